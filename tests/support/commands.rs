//! Command helper methods for Test.

use super::Test;
use assert_cmd::Command;
use std::process::Output;

impl Test {
    /// Create a bullpen command with an isolated environment.
    ///
    /// Returns a Command configured with:
    /// - HOME set to the temporary home directory
    /// - Current directory set to the test project directory
    /// - BULLPEN_* and AWS_* variables removed
    pub fn cmd(&self) -> Command {
        #[allow(deprecated)]
        let mut cmd = Command::cargo_bin("bullpen").expect("failed to find bullpen binary");
        cmd.env("HOME", self.home.path());
        cmd.env("USERPROFILE", self.home.path());
        for var in [
            "BULLPEN_CONFIG",
            "BULLPEN_ENVIRONMENT",
            "BULLPEN_REGION",
            "BULLPEN_PROFILE",
            "BULLPEN_IMAGE_TAG",
            "BULLPEN_LOG",
            "AWS_PROFILE",
            "AWS_ACCESS_KEY_ID",
            "AWS_SECRET_ACCESS_KEY",
        ] {
            cmd.env_remove(var);
        }
        cmd.env("NO_COLOR", "1");
        cmd.current_dir(self.dir.path());
        cmd
    }

    /// Shortcut for `bullpen init --name`.
    pub fn init_cmd(&self, name: &str) -> Output {
        self.cmd()
            .args(["init", "--name", name])
            .output()
            .expect("failed to run bullpen init")
    }

    /// Shortcut for `bullpen plan`.
    pub fn plan(&self) -> Output {
        self.cmd()
            .arg("plan")
            .output()
            .expect("failed to run bullpen plan")
    }

    /// Run bullpen with arbitrary arguments.
    pub fn run(&self, args: &[&str]) -> Output {
        self.cmd()
            .args(args)
            .output()
            .expect("failed to run bullpen")
    }
}
