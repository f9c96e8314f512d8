//! Test support utilities for bullpen integration tests.
//!
//! Provides reusable test environment setup and helper commands.

#![allow(dead_code)]

pub mod assertions;
pub mod commands;
pub mod fixtures;
pub mod skip;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use fixtures::*;

use tempfile::TempDir;

/// Test environment with isolated temp directories.
///
/// Child processes run with `.current_dir()` and a scrubbed environment so
/// tests can run in parallel without touching real cloud credentials.
pub struct Test {
    /// Temporary directory for the project
    pub dir: TempDir,
    /// Temporary home directory
    pub home: TempDir,
}

impl Test {
    /// Create a new empty test environment.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let home = TempDir::new().expect("failed to create temp home");

        Self { dir, home }
    }

    /// Create a test environment with bullpen.toml scaffolded.
    pub fn init(name: &str) -> Self {
        let t = Self::new();
        let output = t.init_cmd(name);
        assert!(
            output.status.success(),
            "Failed to scaffold config: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        t
    }

    /// Create a test environment from raw config contents.
    pub fn with_config(contents: &str) -> Self {
        let t = Self::new();
        t.write("bullpen.toml", contents);
        t
    }

    /// Write a file relative to the project dir.
    pub fn write(&self, rel: &str, contents: &str) {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create parent dir");
        }
        std::fs::write(path, contents).expect("failed to write file");
    }

    /// Write an `aws` shell script into a private bin dir and return the dir.
    ///
    /// `answers` is the body of a `case "$1 $2" in ... esac`; put the dir on
    /// `PATH` to route every `aws` call through it.
    #[cfg(unix)]
    pub fn fake_aws(&self, answers: &str) -> std::path::PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let bin = self.home.path().join("bin");
        std::fs::create_dir_all(&bin).expect("failed to create bin dir");
        let script = bin.join("aws");
        let body = format!("#!/bin/sh\ncase \"$1 $2\" in\n{}\nesac\n", answers);
        std::fs::write(&script, body).expect("failed to write aws script");
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))
            .expect("failed to mark aws script executable");
        bin
    }

    /// Read a file relative to the project dir.
    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(rel)).expect("failed to read file")
    }
}
