//! AWS backends via the `aws` CLI.
//!
//! ## Requirements
//!
//! - `aws` CLI v2 on PATH
//! - credentials from the environment, a profile, or the default chain
//!
//! Every call runs with `--region <region> --output json`; responses are parsed
//! with `serde_json`. Secret values travel on stdin, never in arguments.

use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::Exec;
use crate::error::{Error, PreconditionError, ProviderError, Result};

mod compute;
mod dns;
mod ecr;
mod network;
mod secrets;
mod stack;

/// Seconds to back off when a CLI waiter gives up before the resource settles.
const WAIT_BACKOFF_SECS: u64 = 15;

/// CLI waiter runs allowed before a resource still in progress is an error.
/// Each CloudFormation waiter polls for up to an hour; each ECS one for ten minutes.
const MAX_WAIT_ROUNDS: u32 = 4;

/// `aws` CLI bound to one region (and optionally one profile).
#[derive(Debug, Clone)]
pub struct AwsCli {
    exec: Exec,
    region: String,
    backoff: Duration,
}

impl AwsCli {
    pub fn new(region: &str, profile: Option<&str>) -> Self {
        let mut base = vec![
            "--region".to_string(),
            region.to_string(),
            "--output".to_string(),
            "json".to_string(),
        ];
        if let Some(profile) = profile {
            base.push("--profile".to_string());
            base.push(profile.to_string());
        }
        Self {
            exec: Exec::new("aws").with_args(base),
            region: region.to_string(),
            backoff: Duration::from_secs(WAIT_BACKOFF_SECS),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Check the CLI is installed.
    pub fn check_cli(&self) -> Result<()> {
        if !self.exec.available() {
            return Err(PreconditionError::MissingTool("aws".to_string()).into());
        }
        Ok(())
    }

    /// ARN of the calling identity. Fails if no credentials resolve.
    pub fn caller_identity(&self) -> Result<String> {
        self.check_cli()?;
        let value = self
            .exec
            .json(&["sts", "get-caller-identity"])
            .map_err(|e| PreconditionError::MissingCredentials(e.to_string()))?;
        let arn = str_field(&value, "Arn").unwrap_or_default();
        debug!(arn = %arn, "resolved caller identity");
        Ok(arn)
    }

    fn json<S: AsRef<str>>(&self, args: &[S]) -> Result<Value> {
        self.exec.json(args)
    }

    fn run<S: AsRef<str>>(&self, args: &[S]) -> Result<String> {
        self.exec.run(args)
    }
}

/// Whether a failed CLI call reported `needle` on stderr.
fn failed_with(err: &Error, needle: &str) -> bool {
    matches!(
        err,
        Error::Provider(ProviderError::CommandFailed { stderr, .. }) if stderr.contains(needle)
    )
}

/// String field of a JSON object.
fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Elements of an array field, empty if missing.
fn array<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Malformed-response error for `command`.
fn unexpected(command: &str, reason: impl Into<String>) -> Error {
    ProviderError::Response {
        command: command.to_string(),
        reason: reason.into(),
    }
    .into()
}

/// An `AwsCli` whose `aws` is a shell script answering by subcommand.
///
/// The script appends each subcommand to `calls` next to itself.
#[cfg(all(test, unix))]
pub(super) mod scripted {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use std::time::Duration;

    use super::{AwsCli, Exec};

    /// `answers` is the body of a `case "$2" in ... esac`.
    pub fn aws(dir: &Path, answers: &str) -> AwsCli {
        let script = dir.join("aws");
        let body = format!(
            "#!/bin/sh\necho \"$2\" >> \"$(dirname \"$0\")/calls\"\ncase \"$2\" in\n{}\nesac\n",
            answers
        );
        fs::write(&script, body).unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        AwsCli {
            exec: Exec::new(&script.display().to_string()),
            region: "us-east-1".to_string(),
            backoff: Duration::ZERO,
        }
    }

    /// Subcommands the script received, in order.
    pub fn calls(dir: &Path) -> Vec<String> {
        fs::read_to_string(dir.join("calls"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}
