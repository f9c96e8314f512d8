//! External command execution.
//!
//! Captures stdout, surfaces stderr on failure, and feeds sensitive input
//! through stdin so it never appears in process arguments or error messages.

use std::io::Write;
use std::process::{Command, Stdio};
use tracing::trace;

use crate::error::{ProviderError, Result};

/// A CLI program invoked with per-call arguments.
#[derive(Debug, Clone)]
pub struct Exec {
    program: String,
    base_args: Vec<String>,
}

impl Exec {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            base_args: Vec::new(),
        }
    }

    /// Arguments appended to every invocation.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Check the program is on PATH.
    pub fn available(&self) -> bool {
        which::which(&self.program).is_ok()
    }

    /// Run and return stdout.
    pub fn run<S: AsRef<str>>(&self, args: &[S]) -> Result<String> {
        self.run_inner(args, None)
    }

    /// Run with `input` on stdin and return stdout.
    pub fn run_with_stdin<S: AsRef<str>>(&self, args: &[S], input: &str) -> Result<String> {
        self.run_inner(args, Some(input))
    }

    /// Run and parse stdout as JSON. Empty output parses as `null`.
    pub fn json<S: AsRef<str>>(&self, args: &[S]) -> Result<serde_json::Value> {
        let out = self.run(args)?;
        if out.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&out).map_err(|e| {
            ProviderError::Response {
                command: self.display(args),
                reason: format!("invalid JSON: {}", e),
            }
            .into()
        })
    }

    fn run_inner<S: AsRef<str>>(&self, args: &[S], input: Option<&str>) -> Result<String> {
        let shown = self.display(args);
        trace!(command = %shown, "running");

        let mut command = Command::new(&self.program);
        command
            .args(args.iter().map(|a| a.as_ref()))
            .args(&self.base_args)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|source| ProviderError::Spawn {
            command: shown.clone(),
            source,
        })?;

        if let Some(input) = input {
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(input.as_bytes())?;
            }
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ProviderError::CommandFailed {
                command: shown,
                stderr,
            }
            .into());
        }

        String::from_utf8(output.stdout).map_err(|e| {
            ProviderError::Response {
                command: shown,
                reason: format!("non UTF-8 output: {}", e),
            }
            .into()
        })
    }

    fn display<S: AsRef<str>>(&self, args: &[S]) -> String {
        let mut parts = vec![self.program.as_str()];
        parts.extend(args.iter().map(|a| a.as_ref()));
        parts.join(" ")
    }
}
