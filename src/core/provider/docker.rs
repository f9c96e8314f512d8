//! Image build and push via the `docker` CLI.
//!
//! Registry credentials come from `aws ecr get-login-password` and are handed
//! to `docker login` on stdin.

use std::path::Path;
use tracing::{debug, info};

use super::aws::AwsCli;
use super::{Exec, Registry};
use crate::error::{ImageError, PreconditionError, Result};

/// Docker CLI paired with the AWS CLI for registry access.
#[derive(Debug, Clone)]
pub struct Docker {
    exec: Exec,
    aws: AwsCli,
}

impl Docker {
    pub fn new(aws: AwsCli) -> Self {
        Self {
            exec: Exec::new("docker"),
            aws,
        }
    }

    /// Check the CLI is installed.
    pub fn check_cli(&self) -> Result<()> {
        if !self.exec.available() {
            return Err(PreconditionError::MissingTool("docker".to_string()).into());
        }
        Ok(())
    }
}

impl Registry for Docker {
    fn ensure_repository(&self, repository: &str) -> Result<String> {
        self.aws.ensure_repository(repository)
    }

    fn login(&self, registry: &str) -> Result<()> {
        self.check_cli()?;
        let login_error = |reason: String| ImageError::Login {
            registry: registry.to_string(),
            reason,
        };

        let password = self
            .aws
            .ecr_login_password()
            .map_err(|e| login_error(e.to_string()))?;
        self.exec
            .run_with_stdin(
                &["login", "--username", "AWS", "--password-stdin", registry],
                &password,
            )
            .map_err(|e| login_error(e.to_string()))?;
        debug!(registry, "registry login succeeded");
        Ok(())
    }

    fn build(
        &self,
        context: &Path,
        dockerfile: &Path,
        local_ref: &str,
        platform: &str,
    ) -> Result<()> {
        self.check_cli()?;
        info!(image = local_ref, platform, "building image");
        let dockerfile = dockerfile.display().to_string();
        let context = context.display().to_string();
        self.exec
            .run(&[
                "build",
                "--platform",
                platform,
                "-f",
                dockerfile.as_str(),
                "-t",
                local_ref,
                context.as_str(),
            ])
            .map_err(|e| ImageError::Build {
                image: local_ref.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    fn push(&self, local_ref: &str, remote_ref: &str) -> Result<String> {
        let push_error = |reason: String| ImageError::Push {
            image: remote_ref.to_string(),
            reason,
        };

        self.exec
            .run(&["tag", local_ref, remote_ref])
            .map_err(|e| push_error(e.to_string()))?;
        let out = self
            .exec
            .run(&["push", remote_ref])
            .map_err(|e| push_error(e.to_string()))?;

        Ok(match parse_push_digest(&out) {
            Some(digest) => format!("{}@{}", strip_tag(remote_ref), digest),
            None => remote_ref.to_string(),
        })
    }
}

/// `sha256:…` digest from `docker push` output.
fn parse_push_digest(output: &str) -> Option<String> {
    output
        .split_whitespace()
        .find(|w| w.starts_with("sha256:") && w.len() == "sha256:".len() + 64)
        .map(str::to_string)
}

/// Repository part of a reference, without its tag. A colon before the last
/// slash belongs to a registry port.
fn strip_tag(reference: &str) -> &str {
    let name_start = reference.rfind('/').map(|i| i + 1).unwrap_or(0);
    match reference[name_start..].rfind(':') {
        Some(i) => &reference[..name_start + i],
        None => reference,
    }
}

/// Registry host of a repository URI.
pub fn registry_host(uri: &str) -> &str {
    uri.split('/').next().unwrap_or(uri)
}
