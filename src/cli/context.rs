//! Config loading and provider wiring shared by commands.

use std::path::Path;
use tracing::debug;

use crate::cli::{output, Overrides};
use crate::core::config::{Config, VaultBackend};
use crate::core::provider::aws::AwsCli;
use crate::core::provider::docker::Docker;
use crate::core::provider::Providers;
use crate::error::{PreconditionError, Result};

/// Load `bullpen.toml` and apply command-line overrides.
pub fn load(path: &Path, overrides: &Overrides) -> Result<Config> {
    let mut config = Config::load(path)?;
    if let Some(environment) = &overrides.environment {
        config.project.environment = environment.clone();
    }
    if let Some(region) = &overrides.region {
        config.project.region = region.clone();
    }
    if let Some(profile) = &overrides.profile {
        config.project.profile = Some(profile.clone());
    }
    config.validate()?;
    debug!(
        environment = %config.project.environment,
        region = %config.project.region,
        "overrides applied"
    );
    Ok(config)
}

/// Providers for the configured account and region.
pub fn connect(config: &Config) -> Result<Providers> {
    Providers::aws(
        &config.project.region,
        config.project.profile.as_deref(),
        config.vault.backend == VaultBackend::Sdk,
    )
}

/// Required tools are installed and credentials resolve.
///
/// Returns the caller identity ARN.
pub fn preflight(config: &Config, needs_docker: bool) -> Result<String> {
    let aws = AwsCli::new(&config.project.region, config.project.profile.as_deref());
    aws.check_cli()?;
    if needs_docker {
        Docker::new(aws.clone()).check_cli()?;
    }
    aws.caller_identity()
}

/// Ask before mutating. Skipped with `--yes` or when stdin is not a terminal.
pub fn confirm(prompt: &str, yes: bool) -> Result<()> {
    if yes || !atty::is(atty::Stream::Stdin) {
        return Ok(());
    }
    let proceed = dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| crate::error::Error::Other(e.to_string()))?;
    if !proceed {
        output::dimmed("cancelled");
        return Err(PreconditionError::Cancelled.into());
    }
    Ok(())
}
