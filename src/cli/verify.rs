//! Verify command - smoke checks alone.

use std::path::Path;

use crate::cli::{context, output, Overrides};
use crate::core::pipeline::Deployment;
use crate::error::Result;

/// Probe the deployed endpoint. Failed checks are warnings; the exit code stays 0.
pub fn execute(path: &Path, overrides: &Overrides) -> Result<()> {
    let config = context::load(path, overrides)?;
    context::preflight(&config, false)?;
    let providers = context::connect(&config)?;

    let checks = Deployment::new(&config, &providers).verify_only()?;
    for check in &checks {
        if check.passed() {
            output::success(&format!("{} {}", check.name, check.url));
        } else {
            let observed = check
                .status
                .map(|s| s.to_string())
                .or_else(|| check.detail.clone())
                .unwrap_or_else(|| "no response".to_string());
            output::warn(&format!(
                "{} {} returned {} (expected {})",
                check.name, check.url, observed, check.expected
            ));
        }
    }
    Ok(())
}
