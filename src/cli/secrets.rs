//! Secrets commands.

use std::path::Path;
use zeroize::Zeroizing;

use crate::cli::{context, output, Overrides};
use crate::core::domain::{Purpose, SecretName};
use crate::core::vault;
use crate::error::{ConfigError, Result};

/// Apply the rotation policy outside a deploy.
pub fn ensure(
    path: &Path,
    overrides: &Overrides,
    purpose: Option<Purpose>,
    from_env: Option<String>,
) -> Result<()> {
    let config = context::load(path, overrides)?;
    context::preflight(&config, false)?;
    let providers = context::connect(&config)?;
    let table = config.policy_table();

    let candidate = match &from_env {
        Some(var) => Some(Zeroizing::new(std::env::var(var).map_err(|_| {
            ConfigError::InvalidValue {
                field: "--from-env",
                reason: format!("environment variable {} is not set", var),
            }
        })?)),
        None => None,
    };

    let purposes: Vec<Purpose> = match purpose {
        Some(p) => vec![p],
        None => Purpose::ALL.to_vec(),
    };

    for purpose in purposes {
        let name = SecretName::new(&config.project.name, &config.project.environment, purpose)?;
        let ensured = vault::ensure(
            providers.secrets.as_ref(),
            &name,
            candidate.as_ref().map(|c| c.as_str()),
            &table.policy(purpose),
        )?;
        let report = ensured.report();
        output::success(&format!(
            "{} {} [{}]",
            output::resource(&name.to_string()),
            format!("{:?}", report.action).to_lowercase(),
            report.fingerprint
        ));
    }
    Ok(())
}

/// List secret names and the action the next deploy would take.
pub fn list(path: &Path, overrides: &Overrides, json: bool) -> Result<()> {
    let config = context::load(path, overrides)?;
    context::preflight(&config, false)?;
    let providers = context::connect(&config)?;
    let table = config.policy_table();

    let mut rows = Vec::new();
    for purpose in Purpose::ALL {
        let name = SecretName::new(&config.project.name, &config.project.environment, purpose)?;
        let exists = providers.secrets.describe(&name)?;
        let action = vault::decide(providers.secrets.as_ref(), &name, &table.policy(purpose))?;
        rows.push((name, exists, action));
    }

    if json {
        let value: Vec<_> = rows
            .iter()
            .map(|(name, exists, action)| {
                serde_json::json!({ "name": name, "exists": exists, "next": action })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    output::section("Secrets");
    for (name, exists, action) in &rows {
        let state = if *exists { "present" } else { "absent" };
        output::kv(
            name.purpose().slug(),
            format!(
                "{}  {}, next deploy: {}",
                name,
                state,
                format!("{:?}", action).to_lowercase()
            ),
        );
    }
    Ok(())
}
