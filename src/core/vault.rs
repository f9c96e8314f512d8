//! Credential vault stage.
//!
//! `ensure` reads a secret, keeps it if its purpose's policy accepts it, and
//! otherwise writes a replacement. Each call performs at most one write.

use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::core::domain::{
    Policy, PolicyTable, Purpose, Rotation, SecretAction, SecretName, SecretReport,
};
use crate::core::generate::{fingerprint, generate};
use crate::core::provider::SecretStore;
use crate::error::{Error, Result, VaultError};

/// The effective value of a secret after `ensure`.
pub struct EnsuredSecret {
    pub name: SecretName,
    pub value: Zeroizing<String>,
    pub action: SecretAction,
}

impl EnsuredSecret {
    /// Loggable summary. Carries a fingerprint, never the value.
    pub fn report(&self) -> SecretReport {
        SecretReport {
            name: self.name.clone(),
            action: self.action,
            fingerprint: fingerprint(&self.value),
        }
    }
}

impl std::fmt::Debug for EnsuredSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnsuredSecret")
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .field("action", &self.action)
            .finish()
    }
}

/// What the store currently holds under a name.
enum Existing {
    Absent,
    /// Present but not readable as text.
    Unreadable,
    Value(Zeroizing<String>),
}

impl Existing {
    fn as_option(&self) -> Option<&str> {
        match self {
            Existing::Value(v) => Some(v.as_str()),
            _ => None,
        }
    }
}

fn read_existing(store: &dyn SecretStore, name: &SecretName) -> Result<Existing> {
    if !store.describe(name)? {
        return Ok(Existing::Absent);
    }
    match store.get(name) {
        Ok(value) => Ok(Existing::Value(value)),
        Err(Error::Vault(VaultError::Malformed { reason, .. })) => {
            warn!(secret = %name, %reason, "existing value unreadable, will regenerate");
            Ok(Existing::Unreadable)
        }
        Err(Error::Vault(VaultError::NotFound(_))) => Ok(Existing::Absent),
        Err(e) => Err(e),
    }
}

fn action_for(existing: &Existing, policy: &Policy) -> SecretAction {
    if policy.accepts(existing.as_option()) {
        return SecretAction::Reused;
    }
    match existing {
        Existing::Absent => SecretAction::Created,
        Existing::Value(_) if policy.rotation == Rotation::Always => {
            SecretAction::Rotated
        }
        _ => SecretAction::Regenerated,
    }
}

/// Action `ensure` would take, without writing.
pub fn decide(store: &dyn SecretStore, name: &SecretName, policy: &Policy) -> Result<SecretAction> {
    let existing = read_existing(store, name)?;
    Ok(action_for(&existing, policy))
}

/// Return the effective value of `name` under `policy`.
///
/// When a replacement is needed, `candidate` is written if supplied;
/// otherwise a value is generated by the policy's generator.
///
/// # Errors
///
/// Fails if the store is unreachable or the write is refused. An unreadable
/// existing value is not an error; it is replaced.
pub fn ensure(
    store: &dyn SecretStore,
    name: &SecretName,
    candidate: Option<&str>,
    policy: &Policy,
) -> Result<EnsuredSecret> {
    let existing = read_existing(store, name)?;
    let action = action_for(&existing, policy);

    if let (SecretAction::Reused, Existing::Value(value)) = (action, existing) {
        debug!(secret = %name, fingerprint = %fingerprint(&value), "reusing secret");
        return Ok(EnsuredSecret {
            name: name.clone(),
            value,
            action,
        });
    }

    let value = match candidate {
        Some(candidate) => {
            check_candidate(name, candidate, policy)?;
            Zeroizing::new(candidate.to_string())
        }
        None => generate(&policy.generator),
    };
    store.put(name, &value, name.purpose().description())?;

    info!(
        secret = %name,
        action = ?action,
        fingerprint = %fingerprint(&value),
        "secret written"
    );
    Ok(EnsuredSecret {
        name: name.clone(),
        value,
        action,
    })
}

fn check_candidate(name: &SecretName, candidate: &str, policy: &Policy) -> Result<()> {
    let reject = |reason: String| VaultError::Rejected {
        name: name.to_string(),
        reason,
    };
    if candidate.trim().is_empty() {
        return Err(reject("value is blank".to_string()).into());
    }
    if let Rotation::IfAbsentOrShorterThan(min) = policy.rotation {
        let len = candidate.chars().count();
        if len < min {
            return Err(reject(format!("{} characters, need at least {}", len, min)).into());
        }
    }
    Ok(())
}

/// Ensure every purpose's secret for `scope/environment`, in provisioning order.
pub fn provision(
    store: &dyn SecretStore,
    table: &PolicyTable,
    scope: &str,
    environment: &str,
) -> Result<Vec<EnsuredSecret>> {
    Purpose::ALL
        .iter()
        .map(|&purpose| {
            let name = SecretName::new(scope, environment, purpose)?;
            ensure(store, &name, None, &table.policy(purpose))
        })
        .collect()
}
