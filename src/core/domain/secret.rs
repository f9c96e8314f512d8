//! Secret names and the purpose → regeneration policy table.
//!
//! A secret is addressed by `{scope}/{environment}/{purpose}`. What happens to
//! an existing value on each run is decided by its [`Purpose`] alone, through
//! a single [`PolicyTable`].

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::core::constants;
use crate::error::{Result, VaultError};

/// What a secret is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Purpose {
    /// Application session signing key.
    SigningKey,
    /// Access-token signing key.
    TokenKey,
    /// Master password of the managed database.
    DatabasePassword,
    /// Password of the administrative account created by the init task.
    AdminPassword,
}

impl Purpose {
    /// Every purpose, in provisioning order.
    pub const ALL: [Purpose; 4] = [
        Purpose::SigningKey,
        Purpose::TokenKey,
        Purpose::DatabasePassword,
        Purpose::AdminPassword,
    ];

    /// Last path segment of the secret name.
    pub fn slug(&self) -> &'static str {
        match self {
            Self::SigningKey => "secret-key",
            Self::TokenKey => "jwt-secret-key",
            Self::DatabasePassword => "db-password",
            Self::AdminPassword => "admin-password",
        }
    }

    /// Description stored alongside the secret.
    pub fn description(&self) -> &'static str {
        match self {
            Self::SigningKey => "Application session signing key",
            Self::TokenKey => "Access token signing key",
            Self::DatabasePassword => "Database master password",
            Self::AdminPassword => "Initial administrator password",
        }
    }

    /// Stack parameter that receives this secret's name.
    pub fn parameter(&self) -> &'static str {
        match self {
            Self::SigningKey => "SecretKeySecretName",
            Self::TokenKey => "JwtSecretKeySecretName",
            Self::DatabasePassword => "DBPasswordSecretName",
            Self::AdminPassword => "AdminPasswordSecretName",
        }
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Purpose {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.slug() == s)
            .ok_or_else(|| {
                VaultError::InvalidName {
                    name: s.to_string(),
                    reason: "unknown purpose".to_string(),
                }
                .into()
            })
    }
}

/// Hierarchical secret name: `{scope}/{environment}/{purpose}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SecretName {
    scope: String,
    environment: String,
    purpose: Purpose,
}

impl SecretName {
    /// Build a name, validating both free-form segments.
    pub fn new(scope: &str, environment: &str, purpose: Purpose) -> Result<Self> {
        validate_segment(scope, "scope")?;
        validate_segment(environment, "environment")?;
        Ok(Self {
            scope: scope.to_string(),
            environment: environment.to_string(),
            purpose,
        })
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn purpose(&self) -> Purpose {
        self.purpose
    }
}

impl fmt::Display for SecretName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.scope, self.environment, self.purpose)
    }
}

impl FromStr for SecretName {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('/').collect();
        if parts.len() != 3 {
            return Err(VaultError::InvalidName {
                name: s.to_string(),
                reason: "expected scope/environment/purpose".to_string(),
            }
            .into());
        }
        Self::new(parts[0], parts[1], parts[2].parse()?)
    }
}

impl Serialize for SecretName {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn validate_segment(segment: &str, what: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(VaultError::InvalidName {
            name: segment.to_string(),
            reason: format!("{} cannot be empty", what),
        }
        .into());
    }
    if let Some(ch) = segment
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '-' | '_' | '.'))
    {
        return Err(VaultError::InvalidName {
            name: segment.to_string(),
            reason: format!("invalid character '{}' in {}", ch, what),
        }
        .into());
    }
    Ok(())
}

/// When an existing value is replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    /// Replace on every run.
    Always,
    /// Keep any readable existing value.
    IfAbsent,
    /// Keep an existing value only if it has at least this many characters.
    IfAbsentOrShorterThan(usize),
}

/// How a replacement value is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generator {
    /// URL-safe base64 token of exactly `len` characters.
    Token { len: usize },
    /// ASCII letters and digits.
    Alphanumeric { len: usize },
    /// At least one lowercase, uppercase, digit and symbol.
    MixedClass { len: usize },
}

impl Generator {
    pub fn length(&self) -> usize {
        match self {
            Self::Token { len } | Self::Alphanumeric { len } | Self::MixedClass { len } => *len,
        }
    }
}

/// Regeneration trigger paired with a generation rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    pub rotation: Rotation,
    pub generator: Generator,
}

impl Policy {
    /// Whether an existing value may be returned unchanged.
    ///
    /// `None` means the secret is absent or its value could not be read.
    pub fn accepts(&self, existing: Option<&str>) -> bool {
        let Some(value) = existing else {
            return false;
        };
        if value.trim().is_empty() {
            return false;
        }
        match self.rotation {
            Rotation::Always => false,
            Rotation::IfAbsent => true,
            Rotation::IfAbsentOrShorterThan(min) => value.chars().count() >= min,
        }
    }
}

/// What `ensure` did with a secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SecretAction {
    /// Existing value satisfied the policy and was returned unchanged.
    Reused,
    /// Secret did not exist and was written.
    Created,
    /// Existing value was replaced because the policy rotates on every run.
    Rotated,
    /// Existing value failed the policy (too short or unreadable) and was replaced.
    Regenerated,
}

impl SecretAction {
    pub fn wrote(&self) -> bool {
        !matches!(self, Self::Reused)
    }
}

/// Purpose → policy mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyTable {
    admin_min_length: usize,
}

impl PolicyTable {
    /// The standard table, with a configurable administrator minimum length.
    pub fn new(admin_min_length: usize) -> Self {
        Self { admin_min_length }
    }

    pub fn policy(&self, purpose: Purpose) -> Policy {
        match purpose {
            Purpose::SigningKey | Purpose::TokenKey => Policy {
                rotation: Rotation::Always,
                generator: Generator::Token {
                    len: constants::SIGNING_KEY_LENGTH,
                },
            },
            Purpose::DatabasePassword => Policy {
                rotation: Rotation::IfAbsent,
                generator: Generator::Alphanumeric {
                    len: constants::DATABASE_PASSWORD_LENGTH,
                },
            },
            Purpose::AdminPassword => Policy {
                rotation: Rotation::IfAbsentOrShorterThan(self.admin_min_length),
                generator: Generator::MixedClass {
                    len: constants::ADMIN_PASSWORD_LENGTH.max(self.admin_min_length),
                },
            },
        }
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::new(constants::ADMIN_PASSWORD_MIN_LENGTH)
    }
}
