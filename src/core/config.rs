//! Configuration file management.
//!
//! Handles reading, validating and scaffolding `bullpen.toml`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::core::constants;
use crate::core::dns::DomainSpec;
use crate::core::domain::{PolicyTable, Purpose, SecretName};
use crate::core::image::ImageSpec;
use crate::core::topology::NetworkPreferences;
use crate::core::verify::VerifySpec;
use crate::error::{ConfigError, Result};

/// Deployment description stored in `bullpen.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub project: Project,
    #[serde(default)]
    pub network: Network,
    pub image: Image,
    pub stack: Stack,
    #[serde(default)]
    pub service: Service,
    #[serde(default)]
    pub migration: Migration,
    /// Custom domain. Absent means the load balancer address is used as-is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns: Option<Dns>,
    #[serde(default)]
    pub verify: Verify,
    #[serde(default)]
    pub vault: Vault,
}

/// Identity of the deployment unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Project name; also the scope of every secret name.
    pub name: String,
    pub environment: String,
    pub region: String,
    /// Named AWS CLI profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
}

/// Network discovery preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    /// Tag key the preferred network carries.
    #[serde(default = "default_tag_key")]
    pub tag_key: String,
    /// Tag value; defaults to `{project}-vpc`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_value: Option<String>,
    /// Subnets to place the migration task in when discovery finds none.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fallback_subnets: Vec<String>,
    #[serde(default = "default_true")]
    pub assign_public_ip: bool,
}

impl Default for Network {
    fn default() -> Self {
        Self {
            tag_key: default_tag_key(),
            tag_value: None,
            fallback_subnets: Vec::new(),
            assign_public_ip: true,
        }
    }
}

/// Container image build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    /// Registry repository name.
    pub repository: String,
    #[serde(default = "default_context")]
    pub context: PathBuf,
    #[serde(default = "default_dockerfile")]
    pub dockerfile: PathBuf,
    #[serde(default = "default_platform")]
    pub platform: String,
    #[serde(default = "default_tag")]
    pub tag: String,
}

/// Infrastructure stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stack {
    /// Defaults to `{project}-{environment}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub template: PathBuf,
    /// Extra template parameters passed verbatim.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
    /// Extra stack tags.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

/// Long-running service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    /// Container whose command the migration task overrides.
    #[serde(default = "default_container")]
    pub container: String,
}

impl Default for Service {
    fn default() -> Self {
        Self {
            container: default_container(),
        }
    }
}

/// One-shot database initialization task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Migration {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_migration_command")]
    pub command: Vec<String>,
    /// Administrative account the task creates.
    #[serde(default = "default_admin_username")]
    pub admin_username: String,
    /// Log group of the task's container, for failure hints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_group: Option<String>,
}

impl Default for Migration {
    fn default() -> Self {
        Self {
            enabled: true,
            command: default_migration_command(),
            admin_username: default_admin_username(),
            log_group: None,
        }
    }
}

/// Custom domain record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dns {
    /// Fully-qualified record name.
    pub domain: String,
    /// Hosted zone; looked up from `domain` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,
    #[serde(default = "default_ttl")]
    pub ttl: u32,
    /// Let the template create the record when none exists yet.
    #[serde(default = "default_true")]
    pub template_managed: bool,
}

/// Post-deploy smoke checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verify {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_scheme")]
    pub scheme: String,
    #[serde(default = "default_health_path")]
    pub health_path: String,
    #[serde(default = "default_auth_path")]
    pub auth_path: String,
}

impl Default for Verify {
    fn default() -> Self {
        Self {
            enabled: true,
            scheme: default_scheme(),
            health_path: default_health_path(),
            auth_path: default_auth_path(),
        }
    }
}

/// Which secret store implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VaultBackend {
    /// The `aws secretsmanager` CLI.
    #[default]
    Cli,
    /// The AWS SDK (feature `aws`).
    Sdk,
}

/// Secret store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vault {
    #[serde(default)]
    pub backend: VaultBackend,
    /// Minimum length an existing administrator password must have to be kept.
    #[serde(default = "default_admin_min_length")]
    pub admin_min_length: usize,
}

impl Default for Vault {
    fn default() -> Self {
        Self {
            backend: VaultBackend::Cli,
            admin_min_length: default_admin_min_length(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_tag_key() -> String {
    constants::NETWORK_TAG_KEY.to_string()
}

fn default_context() -> PathBuf {
    PathBuf::from(".")
}

fn default_dockerfile() -> PathBuf {
    PathBuf::from("Dockerfile")
}

fn default_platform() -> String {
    constants::DEFAULT_PLATFORM.to_string()
}

fn default_tag() -> String {
    "latest".to_string()
}

fn default_container() -> String {
    "app".to_string()
}

fn default_migration_command() -> Vec<String> {
    vec!["flask".to_string(), "init-db".to_string()]
}

fn default_admin_username() -> String {
    "admin".to_string()
}

fn default_ttl() -> u32 {
    constants::DNS_TTL
}

fn default_scheme() -> String {
    "http".to_string()
}

fn default_health_path() -> String {
    constants::HEALTH_PATH.to_string()
}

fn default_auth_path() -> String {
    constants::AUTH_PATH.to_string()
}

fn default_admin_min_length() -> usize {
    constants::ADMIN_PASSWORD_MIN_LENGTH
}

impl Config {
    /// Default path in the current directory.
    pub fn default_path() -> PathBuf {
        PathBuf::from(constants::CONFIG_FILE)
    }

    /// Load and validate configuration from `path`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if the file doesn't exist,
    /// or `ConfigError::Parse` if the TOML is malformed.
    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading config");

        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()).into());
        }
        let contents = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        let config = Self::parse(&contents)?;

        debug!(
            project = %config.project.name,
            environment = %config.project.environment,
            region = %config.project.region,
            "config loaded"
        );
        Ok(config)
    }

    /// Parse and validate TOML.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Write a commented starter configuration to `path`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::AlreadyExists` rather than overwriting.
    pub fn scaffold(path: &Path, name: &str) -> Result<()> {
        if path.exists() {
            return Err(ConfigError::AlreadyExists(path.display().to_string()).into());
        }
        std::fs::write(path, starter(name))?;
        debug!(path = %path.display(), "wrote starter config");
        Ok(())
    }

    /// Validate the configuration structure and contents.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` or `ConfigError::MissingField` on validation failure.
    pub fn validate(&self) -> Result<()> {
        debug!("validating config");

        require("project.name", &self.project.name)?;
        require("project.environment", &self.project.environment)?;
        require("project.region", &self.project.region)?;
        require("image.repository", &self.image.repository)?;

        // Every secret name must be constructible from the project identity.
        SecretName::new(
            &self.project.name,
            &self.project.environment,
            Purpose::SigningKey,
        )
        .map_err(|e| ConfigError::InvalidValue {
            field: "project",
            reason: e.to_string(),
        })?;

        if self.stack.template.as_os_str().is_empty() {
            return Err(ConfigError::MissingField {
                field: "stack.template",
            }
            .into());
        }

        if self.migration.enabled && self.migration.command.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "migration.command",
                reason: "must name at least the program to run".to_string(),
            }
            .into());
        }

        if self.vault.admin_min_length == 0 {
            return Err(ConfigError::InvalidValue {
                field: "vault.admin_min_length",
                reason: "must be at least 1".to_string(),
            }
            .into());
        }

        if let Some(dns) = &self.dns {
            require("dns.domain", &dns.domain)?;
            if !dns.domain.contains('.') {
                return Err(ConfigError::InvalidValue {
                    field: "dns.domain",
                    reason: format!("'{}' is not a fully-qualified name", dns.domain),
                }
                .into());
            }
        }

        for key in self.stack.parameters.keys() {
            if RESERVED_PARAMETERS.contains(&key.as_str()) {
                return Err(ConfigError::InvalidValue {
                    field: "stack.parameters",
                    reason: format!("'{}' is computed at deploy time", key),
                }
                .into());
            }
        }

        Ok(())
    }

    /// Stack name, defaulting to `{project}-{environment}`.
    pub fn stack_name(&self) -> String {
        self.stack.name.clone().unwrap_or_else(|| {
            format!("{}-{}", self.project.name, self.project.environment)
        })
    }

    /// Tag value of the preferred network, defaulting to `{project}-vpc`.
    pub fn network_tag_value(&self) -> String {
        self.network
            .tag_value
            .clone()
            .unwrap_or_else(|| format!("{}-vpc", self.project.name))
    }

    pub fn policy_table(&self) -> PolicyTable {
        PolicyTable::new(self.vault.admin_min_length)
    }

    pub fn network_preferences(&self) -> NetworkPreferences {
        NetworkPreferences {
            tag_key: self.network.tag_key.clone(),
            tag_value: self.network_tag_value(),
            fallback_subnets: self.network.fallback_subnets.clone(),
        }
    }

    pub fn image_spec(&self) -> ImageSpec {
        ImageSpec {
            repository: self.image.repository.clone(),
            context: self.image.context.clone(),
            dockerfile: self.image.dockerfile.clone(),
            platform: self.image.platform.clone(),
            tag: self.image.tag.clone(),
        }
    }

    pub fn domain_spec(&self) -> Option<DomainSpec> {
        self.dns.as_ref().map(|dns| DomainSpec {
            domain: dns.domain.clone(),
            zone_id: dns.zone_id.clone(),
            ttl: dns.ttl,
            template_managed: dns.template_managed,
        })
    }

    pub fn verify_spec(&self) -> VerifySpec {
        VerifySpec {
            scheme: self.verify.scheme.clone(),
            health_path: self.verify.health_path.clone(),
            auth_path: self.verify.auth_path.clone(),
        }
    }
}

/// Parameters the orchestrator computes itself.
const RESERVED_PARAMETERS: &[&str] = &[
    constants::PARAM_ENVIRONMENT,
    constants::PARAM_NETWORK,
    constants::PARAM_SUBNETS,
    constants::PARAM_PUBLIC_SUBNETS,
    constants::PARAM_IMAGE,
    constants::PARAM_CREATE_DNS,
    constants::PARAM_DOMAIN,
    constants::PARAM_ZONE,
];

fn require(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::MissingField { field }.into());
    }
    Ok(())
}

fn starter(name: &str) -> String {
    format!(
        r#"# bullpen deployment description

[project]
name = "{name}"
environment = "production"
region = "us-east-1"
# profile = "default"

[network]
# Network is looked up by tag, falling back to the first one in the region.
tag_key = "Name"
# tag_value = "{name}-vpc"
# fallback_subnets = []

[image]
repository = "{name}"
context = "."
dockerfile = "Dockerfile"
platform = "{platform}"
tag = "latest"

[stack]
template = "infrastructure/stack.yaml"
# name = "{name}-production"

[stack.parameters]
# DBInstanceClass = "db.t3.micro"

[service]
container = "app"

[migration]
enabled = true
command = ["flask", "init-db"]
admin_username = "admin"
# log_group = "/ecs/{name}"

# [dns]
# domain = "api.example.com"
# template_managed = true

[verify]
enabled = true
health_path = "{health}"
auth_path = "{auth}"

[vault]
backend = "cli"
admin_min_length = {min}
"#,
        name = name,
        platform = constants::DEFAULT_PLATFORM,
        health = constants::HEALTH_PATH,
        auth = constants::AUTH_PATH,
        min = constants::ADMIN_PASSWORD_MIN_LENGTH,
    )
}
