//! External collaborators.
//!
//! One trait per system the orchestrator drives. Every method blocks until the
//! external system answers; waits defer to the provider's own wait semantics.
//!
//! ## Implementations
//!
//! - [`aws`]: shells out to the `aws` CLI (default)
//! - [`docker`]: image build and push through the `docker` CLI
//! - [`sdk`]: Secrets Manager through the AWS SDK (feature `aws`)
//! - [`memory`]: in-memory cloud with a call journal, for tests
//!
//! ## Adding a New Provider
//!
//! 1. Implement the traits it covers
//! 2. Add a constructor to [`Providers`]

use std::path::Path;

use zeroize::Zeroizing;

use crate::core::domain::{
    CommandOverride, DnsRecord, NetworkPlacement, SecretName, ServiceState, StackStatus, Subnet,
    TaskState, UpdateOutcome,
};
use crate::core::types::{Outputs, Parameters, Tags, TaskId};
use crate::error::Result;

pub mod aws;
pub mod docker;
mod exec;
pub mod http;
pub mod memory;

#[cfg(feature = "aws")]
pub mod sdk;

pub use exec::Exec;

/// Secret store.
pub trait SecretStore {
    /// Whether a secret with this name exists.
    fn describe(&self, name: &SecretName) -> Result<bool>;

    /// Current value. Returns `VaultError::Malformed` if the value cannot be
    /// read as text.
    fn get(&self, name: &SecretName) -> Result<Zeroizing<String>>;

    /// Create the secret or replace its value, keeping its identity.
    fn put(&self, name: &SecretName, value: &str, description: &str) -> Result<()>;
}

/// Network discovery.
pub trait NetworkProvider {
    /// Network carrying tag `key=value`, if any.
    fn find_network(&self, key: &str, value: &str) -> Result<Option<String>>;

    /// Every network in the region, in provider order.
    fn list_networks(&self) -> Result<Vec<String>>;

    /// Subnets of a network, in provider order.
    fn list_subnets(&self, network_id: &str) -> Result<Vec<Subnet>>;
}

/// Declarative infrastructure.
pub trait InfraProvider {
    /// Current status, `StackStatus::Absent` if the stack does not exist.
    fn describe_stack(&self, name: &str) -> Result<StackStatus>;

    fn create_stack(
        &self,
        name: &str,
        template: &Path,
        params: &Parameters,
        tags: &Tags,
    ) -> Result<()>;

    fn update_stack(
        &self,
        name: &str,
        template: &Path,
        params: &Parameters,
        tags: &Tags,
    ) -> Result<UpdateOutcome>;

    /// Block until the stack leaves its in-progress state and return where it landed.
    fn wait_terminal(&self, name: &str) -> Result<StackStatus>;

    fn get_outputs(&self, name: &str) -> Result<Outputs>;
}

/// Compute orchestrator.
pub trait ComputeOrchestrator {
    fn describe_service(&self, cluster: &str, service: &str) -> Result<ServiceState>;

    fn update_service(&self, cluster: &str, service: &str, force_new_deployment: bool)
        -> Result<()>;

    fn wait_service_stable(&self, cluster: &str, service: &str) -> Result<()>;

    /// Launch one task instance and return its id.
    fn run_task(
        &self,
        cluster: &str,
        task_definition: &str,
        command: &CommandOverride,
        placement: &NetworkPlacement,
    ) -> Result<TaskId>;

    fn wait_task_stopped(&self, cluster: &str, task_id: &str) -> Result<()>;

    /// Task state, with the exit code of `container`.
    fn describe_task(&self, cluster: &str, task_id: &str, container: &str) -> Result<TaskState>;
}

/// DNS zone.
pub trait DnsProvider {
    /// Hosted zone serving `domain`, if any.
    fn find_zone(&self, domain: &str) -> Result<Option<String>>;

    /// Records in `zone` whose name equals `name`.
    fn list_records(&self, zone: &str, name: &str) -> Result<Vec<DnsRecord>>;

    fn upsert_record(&self, zone: &str, record: &DnsRecord) -> Result<()>;
}

/// Container registry and image builder.
pub trait Registry {
    /// URI of the repository, created if missing.
    fn ensure_repository(&self, repository: &str) -> Result<String>;

    fn login(&self, registry: &str) -> Result<()>;

    fn build(&self, context: &Path, dockerfile: &Path, local_ref: &str, platform: &str)
        -> Result<()>;

    /// Push and return the resolved reference, preferring a digest.
    fn push(&self, local_ref: &str, remote_ref: &str) -> Result<String>;
}

/// HTTP probe for post-deploy smoke checks.
pub trait HttpProbe {
    fn get(&self, url: &str) -> Result<u16>;

    fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<u16>;
}

/// One implementation of every seam.
pub struct Providers {
    pub secrets: Box<dyn SecretStore>,
    pub network: Box<dyn NetworkProvider>,
    pub infra: Box<dyn InfraProvider>,
    pub compute: Box<dyn ComputeOrchestrator>,
    pub dns: Box<dyn DnsProvider>,
    pub registry: Box<dyn Registry>,
    pub probe: Box<dyn HttpProbe>,
}

impl Providers {
    /// CLI-backed providers for `region`.
    ///
    /// With `sdk_vault` (feature `aws`), secrets go through the SDK instead.
    pub fn aws(region: &str, profile: Option<&str>, sdk_vault: bool) -> Result<Self> {
        let cli = aws::AwsCli::new(region, profile);
        let secrets: Box<dyn SecretStore> = if sdk_vault {
            sdk_store(region)?
        } else {
            Box::new(cli.clone())
        };

        Ok(Self {
            secrets,
            network: Box::new(cli.clone()),
            infra: Box::new(cli.clone()),
            compute: Box::new(cli.clone()),
            dns: Box::new(cli.clone()),
            registry: Box::new(docker::Docker::new(cli)),
            probe: Box::new(http::Reqwest::new()?),
        })
    }
}

#[cfg(feature = "aws")]
fn sdk_store(region: &str) -> Result<Box<dyn SecretStore>> {
    Ok(Box::new(sdk::SecretsManager::new(region)?))
}

#[cfg(not(feature = "aws"))]
fn sdk_store(_region: &str) -> Result<Box<dyn SecretStore>> {
    Err(crate::error::ConfigError::InvalidValue {
        field: "vault.backend",
        reason: "SDK support not compiled. Rebuild with: cargo install bullpen --features aws"
            .to_string(),
    }
    .into())
}
