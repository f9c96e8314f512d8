//! Error types.
//!
//! One enum per concern, wrapped by [`Error`]. Every fatal variant names the
//! resource it concerns so [`Error::hint`] can point the operator at the
//! command that inspects it.

use thiserror::Error;

/// Top-level error.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Stack(#[from] StackError),

    #[error(transparent)]
    Dns(#[from] DnsError),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Where an error sits in the failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// Detected before any mutation.
    Precondition,
    /// A create/update/run reached a failed terminal state.
    Mutation,
    /// Failed after the infrastructure change succeeded; run still succeeds.
    BestEffort,
    /// A smoke probe could not complete; reported as a warning.
    Verification,
}

/// Configuration file errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config not found: {0}")]
    NotFound(String),

    #[error("config already exists: {0}")]
    AlreadyExists(String),

    #[error("failed to read config: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("missing config field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Conditions that must hold before anything is mutated.
#[derive(Error, Debug)]
pub enum PreconditionError {
    #[error("required tool not found on PATH: {0}")]
    MissingTool(String),

    #[error("no usable cloud credentials: {0}")]
    MissingCredentials(String),

    #[error("stack {stack} is busy ({status}); wait for it to settle")]
    StackBusy { stack: String, status: String },

    #[error("stack {stack} rolled back during creation and cannot be updated; delete it first")]
    StackRolledBack { stack: String },

    #[error("stack {stack} failed to roll back an update; continue the rollback before deploying")]
    StackRollbackFailed { stack: String },

    #[error("service {service} in {cluster} is not stable: {running} running of {desired} desired")]
    ServiceUnstable {
        cluster: String,
        service: String,
        running: u32,
        desired: u32,
    },

    #[error("stack {0} does not exist yet; run `bullpen deploy` first")]
    StackMissing(String),

    #[error("deployment cancelled")]
    Cancelled,
}

/// Secret store errors.
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("secret store unreachable while reading {name}: {reason}")]
    Unreachable { name: String, reason: String },

    #[error("secret {0} does not exist")]
    NotFound(String),

    #[error("secret {name} holds an unreadable value: {reason}")]
    Malformed { name: String, reason: String },

    #[error("failed to write secret {name}: {reason}")]
    WriteFailed { name: String, reason: String },

    #[error("invalid secret name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("supplied value for {name} rejected: {reason}")]
    Rejected { name: String, reason: String },
}

/// Network discovery errors.
#[derive(Error, Debug)]
pub enum TopologyError {
    #[error("no network found in region {0}")]
    NoNetwork(String),

    #[error("network {0} has no subnets")]
    NoSubnets(String),
}

/// Image build and publish errors.
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("registry login failed for {registry}: {reason}")]
    Login { registry: String, reason: String },

    #[error("image build failed for {image}: {reason}")]
    Build { image: String, reason: String },

    #[error("push rejected for {image}: {reason}")]
    Push { image: String, reason: String },
}

/// Stack reconciliation errors.
#[derive(Error, Debug)]
pub enum StackError {
    #[error("stack {stack} ended in {status}")]
    Failed { stack: String, status: String },

    #[error("stack {stack} still {status} after {rounds} waiter rounds")]
    WaitExhausted {
        stack: String,
        status: String,
        rounds: u32,
    },

    #[error("stack {stack} is missing expected output {output}")]
    MissingOutput { stack: String, output: String },

    #[error("template not readable at {path}: {reason}")]
    Template { path: String, reason: String },
}

/// DNS reconciliation errors.
#[derive(Error, Debug)]
pub enum DnsError {
    #[error("no hosted zone found for {0}")]
    ZoneNotFound(String),

    #[error("failed to upsert {fqdn} in zone {zone}: {reason}")]
    UpsertFailed {
        zone: String,
        fqdn: String,
        reason: String,
    },
}

/// One-off task errors.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("migration task {task_id} in {cluster} exited with code {exit_code}")]
    Failed {
        cluster: String,
        task_id: String,
        exit_code: i32,
        log_group: Option<String>,
    },

    #[error("migration task {task_id} in {cluster} stopped without an exit code: {reason}")]
    NoExitCode {
        cluster: String,
        task_id: String,
        reason: String,
    },

    #[error("migration task {task_id} in {cluster} still running after {rounds} waiter rounds")]
    WaitExhausted {
        cluster: String,
        task_id: String,
        rounds: u32,
    },

    #[error("failed to launch migration task in {cluster}: {reason}")]
    Launch { cluster: String, reason: String },
}

/// Failures talking to an external CLI or API.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("`{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unexpected response from `{command}`: {reason}")]
    Response { command: String, reason: String },

    #[error("http request to {url} failed: {reason}")]
    Http { url: String, reason: String },
}

impl Error {
    /// Taxonomy bucket for this error.
    pub fn category(&self) -> Category {
        match self {
            Error::Stack(StackError::Failed { .. })
            | Error::Stack(StackError::WaitExhausted { .. })
            | Error::Task(_)
            | Error::Image(ImageError::Push { .. })
            | Error::Image(ImageError::Build { .. }) => Category::Mutation,
            Error::Dns(DnsError::UpsertFailed { .. }) => Category::BestEffort,
            Error::Provider(ProviderError::Http { .. }) => Category::Verification,
            Error::Vault(VaultError::WriteFailed { .. }) => Category::Mutation,
            _ => Category::Precondition,
        }
    }

    /// Command an operator can run to inspect the failing resource.
    pub fn hint(&self) -> Option<String> {
        match self {
            Error::Config(ConfigError::NotFound(_)) => Some("run: bullpen init".to_string()),
            Error::Precondition(PreconditionError::MissingCredentials(_)) => {
                Some("run: aws sts get-caller-identity".to_string())
            }
            Error::Precondition(PreconditionError::StackRolledBack { stack }) => Some(format!(
                "recover: aws cloudformation delete-stack --stack-name {}",
                stack
            )),
            Error::Precondition(PreconditionError::StackRollbackFailed { stack }) => Some(format!(
                "recover: aws cloudformation continue-update-rollback --stack-name {}",
                stack
            )),
            Error::Precondition(PreconditionError::StackBusy { stack, .. })
            | Error::Stack(StackError::Failed { stack, .. })
            | Error::Stack(StackError::WaitExhausted { stack, .. })
            | Error::Stack(StackError::MissingOutput { stack, .. }) => Some(format!(
                "inspect: aws cloudformation describe-stack-events --stack-name {}",
                stack
            )),
            Error::Precondition(PreconditionError::ServiceUnstable {
                cluster, service, ..
            }) => Some(format!(
                "inspect: aws ecs describe-services --cluster {} --services {}",
                cluster, service
            )),
            Error::Task(TaskError::Failed {
                cluster,
                task_id,
                log_group,
                ..
            }) => Some(match log_group {
                Some(group) => format!(
                    "inspect: aws ecs describe-tasks --cluster {} --tasks {} && aws logs tail {} --since 30m",
                    cluster, task_id, group
                ),
                None => format!(
                    "inspect: aws ecs describe-tasks --cluster {} --tasks {}",
                    cluster, task_id
                ),
            }),
            Error::Task(TaskError::NoExitCode {
                cluster, task_id, ..
            })
            | Error::Task(TaskError::WaitExhausted {
                cluster, task_id, ..
            }) => Some(format!(
                "inspect: aws ecs describe-tasks --cluster {} --tasks {}",
                cluster, task_id
            )),
            Error::Vault(VaultError::Unreachable { name, .. })
            | Error::Vault(VaultError::WriteFailed { name, .. }) => Some(format!(
                "inspect: aws secretsmanager describe-secret --secret-id {}",
                name
            )),
            Error::Dns(DnsError::UpsertFailed { zone, fqdn, .. }) => Some(format!(
                "inspect: aws route53 list-resource-record-sets --hosted-zone-id {} --query \"ResourceRecordSets[?Name=='{}.']\"",
                zone, fqdn
            )),
            Error::Topology(TopologyError::NoNetwork(region)) => Some(format!(
                "inspect: aws ec2 describe-vpcs --region {}",
                region
            )),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
