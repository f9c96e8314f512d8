//! Domain types.

mod dns;
mod run;
mod secret;
mod stack;
mod task;
mod topology;

pub use dns::{normalize_name, DnsDecision, DnsOutcome, DnsRecord};
pub use run::{Check, RunReport, SecretReport};
pub use secret::{Generator, Policy, PolicyTable, Purpose, Rotation, SecretAction, SecretName};
pub use stack::{StackAction, StackOutputs, StackResult, StackStatus, UpdateOutcome};
pub use task::{CommandOverride, NetworkPlacement, ServiceState, TaskOutcome, TaskState};
pub use topology::{Subnet, Topology};
