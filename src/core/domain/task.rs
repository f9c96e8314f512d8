//! Compute service and one-off task state.

use serde::Serialize;

/// Observed state of a long-running service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceState {
    pub running: u32,
    pub desired: u32,
    pub task_definition: String,
}

impl ServiceState {
    pub fn is_stable(&self) -> bool {
        self.desired > 0 && self.running == self.desired
    }
}

/// Lifecycle of a one-off task.
///
/// The exit code only exists once the task is stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Running,
    Stopped {
        exit_code: Option<i32>,
        reason: Option<String>,
    },
}

impl TaskState {
    /// Map an ECS `lastStatus`. Anything before RUNNING counts as pending and
    /// anything after it, short of STOPPED, as running.
    pub fn from_provider(status: &str, exit_code: Option<i32>, reason: Option<String>) -> Self {
        match status {
            "STOPPED" => Self::Stopped { exit_code, reason },
            "PROVISIONING" | "PENDING" | "ACTIVATING" => Self::Pending,
            _ => Self::Running,
        }
    }
}

/// Where a one-off task is placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkPlacement {
    pub subnets: Vec<String>,
    pub security_groups: Vec<String>,
    pub assign_public_ip: bool,
}

/// Replaces the container's entry point for a single run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOverride {
    pub container: String,
    pub command: Vec<String>,
}

/// A migration task that ran to completion with exit code 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskOutcome {
    pub cluster: String,
    pub task_id: String,
    pub exit_code: i32,
    pub admin_username: String,
}
