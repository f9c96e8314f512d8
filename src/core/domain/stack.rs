//! Stack status and outputs.

use serde::Serialize;
use std::fmt;

use crate::core::constants;
use crate::core::types::Outputs;
use crate::error::{Result, StackError};

/// Lifecycle status of a resource stack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StackStatus {
    #[default]
    Absent,
    Creating,
    CreateComplete,
    CreateFailed,
    Updating,
    UpdateComplete,
    UpdateFailed,
    /// A failed operation is being undone; no change can be submitted.
    RollingBack,
    /// Undoing a failed update itself failed. The stack accepts no update
    /// until the rollback is continued.
    UpdateRollbackFailed,
    /// A provider status outside the modelled lifecycle (deletes, imports, reviews).
    Other(String),
}

impl StackStatus {
    /// Map a CloudFormation status string.
    ///
    /// Settled rollbacks collapse onto the failed state of the operation they
    /// undo. Rollbacks still running are in progress.
    pub fn from_provider(status: &str) -> Self {
        match status {
            "CREATE_IN_PROGRESS" => Self::Creating,
            "CREATE_COMPLETE" => Self::CreateComplete,
            "CREATE_FAILED" | "ROLLBACK_FAILED" | "ROLLBACK_COMPLETE" => Self::CreateFailed,
            "UPDATE_IN_PROGRESS" | "UPDATE_COMPLETE_CLEANUP_IN_PROGRESS" => Self::Updating,
            "UPDATE_COMPLETE" => Self::UpdateComplete,
            "UPDATE_FAILED" | "UPDATE_ROLLBACK_COMPLETE" => Self::UpdateFailed,
            "ROLLBACK_IN_PROGRESS"
            | "UPDATE_ROLLBACK_IN_PROGRESS"
            | "UPDATE_ROLLBACK_COMPLETE_CLEANUP_IN_PROGRESS" => Self::RollingBack,
            "UPDATE_ROLLBACK_FAILED" => Self::UpdateRollbackFailed,
            "DELETE_COMPLETE" => Self::Absent,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::CreateComplete | Self::UpdateComplete)
    }

    pub fn is_failed(&self) -> bool {
        matches!(
            self,
            Self::CreateFailed | Self::UpdateFailed | Self::UpdateRollbackFailed
        )
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::Creating | Self::Updating | Self::RollingBack)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Absent => "absent",
            Self::Creating => "creating",
            Self::CreateComplete => "create-complete",
            Self::CreateFailed => "create-failed",
            Self::Updating => "updating",
            Self::UpdateComplete => "update-complete",
            Self::UpdateFailed => "update-failed",
            Self::RollingBack => "rolling-back",
            Self::UpdateRollbackFailed => "update-rollback-failed",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for StackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verb submitted to the provider, or why none was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StackAction {
    Created,
    Updated,
    /// Update submitted but the provider found nothing to change.
    Unchanged,
}

/// Result of submitting an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Submitted,
    NoChanges,
}

/// The outputs every applied stack must expose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackOutputs {
    pub cluster: String,
    pub service: String,
    pub load_balancer_dns: String,
    pub security_group: String,
    #[serde(skip)]
    pub raw: Outputs,
}

impl StackOutputs {
    /// Extract the required outputs. A missing key is a template error.
    pub fn from_map(stack: &str, raw: Outputs) -> Result<Self> {
        let take = |key: &str| -> Result<String> {
            raw.get(key)
                .filter(|v| !v.is_empty())
                .cloned()
                .ok_or_else(|| {
                    StackError::MissingOutput {
                        stack: stack.to_string(),
                        output: key.to_string(),
                    }
                    .into()
                })
        };

        Ok(Self {
            cluster: take(constants::OUTPUT_CLUSTER)?,
            service: take(constants::OUTPUT_SERVICE)?,
            load_balancer_dns: take(constants::OUTPUT_LOAD_BALANCER)?,
            security_group: take(constants::OUTPUT_SECURITY_GROUP)?,
            raw,
        })
    }
}

/// Outcome of one reconcile.
#[derive(Debug, Clone, Serialize)]
pub struct StackResult {
    pub name: String,
    pub action: StackAction,
    pub status: StackStatus,
    pub outputs: StackOutputs,
}
