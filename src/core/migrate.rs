//! One-shot database initialization task.

use tracing::{debug, info};

use crate::core::domain::{CommandOverride, NetworkPlacement, TaskOutcome, TaskState};
use crate::core::provider::ComputeOrchestrator;
use crate::error::{PreconditionError, Result, TaskError};

/// How to run the initialization task.
#[derive(Debug, Clone)]
pub struct MigrationSpec {
    pub container: String,
    pub command: Vec<String>,
    pub admin_username: String,
    /// Container log group, quoted in failure hints.
    pub log_group: Option<String>,
    pub placement: NetworkPlacement,
}

/// Force a new deployment of the service and wait until it is stable.
pub fn redeploy(compute: &dyn ComputeOrchestrator, cluster: &str, service: &str) -> Result<()> {
    info!(cluster, service, "rolling service");
    compute.update_service(cluster, service, true)?;
    compute.wait_service_stable(cluster, service)?;
    debug!(cluster, service, "service stable");
    Ok(())
}

/// Launch exactly one task with the command override, wait for it to stop,
/// and interpret its exit code. Never retried.
///
/// # Errors
///
/// - `PreconditionError::ServiceUnstable` if the service is not at its desired count
/// - `TaskError::Failed` on a nonzero exit
/// - `TaskError::NoExitCode` if the container never reported one
pub fn run_once(
    compute: &dyn ComputeOrchestrator,
    cluster: &str,
    service: &str,
    spec: &MigrationSpec,
) -> Result<TaskOutcome> {
    let state = compute.describe_service(cluster, service)?;
    if !state.is_stable() {
        return Err(PreconditionError::ServiceUnstable {
            cluster: cluster.to_string(),
            service: service.to_string(),
            running: state.running,
            desired: state.desired,
        }
        .into());
    }

    let command = CommandOverride {
        container: spec.container.clone(),
        command: spec.command.clone(),
    };
    let task_id = compute.run_task(cluster, &state.task_definition, &command, &spec.placement)?;
    info!(
        cluster,
        task = %task_id,
        task_definition = %state.task_definition,
        command = %spec.command.join(" "),
        "migration task started"
    );

    compute.wait_task_stopped(cluster, &task_id)?;

    match compute.describe_task(cluster, &task_id, &spec.container)? {
        TaskState::Stopped {
            exit_code: Some(0), ..
        } => {
            info!(
                cluster,
                task = %task_id,
                admin = %spec.admin_username,
                "database initialized"
            );
            Ok(TaskOutcome {
                cluster: cluster.to_string(),
                task_id,
                exit_code: 0,
                admin_username: spec.admin_username.clone(),
            })
        }
        TaskState::Stopped {
            exit_code: Some(code),
            ..
        } => Err(TaskError::Failed {
            cluster: cluster.to_string(),
            task_id,
            exit_code: code,
            log_group: spec.log_group.clone(),
        }
        .into()),
        TaskState::Stopped {
            exit_code: None,
            reason,
        } => Err(TaskError::NoExitCode {
            cluster: cluster.to_string(),
            task_id,
            reason: reason.unwrap_or_else(|| "no reason reported".to_string()),
        }
        .into()),
        other => Err(TaskError::NoExitCode {
            cluster: cluster.to_string(),
            task_id,
            reason: format!("task not stopped after wait ({:?})", other),
        }
        .into()),
    }
}
