//! ECS services and one-off tasks.

use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{array, str_field, unexpected, AwsCli, MAX_WAIT_ROUNDS};
use crate::core::domain::{CommandOverride, NetworkPlacement, ServiceState, TaskState};
use crate::core::provider::ComputeOrchestrator;
use crate::core::types::TaskId;
use crate::error::{PreconditionError, Result, TaskError};

const LAUNCH_TYPE: &str = "FARGATE";

impl ComputeOrchestrator for AwsCli {
    fn describe_service(&self, cluster: &str, service: &str) -> Result<ServiceState> {
        let response = self.json(&[
            "ecs",
            "describe-services",
            "--cluster",
            cluster,
            "--services",
            service,
        ])?;
        parse_service(&response).ok_or_else(|| {
            unexpected(
                "ecs describe-services",
                format!("service {} not found in {}", service, cluster),
            )
        })
    }

    fn update_service(
        &self,
        cluster: &str,
        service: &str,
        force_new_deployment: bool,
    ) -> Result<()> {
        let mut args = vec![
            "ecs",
            "update-service",
            "--cluster",
            cluster,
            "--service",
            service,
        ];
        if force_new_deployment {
            args.push("--force-new-deployment");
        }
        self.run(&args)?;
        Ok(())
    }

    fn wait_service_stable(&self, cluster: &str, service: &str) -> Result<()> {
        debug!(cluster, service, "waiting for service to stabilize");
        let waited = self.run(&[
            "ecs",
            "wait",
            "services-stable",
            "--cluster",
            cluster,
            "--services",
            service,
        ]);
        if let Err(e) = waited {
            let state = self.describe_service(cluster, service)?;
            warn!(cluster, service, error = %e, "service did not stabilize");
            return Err(PreconditionError::ServiceUnstable {
                cluster: cluster.to_string(),
                service: service.to_string(),
                running: state.running,
                desired: state.desired,
            }
            .into());
        }
        Ok(())
    }

    fn run_task(
        &self,
        cluster: &str,
        task_definition: &str,
        command: &CommandOverride,
        placement: &NetworkPlacement,
    ) -> Result<TaskId> {
        let network = network_configuration(placement).to_string();
        let overrides = overrides(command).to_string();
        let response = self
            .json(&[
                "ecs",
                "run-task",
                "--cluster",
                cluster,
                "--task-definition",
                task_definition,
                "--launch-type",
                LAUNCH_TYPE,
                "--count",
                "1",
                "--network-configuration",
                network.as_str(),
                "--overrides",
                overrides.as_str(),
            ])
            .map_err(|e| TaskError::Launch {
                cluster: cluster.to_string(),
                reason: e.to_string(),
            })?;

        parse_run_task(&response).map_err(|reason| {
            TaskError::Launch {
                cluster: cluster.to_string(),
                reason,
            }
            .into()
        })
    }

    fn wait_task_stopped(&self, cluster: &str, task_id: &str) -> Result<()> {
        let mut rounds = 0;
        loop {
            let waited = self.run(&[
                "ecs",
                "wait",
                "tasks-stopped",
                "--cluster",
                cluster,
                "--tasks",
                task_id,
            ]);
            if waited.is_ok() {
                return Ok(());
            }
            // Migrations can outlast the waiter's attempt budget.
            let response = self.describe_tasks(cluster, task_id)?;
            if last_status(&response).as_deref() == Some("STOPPED") {
                return Ok(());
            }
            rounds += 1;
            if rounds == MAX_WAIT_ROUNDS {
                return Err(TaskError::WaitExhausted {
                    cluster: cluster.to_string(),
                    task_id: task_id.to_string(),
                    rounds,
                }
                .into());
            }
            debug!(cluster, task_id, round = rounds, "task still running, waiting again");
            std::thread::sleep(self.backoff);
        }
    }

    fn describe_task(&self, cluster: &str, task_id: &str, container: &str) -> Result<TaskState> {
        let response = self.describe_tasks(cluster, task_id)?;
        parse_task(&response, container)
            .ok_or_else(|| unexpected("ecs describe-tasks", format!("task {} not found", task_id)))
    }
}

impl AwsCli {
    fn describe_tasks(&self, cluster: &str, task_id: &str) -> Result<Value> {
        self.json(&[
            "ecs",
            "describe-tasks",
            "--cluster",
            cluster,
            "--tasks",
            task_id,
        ])
    }
}

fn network_configuration(placement: &NetworkPlacement) -> Value {
    json!({
        "awsvpcConfiguration": {
            "subnets": placement.subnets,
            "securityGroups": placement.security_groups,
            "assignPublicIp": if placement.assign_public_ip { "ENABLED" } else { "DISABLED" },
        }
    })
}

fn overrides(command: &CommandOverride) -> Value {
    json!({
        "containerOverrides": [{
            "name": command.container,
            "command": command.command,
        }]
    })
}

fn parse_service(response: &Value) -> Option<ServiceState> {
    let service = array(response, "services").first()?;
    Some(ServiceState {
        running: count(service, "runningCount"),
        desired: count(service, "desiredCount"),
        task_definition: str_field(service, "taskDefinition")?,
    })
}

fn count(value: &Value, key: &str) -> u32 {
    value
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0)
}

/// Short task id from the launched task's ARN.
fn parse_run_task(response: &Value) -> std::result::Result<TaskId, String> {
    if let Some(failure) = array(response, "failures").first() {
        return Err(format!(
            "{} ({})",
            str_field(failure, "reason").unwrap_or_else(|| "unknown".to_string()),
            str_field(failure, "arn").unwrap_or_default()
        ));
    }
    let arn = array(response, "tasks")
        .first()
        .and_then(|t| str_field(t, "taskArn"))
        .ok_or_else(|| "no task returned".to_string())?;
    Ok(arn.rsplit('/').next().unwrap_or(&arn).to_string())
}

fn last_status(response: &Value) -> Option<String> {
    array(response, "tasks")
        .first()
        .and_then(|t| str_field(t, "lastStatus"))
}

/// Task state; the exit code comes from `container`, or the first container
/// when none carries that name.
fn parse_task(response: &Value, container: &str) -> Option<TaskState> {
    let task = array(response, "tasks").first()?;
    let status = str_field(task, "lastStatus")?;
    let containers = array(task, "containers");
    let container = containers
        .iter()
        .find(|c| c.get("name").and_then(Value::as_str) == Some(container))
        .or_else(|| containers.first());
    let exit_code = container
        .and_then(|c| c.get("exitCode"))
        .and_then(Value::as_i64)
        .and_then(|n| i32::try_from(n).ok());
    let reason = container
        .and_then(|c| str_field(c, "reason"))
        .or_else(|| str_field(task, "stoppedReason"));
    Some(TaskState::from_provider(&status, exit_code, reason))
}
