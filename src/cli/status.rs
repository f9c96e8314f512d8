//! Status command - stack and service state.

use std::path::Path;

use crate::cli::{context, output, Overrides};
use crate::core::constants;
use crate::core::domain::StackStatus;
use crate::error::Result;

/// Show the stack status, its outputs, and service replica counts.
pub fn execute(path: &Path, overrides: &Overrides, json: bool) -> Result<()> {
    let config = context::load(path, overrides)?;
    context::preflight(&config, false)?;
    let providers = context::connect(&config)?;

    let name = config.stack_name();
    let status = providers.infra.describe_stack(&name)?;
    let outputs = if status.is_complete() || status == StackStatus::UpdateFailed {
        providers.infra.get_outputs(&name)?
    } else {
        Default::default()
    };
    let service = match (
        outputs.get(constants::OUTPUT_CLUSTER),
        outputs.get(constants::OUTPUT_SERVICE),
    ) {
        (Some(cluster), Some(service)) => {
            Some(providers.compute.describe_service(cluster, service)?)
        }
        _ => None,
    };

    if json {
        let value = serde_json::json!({
            "stack": name,
            "status": status,
            "outputs": outputs,
            "service": service,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    output::section("Stack");
    output::kv("name", &name);
    output::kv("status", &status);
    for (key, value) in &outputs {
        output::kv(key, value);
    }

    if let Some(service) = service {
        output::section("Service");
        output::kv("running", format!("{}/{}", service.running, service.desired));
        output::kv("task", &service.task_definition);
        if service.is_stable() {
            output::success("stable");
        } else {
            output::warn("not stable");
        }
    } else if status == StackStatus::Absent {
        output::hint(&format!("run {}", output::cmd("bullpen deploy")));
    } else if status.is_in_progress() {
        output::hint("an operation is in flight; deploys are refused until it settles");
    }
    Ok(())
}
