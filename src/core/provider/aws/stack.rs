//! CloudFormation.

use serde_json::{json, Value};
use std::path::Path;
use tracing::{debug, warn};

use super::{array, failed_with, str_field, unexpected, AwsCli, MAX_WAIT_ROUNDS};
use crate::core::constants::NO_UPDATES_MESSAGE;
use crate::core::domain::{StackStatus, UpdateOutcome};
use crate::core::provider::InfraProvider;
use crate::core::types::{Outputs, Parameters, Tags};
use crate::error::{Result, StackError};

const MISSING: &str = "does not exist";
const CAPABILITIES: &[&str] = &["CAPABILITY_IAM", "CAPABILITY_NAMED_IAM"];

impl AwsCli {
    /// Raw CloudFormation status, `None` if the stack does not exist.
    fn stack_status_raw(&self, name: &str) -> Result<Option<String>> {
        match self.json(&["cloudformation", "describe-stacks", "--stack-name", name]) {
            Ok(response) => {
                let stack = array(&response, "Stacks")
                    .first()
                    .ok_or_else(|| unexpected("cloudformation describe-stacks", "no stacks"))?;
                Ok(str_field(stack, "StackStatus"))
            }
            Err(e) if failed_with(&e, MISSING) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn submit(
        &self,
        verb: &str,
        name: &str,
        template: &Path,
        params: &Parameters,
        tags: &Tags,
    ) -> Result<()> {
        let mut args = vec![
            "cloudformation".to_string(),
            verb.to_string(),
            "--stack-name".to_string(),
            name.to_string(),
            "--template-body".to_string(),
            format!("file://{}", template.display()),
            "--parameters".to_string(),
            parameters_json(params).to_string(),
            "--tags".to_string(),
            tags_json(tags).to_string(),
            "--capabilities".to_string(),
        ];
        args.extend(CAPABILITIES.iter().map(|c| c.to_string()));

        debug!(stack = %name, verb, params = params.len(), "submitting stack change");
        self.run(&args)?;
        Ok(())
    }
}

impl InfraProvider for AwsCli {
    fn describe_stack(&self, name: &str) -> Result<StackStatus> {
        Ok(match self.stack_status_raw(name)? {
            Some(raw) => StackStatus::from_provider(&raw),
            None => StackStatus::Absent,
        })
    }

    fn create_stack(
        &self,
        name: &str,
        template: &Path,
        params: &Parameters,
        tags: &Tags,
    ) -> Result<()> {
        self.submit("create-stack", name, template, params, tags)
    }

    fn update_stack(
        &self,
        name: &str,
        template: &Path,
        params: &Parameters,
        tags: &Tags,
    ) -> Result<UpdateOutcome> {
        match self.submit("update-stack", name, template, params, tags) {
            Ok(()) => Ok(UpdateOutcome::Submitted),
            Err(e) if failed_with(&e, NO_UPDATES_MESSAGE) => Ok(UpdateOutcome::NoChanges),
            Err(e) => Err(e),
        }
    }

    fn wait_terminal(&self, name: &str) -> Result<StackStatus> {
        let mut rounds = 0;
        loop {
            let raw = match self.stack_status_raw(name)? {
                None => return Ok(StackStatus::Absent),
                Some(raw) if !raw.ends_with("_IN_PROGRESS") => {
                    return Ok(StackStatus::from_provider(&raw))
                }
                Some(raw) => raw,
            };
            if rounds == MAX_WAIT_ROUNDS {
                return Err(StackError::WaitExhausted {
                    stack: name.to_string(),
                    status: raw,
                    rounds,
                }
                .into());
            }
            rounds += 1;

            let waiter = waiter_for(&raw);
            debug!(stack = %name, status = %raw, waiter, round = rounds, "waiting on stack");
            // The waiter exits non-zero on failure states and when it runs out
            // of attempts; the status is re-read either way.
            if let Err(e) = self.run(&["cloudformation", "wait", waiter, "--stack-name", name]) {
                warn!(stack = %name, error = %e, "stack waiter returned early");
                std::thread::sleep(self.backoff);
            }
        }
    }

    fn get_outputs(&self, name: &str) -> Result<Outputs> {
        let response = self.json(&["cloudformation", "describe-stacks", "--stack-name", name])?;
        let stack = array(&response, "Stacks")
            .first()
            .ok_or_else(|| unexpected("cloudformation describe-stacks", "no stacks"))?;
        Ok(parse_outputs(stack))
    }
}

fn waiter_for(status: &str) -> &'static str {
    if status.starts_with("CREATE_") {
        "stack-create-complete"
    } else if status.starts_with("ROLLBACK_") {
        "stack-rollback-complete"
    } else if status.starts_with("DELETE_") {
        "stack-delete-complete"
    } else {
        "stack-update-complete"
    }
}

fn parameters_json(params: &Parameters) -> Value {
    Value::Array(
        params
            .iter()
            .map(|(k, v)| json!({ "ParameterKey": k, "ParameterValue": v }))
            .collect(),
    )
}

fn tags_json(tags: &Tags) -> Value {
    Value::Array(
        tags.iter()
            .map(|(k, v)| json!({ "Key": k, "Value": v }))
            .collect(),
    )
}

fn parse_outputs(stack: &Value) -> Outputs {
    array(stack, "Outputs")
        .iter()
        .filter_map(|o| Some((str_field(o, "OutputKey")?, str_field(o, "OutputValue")?)))
        .collect()
}
