//! Stack reconciliation.
//!
//! The verb is decided once, by [`probe`], at the start of a run. The probe
//! and the later submit are not atomic; a concurrent change in between
//! surfaces as a provider error on submit.

use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

use crate::core::constants;
use crate::core::domain::{
    DnsDecision, SecretName, StackAction, StackOutputs, StackResult, StackStatus, Topology,
    UpdateOutcome,
};
use crate::core::provider::InfraProvider;
use crate::core::types::{Parameters, Tags};
use crate::error::{PreconditionError, Result, StackError};

/// Verb to submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verb {
    Create,
    Update,
}

/// Probe result: the verb and the status it was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Probe {
    pub verb: Verb,
    pub status: StackStatus,
}

/// Map a probed status onto a verb.
///
/// # Errors
///
/// - `StackBusy` while an operation or rollback is in flight, or the status
///   is unmodelled
/// - `StackRolledBack` when creation failed; the stack must be deleted first
/// - `StackRollbackFailed` when an update rollback is stuck; it must be
///   continued first
pub fn verb_for(stack: &str, status: &StackStatus) -> Result<Verb> {
    match status {
        StackStatus::Absent => Ok(Verb::Create),
        StackStatus::CreateFailed => Err(PreconditionError::StackRolledBack {
            stack: stack.to_string(),
        }
        .into()),
        StackStatus::UpdateRollbackFailed => Err(PreconditionError::StackRollbackFailed {
            stack: stack.to_string(),
        }
        .into()),
        // Resting states: a settled update rollback accepts the next update.
        s if s.is_complete() || s.is_failed() => Ok(Verb::Update),
        _ => Err(PreconditionError::StackBusy {
            stack: stack.to_string(),
            status: status.to_string(),
        }
        .into()),
    }
}

/// Single existence probe deciding create versus update.
pub fn probe(infra: &dyn InfraProvider, stack: &str) -> Result<Probe> {
    let status = infra.describe_stack(stack)?;
    let verb = verb_for(stack, &status)?;
    debug!(stack, %status, verb = ?verb, "stack probed");
    Ok(Probe { verb, status })
}

/// Fail early if the template cannot be read.
pub fn check_template(template: &Path) -> Result<()> {
    if !template.is_file() {
        return Err(StackError::Template {
            path: template.display().to_string(),
            reason: "file not found".to_string(),
        }
        .into());
    }
    Ok(())
}

/// Submit the change, wait for a terminal state, and read back the outputs.
///
/// # Errors
///
/// A `*-failed` terminal state returns `StackError::Failed`; nothing is
/// rolled back or deleted. A missing output returns `StackError::MissingOutput`.
pub fn apply(
    infra: &dyn InfraProvider,
    stack: &str,
    probe: &Probe,
    template: &Path,
    params: &Parameters,
    tags: &Tags,
) -> Result<StackResult> {
    let (action, status) = match probe.verb {
        Verb::Create => {
            info!(stack, "creating stack");
            infra.create_stack(stack, template, params, tags)?;
            let status = infra.wait_terminal(stack)?;
            expect(stack, &status, StackStatus::CreateComplete)?;
            (StackAction::Created, status)
        }
        Verb::Update => {
            info!(stack, "updating stack");
            match infra.update_stack(stack, template, params, tags)? {
                UpdateOutcome::NoChanges => {
                    info!(stack, "stack already up to date");
                    (StackAction::Unchanged, probe.status.clone())
                }
                UpdateOutcome::Submitted => {
                    let status = infra.wait_terminal(stack)?;
                    expect(stack, &status, StackStatus::UpdateComplete)?;
                    (StackAction::Updated, status)
                }
            }
        }
    };

    let outputs = StackOutputs::from_map(stack, infra.get_outputs(stack)?)?;
    info!(
        stack,
        %status,
        cluster = %outputs.cluster,
        service = %outputs.service,
        load_balancer = %outputs.load_balancer_dns,
        "stack applied"
    );
    Ok(StackResult {
        name: stack.to_string(),
        action,
        status,
        outputs,
    })
}

fn expect(stack: &str, status: &StackStatus, wanted: StackStatus) -> Result<()> {
    if *status != wanted {
        return Err(StackError::Failed {
            stack: stack.to_string(),
            status: status.to_string(),
        }
        .into());
    }
    Ok(())
}

/// Everything the template parameters are computed from.
pub struct StackInputs<'a> {
    pub environment: &'a str,
    pub topology: &'a Topology,
    pub image: &'a str,
    pub secrets: &'a [SecretName],
    /// Present when a custom domain is configured.
    pub dns: Option<&'a DnsDecision>,
    /// Operator-supplied parameters, passed through.
    pub extra: &'a Parameters,
}

/// Template parameters, including the DNS tie-break flag.
///
/// Secrets are passed by name; the template resolves their values itself.
pub fn parameters(inputs: &StackInputs<'_>) -> Parameters {
    let mut params = inputs.extra.clone();
    let mut set = |key: &str, value: String| {
        params.insert(key.to_string(), value);
    };

    set(constants::PARAM_ENVIRONMENT, inputs.environment.to_string());
    set(constants::PARAM_NETWORK, inputs.topology.network_id.clone());
    set(constants::PARAM_SUBNETS, inputs.topology.subnet_ids.join(","));
    set(
        constants::PARAM_PUBLIC_SUBNETS,
        inputs.topology.public_subnet_ids.join(","),
    );
    set(constants::PARAM_IMAGE, inputs.image.to_string());
    for name in inputs.secrets {
        set(name.purpose().parameter(), name.to_string());
    }

    match inputs.dns {
        Some(decision) => {
            set(
                constants::PARAM_CREATE_DNS,
                decision.create_via_template().to_string(),
            );
            set(constants::PARAM_DOMAIN, decision.fqdn.clone());
            set(constants::PARAM_ZONE, decision.zone.clone());
        }
        None => set(constants::PARAM_CREATE_DNS, "false".to_string()),
    }
    params
}

/// Standard stack tags merged over operator-supplied ones.
pub fn tags(project: &str, environment: &str, extra: &Tags) -> Tags {
    let mut tags = extra.clone();
    tags.insert("Project".to_string(), project.to_string());
    tags.insert("Environment".to_string(), environment.to_string());
    tags.insert("DeployedBy".to_string(), whoami::username());
    tags.insert(
        "DeployedAt".to_string(),
        chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
    );
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::{DnsRecord, Purpose};
    use crate::core::provider::memory::{Call, MemoryCloud};
    use crate::error::Error;
    use std::path::PathBuf;

    fn topology() -> Topology {
        Topology {
            region: "us-east-1".into(),
            network_id: "vpc-main".into(),
            subnet_ids: vec!["subnet-a".into(), "subnet-b".into()],
            public_subnet_ids: vec!["subnet-a".into()],
            network_fallback: false,
            public_fallback: false,
        }
    }

    fn run(cloud: &MemoryCloud) -> Result<StackResult> {
        let probe = probe(cloud, "api-prod")?;
        apply(
            cloud,
            "api-prod",
            &probe,
            &PathBuf::from("stack.yaml"),
            &Parameters::new(),
            &Tags::new(),
        )
    }

    fn creates(cloud: &MemoryCloud) -> usize {
        cloud.count(|c| matches!(c, Call::CreateStack { .. }))
    }

    fn updates(cloud: &MemoryCloud) -> usize {
        cloud.count(|c| matches!(c, Call::UpdateStack { .. }))
    }

    #[test]
    fn test_verb_table() {
        assert_eq!(verb_for("s", &StackStatus::Absent).unwrap(), Verb::Create);
        assert_eq!(verb_for("s", &StackStatus::CreateComplete).unwrap(), Verb::Update);
        assert_eq!(verb_for("s", &StackStatus::UpdateComplete).unwrap(), Verb::Update);
        assert_eq!(verb_for("s", &StackStatus::UpdateFailed).unwrap(), Verb::Update);
        assert!(matches!(
            verb_for("s", &StackStatus::Updating),
            Err(Error::Precondition(PreconditionError::StackBusy { .. }))
        ));
        assert!(matches!(
            verb_for("s", &StackStatus::CreateFailed),
            Err(Error::Precondition(PreconditionError::StackRolledBack { .. }))
        ));
    }

    #[test]
    fn test_rollback_states_are_not_updatable() {
        for raw in [
            "ROLLBACK_IN_PROGRESS",
            "UPDATE_ROLLBACK_IN_PROGRESS",
            "UPDATE_ROLLBACK_COMPLETE_CLEANUP_IN_PROGRESS",
        ] {
            let err = verb_for("s", &StackStatus::from_provider(raw)).unwrap_err();
            assert!(
                matches!(err, Error::Precondition(PreconditionError::StackBusy { .. })),
                "{raw}"
            );
        }

        let err = verb_for("s", &StackStatus::from_provider("UPDATE_ROLLBACK_FAILED")).unwrap_err();
        assert!(matches!(
            err,
            Error::Precondition(PreconditionError::StackRollbackFailed { .. })
        ));
        assert!(err
            .hint()
            .unwrap()
            .contains("continue-update-rollback --stack-name s"));

        let err = verb_for("s", &StackStatus::from_provider("ROLLBACK_FAILED")).unwrap_err();
        assert!(err.hint().unwrap().contains("delete-stack --stack-name s"));

        assert_eq!(
            verb_for("s", &StackStatus::from_provider("UPDATE_ROLLBACK_COMPLETE")).unwrap(),
            Verb::Update
        );
    }

    #[test]
    fn test_absent_stack_is_created() {
        let cloud = MemoryCloud::standard();
        let result = run(&cloud).unwrap();
        assert_eq!(result.action, StackAction::Created);
        assert_eq!(result.status, StackStatus::CreateComplete);
        assert_eq!(result.outputs.cluster, "prod-cluster");
        assert_eq!((creates(&cloud), updates(&cloud)), (1, 0));
    }

    #[test]
    fn test_complete_stack_is_updated() {
        let cloud = MemoryCloud::standard().with_stack("api-prod", StackStatus::CreateComplete);
        let result = run(&cloud).unwrap();
        assert_eq!(result.action, StackAction::Updated);
        assert_eq!((creates(&cloud), updates(&cloud)), (0, 1));
    }

    #[test]
    fn test_no_changes_still_reads_outputs() {
        let cloud = MemoryCloud::standard()
            .with_stack("api-prod", StackStatus::UpdateComplete)
            .stack_unchanged();
        let result = run(&cloud).unwrap();
        assert_eq!(result.action, StackAction::Unchanged);
        assert_eq!(result.status, StackStatus::UpdateComplete);
        assert_eq!(result.outputs.service, "api-service");
        assert_eq!(cloud.count(|c| matches!(c, Call::WaitStack(_))), 0);
    }

    #[test]
    fn test_failed_create_surfaces_without_cleanup() {
        let cloud = MemoryCloud::standard().stack_fails();
        let err = run(&cloud).unwrap_err();
        assert!(matches!(err, Error::Stack(StackError::Failed { ref status, .. }) if status == "create-failed"));
        assert!(err.hint().unwrap().contains("describe-stack-events --stack-name api-prod"));
        assert_eq!(cloud.count(|c| matches!(c, Call::GetOutputs(_))), 0);
    }

    #[test]
    fn test_missing_output_is_error() {
        let cloud = MemoryCloud::standard().without_output(constants::OUTPUT_LOAD_BALANCER);
        let err = run(&cloud).unwrap_err();
        assert!(err.to_string().contains("LoadBalancerDNS"));
    }

    #[test]
    fn test_parameters_thread_dns_flag() {
        let topology = topology();
        let secrets = vec![SecretName::new("api", "prod", Purpose::DatabasePassword).unwrap()];
        let mut decision = DnsDecision {
            zone: "Z1".into(),
            fqdn: "api.example.com".into(),
            existing: Vec::new(),
            allow_template_create: true,
        };
        let params_for = |dns: Option<&DnsDecision>| {
            parameters(&StackInputs {
                environment: "prod",
                topology: &topology,
                image: "repo@sha256:abc",
                secrets: &secrets,
                dns,
                extra: &Parameters::new(),
            })
        };

        let params = params_for(Some(&decision));
        assert_eq!(params[constants::PARAM_CREATE_DNS], "true");
        assert_eq!(params[constants::PARAM_DOMAIN], "api.example.com");
        assert_eq!(params[constants::PARAM_SUBNETS], "subnet-a,subnet-b");
        assert_eq!(params["DBPasswordSecretName"], "api/prod/db-password");

        decision.existing.push(DnsRecord {
            name: "api.example.com".into(),
            record_type: "CNAME".into(),
            value: "old".into(),
            ttl: None,
        });
        let params = params_for(Some(&decision));
        assert_eq!(params[constants::PARAM_CREATE_DNS], "false");

        let params = params_for(None);
        assert_eq!(params[constants::PARAM_CREATE_DNS], "false");
        assert!(!params.contains_key(constants::PARAM_DOMAIN));
    }

    #[test]
    fn test_tags() {
        let mut extra = Tags::new();
        extra.insert("Team".into(), "care".into());
        extra.insert("Project".into(), "spoofed".into());
        let tags = tags("patient-api", "production", &extra);
        assert_eq!(tags["Project"], "patient-api");
        assert_eq!(tags["Team"], "care");
        assert!(tags.contains_key("DeployedBy"));
        assert!(tags["DeployedAt"].ends_with('Z'));
    }

    #[test]
    fn test_check_template() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("stack.yaml");
        assert!(check_template(&path).is_err());
        std::fs::write(&path, "Resources: {}").unwrap();
        assert!(check_template(&path).is_ok());
    }
}
