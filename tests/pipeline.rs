//! End-to-end runs against the in-memory cloud.

mod support;

use bullpen::core::constants;
use bullpen::core::domain::{DnsOutcome, SecretAction, StackAction, StackStatus};
use bullpen::core::pipeline::Deployment;
use bullpen::core::provider::memory::{Call, MemoryCloud};
use bullpen::error::{Error, PreconditionError, StackError, TaskError};
use support::*;

fn param<'a>(call: &'a Call, key: &str) -> Option<&'a str> {
    match call {
        Call::CreateStack { params, .. } | Call::UpdateStack { params, .. } => {
            params.get(key).map(String::as_str)
        }
        _ => None,
    }
}

fn stack_calls(cloud: &MemoryCloud) -> Vec<Call> {
    cloud
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::CreateStack { .. } | Call::UpdateStack { .. }))
        .collect()
}

fn upserts(cloud: &MemoryCloud) -> usize {
    cloud.count(|c| matches!(c, Call::UpsertRecord { .. }))
}

#[test]
fn test_first_deploy_creates_stack_and_record() {
    let d = deployment(DNS_SECTION);
    let cloud = MemoryCloud::standard();
    let providers = cloud.providers();

    let report = Deployment::new(&d.config, &providers).run().unwrap();

    let submitted = stack_calls(&cloud);
    assert_eq!(submitted.len(), 1);
    assert!(matches!(submitted[0], Call::CreateStack { .. }));
    assert_eq!(param(&submitted[0], constants::PARAM_CREATE_DNS), Some("true"));
    assert_eq!(report.stack.action, StackAction::Created);

    assert_eq!(upserts(&cloud), 0);
    assert!(matches!(report.dns, DnsOutcome::CreatedByStack { .. }));
    let records = cloud.records("Z0EXAMPLE");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].value, "new-lb.elb.amazonaws.com");

    let task = report.migration.as_ref().unwrap();
    assert_eq!(task.exit_code, 0);
    assert_eq!(task.cluster, "prod-cluster");
    assert_eq!(task.admin_username, "admin");

    assert!(report.secrets.iter().all(|s| s.action == SecretAction::Created));
    assert!(report.follow_ups().is_empty());
}

#[test]
fn test_existing_record_is_upserted_after_update() {
    let d = deployment(DNS_SECTION);
    let cloud = MemoryCloud::standard()
        .with_stack(STACK, StackStatus::UpdateComplete)
        .with_record("Z0EXAMPLE", "api.example.com.", "old-lb.elb.amazonaws.com");
    let providers = cloud.providers();

    let report = Deployment::new(&d.config, &providers).run().unwrap();

    let submitted = stack_calls(&cloud);
    assert_eq!(submitted.len(), 1);
    assert!(matches!(submitted[0], Call::UpdateStack { .. }));
    assert_eq!(param(&submitted[0], constants::PARAM_CREATE_DNS), Some("false"));

    assert_eq!(upserts(&cloud), 1);
    let records = cloud.records("Z0EXAMPLE");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].value, "new-lb.elb.amazonaws.com");
    assert_eq!(
        report.dns,
        DnsOutcome::Upserted {
            fqdn: "api.example.com".into(),
            previous: Some("old-lb.elb.amazonaws.com".into()),
            target: "new-lb.elb.amazonaws.com".into(),
        }
    );
}

#[test]
fn test_upsert_follows_stack_apply() {
    let d = deployment(DNS_SECTION);
    let cloud = MemoryCloud::standard()
        .with_stack(STACK, StackStatus::UpdateComplete)
        .with_record("Z0EXAMPLE", "api.example.com", "old-lb.elb.amazonaws.com");
    let providers = cloud.providers();

    Deployment::new(&d.config, &providers).run().unwrap();

    let probe = cloud
        .position(|c| matches!(c, Call::ListRecords { .. }))
        .unwrap();
    let update = cloud
        .position(|c| matches!(c, Call::UpdateStack { .. }))
        .unwrap();
    let wait = cloud.position(|c| matches!(c, Call::WaitStack(_))).unwrap();
    let upsert = cloud
        .position(|c| matches!(c, Call::UpsertRecord { .. }))
        .unwrap();
    assert!(probe < update);
    assert!(update < wait);
    assert!(wait < upsert);
}

#[test]
fn test_failed_upsert_is_a_follow_up() {
    let d = deployment(DNS_SECTION);
    let cloud = MemoryCloud::standard()
        .with_record("Z0EXAMPLE", "api.example.com", "old-lb.elb.amazonaws.com")
        .upsert_fails();
    let providers = cloud.providers();

    let report = Deployment::new(&d.config, &providers).run().unwrap();

    assert!(matches!(report.dns, DnsOutcome::UpsertFailed { .. }));
    assert!(report.migration.is_some());
    let follow_ups = report.follow_ups();
    assert_eq!(follow_ups.len(), 1);
    assert!(follow_ups[0].contains("new-lb.elb.amazonaws.com"));
}

#[test]
fn test_failed_migration_names_cluster_and_task() {
    let d = deployment("");
    let cloud = MemoryCloud::standard().task_exit(Some(1));
    let providers = cloud.providers();

    let err = Deployment::new(&d.config, &providers).run().unwrap_err();

    assert!(matches!(err, Error::Task(TaskError::Failed { exit_code: 1, .. })));
    let message = err.to_string();
    assert!(message.contains("prod-cluster"), "{}", message);
    assert!(message.contains("task-0001"), "{}", message);
    assert_eq!(cloud.count(|c| matches!(c, Call::HttpGet(_) | Call::HttpPost(_))), 0);
}

#[test]
fn test_task_without_exit_code_fails() {
    let d = deployment("");
    let cloud = MemoryCloud::standard().task_exit(None);
    let providers = cloud.providers();

    let err = Deployment::new(&d.config, &providers).run().unwrap_err();
    assert!(matches!(err, Error::Task(TaskError::NoExitCode { .. })));
    assert!(err.to_string().contains("CannotPullContainerError"));
}

#[test]
fn test_rolled_back_create_is_precondition() {
    let d = deployment("");
    let cloud = MemoryCloud::standard().with_stack(STACK, StackStatus::CreateFailed);
    let providers = cloud.providers();

    let err = Deployment::new(&d.config, &providers).run().unwrap_err();
    assert!(matches!(
        err,
        Error::Precondition(PreconditionError::StackRolledBack { .. })
    ));
    assert!(stack_calls(&cloud).is_empty());
    assert_eq!(cloud.count(|c| matches!(c, Call::SecretPut(_))), 0);
}

#[test]
fn test_rollback_states_abort_before_any_mutation() {
    for raw in [
        "ROLLBACK_IN_PROGRESS",
        "UPDATE_ROLLBACK_IN_PROGRESS",
        "UPDATE_ROLLBACK_COMPLETE_CLEANUP_IN_PROGRESS",
        "UPDATE_ROLLBACK_FAILED",
        "ROLLBACK_FAILED",
    ] {
        let d = deployment("");
        let cloud = MemoryCloud::standard().with_stack(STACK, StackStatus::from_provider(raw));
        let providers = cloud.providers();

        let err = Deployment::new(&d.config, &providers).run().unwrap_err();
        assert!(matches!(err, Error::Precondition(_)), "{raw}: {err}");
        assert!(stack_calls(&cloud).is_empty(), "{raw}");
        assert_eq!(cloud.count(|c| matches!(c, Call::SecretPut(_))), 0, "{raw}");
        assert_eq!(cloud.count(|c| matches!(c, Call::Build(_))), 0, "{raw}");
    }
}

#[test]
fn test_stuck_update_rollback_points_at_continue() {
    let d = deployment("");
    let cloud = MemoryCloud::standard()
        .with_stack(STACK, StackStatus::from_provider("UPDATE_ROLLBACK_FAILED"));
    let providers = cloud.providers();

    let err = Deployment::new(&d.config, &providers).run().unwrap_err();
    assert!(matches!(
        err,
        Error::Precondition(PreconditionError::StackRollbackFailed { .. })
    ));
    assert_eq!(
        err.hint().unwrap(),
        format!("recover: aws cloudformation continue-update-rollback --stack-name {STACK}")
    );
}

#[test]
fn test_failed_stack_skips_dns_and_migration() {
    let d = deployment(DNS_SECTION);
    let cloud = MemoryCloud::standard()
        .with_record("Z0EXAMPLE", "api.example.com", "old-lb.elb.amazonaws.com")
        .stack_fails();
    let providers = cloud.providers();

    let err = Deployment::new(&d.config, &providers).run().unwrap_err();
    assert!(matches!(err, Error::Stack(StackError::Failed { .. })));
    assert_eq!(upserts(&cloud), 0);
    assert_eq!(cloud.count(|c| matches!(c, Call::RunTask { .. })), 0);
}

#[test]
fn test_missing_output_fails_after_apply() {
    let d = deployment("");
    let cloud = MemoryCloud::standard().without_output(constants::OUTPUT_SECURITY_GROUP);
    let providers = cloud.providers();

    let err = Deployment::new(&d.config, &providers).run().unwrap_err();
    assert!(err.to_string().contains(constants::OUTPUT_SECURITY_GROUP));
    assert_eq!(cloud.count(|c| matches!(c, Call::RunTask { .. })), 0);
}

#[test]
fn test_second_run_rotates_signing_keys_only() {
    let d = deployment("");
    let cloud = MemoryCloud::standard();
    let providers = cloud.providers();

    Deployment::new(&d.config, &providers).run().unwrap();
    let db = cloud
        .secret("patient-api/production/db-password")
        .unwrap();
    let signing = cloud.secret("patient-api/production/secret-key").unwrap();

    let report = Deployment::new(&d.config, &providers).run().unwrap();

    assert_eq!(cloud.secret("patient-api/production/db-password").unwrap(), db);
    assert_ne!(cloud.secret("patient-api/production/secret-key").unwrap(), signing);
    let action = |slug: &str| {
        report
            .secrets
            .iter()
            .find(|s| s.name.purpose().slug() == slug)
            .map(|s| s.action)
            .unwrap()
    };
    assert_eq!(action("secret-key"), SecretAction::Rotated);
    assert_eq!(action("jwt-secret-key"), SecretAction::Rotated);
    assert_eq!(action("db-password"), SecretAction::Reused);
    assert_eq!(action("admin-password"), SecretAction::Reused);
    assert_eq!(report.stack.action, StackAction::Updated);
}

#[test]
fn test_secret_values_stay_out_of_report() {
    let d = deployment("");
    let cloud = MemoryCloud::standard();
    let providers = cloud.providers();

    let report = Deployment::new(&d.config, &providers).run().unwrap();
    let json = serde_json::to_string(&report).unwrap();

    for slug in ["secret-key", "jwt-secret-key", "db-password", "admin-password"] {
        let value = cloud
            .secret(&format!("patient-api/production/{}", slug))
            .unwrap();
        assert!(!json.contains(&value), "{} leaked into report", slug);
    }
}

#[test]
fn test_stack_receives_secret_names_not_values() {
    let d = deployment("");
    let cloud = MemoryCloud::standard();
    let providers = cloud.providers();

    Deployment::new(&d.config, &providers).run().unwrap();

    let submitted = stack_calls(&cloud);
    assert_eq!(
        param(&submitted[0], "DBPasswordSecretName"),
        Some("patient-api/production/db-password")
    );
    assert_eq!(param(&submitted[0], constants::PARAM_CREATE_DNS), Some("false"));
}
