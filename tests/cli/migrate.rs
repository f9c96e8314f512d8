//! `bullpen migrate` end to end, with `aws` answered by a shell script.

use crate::support::*;
use predicates::prelude::*;

const CONFIG: &str = r#"
[project]
name = "patient-api"
environment = "production"
region = "us-east-1"

[image]
repository = "patient-api"

[stack]
template = "stack.yaml"
"#;

/// Everything `migrate` reads before it launches the task.
const DEPLOYED: &str = r#"
"sts get-caller-identity") echo '{"Arn": "arn:aws:iam::123456789012:user/ci"}' ;;
"ec2 describe-vpcs") echo '{"Vpcs": [{"VpcId": "vpc-1"}]}' ;;
"ec2 describe-subnets") echo '{"Subnets": [{"SubnetId": "subnet-1", "MapPublicIpOnLaunch": true}]}' ;;
"cloudformation describe-stacks") echo '{"Stacks": [{"StackStatus": "UPDATE_COMPLETE", "Outputs": [
  {"OutputKey": "ClusterName", "OutputValue": "prod-cluster"},
  {"OutputKey": "ServiceName", "OutputValue": "api-service"},
  {"OutputKey": "LoadBalancerDNS", "OutputValue": "lb-1.elb.amazonaws.com"},
  {"OutputKey": "ECSSecurityGroupId", "OutputValue": "sg-1"}]}]}' ;;
"ecs describe-services") echo '{"services": [{"runningCount": 1, "desiredCount": 1, "taskDefinition": "arn:aws:ecs:us-east-1:1:task-definition/api:7"}]}' ;;
"ecs wait") exit 0 ;;
"ecs run-task") echo '{"tasks": [{"taskArn": "arn:aws:ecs:us-east-1:1:task/prod-cluster/0123abcd"}], "failures": []}' ;;
"#;

fn project(task: &str) -> (Test, std::path::PathBuf) {
    let t = Test::with_config(CONFIG);
    t.write("stack.yaml", TEMPLATE);
    let bin = t.fake_aws(&format!(
        "{}\"ecs describe-tasks\") echo '{}' ;;\n*) echo \"unexpected call: $*\" >&2; exit 255 ;;",
        DEPLOYED, task
    ));
    (t, bin)
}

#[test]
fn test_failed_migration_exits_one_without_success_line() {
    let (t, bin) = project(
        r#"{"tasks": [{"lastStatus": "STOPPED", "containers": [{"name": "app", "exitCode": 3}]}]}"#,
    );

    t.cmd()
        .env("PATH", &bin)
        .args(["migrate", "--yes"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("database initialized").not())
        .stderr(
            predicate::str::contains("exited with code 3").and(predicate::str::contains(
                "aws ecs describe-tasks --cluster prod-cluster --tasks 0123abcd",
            )),
        );
}

#[test]
fn test_successful_migration_reports_task() {
    let (t, bin) = project(
        r#"{"tasks": [{"lastStatus": "STOPPED", "containers": [{"name": "app", "exitCode": 0}]}]}"#,
    );

    t.cmd()
        .env("PATH", &bin)
        .args(["migrate", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "database initialized by task 0123abcd in prod-cluster",
        ));
}

#[test]
fn test_missing_aws_cli_exits_one() {
    let t = Test::with_config(CONFIG);
    t.write("stack.yaml", TEMPLATE);
    let empty = tempfile::TempDir::new().expect("failed to create temp dir");

    t.cmd()
        .env("PATH", empty.path())
        .args(["migrate", "--yes"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("database initialized").not())
        .stderr(predicate::str::contains("aws"));
}
