//! Config validation surfaced through the CLI.
//!
//! Every case here fails while loading, before any tool or credential check.

use crate::support::*;

const BASE: &str = r#"
[project]
name = "patient-api"
environment = "production"
region = "us-east-1"

[image]
repository = "patient-api"

[stack]
template = "stack.yaml"
"#;

#[test]
fn test_reserved_parameter_rejected() {
    let t = Test::with_config(&format!(
        "{}\n[stack.parameters]\nCreateDNSRecord = \"true\"\n",
        BASE
    ));

    let output = t.plan();
    assert_failure(&output);
    assert_stderr_contains(&output, "CreateDNSRecord");
}

#[test]
fn test_missing_repository_rejected() {
    let t = Test::with_config(&BASE.replace("repository = \"patient-api\"", "repository = \"\""));

    let output = t.plan();
    assert_failure(&output);
    assert_stderr_contains(&output, "image.repository");
}

#[test]
fn test_invalid_environment_override_rejected() {
    let t = Test::with_config(BASE);

    let output = t.run(&["plan", "--environment", "prod/eu"]);
    assert_failure(&output);
    assert_stderr_contains(&output, "invalid character");
}

#[test]
fn test_unqualified_domain_rejected() {
    let t = Test::with_config(&format!("{}\n[dns]\ndomain = \"localhost\"\n", BASE));

    let output = t.plan();
    assert_failure(&output);
    assert_stderr_contains(&output, "dns.domain");
}

#[test]
fn test_malformed_toml_rejected() {
    let t = Test::with_config("[project\nname = ");

    let output = t.plan();
    assert_failure(&output);
    assert_stderr_contains(&output, "invalid config");
}
