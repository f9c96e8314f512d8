//! Tests for error handling and CLI flags.

use crate::support::*;
use predicates::prelude::*;

#[test]
fn test_help_lists_commands() {
    let t = Test::new();

    let output = t.run(&["--help"]);
    assert_success(&output);
    let out = stdout(&output);
    for command in ["deploy", "plan", "secrets", "migrate", "verify"] {
        assert!(out.contains(command), "help missing {}", command);
    }
}

#[test]
fn test_unknown_command_fails() {
    let t = Test::new();
    assert_failure(&t.run(&["pitch"]));
}

#[test]
fn test_version_flag() {
    let t = Test::new();

    let output = t.run(&["--version"]);
    assert_success(&output);
    assert_stdout_contains(&output, "bullpen");
}

#[test]
fn test_missing_config_hints_init() {
    let t = Test::new();

    let output = t.plan();
    assert_failure(&output);
    assert_eq!(output.status.code(), Some(1));
    assert_stderr_contains(&output, "config not found");
    assert_stderr_contains(&output, "bullpen init");
}

#[test]
fn test_image_ref_conflicts_with_image_tag() {
    let t = Test::init("api");

    let output = t.run(&[
        "deploy",
        "--yes",
        "--image-ref",
        "repo@sha256:feed",
        "--image-tag",
        "v2",
    ]);
    assert_failure(&output);
    assert_stderr_contains(&output, "cannot be used with");
}

#[test]
fn test_deploy_without_config_exits_nonzero() {
    let t = Test::new();

    t.cmd()
        .args(["deploy", "--yes"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("bullpen.toml").and(predicate::str::contains("bullpen init")));
}

#[test]
fn test_from_env_requires_purpose() {
    let t = Test::init("api");

    let output = t.run(&["secrets", "ensure", "--from-env", "ADMIN_PW"]);
    assert_failure(&output);
}

#[test]
fn test_completions_bash_outputs_script() {
    let t = Test::new();

    let output = t.run(&["completions", "bash"]);
    assert_success(&output);
    assert_stdout_contains(&output, "bullpen");
}

#[test]
fn test_completions_zsh_outputs_script() {
    let t = Test::new();

    let output = t.run(&["completions", "zsh"]);
    assert_success(&output);
    assert_stdout_contains(&output, "#compdef bullpen");
}
