//! Tests for `bullpen init`.

use crate::support::*;

#[test]
fn test_init_creates_config() {
    let t = Test::new();

    let output = t.init_cmd("patient-api");
    assert_success(&output);
    assert_stdout_contains(&output, "created bullpen.toml");

    let contents = t.read("bullpen.toml");
    assert!(contents.contains("name = \"patient-api\""));
    assert!(contents.contains("[migration]"));
}

#[test]
fn test_init_refuses_to_overwrite() {
    let t = Test::init("patient-api");
    t.write("bullpen.toml", "# hand edited\n");

    let output = t.init_cmd("other");
    assert_failure(&output);
    assert_stderr_contains(&output, "already exists");
    assert_eq!(t.read("bullpen.toml"), "# hand edited\n");
}

#[test]
fn test_init_honours_config_flag() {
    let t = Test::new();

    let output = t.run(&["--config", "deploy/staging.toml", "init", "--name", "api"]);
    assert_failure(&output);

    std::fs::create_dir_all(t.dir.path().join("deploy")).unwrap();
    let output = t.run(&["--config", "deploy/staging.toml", "init", "--name", "api"]);
    assert_success(&output);
    assert!(t.read("deploy/staging.toml").contains("name = \"api\""));
}

#[test]
fn test_scaffolded_config_parses() {
    let t = Test::init("patient-api");
    let config = bullpen::core::config::Config::parse(&t.read("bullpen.toml")).unwrap();
    assert_eq!(config.stack_name(), "patient-api-production");
    assert!(config.dns.is_none());
}
