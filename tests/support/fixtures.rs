//! Test fixtures and constants.

use bullpen::core::config::Config;
use tempfile::TempDir;

/// Minimal stack template; the memory cloud never reads it.
pub const TEMPLATE: &str = "AWSTemplateFormatVersion: '2010-09-09'\nResources: {}\n";

/// Stack name used by [`deployment`].
pub const STACK: &str = "patient-api-production";

/// A config with the template written next to it.
///
/// Holds the temp dir so the template outlives the config.
pub struct Deployment {
    pub dir: TempDir,
    pub config: Config,
}

/// Build a validated config for the memory cloud's standard layout.
///
/// `extra` is appended verbatim, so it can add whole sections.
pub fn deployment(extra: &str) -> Deployment {
    let dir = TempDir::new().expect("failed to create temp dir");
    let template = dir.path().join("stack.yaml");
    std::fs::write(&template, TEMPLATE).expect("failed to write template");
    let toml = format!(
        r#"
[project]
name = "patient-api"
environment = "production"
region = "us-east-1"

[network]
tag_value = "main"

[image]
repository = "patient-api"
tag = "v42"

[stack]
template = "{}"
{}
"#,
        template.display(),
        extra
    );
    let config = Config::parse(&toml).expect("fixture config should be valid");
    Deployment { dir, config }
}

/// `[dns]` section for the standard zone.
pub const DNS_SECTION: &str = "\n[dns]\ndomain = \"api.example.com\"\n";
