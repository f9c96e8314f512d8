//! Check command - preconditions only.

use std::path::Path;

use crate::cli::{context, output, Overrides};
use crate::core::stack;
use crate::error::Result;

/// Verify configuration, tools, credentials and template without mutating.
pub fn execute(path: &Path, overrides: &Overrides) -> Result<()> {
    let config = context::load(path, overrides)?;
    output::success(&format!("config {} valid", path.display()));

    stack::check_template(&config.stack.template)?;
    output::success(&format!("template {}", config.stack.template.display()));

    let identity = context::preflight(&config, true)?;
    output::success("aws and docker found");
    output::success(&format!("credentials resolve to {}", output::resource(&identity)));

    output::section("Target");
    output::kv("project", &config.project.name);
    output::kv("environment", &config.project.environment);
    output::kv("region", &config.project.region);
    output::kv("stack", config.stack_name());
    Ok(())
}
