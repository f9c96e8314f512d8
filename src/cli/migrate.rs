//! Migrate command - the initialization task alone.

use std::path::Path;

use crate::cli::{context, output, Overrides};
use crate::core::pipeline::Deployment;
use crate::error::Result;

/// Run the migration task against the already-deployed stack.
pub fn execute(path: &Path, overrides: &Overrides, yes: bool) -> Result<()> {
    let config = context::load(path, overrides)?;
    context::preflight(&config, false)?;
    context::confirm(
        &format!(
            "run {:?} against {}?",
            config.migration.command.join(" "),
            config.stack_name()
        ),
        yes,
    )?;
    let providers = context::connect(&config)?;

    output::step("running migration task");
    let outcome = Deployment::new(&config, &providers).migrate_only()?;
    output::success(&format!(
        "database initialized by task {} in {} (admin: {})",
        outcome.task_id, outcome.cluster, outcome.admin_username
    ));
    Ok(())
}
