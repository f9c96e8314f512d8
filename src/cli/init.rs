//! Init command - write a starter bullpen.toml.

use std::path::Path;
use tracing::info;

use crate::cli::output;
use crate::core::config::Config;
use crate::error::Result;

/// Scaffold a commented configuration at `path`.
pub fn execute(path: &Path, name: Option<String>) -> Result<()> {
    let name = name.unwrap_or_else(|| {
        std::env::current_dir()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
            .unwrap_or_else(|| "app".to_string())
    });

    info!(project = %name, "scaffolding config");
    Config::scaffold(path, &name)?;

    output::success(&format!("created {}", path.display()));
    output::hint(&format!(
        "edit [stack] template and [image] repository, then run {}",
        output::cmd("bullpen check")
    ));
    Ok(())
}
