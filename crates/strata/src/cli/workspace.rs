//! `strata init` command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use strata::{Strata, StrataConfig};

use super::{print_json, OutputMode};

/// Run the init command.
pub fn init(workspace: &Path, max_depth: Option<u32>, mode: OutputMode) -> Result<()> {
    let mut config = StrataConfig::default();
    if let Some(depth) = max_depth {
        config.max_depth = depth;
    }

    let strata = Strata::init(workspace, config)
        .with_context(|| format!("failed to initialize {}", workspace.display()))?;

    match mode {
        OutputMode::Json => print_json(&serde_json::json!({
            "database": strata.db_path().display().to_string(),
            "max_depth": strata.config().max_depth,
        }))?,
        OutputMode::Text => {
            println!("{} strata workspace", "Initialized".green().bold());
            println!("  Database: {}", strata.db_path().display());
            println!("  Max depth: {}", strata.config().max_depth);
        }
    }
    Ok(())
}
