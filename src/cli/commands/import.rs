//! `import`: bulk-add students from a text file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::cli::display::{action_success, print_json};
use crate::cli::AppContext;
use crate::services::parse_import_text;

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// File with one `name,repo`, `name<TAB>repo`, `name repo` or bare repo per line
    pub file: PathBuf,
}

pub async fn execute(args: ImportArgs, context: AppContext, json_mode: bool) -> Result<()> {
    let text = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let summary = context
        .roster()
        .import(parse_import_text(&text))
        .await
        .context("Import failed")?;

    if json_mode {
        return print_json(&summary);
    }
    println!(
        "{}",
        action_success(&format!(
            "Imported: {} added, {} updated, {} skipped",
            summary.added, summary.updated, summary.skipped
        ))
    );
    Ok(())
}
