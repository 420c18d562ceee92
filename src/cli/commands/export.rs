//! `export`: CSV score sheet.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;
use tokio::io::AsyncWriteExt;

use crate::cli::display::{action_success, print_json};
use crate::cli::AppContext;

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Write to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub async fn execute(args: ExportArgs, context: AppContext, json_mode: bool) -> Result<()> {
    let csv = context
        .views()
        .export_csv()
        .await
        .context("Failed to render CSV")?;

    let Some(path) = args.output else {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(csv.as_bytes()).await?;
        stdout.flush().await?;
        return Ok(());
    };

    tokio::fs::write(&path, csv.as_bytes())
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    if json_mode {
        print_json(&json!({ "ok": true, "path": path.display().to_string() }))
    } else {
        println!("{}", action_success(&format!("Exported to {}", path.display())));
        Ok(())
    }
}
