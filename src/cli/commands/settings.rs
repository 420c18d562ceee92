//! `settings`: show or change runtime settings.

use anyhow::{Context, Result};
use clap::Args;
use serde_json::{Map, Value};

use crate::cli::display::print_json;
use crate::cli::AppContext;

#[derive(Args, Debug)]
pub struct SettingsArgs {
    /// New background poll interval in seconds (clamped to 5..=3600)
    #[arg(long)]
    pub poll_interval: Option<i64>,

    /// New browser refresh interval in seconds (clamped to 5..=3600)
    #[arg(long)]
    pub client_refresh: Option<i64>,
}

pub async fn execute(args: SettingsArgs, context: AppContext, json_mode: bool) -> Result<()> {
    let roster = context.roster();
    let mut settings = roster.settings().await.context("Failed to load settings")?;

    if args.poll_interval.is_some() || args.client_refresh.is_some() {
        let pick = |arg: Option<i64>, current: u64| arg.map_or_else(|| Value::from(current), Value::from);
        let mut body = Map::new();
        body.insert(
            "server_poll_interval_seconds".into(),
            pick(args.poll_interval, settings.server_poll_interval_seconds),
        );
        body.insert(
            "client_refresh_seconds".into(),
            pick(args.client_refresh, settings.client_refresh_seconds),
        );
        settings = roster
            .save_settings(&Value::Object(body))
            .await
            .context("Failed to save settings")?;
    }

    if json_mode {
        return print_json(&settings);
    }
    println!("Server poll interval: {}s", settings.server_poll_interval_seconds);
    println!("Client refresh:       {}s", settings.client_refresh_seconds);
    Ok(())
}
