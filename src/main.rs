//! Homework tracker CLI entry point.

use anyhow::{Context, Result};
use clap::Parser;

use homework_tracker::cli::{commands, AppContext, Cli, Commands};
use homework_tracker::infrastructure::config::ConfigLoader;
use homework_tracker::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.json;

    if let Err(err) = run(cli).await {
        homework_tracker::cli::handle_error(err, json_mode);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = ConfigLoader::load_or_default(cli.config.as_ref())?;

    let log_config = LogConfig::from_settings(&config.logging)?;
    let _logger = LoggerImpl::init(&log_config).context("Failed to initialize logging")?;

    let context = AppContext::new(config)?;
    let json = cli.json;

    match cli.command {
        Commands::Serve(args) => commands::serve::execute(args, context, json).await,
        Commands::Check => commands::check::execute(context, json).await,
        Commands::List => commands::list::execute(context, json).await,
        Commands::Export(args) => commands::export::execute(args, context, json).await,
        Commands::Import(args) => commands::import::execute(args, context, json).await,
        Commands::Settings(args) => commands::settings::execute(args, context, json).await,
    }
}
