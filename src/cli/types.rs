//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use super::commands::{export::ExportArgs, import::ImportArgs, serve::ServeArgs, settings::SettingsArgs};

#[derive(Parser, Debug)]
#[command(name = "homework-tracker")]
#[command(about = "Homework Tracker - student repositories, scores and badges", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to a YAML config file
    #[arg(short, long, global = true, env = "HWTRACK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server and the background poller
    Serve(ServeArgs),

    /// Run one reconciliation pass against GitHub
    Check,

    /// List students with scores, commits and badges
    List,

    /// Export the score sheet as CSV
    Export(ExportArgs),

    /// Import students from a text file
    Import(ImportArgs),

    /// Show or change runtime settings
    Settings(SettingsArgs),
}
