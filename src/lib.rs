//! Homework Tracker
//!
//! Tracks student homework repositories hosted on GitHub, records per-phase
//! scores and derives achievement badges, a leaderboard and CSV exports.
//!
//! # Architecture
//!
//! The crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, errors and the `RepoHost` port
//! - **Service Layer** (`services`): badges, reconciliation, roster and views
//! - **Adapters** (`adapters`): GitHub client, JSON store, cache, HTTP API
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use homework_tracker::{GitHubClient, JsonStore, Reconciler};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = homework_tracker::ConfigLoader::load()?;
//!     let store = Arc::new(JsonStore::from_config(&config.storage));
//!     let host = Arc::new(GitHubClient::new(&config.github)?);
//!     Reconciler::new(store, host).check_all().await?;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use adapters::cache::ResponseCache;
pub use adapters::github::GitHubClient;
pub use adapters::http::{AppState, HttpServer, HttpServerConfig};
pub use adapters::json_store::JsonStore;
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    Badge, BadgeLevel, Config, ReconciliationEntry, ReconciliationState, Settings, Student,
};
pub use domain::ports::RepoHost;
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    calculate_badges, PollDaemon, Reconciler, RosterService, ViewService,
};
