//! Shared wiring for CLI commands.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::adapters::cache::ResponseCache;
use crate::adapters::github::GitHubClient;
use crate::adapters::json_store::JsonStore;
use crate::domain::models::Config;
use crate::domain::ports::RepoHost;
use crate::services::{Reconciler, RosterService, ViewService};

/// Loaded configuration plus the adapters every command needs.
pub struct AppContext {
    pub config: Config,
    pub store: Arc<JsonStore>,
    pub host: Arc<dyn RepoHost>,
}

impl AppContext {
    /// Build the store and GitHub client from configuration.
    pub fn new(config: Config) -> Result<Self> {
        let store = Arc::new(JsonStore::from_config(&config.storage));
        let client = GitHubClient::new(&config.github).context("Failed to create GitHub client")?;
        if !client.is_authenticated() {
            tracing::info!("no GitHub token configured; using unauthenticated rate limits");
        }
        Ok(Self {
            config,
            store,
            host: Arc::new(client),
        })
    }

    /// Use an existing store and host, mostly for tests.
    pub fn with_parts(config: Config, store: Arc<JsonStore>, host: Arc<dyn RepoHost>) -> Self {
        Self { config, store, host }
    }

    pub fn cache(&self) -> ResponseCache {
        ResponseCache::from_config(&self.config.cache)
    }

    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(Arc::clone(&self.store), Arc::clone(&self.host))
    }

    pub fn roster(&self) -> RosterService {
        RosterService::new(Arc::clone(&self.store), self.cache())
    }

    pub fn views(&self) -> ViewService {
        ViewService::new(Arc::clone(&self.store), Arc::clone(&self.host), self.cache())
    }
}
