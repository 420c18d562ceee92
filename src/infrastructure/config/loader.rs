use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "homework-tracker.yaml";

/// Prefix of environment overrides, e.g. `HWTRACK_SERVER__PORT=8080`.
pub const ENV_PREFIX: &str = "HWTRACK_";

/// Conventional token variable honoured when no token is configured.
pub const GITHUB_TOKEN_VAR: &str = "GITHUB_TOKEN";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("Data directory cannot be empty")]
    EmptyDataDir,

    #[error("Invalid port: 0")]
    InvalidPort,

    #[error("Invalid GitHub timeout: 0 seconds")]
    InvalidTimeout,

    #[error("Invalid cache TTL: 0 seconds")]
    InvalidCacheTtl,
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. `homework-tracker.yaml` in the working directory (optional)
    /// 3. Environment variables (HWTRACK_* prefix, `__` for nesting)
    pub fn load() -> Result<Config> {
        Self::extract(Self::figment(Path::new(DEFAULT_CONFIG_FILE)))
    }

    /// Load configuration from a specific file, still honouring
    /// environment overrides. The file must exist.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.is_file() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        Self::extract(Self::figment(path)).with_context(|| format!("Failed to load config from {}", path.display()))
    }

    /// Load from `path` when given, otherwise from the default location.
    pub fn load_or_default(path: Option<&PathBuf>) -> Result<Config> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Self::load(),
        }
    }

    fn figment(path: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    fn extract(figment: Figment) -> Result<Config> {
        let mut config: Config = figment
            .extract()
            .context("Failed to extract configuration from figment")?;

        if config.github.token.as_deref().map_or(true, str::is_empty) {
            config.github.token = std::env::var(GITHUB_TOKEN_VAR).ok().filter(|t| !t.is_empty());
        }

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.storage.data_dir.trim().is_empty() {
            return Err(ConfigError::EmptyDataDir);
        }

        if config.server.port == 0 {
            return Err(ConfigError::InvalidPort);
        }

        if config.github.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        if config.cache.ttl_secs == 0 {
            return Err(ConfigError::InvalidCacheTtl);
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        Ok(())
    }
}
