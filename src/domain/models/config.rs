use serde::{Deserialize, Serialize};

/// Main configuration structure for the homework tracker
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// On-disk storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// GitHub API configuration
    #[serde(default)]
    pub github: GitHubConfig,

    /// Background poller configuration
    #[serde(default)]
    pub poller: PollerConfig,

    /// Aggregate view cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ServerConfig {
    /// Address to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding the HTML front-end (optional)
    #[serde(default)]
    pub static_dir: Option<String>,

    /// Whether to allow cross-origin requests
    #[serde(default = "default_true")]
    pub enable_cors: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

const fn default_port() -> u16 {
    5000
}

const fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: None,
            enable_cors: default_true(),
        }
    }
}

/// On-disk storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StorageConfig {
    /// Directory holding students.json, state.json and friends
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Directory receiving quarantined corrupt files
    #[serde(default = "default_backup_dir")]
    pub backup_dir: String,
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_backup_dir() -> String {
    "backups".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            backup_dir: default_backup_dir(),
        }
    }
}

/// GitHub API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GitHubConfig {
    /// REST API base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Optional access token; raises the rate limit when present
    #[serde(default)]
    pub token: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_api_base_url() -> String {
    "https://api.github.com".to_string()
}

const fn default_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    "homework-tracker".to_string()
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            token: None,
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

/// Background poller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PollerConfig {
    /// Run the reconciliation loop alongside the server
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Run one pass immediately instead of sleeping first
    #[serde(default = "default_true")]
    pub run_on_startup: bool,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            run_on_startup: default_true(),
        }
    }
}

/// Aggregate view cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CacheConfig {
    /// Time-to-live of cached views in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

const fn default_cache_ttl_secs() -> u64 {
    60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files (stdout only when unset)
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Rotation policy for log files: daily, hourly, never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}
