use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::models::LoggingConfig;

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format (json, pretty)
    #[serde(default = "default_format")]
    pub format: LogFormat,

    /// Directory for log files (optional, if None logs only to the console)
    pub log_dir: Option<PathBuf>,

    /// Enable console (stderr) logging
    #[serde(default = "default_true")]
    pub enable_stdout: bool,

    /// Log rotation policy
    #[serde(default)]
    pub rotation: RotationPolicy,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    #[default]
    Daily,
    Hourly,
    Never,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_format(),
            log_dir: None,
            enable_stdout: true,
            rotation: RotationPolicy::default(),
        }
    }
}

impl LogConfig {
    /// Build from the `logging` section of the application config.
    pub fn from_settings(settings: &LoggingConfig) -> Result<Self> {
        let format = match settings.format.as_str() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            other => anyhow::bail!("Invalid log format: {other}"),
        };
        let rotation = match settings.rotation.as_str() {
            "daily" => RotationPolicy::Daily,
            "hourly" => RotationPolicy::Hourly,
            "never" => RotationPolicy::Never,
            other => anyhow::bail!("Invalid log rotation: {other}"),
        };
        Ok(Self {
            level: settings.level.clone(),
            format,
            log_dir: settings.log_dir.as_ref().map(PathBuf::from),
            enable_stdout: true,
            rotation,
        })
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_format() -> LogFormat {
    LogFormat::Pretty
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_settings() {
        let settings = LoggingConfig {
            level: "debug".into(),
            format: "json".into(),
            log_dir: Some("logs".into()),
            rotation: "hourly".into(),
        };
        let config = LogConfig::from_settings(&settings).unwrap();
        assert_eq!(config.level, "debug");
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.log_dir, Some(PathBuf::from("logs")));
        assert_eq!(config.rotation, RotationPolicy::Hourly);
        assert!(config.enable_stdout);
    }

    #[test]
    fn test_from_settings_rejects_unknown() {
        let settings = LoggingConfig {
            format: "xml".into(),
            ..Default::default()
        };
        assert!(LogConfig::from_settings(&settings).is_err());

        let settings = LoggingConfig {
            rotation: "weekly".into(),
            ..Default::default()
        };
        assert!(LogConfig::from_settings(&settings).is_err());
    }

    #[test]
    fn test_rotation_deserialize() {
        let rotation: RotationPolicy = serde_json::from_str(r#""never""#).unwrap();
        assert_eq!(rotation, RotationPolicy::Never);
    }
}
