//! Runtime-adjustable settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::lenient::coerce_int;

/// Lower bound for every interval setting, in seconds.
pub const MIN_INTERVAL_SECS: u64 = 5;

/// Upper bound for every interval setting, in seconds.
pub const MAX_INTERVAL_SECS: u64 = 3600;

/// Default background poll interval.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 300;

/// Default browser auto-refresh interval.
pub const DEFAULT_CLIENT_REFRESH_SECS: u64 = 60;

/// Settings editable through the API.
///
/// Always range-clamped; construct from untrusted input with
/// [`Settings::normalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub server_poll_interval_seconds: u64,
    pub client_refresh_seconds: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_poll_interval_seconds: DEFAULT_POLL_INTERVAL_SECS,
            client_refresh_seconds: DEFAULT_CLIENT_REFRESH_SECS,
        }
    }
}

impl Settings {
    /// Build settings from any JSON shape.
    ///
    /// Missing or non-integer fields take their default; every field is then
    /// clamped to `[5, 3600]`. Never fails.
    pub fn normalize(raw: &Value) -> Self {
        let Some(obj) = raw.as_object() else {
            return Self::default();
        };
        let field = |key: &str, default: u64| -> u64 {
            let value = obj
                .get(key)
                .and_then(coerce_int)
                .unwrap_or_else(|| i64::try_from(default).unwrap_or(i64::MAX));
            clamp_interval(value)
        };
        Self {
            server_poll_interval_seconds: field("server_poll_interval_seconds", DEFAULT_POLL_INTERVAL_SECS),
            client_refresh_seconds: field("client_refresh_seconds", DEFAULT_CLIENT_REFRESH_SECS),
        }
    }

    /// Sleep duration between background reconciliation passes.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.server_poll_interval_seconds)
    }
}

fn clamp_interval(value: i64) -> u64 {
    let min = i64::try_from(MIN_INTERVAL_SECS).unwrap_or(0);
    let max = i64::try_from(MAX_INTERVAL_SECS).unwrap_or(i64::MAX);
    u64::try_from(value.clamp(min, max)).unwrap_or(MIN_INTERVAL_SECS)
}
