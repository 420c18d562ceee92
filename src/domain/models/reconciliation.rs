//! Locally persisted view of each student's remote repository state.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Reconciliation state for every student, keyed by student name.
pub type ReconciliationState = BTreeMap<String, ReconciliationEntry>;

/// What the tracker last learned about a student's repository.
///
/// `commits_count` is only ever written with a confirmed, non-negative
/// value; a failed count keeps the previous one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationEntry {
    #[serde(default)]
    pub last_known_pushed_at: Option<String>,
    #[serde(default)]
    pub last_viewed_at: Option<String>,
    #[serde(default)]
    pub commits_count: Option<i64>,
}

impl ReconciliationEntry {
    /// Confirmed commit count, or 0 when unknown.
    pub fn commits_or_zero(&self) -> u64 {
        self.commits_count
            .and_then(|c| u64::try_from(c).ok())
            .unwrap_or(0)
    }

    /// Record a remote push time. Returns whether anything changed.
    pub fn observe_push(&mut self, pushed_at: &str) -> bool {
        if self.last_known_pushed_at.as_deref() == Some(pushed_at) {
            return false;
        }
        self.last_known_pushed_at = Some(pushed_at.to_string());
        true
    }

    /// Record a commit count. Negative (unknown) counts are ignored.
    /// Returns whether anything changed.
    pub fn observe_commits(&mut self, count: i64) -> bool {
        if count < 0 || self.commits_count == Some(count) {
            return false;
        }
        self.commits_count = Some(count);
        true
    }

    /// Whether the repository was pushed to after the instructor last looked.
    ///
    /// Timestamps are compared as instants; if either fails to parse the
    /// raw strings are compared for inequality instead.
    pub fn updated_since_view(&self) -> bool {
        let Some(pushed) = self.last_known_pushed_at.as_deref().filter(|s| !s.is_empty()) else {
            return false;
        };
        let Some(viewed) = self.last_viewed_at.as_deref().filter(|s| !s.is_empty()) else {
            return true;
        };
        match (parse_timestamp(pushed), parse_timestamp(viewed)) {
            (Some(p), Some(v)) => p > v,
            _ => pushed != viewed,
        }
    }
}

/// Parse an RFC 3339 / ISO-8601 timestamp with an explicit offset.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw.trim()).ok()
}
