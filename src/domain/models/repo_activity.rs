//! Remote repository facts fetched from the hosting service.

use serde::{Deserialize, Serialize};

/// Repository metadata. Only `pushed_at` drives reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoInfo {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    /// ISO 8601 timestamp of the last push to any branch.
    #[serde(default)]
    pub pushed_at: Option<String>,
    #[serde(default)]
    pub default_branch: Option<String>,
}

/// Result of a commit-count lookup.
///
/// `Unknown` means the count could not be determined this cycle and must
/// never overwrite a previously known value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitCount {
    Known(u64),
    Unknown,
}

impl CommitCount {
    /// Wire/legacy representation: the count, or `-1` when unknown.
    pub fn as_i64(self) -> i64 {
        match self {
            Self::Known(n) => i64::try_from(n).unwrap_or(i64::MAX),
            Self::Unknown => -1,
        }
    }
}

/// A condensed commit for timelines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSummary {
    /// Abbreviated (7 character) commit hash.
    pub sha: String,
    pub message: String,
    pub author: String,
    pub date: String,
    pub url: String,
}
