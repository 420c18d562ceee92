use async_trait::async_trait;

use crate::domain::models::{CommitCount, CommitSummary, RepoInfo};

/// Read-only access to the service hosting student repositories.
///
/// Every method degrades instead of failing: transport errors, timeouts and
/// unexpected statuses surface as `None`, [`CommitCount::Unknown`] or an
/// empty list. Implementations must never panic on malformed URLs.
#[async_trait]
pub trait RepoHost: Send + Sync {
    /// Fetch repository metadata, or `None` if it cannot be obtained.
    async fn fetch_repo_info(&self, repo_url: &str) -> Option<RepoInfo>;

    /// Count the commits on the default branch.
    ///
    /// `Known(0)` means the repository is confirmed missing or empty;
    /// `Unknown` means "retry on the next cycle".
    async fn fetch_commits_count(&self, repo_url: &str) -> CommitCount;

    /// Up to `limit` most recent commits, newest first.
    async fn fetch_commit_history(&self, repo_url: &str, limit: usize) -> Vec<CommitSummary>;
}
