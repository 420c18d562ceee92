//! GitHub HTTP client.
//!
//! Wraps the three read-only GitHub REST API v3 calls the reconciler needs.
//! Nothing here returns an error: every failure is logged and degraded to
//! `None`, [`CommitCount::Unknown`] or an empty list so the caller can simply
//! retry on its next cycle.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{CommitCount, CommitSummary, GitHubConfig, RepoInfo, RepoRef};
use crate::domain::ports::RepoHost;

use super::models::{last_page_from_link_header, GitHubCommit};

/// Page size used for the fallback exact count.
const FULL_PAGE_SIZE: usize = 100;

/// HTTP client for the GitHub REST API v3.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    /// The underlying HTTP client.
    http: Client,
    /// API root, without trailing slash.
    base_url: String,
    /// Optional personal access token.
    token: Option<String>,
}

impl GitHubClient {
    /// Create a client from configuration.
    pub fn new(config: &GitHubConfig) -> DomainResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| DomainError::invalid(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            token: config.token.clone().filter(|t| !t.is_empty()),
        })
    }

    /// Whether requests carry an access token.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Send an authorized GET request, logging transport failures.
    async fn get(&self, url: &str, query: &[(&str, String)]) -> Option<Response> {
        let mut req = self
            .http
            .get(url)
            .query(query)
            .header("Accept", "application/vnd.github.v3+json");
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        match req.send().await {
            Ok(resp) => Some(resp),
            Err(e) => {
                tracing::warn!(url, error = %e, "GitHub request failed");
                None
            }
        }
    }

    fn repo_url(&self, repo: &RepoRef) -> String {
        format!("{}/repos/{}/{}", self.base_url, repo.owner, repo.name)
    }

    /// Fetch repository metadata.
    ///
    /// Returns `None` for unparseable URLs, transport errors, non-200
    /// statuses and undecodable bodies.
    pub async fn fetch_repo_info(&self, repo_url: &str) -> Option<RepoInfo> {
        let Some(repo) = RepoRef::parse(repo_url) else {
            tracing::debug!(repo_url, "skipping repo info fetch: cannot parse owner/name");
            return None;
        };

        let resp = self.get(&self.repo_url(&repo), &[]).await?;
        if resp.status() != StatusCode::OK {
            tracing::debug!(repo = %repo, status = %resp.status(), "GitHub repo info unavailable");
            return None;
        }

        match resp.json::<RepoInfo>().await {
            Ok(info) => Some(info),
            Err(e) => {
                tracing::warn!(repo = %repo, error = %e, "GitHub repo info parse failed");
                None
            }
        }
    }

    /// Count commits using at most two requests.
    ///
    /// A `per_page=1` request whose `Link` header advertises a last page
    /// yields the total directly. Without pagination the repository fits in
    /// a single 100-item page, which is then counted.
    pub async fn fetch_commits_count(&self, repo_url: &str) -> CommitCount {
        let Some(repo) = RepoRef::parse(repo_url) else {
            return CommitCount::Known(0);
        };
        let url = format!("{}/commits", self.repo_url(&repo));

        let Some(resp) = self.get(&url, &[("per_page", "1".to_string())]).await else {
            return CommitCount::Unknown;
        };
        match resp.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => return CommitCount::Known(0),
            status => {
                tracing::debug!(repo = %repo, %status, "GitHub commit count unavailable");
                return CommitCount::Unknown;
            }
        }

        let last_page = resp
            .headers()
            .get(reqwest::header::LINK)
            .and_then(|v| v.to_str().ok())
            .and_then(last_page_from_link_header);
        if let Some(total) = last_page {
            return CommitCount::Known(total);
        }

        let Some(resp) = self
            .get(&url, &[("per_page", FULL_PAGE_SIZE.to_string())])
            .await
        else {
            return CommitCount::Unknown;
        };
        if resp.status() != StatusCode::OK {
            tracing::debug!(repo = %repo, status = %resp.status(), "GitHub commit page unavailable");
            return CommitCount::Unknown;
        }
        match resp.json::<Vec<serde_json::Value>>().await {
            Ok(commits) => CommitCount::Known(commits.len() as u64),
            Err(e) => {
                tracing::warn!(repo = %repo, error = %e, "GitHub commit page parse failed");
                CommitCount::Unknown
            }
        }
    }

    /// Fetch up to `limit` recent commits, newest first.
    pub async fn fetch_commit_history(&self, repo_url: &str, limit: usize) -> Vec<CommitSummary> {
        let Some(repo) = RepoRef::parse(repo_url) else {
            return Vec::new();
        };
        let url = format!("{}/commits", self.repo_url(&repo));

        let Some(resp) = self.get(&url, &[("per_page", limit.to_string())]).await else {
            return Vec::new();
        };
        if resp.status() != StatusCode::OK {
            tracing::debug!(repo = %repo, status = %resp.status(), "GitHub commit history unavailable");
            return Vec::new();
        }

        match resp.json::<Vec<GitHubCommit>>().await {
            Ok(commits) => commits
                .into_iter()
                .take(limit)
                .map(CommitSummary::from)
                .collect(),
            Err(e) => {
                tracing::warn!(repo = %repo, error = %e, "GitHub commit history parse failed");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl RepoHost for GitHubClient {
    async fn fetch_repo_info(&self, repo_url: &str) -> Option<RepoInfo> {
        Self::fetch_repo_info(self, repo_url).await
    }

    async fn fetch_commits_count(&self, repo_url: &str) -> CommitCount {
        Self::fetch_commits_count(self, repo_url).await
    }

    async fn fetch_commit_history(&self, repo_url: &str, limit: usize) -> Vec<CommitSummary> {
        Self::fetch_commit_history(self, repo_url, limit).await
    }
}
