//! Common test utilities for integration tests
//!
//! Provides shared fixtures and an in-memory repository host used across
//! multiple integration test files.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use homework_tracker::domain::models::{CommitCount, CommitSummary, RepoInfo};
use homework_tracker::{JsonStore, RepoHost};

/// Create a temporary directory for test isolation
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// A store rooted in a fresh temporary directory.
///
/// The `TempDir` must outlive the store.
pub fn temp_store() -> (TempDir, Arc<JsonStore>) {
    let dir = temp_dir();
    let store = JsonStore::new(dir.path().join("data"), dir.path().join("backups"));
    (dir, Arc::new(store))
}

/// What the fake host knows about one repository URL.
#[derive(Debug, Clone)]
pub struct FakeRepo {
    pub pushed_at: Option<String>,
    pub commits: CommitCount,
    pub history: Vec<CommitSummary>,
}

/// In-memory `RepoHost` keyed by repository URL.
///
/// Unknown URLs behave like an unreachable host.
#[derive(Debug, Default)]
pub struct FakeHost {
    repos: Mutex<HashMap<String, FakeRepo>>,
    calls: AtomicUsize,
}

impl FakeHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_repo(&self, url: &str, pushed_at: Option<&str>, commits: CommitCount) {
        let mut repos = self.repos.lock().unwrap();
        let entry = repos.entry(url.to_string()).or_insert_with(|| FakeRepo {
            pushed_at: None,
            commits: CommitCount::Unknown,
            history: Vec::new(),
        });
        entry.pushed_at = pushed_at.map(str::to_string);
        entry.commits = commits;
    }

    pub fn set_history(&self, url: &str, history: Vec<CommitSummary>) {
        let mut repos = self.repos.lock().unwrap();
        if let Some(repo) = repos.get_mut(url) {
            repo.history = history;
        }
    }

    /// Number of calls made through the port.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn lookup(&self, url: &str) -> Option<FakeRepo> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.repos.lock().unwrap().get(url).cloned()
    }
}

#[async_trait]
impl RepoHost for FakeHost {
    async fn fetch_repo_info(&self, repo_url: &str) -> Option<RepoInfo> {
        self.lookup(repo_url).map(|repo| RepoInfo {
            pushed_at: repo.pushed_at,
            ..Default::default()
        })
    }

    async fn fetch_commits_count(&self, repo_url: &str) -> CommitCount {
        self.lookup(repo_url)
            .map_or(CommitCount::Unknown, |repo| repo.commits)
    }

    async fn fetch_commit_history(&self, repo_url: &str, limit: usize) -> Vec<CommitSummary> {
        self.lookup(repo_url)
            .map(|repo| repo.history.into_iter().take(limit).collect())
            .unwrap_or_default()
    }
}

/// A commit summary dated `date` (RFC 3339).
pub fn commit(sha: &str, date: &str) -> CommitSummary {
    CommitSummary {
        sha: sha.to_string(),
        message: format!("commit {sha}"),
        author: "Student".to_string(),
        date: date.to_string(),
        url: format!("https://github.com/example/repo/commit/{sha}"),
    }
}
