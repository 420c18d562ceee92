//! Reconciliation of remote repository state into the local store.
//!
//! A pass walks the roster in order and, for every trackable student,
//! fetches push metadata and the commit count from the [`RepoHost`]. Network
//! calls happen before the state lock is taken; the entry is then re-read,
//! updated and persisted under the lock, one student at a time.

use std::sync::Arc;

use chrono::Utc;

use crate::adapters::json_store::JsonStore;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    CommitCount, ReconciliationEntry, ReconciliationState, RepoInfo, Student,
};
use crate::domain::ports::RepoHost;

/// Outcome counters for one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Students whose repository answered.
    pub checked: usize,
    /// Students whose entry changed and was persisted.
    pub updated: usize,
    /// Students skipped (untrackable or unreachable).
    pub skipped: usize,
    /// Whether the pass ended early on a stop request.
    pub interrupted: bool,
}

/// Current time in the format stored in reconciliation entries.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339()
}

/// Reconciles remote repository facts into the store.
pub struct Reconciler {
    store: Arc<JsonStore>,
    host: Arc<dyn RepoHost>,
}

impl Reconciler {
    pub fn new(store: Arc<JsonStore>, host: Arc<dyn RepoHost>) -> Self {
        Self { store, host }
    }

    /// Run one full pass and return the resulting state.
    pub async fn check_all(&self) -> DomainResult<ReconciliationState> {
        self.check_all_until(|| false).await?;
        self.store.load_state().await
    }

    /// Run one pass, consulting `should_stop` before every student.
    pub async fn check_all_until<F>(&self, should_stop: F) -> DomainResult<PassReport>
    where
        F: Fn() -> bool + Send + Sync,
    {
        let students = self.store.load_students().await?;
        let mut report = PassReport::default();

        for student in &students {
            if should_stop() {
                tracing::info!("reconciliation pass interrupted by stop request");
                report.interrupted = true;
                break;
            }
            if !student.is_trackable() {
                report.skipped += 1;
                continue;
            }

            let Some(info) = self.host.fetch_repo_info(&student.repo).await else {
                tracing::debug!(student = %student.name, "repository unreachable, skipping");
                report.skipped += 1;
                continue;
            };
            let commits = self.host.fetch_commits_count(&student.repo).await;
            report.checked += 1;

            if self.apply(student, &info, commits).await? {
                report.updated += 1;
            }
        }

        tracing::info!(
            students = students.len(),
            checked = report.checked,
            updated = report.updated,
            skipped = report.skipped,
            "reconciliation pass finished"
        );
        Ok(report)
    }

    /// Merge fetched facts into the student's entry, persisting on change.
    async fn apply(&self, student: &Student, info: &RepoInfo, commits: CommitCount) -> DomainResult<bool> {
        let name = student.name.clone();
        let pushed_at = info.pushed_at.clone().filter(|p| !p.is_empty());

        self.store
            .update_if_changed(move |state: &mut ReconciliationState| {
                let mut entry = state.get(&name).cloned().unwrap_or_default();
                let mut changed = false;
                if let Some(pushed_at) = &pushed_at {
                    changed |= entry.observe_push(pushed_at);
                }
                if let CommitCount::Known(_) = commits {
                    changed |= entry.observe_commits(commits.as_i64());
                }
                if changed {
                    tracing::debug!(
                        student = %name,
                        pushed_at = ?entry.last_known_pushed_at,
                        commits = ?entry.commits_count,
                        "reconciliation entry updated"
                    );
                    state.insert(name, entry);
                }
                changed
            })
            .await
    }

    /// Record that the instructor looked at a student's repository.
    ///
    /// When no push time is known yet, one is fetched first so that the
    /// view does not immediately read as stale. Unknown names still get an
    /// entry.
    pub async fn mark_viewed(&self, name: &str) -> DomainResult<ReconciliationEntry> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::invalid("missing name"));
        }

        let known_push = self
            .store
            .load_state()
            .await?
            .get(name)
            .is_some_and(|entry| entry.last_known_pushed_at.is_some());

        let fetched = if known_push {
            None
        } else {
            let repo = self
                .store
                .load_students()
                .await?
                .into_iter()
                .find(|s| s.name == name)
                .map(|s| s.repo)
                .filter(|repo| !repo.is_empty());
            match repo {
                Some(repo) => self.host.fetch_repo_info(&repo).await,
                None => None,
            }
        };

        let viewed_at = now_timestamp();
        let key = name.to_string();
        self.store
            .update(move |state: &mut ReconciliationState| {
                let entry = state.entry(key).or_default();
                entry.last_viewed_at = Some(viewed_at);
                if let Some(info) = fetched {
                    if entry.last_known_pushed_at.is_none() {
                        entry.last_known_pushed_at = info.pushed_at;
                    }
                }
                Ok(entry.clone())
            })
            .await
    }

    /// Mark a student viewed and return their repository URL.
    ///
    /// Unlike [`mark_viewed`](Self::mark_viewed) this never touches the
    /// network and fails for unknown students.
    pub async fn open_repo(&self, name: &str) -> DomainResult<String> {
        let repo = self
            .store
            .load_students()
            .await?
            .into_iter()
            .find(|s| s.name == name)
            .map(|s| s.repo)
            .filter(|repo| !repo.is_empty())
            .ok_or_else(|| DomainError::StudentNotFound(name.to_string()))?;

        let viewed_at = now_timestamp();
        let key = name.to_string();
        self.store
            .update(move |state: &mut ReconciliationState| {
                state.entry(key).or_default().last_viewed_at = Some(viewed_at);
                Ok(())
            })
            .await?;
        Ok(repo)
    }
}
