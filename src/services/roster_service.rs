//! Roster management: students, scores, remarks and settings.
//!
//! Every mutation of the student list invalidates the response cache.
//! Renames carry the student's reconciliation entry, remarks and score
//! history over to the new name.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::adapters::cache::ResponseCache;
use crate::adapters::json_store::JsonStore;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::lenient::coerce_int;
use crate::domain::models::score_history::record_event;
use crate::domain::models::student::scores_from_value;
use crate::domain::models::{
    clamp_score, ReconciliationState, Remark, Remarks, ScoreHistory, ScoreHistoryEvent, Scores,
    Settings, Student, PHASE_COUNT,
};
use crate::services::import_parser::ImportEntry;
use crate::services::reconciler::now_timestamp;

/// Add or update request for a single student.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentInput {
    pub name: String,
    pub repo: String,
    /// Previous name when renaming; defaults to `name`.
    pub old_name: Option<String>,
    /// Replacement scores; `None` keeps the current ones.
    pub scores: Option<Scores>,
}

impl StudentInput {
    /// Read a request body leniently.
    ///
    /// A present but malformed `scores` field becomes five zeros.
    pub fn from_json(body: &Value) -> Self {
        let text = |key: &str| {
            body.get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .unwrap_or_default()
                .to_string()
        };
        let old_name = Some(text("old_name")).filter(|n| !n.is_empty());
        Self {
            name: text("name"),
            repo: text("repo"),
            old_name,
            scores: body.get("scores").map(scores_from_value),
        }
    }
}

/// Single-phase score change request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreInput {
    pub name: String,
    pub phase: Option<Value>,
    pub score: Option<Value>,
}

impl ScoreInput {
    pub fn from_json(body: &Value) -> Self {
        Self {
            name: body
                .get("name")
                .and_then(Value::as_str)
                .map(str::trim)
                .unwrap_or_default()
                .to_string(),
            phase: body.get("phase").cloned(),
            score: body.get("score").cloned(),
        }
    }
}

/// Counters returned by an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub added: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// Roster operations over the store.
pub struct RosterService {
    store: Arc<JsonStore>,
    cache: ResponseCache,
}

impl RosterService {
    pub fn new(store: Arc<JsonStore>, cache: ResponseCache) -> Self {
        Self { store, cache }
    }

    /// All students in roster order.
    pub async fn list(&self) -> DomainResult<Vec<Student>> {
        self.store.load_students().await
    }

    /// Add a student. Names and repositories must be unique.
    pub async fn add(&self, input: StudentInput) -> DomainResult<Student> {
        if input.name.is_empty() || input.repo.is_empty() {
            return Err(DomainError::invalid("missing name or repo"));
        }
        let student = Student::new(input.name, input.repo).with_scores(input.scores.unwrap_or_default());

        let added = student.clone();
        self.store
            .update(move |students: &mut Vec<Student>| {
                if students.iter().any(|s| s.name == added.name) {
                    return Err(DomainError::Conflict("name"));
                }
                if students.iter().any(|s| s.repo == added.repo) {
                    return Err(DomainError::Conflict("repo"));
                }
                students.push(added);
                Ok(())
            })
            .await?;

        self.cache.invalidate_all();
        tracing::info!(student = %student.name, "student added");
        Ok(student)
    }

    /// Update, and possibly rename, a student.
    pub async fn update(&self, input: StudentInput) -> DomainResult<Student> {
        let old_name = input.old_name.clone().unwrap_or_else(|| input.name.clone());
        if input.name.is_empty() || input.repo.is_empty() {
            return Err(DomainError::invalid("missing name or repo"));
        }

        let lookup = old_name.clone();
        let updated = self
            .store
            .update(move |students: &mut Vec<Student>| {
                let idx = students
                    .iter()
                    .position(|s| s.name == lookup)
                    .ok_or_else(|| DomainError::StudentNotFound(lookup.clone()))?;
                if input.name != lookup && students.iter().any(|s| s.name == input.name) {
                    return Err(DomainError::Conflict("name"));
                }
                if students
                    .iter()
                    .enumerate()
                    .any(|(i, s)| i != idx && s.repo == input.repo)
                {
                    return Err(DomainError::Conflict("repo"));
                }

                let target = &mut students[idx];
                target.name = input.name;
                target.repo = input.repo;
                if let Some(scores) = input.scores {
                    target.scores = scores;
                }
                Ok(target.clone())
            })
            .await?;

        self.cache.invalidate_all();
        if updated.name != old_name {
            self.migrate_name(&old_name, &updated.name).await?;
            tracing::info!(from = %old_name, to = %updated.name, "student renamed");
        }
        Ok(updated)
    }

    /// Move per-student records from one name to another.
    async fn migrate_name(&self, from: &str, to: &str) -> DomainResult<()> {
        let (f, t) = (from.to_string(), to.to_string());
        self.store
            .update_if_changed(move |state: &mut ReconciliationState| {
                state.remove(&f).map(|entry| state.insert(t, entry)).is_some()
            })
            .await?;

        let (f, t) = (from.to_string(), to.to_string());
        self.store
            .update_if_changed(move |remarks: &mut Remarks| {
                remarks.remove(&f).map(|remark| remarks.insert(t, remark)).is_some()
            })
            .await?;

        let (f, t) = (from.to_string(), to.to_string());
        self.store
            .update_if_changed(move |history: &mut ScoreHistory| {
                history.remove(&f).map(|events| history.insert(t, events)).is_some()
            })
            .await?;
        Ok(())
    }

    /// Remove a student. Their other records are left in place.
    pub async fn delete(&self, name: &str) -> DomainResult<()> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::invalid("missing name"));
        }

        let target = name.clone();
        self.store
            .update(move |students: &mut Vec<Student>| {
                let before = students.len();
                students.retain(|s| s.name != target);
                if students.len() == before {
                    return Err(DomainError::StudentNotFound(target));
                }
                Ok(())
            })
            .await?;

        self.cache.invalidate_all();
        tracing::info!(student = %name, "student deleted");
        Ok(())
    }

    /// Set one phase score, recording the change in the score history.
    pub async fn set_score(&self, input: ScoreInput) -> DomainResult<Student> {
        if input.name.is_empty() {
            return Err(DomainError::invalid("missing name"));
        }
        let (Some(phase), Some(score)) = (input.phase, input.score) else {
            return Err(DomainError::invalid("missing phase or score"));
        };
        let phase = coerce_int(&phase).ok_or_else(|| DomainError::invalid("invalid phase or score"))?;
        let phase = usize::try_from(phase)
            .ok()
            .filter(|&p| p < PHASE_COUNT)
            .ok_or_else(|| DomainError::invalid("invalid phase"))?;
        let score = clamp_score(&score);

        let name = input.name;
        let lookup = name.clone();
        let (student, old_score) = self
            .store
            .update(move |students: &mut Vec<Student>| {
                let target = students
                    .iter_mut()
                    .find(|s| s.name == lookup)
                    .ok_or_else(|| DomainError::StudentNotFound(lookup.clone()))?;
                let old_score = target.scores[phase];
                target.scores[phase] = score;
                Ok((target.clone(), old_score))
            })
            .await?;

        if old_score != score {
            let event = ScoreHistoryEvent {
                timestamp: now_timestamp(),
                phase,
                old_score,
                new_score: score,
            };
            self.store
                .update(move |history: &mut ScoreHistory| {
                    record_event(history, &name, event);
                    Ok(())
                })
                .await?;
            tracing::info!(student = %student.name, phase, old_score, new_score = score, "score changed");
        }

        self.cache.invalidate_all();
        Ok(student)
    }

    /// Merge imported entries into the roster.
    ///
    /// Existing names get their repository replaced, repositories already
    /// owned by another student are skipped, everything else is appended
    /// with zero scores. Fails when `entries` is empty.
    pub async fn import(&self, entries: Vec<ImportEntry>) -> DomainResult<ImportSummary> {
        if entries.is_empty() {
            return Err(DomainError::invalid("no valid entries"));
        }

        let summary = self
            .store
            .update(move |students: &mut Vec<Student>| {
                let mut summary = ImportSummary::default();
                let mut by_name: HashMap<String, usize> = students
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| !s.name.is_empty())
                    .map(|(i, s)| (s.name.clone(), i))
                    .collect();
                let mut repos: HashSet<String> = students
                    .iter()
                    .filter(|s| !s.repo.is_empty())
                    .map(|s| s.repo.clone())
                    .collect();

                for entry in entries {
                    if !entry.is_complete() {
                        summary.skipped += 1;
                        continue;
                    }
                    if let Some(&idx) = by_name.get(&entry.name) {
                        let existing = &mut students[idx];
                        if existing.repo == entry.repo {
                            summary.skipped += 1;
                        } else {
                            existing.repo = entry.repo;
                            summary.updated += 1;
                        }
                        continue;
                    }
                    if repos.contains(&entry.repo) {
                        summary.skipped += 1;
                        continue;
                    }
                    repos.insert(entry.repo.clone());
                    by_name.insert(entry.name.clone(), students.len());
                    students.push(Student::new(entry.name, entry.repo));
                    summary.added += 1;
                }
                Ok(summary)
            })
            .await?;

        self.cache.invalidate_all();
        tracing::info!(
            added = summary.added,
            updated = summary.updated,
            skipped = summary.skipped,
            "students imported"
        );
        Ok(summary)
    }

    /// Remark for a student, or an empty one.
    pub async fn remarks(&self, name: &str) -> DomainResult<Remark> {
        Ok(self.store.load_remarks().await?.remove(name).unwrap_or_default())
    }

    /// Replace a student's remark.
    pub async fn save_remarks(&self, name: &str, body: &Value) -> DomainResult<Remark> {
        let remark = Remark::from_request(body, now_timestamp());
        let (key, stored) = (name.to_string(), remark.clone());
        self.store
            .update(move |remarks: &mut Remarks| {
                remarks.insert(key, stored);
                Ok(())
            })
            .await?;
        Ok(remark)
    }

    pub async fn settings(&self) -> DomainResult<Settings> {
        self.store.load_settings().await
    }

    /// Normalize and persist settings. Never rejects input.
    pub async fn save_settings(&self, body: &Value) -> DomainResult<Settings> {
        let settings = self.store.save_settings(body).await?;
        tracing::info!(
            poll_interval = settings.server_poll_interval_seconds,
            client_refresh = settings.client_refresh_seconds,
            "settings saved"
        );
        Ok(settings)
    }
}
