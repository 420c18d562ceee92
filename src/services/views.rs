//! Read-side projections: roster list, leaderboard, student details and
//! CSV export.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Days, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::adapters::cache::ResponseCache;
use crate::adapters::json_store::JsonStore;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::reconciliation::parse_timestamp;
use crate::domain::models::score_history::recent_events;
use crate::domain::models::{
    avatar_url, Badge, CommitSummary, ReconciliationEntry, ReconciliationState, Remark,
    ScoreHistoryEvent, Scores, Student, PHASE_LABELS,
};
use crate::domain::ports::RepoHost;
use crate::services::badge_engine::calculate_badges;

/// Avatar edge length in pixels.
const AVATAR_SIZE: u32 = 80;

/// Commits shown on the details page.
const DETAIL_COMMIT_LIMIT: usize = 30;

/// Score history events shown on the details page.
const DETAIL_HISTORY_LIMIT: usize = 20;

/// Days covered by the commit histogram.
const FREQUENCY_DAYS: u64 = 30;

/// One row of the roster list.
#[derive(Debug, Clone, Serialize)]
pub struct StudentRow {
    pub name: String,
    pub repo: String,
    pub last_known_pushed_at: Option<String>,
    pub last_viewed_at: Option<String>,
    pub updated_since_view: bool,
    pub scores: Scores,
    pub avg_score: f64,
    pub commits_count: u64,
    pub avatar_url: Option<String>,
    pub badges: Vec<Badge>,
}

impl StudentRow {
    fn new(student: &Student, entry: &ReconciliationEntry) -> Self {
        Self {
            name: student.name.clone(),
            repo: student.repo.clone(),
            last_known_pushed_at: entry.last_known_pushed_at.clone(),
            last_viewed_at: entry.last_viewed_at.clone(),
            updated_since_view: entry.updated_since_view(),
            scores: student.scores,
            avg_score: student.avg_score(),
            commits_count: entry.commits_or_zero(),
            avatar_url: avatar_url(&student.repo, AVATAR_SIZE),
            badges: calculate_badges(student, entry),
        }
    }
}

/// Leaderboard ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LeaderboardSort {
    #[default]
    AvgScore,
    TotalScore,
    CommitsCount,
}

impl LeaderboardSort {
    /// Parse a `sort_by` parameter; unknown values fall back to
    /// [`LeaderboardSort::AvgScore`].
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("total_score") => Self::TotalScore,
            Some("commits_count") => Self::CommitsCount,
            _ => Self::AvgScore,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AvgScore => "avg_score",
            Self::TotalScore => "total_score",
            Self::CommitsCount => "commits_count",
        }
    }

    /// Response cache key for this ordering.
    pub fn cache_key(self) -> String {
        format!("leaderboard_{}", self.as_str())
    }

    /// Sort key; higher ranks first. Average and total order identically.
    fn key(self, row: &LeaderboardRow) -> u64 {
        match self {
            Self::AvgScore | Self::TotalScore => u64::from(row.total_score),
            Self::CommitsCount => row.commits_count,
        }
    }
}

/// One ranked leaderboard row.
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardRow {
    pub rank: usize,
    pub name: String,
    pub repo: String,
    pub scores: Scores,
    pub avg_score: f64,
    pub total_score: u32,
    pub commits_count: u64,
    pub avatar_url: Option<String>,
    pub badges: Vec<Badge>,
}

/// Rank students descending by `sort`. Ties keep roster order.
pub fn rank_students(
    students: &[Student],
    state: &ReconciliationState,
    sort: LeaderboardSort,
) -> Vec<LeaderboardRow> {
    let empty = ReconciliationEntry::default();
    let mut rows: Vec<LeaderboardRow> = students
        .iter()
        .map(|student| {
            let entry = state.get(&student.name).unwrap_or(&empty);
            LeaderboardRow {
                rank: 0,
                name: student.name.clone(),
                repo: student.repo.clone(),
                scores: student.scores,
                avg_score: student.avg_score(),
                total_score: student.total_score(),
                commits_count: entry.commits_or_zero(),
                avatar_url: avatar_url(&student.repo, AVATAR_SIZE),
                badges: calculate_badges(student, entry),
            }
        })
        .collect();

    // sort_by is stable, so equal keys keep roster order.
    rows.sort_by(|a, b| sort.key(b).cmp(&sort.key(a)));
    for (idx, row) in rows.iter_mut().enumerate() {
        row.rank = idx + 1;
    }
    rows
}

/// Student summary embedded in [`StudentDetails`].
#[derive(Debug, Clone, Serialize)]
pub struct DetailStudent {
    pub name: String,
    pub repo: String,
    pub scores: Scores,
    pub avg_score: f64,
    pub commits_count: u64,
    pub last_pushed: Option<String>,
    pub last_viewed: Option<String>,
    pub avatar_url: Option<String>,
    pub badges: Vec<Badge>,
}

/// Commits on one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCommits {
    pub date: String,
    pub count: usize,
}

/// A phase label and its score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseScore {
    pub phase: &'static str,
    pub score: u8,
}

/// Everything the details page shows for one student.
#[derive(Debug, Clone, Serialize)]
pub struct StudentDetails {
    pub ok: bool,
    pub student: DetailStudent,
    pub commits: Vec<CommitSummary>,
    pub commit_frequency: Vec<DailyCommits>,
    pub score_trend: Vec<PhaseScore>,
    pub score_history: Vec<ScoreHistoryEvent>,
    pub remarks: Remark,
}

/// Per-day commit counts for the `FREQUENCY_DAYS` days ending at `today`,
/// oldest first. Dates are UTC; commits with unparseable dates are ignored.
pub fn commit_frequency(commits: &[CommitSummary], today: NaiveDate) -> Vec<DailyCommits> {
    let mut by_day: HashMap<NaiveDate, usize> = HashMap::new();
    for commit in commits {
        if let Some(ts) = parse_timestamp(&commit.date) {
            *by_day.entry(ts.with_timezone(&Utc).date_naive()).or_default() += 1;
        }
    }

    (0..FREQUENCY_DAYS)
        .rev()
        .filter_map(|back| today.checked_sub_days(Days::new(back)))
        .map(|day| DailyCommits {
            date: day.format("%Y-%m-%d").to_string(),
            count: by_day.get(&day).copied().unwrap_or(0),
        })
        .collect()
}

/// Per-phase labelled scores.
pub fn score_trend(scores: &Scores) -> Vec<PhaseScore> {
    PHASE_LABELS
        .iter()
        .zip(scores)
        .map(|(&phase, &score)| PhaseScore { phase, score })
        .collect()
}

/// Header row of the CSV export.
pub fn csv_header() -> Vec<String> {
    let mut header: Vec<String> = ["姓名", "仓库链接", "最后更新时间", "最后查看时间"]
        .iter()
        .map(|s| (*s).to_string())
        .collect();
    header.extend(PHASE_LABELS.iter().map(|s| (*s).to_string()));
    header.push("平均分".to_string());
    header
}

/// Render the roster as CSV with a UTF-8 byte order mark and CRLF line
/// endings.
pub fn render_csv(students: &[Student], state: &ReconciliationState) -> String {
    let mut out = String::from('\u{feff}');
    push_csv_row(&mut out, &csv_header());

    for student in students {
        let entry = state.get(&student.name);
        let mut row = vec![
            student.name.clone(),
            student.repo.clone(),
            entry.and_then(|e| e.last_known_pushed_at.clone()).unwrap_or_default(),
            entry.and_then(|e| e.last_viewed_at.clone()).unwrap_or_default(),
        ];
        row.extend(student.scores.iter().map(u8::to_string));
        row.push(format!("{:.1}", student.avg_score()));
        push_csv_row(&mut out, &row);
    }
    out
}

fn push_csv_row(out: &mut String, fields: &[String]) {
    let line: Vec<String> = fields.iter().map(|f| csv_field(f)).collect();
    out.push_str(&line.join(","));
    out.push_str("\r\n");
}

/// Quote a field when it contains a delimiter, quote or line break.
fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Assembles read-side views from the store, the badge engine and the
/// repository host.
pub struct ViewService {
    store: Arc<JsonStore>,
    host: Arc<dyn RepoHost>,
    cache: ResponseCache,
}

impl ViewService {
    pub fn new(store: Arc<JsonStore>, host: Arc<dyn RepoHost>, cache: ResponseCache) -> Self {
        Self { store, host, cache }
    }

    /// Roster with reconciliation status and badges.
    pub async fn list(&self) -> DomainResult<Vec<StudentRow>> {
        let students = self.store.load_students().await?;
        let state = self.store.load_state().await?;
        let empty = ReconciliationEntry::default();
        Ok(students
            .iter()
            .map(|s| StudentRow::new(s, state.get(&s.name).unwrap_or(&empty)))
            .collect())
    }

    /// Ranked leaderboard, served from the response cache when fresh.
    pub async fn leaderboard(&self, sort: LeaderboardSort) -> DomainResult<Arc<Value>> {
        let key = sort.cache_key();
        if let Some(hit) = self.cache.get(&key).await {
            return Ok(hit);
        }

        let generation = self.cache.generation();
        let students = self.store.load_students().await?;
        let state = self.store.load_state().await?;
        let rows = rank_students(&students, &state, sort);
        let value = serde_json::to_value(&rows)?;
        tracing::debug!(sort = sort.as_str(), rows = rows.len(), "leaderboard rebuilt");
        Ok(self.cache.set_if_fresh(key, value, generation).await)
    }

    /// Full details for one student, including live commit history.
    pub async fn details(&self, name: &str) -> DomainResult<StudentDetails> {
        let student = self
            .store
            .load_students()
            .await?
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| DomainError::StudentNotFound(name.to_string()))?;
        let entry = self
            .store
            .load_state()
            .await?
            .remove(name)
            .unwrap_or_default();
        let remarks = self
            .store
            .load_remarks()
            .await?
            .remove(name)
            .unwrap_or_default();
        let history = self.store.load_score_history().await?;

        let commits = self
            .host
            .fetch_commit_history(&student.repo, DETAIL_COMMIT_LIMIT)
            .await;
        let frequency = commit_frequency(&commits, Utc::now().date_naive());

        Ok(StudentDetails {
            ok: true,
            student: DetailStudent {
                name: student.name.clone(),
                repo: student.repo.clone(),
                scores: student.scores,
                avg_score: student.avg_score(),
                commits_count: entry.commits_or_zero(),
                last_pushed: entry.last_known_pushed_at.clone(),
                last_viewed: entry.last_viewed_at.clone(),
                avatar_url: avatar_url(&student.repo, AVATAR_SIZE),
                badges: calculate_badges(&student, &entry),
            },
            commits,
            commit_frequency: frequency,
            score_trend: score_trend(&student.scores),
            score_history: recent_events(&history, name, DETAIL_HISTORY_LIMIT),
            remarks,
        })
    }

    /// CSV export of the roster.
    pub async fn export_csv(&self) -> DomainResult<String> {
        let students = self.store.load_students().await?;
        let state = self.store.load_state().await?;
        Ok(render_csv(&students, &state))
    }
}
