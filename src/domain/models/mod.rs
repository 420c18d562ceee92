//! Domain models.

pub mod badge;
pub mod config;
pub mod lenient;
pub mod reconciliation;
pub mod remark;
pub mod repo_activity;
pub mod repo_ref;
pub mod score_history;
pub mod settings;
pub mod student;

pub use badge::{Badge, BadgeLevel};
pub use config::{
    CacheConfig, Config, GitHubConfig, LoggingConfig, PollerConfig, ServerConfig, StorageConfig,
};
pub use reconciliation::{ReconciliationEntry, ReconciliationState};
pub use remark::{Remark, Remarks};
pub use repo_activity::{CommitCount, CommitSummary, RepoInfo};
pub use repo_ref::{avatar_url, RepoRef};
pub use score_history::{ScoreHistory, ScoreHistoryEvent, MAX_HISTORY_PER_STUDENT};
pub use settings::Settings;
pub use student::{clamp_score, Scores, Student, PHASE_COUNT, PHASE_LABELS};
