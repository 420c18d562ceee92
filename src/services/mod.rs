//! Application services.

pub mod badge_engine;
pub mod import_parser;
pub mod poll_daemon;
pub mod reconciler;
pub mod roster_service;
pub mod views;

pub use badge_engine::calculate_badges;
pub use import_parser::{parse_import_text, ImportEntry};
pub use poll_daemon::{PollDaemon, PollDaemonConfig, PollEvent, PollHandle, PollStatus};
pub use reconciler::{PassReport, Reconciler};
pub use roster_service::{ImportSummary, RosterService, ScoreInput, StudentInput};
pub use views::{LeaderboardSort, ViewService};
