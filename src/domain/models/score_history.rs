//! Audit trail of phase score changes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Maximum number of retained events per student.
pub const MAX_HISTORY_PER_STUDENT: usize = 100;

/// Score history for every student, keyed by student name.
pub type ScoreHistory = BTreeMap<String, Vec<ScoreHistoryEvent>>;

/// One recorded change of a phase score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreHistoryEvent {
    pub timestamp: String,
    pub phase: usize,
    pub old_score: u8,
    pub new_score: u8,
}

/// Append an event, evicting the oldest beyond [`MAX_HISTORY_PER_STUDENT`].
pub fn record_event(history: &mut ScoreHistory, name: &str, event: ScoreHistoryEvent) {
    let events = history.entry(name.to_string()).or_default();
    events.push(event);
    if events.len() > MAX_HISTORY_PER_STUDENT {
        let excess = events.len() - MAX_HISTORY_PER_STUDENT;
        events.drain(..excess);
    }
}

/// The most recent `limit` events for a student, oldest first.
pub fn recent_events(history: &ScoreHistory, name: &str, limit: usize) -> Vec<ScoreHistoryEvent> {
    history
        .get(name)
        .map(|events| events[events.len().saturating_sub(limit)..].to_vec())
        .unwrap_or_default()
}
