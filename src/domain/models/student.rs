//! Student domain model and score normalization.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::lenient::coerce_int;

/// Number of graded homework phases.
pub const PHASE_COUNT: usize = 5;

/// Display labels for the phases, in order.
pub const PHASE_LABELS: [&str; PHASE_COUNT] = ["第一阶段", "第二阶段", "第三阶段", "第四阶段", "第五阶段"];

/// Upper bound of a phase score.
pub const MAX_SCORE: u8 = 100;

/// Per-phase scores, always exactly [`PHASE_COUNT`] values in `0..=100`.
pub type Scores = [u8; PHASE_COUNT];

/// A tracked student.
///
/// `name` is the identity key; `repo` is the homework repository URL.
/// Keys the tracker does not know about are kept in `extra` and written back
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub name: String,
    pub repo: String,
    #[serde(default)]
    pub scores: Scores,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Student {
    /// Create a student with all phases at zero.
    pub fn new(name: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            repo: repo.into(),
            scores: [0; PHASE_COUNT],
            extra: Map::new(),
        }
    }

    /// Builder-style score assignment.
    pub fn with_scores(mut self, scores: Scores) -> Self {
        self.scores = scores;
        self
    }

    /// Sum of all phase scores.
    pub fn total_score(&self) -> u32 {
        total_score(&self.scores)
    }

    /// Mean over all five phases (ungraded phases count as zero).
    pub fn avg_score(&self) -> f64 {
        avg_score(&self.scores)
    }

    /// Whether the reconciler should poll this student at all.
    pub fn is_trackable(&self) -> bool {
        !self.name.is_empty() && !self.repo.is_empty()
    }

    /// Normalize a raw persisted record.
    ///
    /// Returns the normalized student and whether the persisted form must be
    /// rewritten. Non-object records yield `None`. Legacy single-`score`
    /// records and malformed `scores` fields become five zeros.
    pub fn from_raw(raw: &Value) -> Option<(Self, bool)> {
        let obj = raw.as_object()?;

        let name = obj.get("name").and_then(Value::as_str).unwrap_or_default();
        let repo = obj.get("repo").and_then(Value::as_str).unwrap_or_default();
        let scores = obj.get("scores").map_or([0; PHASE_COUNT], scores_from_value);

        let mut student = Self::new(name, repo).with_scores(scores);
        student.extra = obj
            .iter()
            .filter(|(key, _)| !matches!(key.as_str(), "name" | "repo" | "scores" | "score"))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        let changed = serde_json::to_value(&student).map_or(true, |normalized| normalized != *raw);
        Some((student, changed))
    }
}

/// Clamp an integer into the valid score range.
pub fn clamp_score_int(value: i64) -> u8 {
    // The clamp guarantees the value fits in a u8.
    u8::try_from(value.clamp(0, i64::from(MAX_SCORE))).unwrap_or(0)
}

/// Clamp an arbitrary JSON value into the valid score range.
///
/// Non-numeric input maps to 0.
pub fn clamp_score(value: &Value) -> u8 {
    coerce_int(value).map_or(0, clamp_score_int)
}

/// Interpret a JSON value as a full score array.
///
/// Anything other than a list of exactly five entries becomes all zeros;
/// otherwise each entry is clamped individually.
pub fn scores_from_value(value: &Value) -> Scores {
    let mut scores = [0; PHASE_COUNT];
    if let Some(items) = value.as_array().filter(|items| items.len() == PHASE_COUNT) {
        for (slot, item) in scores.iter_mut().zip(items) {
            *slot = clamp_score(item);
        }
    }
    scores
}

/// Sum of a score array.
pub fn total_score(scores: &Scores) -> u32 {
    scores.iter().map(|&s| u32::from(s)).sum()
}

/// Mean of a score array over all phases.
pub fn avg_score(scores: &Scores) -> f64 {
    f64::from(total_score(scores)) / PHASE_COUNT as f64
}
