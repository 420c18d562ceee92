//! Free-text instructor remarks, independent of scores.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Remarks for every student, keyed by student name.
pub type Remarks = BTreeMap<String, Remark>;

/// An instructor's note about a student.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remark {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Remark {
    /// Build a remark from a loosely-typed request body.
    ///
    /// Text is trimmed; `tags` must be a list (non-string items dropped).
    pub fn from_request(body: &Value, updated_at: String) -> Self {
        let text = body
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string();
        let tags = body
            .get("tags")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default();
        Self {
            text,
            tags,
            updated_at: Some(updated_at),
        }
    }
}
