//! Parsing of bulk student imports.
//!
//! Two sources are accepted: a structured `students` list of
//! `{name, repo}` objects and free text with one student per line.

use serde_json::Value;

use crate::domain::models::RepoRef;

/// One candidate student from an import. Either field may be empty, in
/// which case the entry is counted as skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportEntry {
    pub name: String,
    pub repo: String,
}

impl ImportEntry {
    fn new(name: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            repo: repo.into(),
        }
    }

    /// Whether both name and repo are present.
    pub fn is_complete(&self) -> bool {
        !self.name.is_empty() && !self.repo.is_empty()
    }
}

/// Parse free-text import lines.
///
/// Accepted per line, in order of precedence:
/// `name,repo`, `name<TAB>repo`, `name repo` (extra words ignored) and a
/// bare `repo`, whose name defaults to the repository owner. Blank lines
/// are ignored.
pub fn parse_import_text(text: &str) -> Vec<ImportEntry> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(parse_line)
        .collect()
}

fn parse_line(line: &str) -> ImportEntry {
    if let Some((name, repo)) = line.split_once(',').or_else(|| line.split_once('\t')) {
        let (name, repo) = (name.trim(), repo.trim());
        return if name.is_empty() {
            bare_repo(repo)
        } else {
            ImportEntry::new(name, repo)
        };
    }

    let mut words = line.split_whitespace();
    let first = words.next().unwrap_or_default();
    match words.next() {
        Some(repo) => ImportEntry::new(first, repo),
        None => bare_repo(first),
    }
}

/// Entry for a repo given without a name: the owner, or the repo itself.
fn bare_repo(repo: &str) -> ImportEntry {
    let name = RepoRef::owner_of(repo).unwrap_or_else(|| repo.to_string());
    ImportEntry::new(name, repo)
}

/// Collect import entries from a request body.
///
/// Structured entries come first (non-object items and items missing a
/// field are dropped), followed by the parsed `text` lines.
pub fn entries_from_request(body: &Value) -> Vec<ImportEntry> {
    let mut entries: Vec<ImportEntry> = body
        .get("students")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let name = item.get("name").and_then(Value::as_str)?.trim();
                    let repo = item.get("repo").and_then(Value::as_str)?.trim();
                    let entry = ImportEntry::new(name, repo);
                    entry.is_complete().then_some(entry)
                })
                .collect()
        })
        .unwrap_or_default();

    if let Some(text) = body.get("text").and_then(Value::as_str) {
        entries.extend(parse_import_text(text));
    }
    entries
}
