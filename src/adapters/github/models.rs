//! GitHub REST API response models.
//!
//! These structs map to the GitHub REST API v3 JSON payloads. They are
//! internal to the adapter; callers only see the domain types.

use serde::Deserialize;

use crate::domain::models::CommitSummary;

/// Length of an abbreviated commit hash.
const SHORT_SHA_LEN: usize = 7;

/// An item of the `GET /repos/{owner}/{repo}/commits` list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitHubCommit {
    #[serde(default)]
    pub sha: String,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub commit: GitHubCommitDetail,
}

/// The git-level part of a commit.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitHubCommitDetail {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub author: Option<GitHubCommitAuthor>,
}

/// Git author signature (not the GitHub account).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitHubCommitAuthor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

impl From<GitHubCommit> for CommitSummary {
    fn from(c: GitHubCommit) -> Self {
        let author = c.commit.author.unwrap_or_default();
        Self {
            sha: c.sha.chars().take(SHORT_SHA_LEN).collect(),
            message: c.commit.message.unwrap_or_else(|| "No message".to_string()),
            author: author.name.unwrap_or_else(|| "Unknown".to_string()),
            date: author.date.unwrap_or_default(),
            url: c.html_url.unwrap_or_default(),
        }
    }
}

/// Extract the page number of the `rel="last"` link from a `Link` header.
///
/// With `per_page=1` this number equals the total item count.
pub fn last_page_from_link_header(header: &str) -> Option<u64> {
    header
        .split(',')
        .find(|part| part.contains(r#"rel="last""#))
        .and_then(|part| {
            let start = part.find('<')? + 1;
            let end = part[start..].find('>')? + start;
            let url = &part[start..end];
            let (_, query) = url.split_once('?')?;
            query
                .split('&')
                .filter_map(|pair| pair.split_once('='))
                .find(|(key, _)| *key == "page")
                .and_then(|(_, value)| value.parse().ok())
        })
}
