//! Repository references parsed out of free-form repository URLs.

use std::fmt;

/// Owner and name of a hosted repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    /// Parse `owner/name` from a repository URL.
    ///
    /// The owner and name are the first two non-empty path segments; a
    /// trailing `.git` is stripped. Inputs without a scheme are treated as
    /// bare paths. Returns `None` when fewer than two segments exist.
    pub fn parse(repo_url: &str) -> Option<Self> {
        let path = url_path(repo_url.trim());
        let path = path.trim_end_matches('/');
        let path = path.strip_suffix(".git").unwrap_or(path);

        let mut segments = path.split('/').filter(|s| !s.is_empty());
        let owner = segments.next()?;
        let name = segments.next()?;
        Some(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    /// Owner of a repository URL, if one can be parsed.
    pub fn owner_of(repo_url: &str) -> Option<String> {
        Self::parse(repo_url).map(|r| r.owner)
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Avatar image for the owner of `repo_url`.
pub fn avatar_url(repo_url: &str, size: u32) -> Option<String> {
    RepoRef::owner_of(repo_url).map(|owner| format!("https://github.com/{owner}.png?size={size}"))
}

/// Path component of a URL, without query or fragment.
fn url_path(url: &str) -> &str {
    let without_fragment = url.split('#').next().unwrap_or_default();
    let without_query = without_fragment.split('?').next().unwrap_or_default();
    match without_query.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("", |idx| &rest[idx..]),
        None => without_query,
    }
}
