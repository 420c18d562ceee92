//! GitHub adapter.
//!
//! Implements [`RepoHost`](crate::domain::ports::RepoHost) on top of the
//! GitHub REST API.

pub mod client;
pub mod models;

pub use client::GitHubClient;
