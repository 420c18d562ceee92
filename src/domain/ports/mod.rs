//! Port trait definitions (Hexagonal Architecture)
//!
//! - RepoHost: remote repository metadata, commit counts and history
//!
//! Adapters in `crate::adapters` implement these so services can be tested
//! against in-memory fakes.

pub mod repo_host;

pub use repo_host::RepoHost;
