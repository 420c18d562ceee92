//! Infrastructure adapters for external systems.

pub mod cache;
pub mod github;
pub mod http;
pub mod json_store;
