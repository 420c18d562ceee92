//! In-memory caching layer for aggregate views.
//!
//! Uses `moka` for TTL-based concurrent caching with explicit
//! invalidation on writes.

pub mod response_cache;

pub use response_cache::ResponseCache;
