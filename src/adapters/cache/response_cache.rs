//! Short-lived cache for aggregate API views.
//!
//! Entries are JSON documents keyed by view name (for example
//! `leaderboard_avg_score`). Every roster mutation calls
//! [`ResponseCache::invalidate_all`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde_json::Value;

use crate::domain::models::CacheConfig;

/// Default TTL for cached views.
pub const DEFAULT_TTL_SECS: u64 = 60;

/// Maximum number of cached views.
const MAX_CAPACITY: u64 = 64;

/// Thread-safe TTL cache of rendered views.
///
/// Cloning is cheap and shares the underlying storage.
#[derive(Clone)]
pub struct ResponseCache {
    entries: Cache<String, Arc<Value>>,
    /// Bumped by every [`ResponseCache::invalidate_all`].
    generation: Arc<AtomicU64>,
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("entries", &self.entries.entry_count())
            .field("generation", &self.generation())
            .finish()
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseCache {
    /// Create a cache with the default TTL.
    pub fn new() -> Self {
        Self::with_ttl(Duration::from_secs(DEFAULT_TTL_SECS))
    }

    /// Create a cache from configuration.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::with_ttl(Duration::from_secs(config.ttl_secs))
    }

    /// Create with custom TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        let entries = Cache::builder()
            .max_capacity(MAX_CAPACITY)
            .time_to_live(ttl)
            .build();
        Self {
            entries,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Cached value, if present and younger than the TTL.
    pub async fn get(&self, key: &str) -> Option<Arc<Value>> {
        let hit = self.entries.get(key).await;
        tracing::trace!(key, hit = hit.is_some(), "response cache lookup");
        hit
    }

    /// Store a value, replacing any previous one.
    pub async fn set(&self, key: impl Into<String>, value: Value) -> Arc<Value> {
        let value = Arc::new(value);
        self.entries.insert(key.into(), value.clone()).await;
        value
    }

    /// Current invalidation generation.
    ///
    /// Read it before computing a view and hand it to
    /// [`ResponseCache::set_if_fresh`].
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Store a view computed at `generation` unless an invalidation happened
    /// since. The value is returned either way.
    pub async fn set_if_fresh(&self, key: impl Into<String>, value: Value, generation: u64) -> Arc<Value> {
        let key = key.into();
        let value = self.set(key.clone(), value).await;
        if self.generation() != generation {
            tracing::debug!(key, "discarding view computed before invalidation");
            self.entries.invalidate(&key).await;
        }
        value
    }

    /// Drop every cached view.
    pub fn invalidate_all(&self) {
        tracing::debug!("response cache invalidated");
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.entries.invalidate_all();
    }
}
