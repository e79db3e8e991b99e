//! Response cache.
//!
//! Serialized responses are kept for a short time so that repeated requests
//! for the same trip or stop list skip the provider round trip. Each entry
//! carries its own TTL: trip answers go stale in seconds, stop lists in
//! minutes.
//!
//! The cache is best-effort. A miss is never an error, and a failed store is
//! silently dropped.

use std::future::Future;
use std::time::{Duration, Instant};

use axum::body::Bytes;
use moka::Expiry;
use moka::future::Cache as MokaCache;
use tracing::trace;

/// Configuration for the response cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for planned trips.
    pub trip_ttl: Duration,

    /// TTL for stop lists and snaps.
    pub stops_ttl: Duration,

    /// Maximum number of cached entries.
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            trip_ttl: Duration::from_secs(10),
            stops_ttl: Duration::from_secs(300),
            max_capacity: 1000,
        }
    }
}

/// Key-value store for serialized responses.
pub trait ResponseCache: Send + Sync {
    fn get(&self, key: &str) -> impl Future<Output = Option<Bytes>> + Send;

    fn set_with_ttl(&self, key: String, value: Bytes, ttl: Duration) -> impl Future<Output = ()> + Send;
}

#[derive(Debug, Clone)]
struct Entry {
    body: Bytes,
    ttl: Duration,
}

struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, value: &Entry, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process response cache.
#[derive(Clone)]
pub struct MokaResponseCache {
    entries: MokaCache<String, Entry>,
}

impl MokaResponseCache {
    /// Create a new cache with the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        let entries = MokaCache::builder()
            .max_capacity(config.max_capacity)
            .expire_after(PerEntryTtl)
            .build();
        Self { entries }
    }

    /// Get cache statistics (for monitoring).
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }
}

impl Default for MokaResponseCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

impl ResponseCache for MokaResponseCache {
    async fn get(&self, key: &str) -> Option<Bytes> {
        let hit = self.entries.get(key).await.map(|e| e.body);
        trace!(key, hit = hit.is_some(), "response cache lookup");
        hit
    }

    async fn set_with_ttl(&self, key: String, value: Bytes, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }
        self.entries.insert(key, Entry { body: value, ttl }).await;
    }
}
