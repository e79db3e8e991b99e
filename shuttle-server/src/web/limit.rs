//! Per-client rate limiting for the trip endpoint.
//!
//! A fixed-window counter per client key. The limiter is advisory: when it
//! cannot answer, the request is let through.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use moka::future::Cache as MokaCache;
use tracing::warn;

/// Configuration for the rate limiter.
#[derive(Debug, Clone)]
pub struct LimitConfig {
    /// Length of one counting window.
    pub window: Duration,

    /// Requests allowed per client per window.
    pub max_requests: u32,

    /// Maximum number of clients tracked at once.
    pub max_clients: u64,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60),
            max_requests: 30,
            max_clients: 10_000,
        }
    }
}

/// Error from a rate limiter backend.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LimitError {
    #[error("rate limiter unavailable: {0}")]
    Unavailable(String),
}

/// Decides whether a client may make another request.
pub trait RateLimiter: Send + Sync {
    /// Count a request from `client`; `Ok(false)` when over the limit.
    fn check(&self, client: &str) -> impl Future<Output = Result<bool, LimitError>> + Send;
}

/// Fixed-window limiter kept in process.
///
/// Each client's counter is created on its first request and expires one
/// window later, starting a fresh window.
#[derive(Clone)]
pub struct FixedWindowLimiter {
    windows: MokaCache<String, Arc<AtomicU32>>,
    max_requests: u32,
}

impl FixedWindowLimiter {
    pub fn new(config: &LimitConfig) -> Self {
        let windows = MokaCache::builder()
            .time_to_live(config.window)
            .max_capacity(config.max_clients)
            .build();
        Self {
            windows,
            max_requests: config.max_requests,
        }
    }
}

impl Default for FixedWindowLimiter {
    fn default() -> Self {
        Self::new(&LimitConfig::default())
    }
}

impl RateLimiter for FixedWindowLimiter {
    async fn check(&self, client: &str) -> Result<bool, LimitError> {
        let counter = self
            .windows
            .get_with(client.to_string(), async { Arc::new(AtomicU32::new(0)) })
            .await;
        let count = counter.fetch_add(1, Ordering::Relaxed).saturating_add(1);
        Ok(count <= self.max_requests)
    }
}

/// Whether to serve a request from `client`. Limiter failures allow it.
pub async fn allow<L: RateLimiter>(limiter: &L, client: &str) -> bool {
    match limiter.check(client).await {
        Ok(allowed) => allowed,
        Err(err) => {
            warn!(%err, client, "rate limiter failed, allowing request");
            true
        }
    }
}
