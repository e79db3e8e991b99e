//! Application state for the web layer.

use std::sync::Arc;

use crate::cache::{CacheConfig, MokaResponseCache};
use crate::domain::SystemId;
use crate::planner::Planner;

use super::limit::FixedWindowLimiter;

/// Shared application state.
///
/// Contains all the services needed to handle requests.
pub struct AppState<P, C = MokaResponseCache, L = FixedWindowLimiter> {
    /// Trip planner over the live provider
    pub planner: Arc<Planner<P>>,

    /// Serialized response cache
    pub cache: Arc<C>,

    /// Rate limiter for trip requests
    pub limiter: Arc<L>,

    /// System used when a request names none
    pub default_system: SystemId,

    /// TTLs for cached responses
    pub cache_config: Arc<CacheConfig>,
}

impl<P, C, L> AppState<P, C, L> {
    /// Create a new app state.
    pub fn new(planner: Planner<P>, cache: C, limiter: L, default_system: SystemId, cache_config: CacheConfig) -> Self {
        Self {
            planner: Arc::new(planner),
            cache: Arc::new(cache),
            limiter: Arc::new(limiter),
            default_system,
            cache_config: Arc::new(cache_config),
        }
    }
}

impl<P, C, L> Clone for AppState<P, C, L> {
    fn clone(&self) -> Self {
        Self {
            planner: Arc::clone(&self.planner),
            cache: Arc::clone(&self.cache),
            limiter: Arc::clone(&self.limiter),
            default_system: self.default_system,
            cache_config: Arc::clone(&self.cache_config),
        }
    }
}
