//! Per-system caches for graphs and reconciliation tables.
//!
//! Topology changes rarely, so each system's graph is built on first use and
//! kept until evicted. Concurrent requests for a cold system share a single
//! build.

use std::sync::Arc;

use moka::future::Cache as MokaCache;

use crate::domain::{LiveSnapshot, SystemId};
use crate::gtfs::GtfsFeed;
use crate::reconcile::Reconciler;

use super::{FeedGraph, LiveGraph, build_feed_graph, build_live_graph};

/// Configuration for the graph cache.
#[derive(Debug, Clone)]
pub struct GraphCacheConfig {
    /// Maximum number of systems kept per cache.
    pub max_systems: u64,
}

impl Default for GraphCacheConfig {
    fn default() -> Self {
        Self { max_systems: 64 }
    }
}

/// Graphs and reconcilers keyed by system.
#[derive(Clone)]
pub struct GraphCache {
    live: MokaCache<SystemId, Arc<LiveGraph>>,
    feed: MokaCache<SystemId, Arc<FeedGraph>>,
    reconcilers: MokaCache<SystemId, Arc<Reconciler>>,
}

impl GraphCache {
    pub fn new(config: &GraphCacheConfig) -> Self {
        Self {
            live: MokaCache::builder().max_capacity(config.max_systems).build(),
            feed: MokaCache::builder().max_capacity(config.max_systems).build(),
            reconcilers: MokaCache::builder().max_capacity(config.max_systems).build(),
        }
    }

    /// The live graph for `system`, built from `snapshot` if not cached.
    pub async fn live_graph(&self, system: SystemId, snapshot: &LiveSnapshot) -> Arc<LiveGraph> {
        self.live
            .get_with(system, async { Arc::new(build_live_graph(&snapshot.stops)) })
            .await
    }

    /// The feed graph for `system`, built from `feed` if not cached.
    pub async fn feed_graph(&self, system: SystemId, feed: &GtfsFeed) -> Arc<FeedGraph> {
        self.feed
            .get_with(system, async { Arc::new(build_feed_graph(feed)) })
            .await
    }

    /// The reconciler for `system`, built from `snapshot` and `feed` if not
    /// cached.
    pub async fn reconciler(
        &self,
        system: SystemId,
        snapshot: &LiveSnapshot,
        feed: &GtfsFeed,
    ) -> Arc<Reconciler> {
        self.reconcilers
            .get_with(system, async { Arc::new(Reconciler::build(snapshot, feed)) })
            .await
    }

    /// Drop everything cached for `system`.
    pub async fn invalidate(&self, system: SystemId) {
        self.live.invalidate(&system).await;
        self.feed.invalidate(&system).await;
        self.reconcilers.invalidate(&system).await;
    }
}

impl Default for GraphCache {
    fn default() -> Self {
        Self::new(&GraphCacheConfig::default())
    }
}
