//! The trip planner.
//!
//! Answers: "which shuttle(s) should I take from here to there, and when is
//! the next one?" Each request fetches a fresh live snapshot; graphs and
//! reconciliation tables come from the per-system cache.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::domain::{LiveSnapshot, SnapshotIndex, SystemId, TransitSystem};
use crate::eta::EtaEstimator;
use crate::geo::LatLng;
use crate::graph::GraphCache;
use crate::gtfs::GtfsFeed;
use crate::passio::{LiveProvider, fetch_snapshot};

use super::candidates::{FeedContext, SearchContext, generate_candidates};
use super::compress::merge_display;
use super::config::PlannerConfig;
use super::enrich::{Enricher, ShapeSource};
use super::error::{Endpoint, PlanError};
use super::geometry::GeometryMemo;
use super::rank::rank_trips;
use super::types::{CandidateSummary, Snap, StopRef, Trip, TripRequest};

/// A schedule feed and the live system it describes.
#[derive(Debug, Clone)]
pub struct FeedSource {
    pub system: SystemId,
    pub feed: Arc<GtfsFeed>,
}

/// Plans trips against a live provider.
pub struct Planner<P> {
    provider: Arc<P>,
    graphs: GraphCache,
    estimator: EtaEstimator,
    geometry: Arc<GeometryMemo>,
    feed: Option<FeedSource>,
    config: PlannerConfig,
}

impl<P: LiveProvider> Planner<P> {
    pub fn new(provider: Arc<P>, config: PlannerConfig) -> Self {
        Self {
            provider,
            graphs: GraphCache::default(),
            estimator: EtaEstimator::default(),
            geometry: Arc::new(GeometryMemo::default()),
            feed: None,
            config,
        }
    }

    /// Use a schedule feed for `system`: shapes for polylines, and a second
    /// graph to search when the live graph finds nothing.
    pub fn with_feed(mut self, system: SystemId, feed: Arc<GtfsFeed>) -> Self {
        self.feed = Some(FeedSource { system, feed });
        self
    }

    pub fn with_estimator(mut self, estimator: EtaEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    pub fn graphs(&self) -> &GraphCache {
        &self.graphs
    }

    /// Fetch the current stops, routes, and vehicles of `system`.
    pub async fn snapshot(&self, system: SystemId) -> Result<LiveSnapshot, PlanError> {
        Ok(fetch_snapshot(self.provider.as_ref(), system).await?)
    }

    /// Every system the provider serves, by case-insensitive name.
    pub async fn systems(&self) -> Result<Vec<TransitSystem>, PlanError> {
        let mut systems = self.provider.list_systems().await?;
        systems.sort_by_cached_key(|s| (s.name.to_lowercase(), s.id));
        Ok(systems)
    }

    /// Snap a point to its nearest stop.
    fn snap(&self, index: &SnapshotIndex<'_>, point: LatLng, endpoint: Endpoint) -> Result<Snap, PlanError> {
        let (stop, distance_m) = index
            .nearest_stop(point)
            .ok_or(PlanError::NoStopFound(endpoint))?;
        if let Some(max) = self.config.max_snap_distance_m.filter(|max| distance_m > *max) {
            debug!(%endpoint, distance_m, max, "nearest stop beyond snap limit");
            return Err(PlanError::NoStopFound(endpoint));
        }
        Ok(Snap {
            location: point,
            nearest_stop: StopRef::from(stop),
            distance_m,
        })
    }

    /// Snap both ends of a trip without planning it.
    pub async fn match_stops(
        &self,
        system: SystemId,
        origin: LatLng,
        destination: LatLng,
    ) -> Result<(Snap, Snap), PlanError> {
        let snapshot = self.snapshot(system).await?;
        let index = SnapshotIndex::new(&snapshot);
        Ok((
            self.snap(&index, origin, Endpoint::Origin)?,
            self.snap(&index, destination, Endpoint::Destination)?,
        ))
    }

    /// Plan a trip using the current time for vehicle history.
    pub async fn plan_trip(&self, request: TripRequest) -> Result<Trip, PlanError> {
        self.plan_trip_at(request, Utc::now()).await
    }

    /// Plan a trip, recording vehicle positions as seen at `now`.
    pub async fn plan_trip_at(&self, request: TripRequest, now: DateTime<Utc>) -> Result<Trip, PlanError> {
        let system = request.system;
        let snapshot = self.snapshot(system).await?;
        let index = SnapshotIndex::new(&snapshot);

        let origin = self.snap(&index, request.origin, Endpoint::Origin)?;
        let destination = self.snap(&index, request.destination, Endpoint::Destination)?;
        let board = origin.nearest_stop.id.clone();
        let alight = destination.nearest_stop.id.clone();

        if board == alight {
            debug!(stop = %board, "origin and destination share a stop");
            return Ok(Trip {
                system_id: system,
                walk_m: origin.distance_m + destination.distance_m,
                origin,
                destination,
                strategy: None,
                live: false,
                transfers: 0,
                segments: Vec::new(),
                candidates: request.debug.then(Vec::new),
            });
        }

        let graph = self.graphs.live_graph(system, &snapshot).await;
        let feed = match &self.feed {
            Some(source) if source.system == system => {
                let feed_graph = self.graphs.feed_graph(system, &source.feed).await;
                let reconciler = self.graphs.reconciler(system, &snapshot, &source.feed).await;
                Some((source.feed.as_ref(), feed_graph, reconciler))
            }
            _ => None,
        };

        let ctx = SearchContext {
            index: &index,
            graph: &graph,
            feed: feed.as_ref().map(|(_, graph, reconciler)| FeedContext {
                graph: graph.as_ref(),
                reconciler: reconciler.as_ref(),
            }),
            config: &self.config,
            origin: request.origin,
            destination: request.destination,
        };
        let candidates = generate_candidates(&ctx, &board, &alight);
        if candidates.is_empty() {
            return Err(PlanError::NoPathFound {
                from: board,
                to: alight,
            });
        }

        let shapes = feed.as_ref().map(|(feed, _, reconciler)| ShapeSource {
            feed: *feed,
            reconciler: reconciler.as_ref(),
        });
        let mut enricher = Enricher::new(
            system,
            &index,
            &graph,
            &self.estimator,
            &self.geometry,
            shapes,
            now,
        );

        let top = &candidates[..candidates.len().min(self.config.enrich_top_k)];
        let mut enriched = Vec::with_capacity(top.len());
        for skeleton in top {
            match enricher.enrich(skeleton) {
                Ok(trip) => enriched.push(trip),
                Err(err) => warn!(%err, strategy = ?skeleton.strategy, "dropping candidate"),
            }
        }

        let Some(best) = rank_trips(enriched).into_iter().next() else {
            return Err(PlanError::EnrichmentFailed {
                candidates: top.len(),
            });
        };

        info!(
            %system,
            %board,
            %alight,
            candidates = candidates.len(),
            strategy = ?best.skeleton.strategy,
            transfers = best.skeleton.transfers,
            live = best.skeleton.live,
            "planned trip"
        );

        Ok(Trip {
            system_id: system,
            origin,
            destination,
            strategy: Some(best.skeleton.strategy),
            live: best.skeleton.live,
            transfers: best.skeleton.transfers,
            walk_m: best.skeleton.walk_m,
            segments: merge_display(best.segments),
            candidates: request
                .debug
                .then(|| candidates.iter().map(CandidateSummary::from).collect()),
        })
    }
}

#[cfg(test)]
#[path = "trip_tests.rs"]
mod tests;
