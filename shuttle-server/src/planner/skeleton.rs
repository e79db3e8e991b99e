//! Unenriched trip candidates.
//!
//! A skeleton fixes which routes to ride between which stops, but carries no
//! live data yet. Skeletons are cheap, so many are generated and scored and
//! only the best few are enriched.

use serde::Serialize;

use crate::domain::{LiveRouteId, LiveStopId, SnapshotIndex};

use super::config::PlannerConfig;

/// How a candidate was generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// One route serves both snapped stops.
    Direct,
    /// Found by path search with a change of route.
    OneTransfer,
    /// Boards or alights at a nearby stop other than the snapped one.
    WalkModified,
}

/// One ride on one route.
///
/// Always holds at least a boarding and an alighting stop.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentSkeleton {
    route: LiveRouteId,
    stops: Vec<LiveStopId>,
}

impl SegmentSkeleton {
    pub fn new(route: LiveRouteId, stops: Vec<LiveStopId>) -> Option<Self> {
        (stops.len() >= 2).then_some(Self { route, stops })
    }

    pub fn route(&self) -> &LiveRouteId {
        &self.route
    }

    /// Stops ridden through, boarding first and alighting last.
    pub fn stops(&self) -> &[LiveStopId] {
        &self.stops
    }

    pub fn start(&self) -> &LiveStopId {
        &self.stops[0]
    }

    pub fn end(&self) -> &LiveStopId {
        &self.stops[self.stops.len() - 1]
    }
}

/// A scored candidate trip.
#[derive(Debug, Clone, PartialEq)]
pub struct TripSkeleton {
    segments: Vec<SegmentSkeleton>,
    pub strategy: Strategy,
    /// Walking to the boarding stop plus from the alighting stop (metres).
    pub walk_m: f64,
    pub transfers: usize,
    /// Every segment's route has a vehicle reporting a position.
    pub live: bool,
    /// Lower is better.
    pub score: f64,
}

impl TripSkeleton {
    /// Build and score a skeleton. Returns `None` without segments.
    pub fn new(
        segments: Vec<SegmentSkeleton>,
        strategy: Strategy,
        walk_m: f64,
        index: &SnapshotIndex<'_>,
        config: &PlannerConfig,
    ) -> Option<Self> {
        let live = segments.iter().all(|s| index.has_live_vehicle(&s.route));
        let transfers = segments.len().saturating_sub(1);
        Self::with_score(segments, strategy, walk_m, live, score(live, transfers, walk_m, config))
    }

    /// A skeleton with liveness and score already decided.
    pub(super) fn with_score(
        segments: Vec<SegmentSkeleton>,
        strategy: Strategy,
        walk_m: f64,
        live: bool,
        score: f64,
    ) -> Option<Self> {
        if segments.is_empty() {
            return None;
        }
        Some(Self {
            transfers: segments.len() - 1,
            segments,
            strategy,
            walk_m,
            live,
            score,
        })
    }

    /// Rides in order; never empty.
    pub fn segments(&self) -> &[SegmentSkeleton] {
        &self.segments
    }

    pub fn board(&self) -> &LiveStopId {
        self.segments[0].start()
    }

    pub fn alight(&self) -> &LiveStopId {
        self.segments[self.segments.len() - 1].end()
    }

    pub fn routes(&self) -> Vec<LiveRouteId> {
        self.segments.iter().map(|s| s.route.clone()).collect()
    }

    /// Route and stop sequence identifying this candidate.
    pub fn signature(&self) -> (Vec<LiveRouteId>, Vec<LiveStopId>) {
        let stops = self
            .segments
            .iter()
            .flat_map(|s| s.stops.iter().cloned())
            .collect();
        (self.routes(), stops)
    }
}

/// Heuristic cost of a candidate.
///
/// The missing-vehicle penalty is large enough that any live candidate
/// outranks any dead one with a plausible walk.
pub fn score(live: bool, transfers: usize, walk_m: f64, config: &PlannerConfig) -> f64 {
    let vehicle = if live { 0.0 } else { config.no_vehicle_penalty };
    vehicle + transfers as f64 * config.transfer_penalty + walk_m * config.walk_penalty_per_m
}

/// Order candidates by score, breaking ties deterministically.
pub fn sort_by_score(candidates: &mut [TripSkeleton]) {
    candidates.sort_by(|a, b| {
        a.score
            .total_cmp(&b.score)
            .then_with(|| a.signature().cmp(&b.signature()))
    });
}

/// Keep only the best-scoring candidate per signature.
pub fn dedup_candidates(mut candidates: Vec<TripSkeleton>) -> Vec<TripSkeleton> {
    sort_by_score(&mut candidates);
    let mut seen = std::collections::HashSet::new();
    candidates.retain(|c| seen.insert(c.signature()));
    candidates
}
