//! Candidate trip generation.
//!
//! Three families of candidates are produced between the snapped stops:
//! direct rides on a route serving both, paths with a change of route, and
//! trips that start or end at a nearby alternate stop. When the live graph
//! has no path, the schedule feed's graph is searched instead and the
//! result translated back to live ids.

use std::time::Instant;

use tracing::{debug, trace};

use crate::domain::{LiveRouteId, LiveStopId, SnapshotIndex, Stop};
use crate::geo::{LatLng, haversine_m};
use crate::graph::{FeedGraph, LiveGraph};
use crate::reconcile::{CanonicalRoute, Reconciler};

use super::compress::compress_routes;
use super::config::PlannerConfig;
use super::paths::{GraphPath, PathLimits, find_paths};
use super::skeleton::{SegmentSkeleton, Strategy, TripSkeleton, dedup_candidates};

/// Schedule-feed data available for the request's system.
#[derive(Clone, Copy)]
pub struct FeedContext<'a> {
    pub graph: &'a FeedGraph,
    pub reconciler: &'a Reconciler,
}

/// Everything candidate generation reads.
pub struct SearchContext<'a> {
    pub index: &'a SnapshotIndex<'a>,
    pub graph: &'a LiveGraph,
    pub feed: Option<FeedContext<'a>>,
    pub config: &'a PlannerConfig,
    /// Requested origin, before snapping.
    pub origin: LatLng,
    /// Requested destination, before snapping.
    pub destination: LatLng,
}

impl SearchContext<'_> {
    fn limits(&self) -> PathLimits {
        PathLimits {
            max_paths: self.config.max_paths,
            max_transfers: self.config.max_transfers,
            max_depth: self.config.max_depth,
            max_expansions: self.config.max_expansions,
        }
    }

    /// Metres walked from the requested origin to `board` plus from `alight`
    /// to the requested destination.
    fn walk_m(&self, board: &Stop, alight: &Stop) -> f64 {
        haversine_m(self.origin, board.location) + haversine_m(alight.location, self.destination)
    }

    fn canonical(&self, route: &LiveRouteId) -> CanonicalRoute {
        match self.feed {
            Some(feed) => feed.reconciler.canonical_route(route),
            None => CanonicalRoute::Live(route.clone()),
        }
    }

    fn skeleton(&self, segments: Vec<SegmentSkeleton>, strategy: Strategy) -> Option<TripSkeleton> {
        let board = self.index.stop(segments.first()?.start())?;
        let alight = self.index.stop(segments.last()?.end())?;
        let walk_m = self.walk_m(board, alight);
        TripSkeleton::new(segments, strategy, walk_m, self.index, self.config)
    }
}

/// Scored candidates between two snapped stops, best first.
pub fn generate_candidates(
    ctx: &SearchContext<'_>,
    board: &LiveStopId,
    alight: &LiveStopId,
) -> Vec<TripSkeleton> {
    let mut candidates = direct_candidates(ctx, board, alight, Strategy::Direct);

    if candidates.is_empty() {
        candidates = transfer_candidates(ctx, board, alight, Strategy::OneTransfer);
    }
    if candidates.is_empty() {
        candidates = feed_candidates(ctx, board, alight);
    }

    if !candidates.iter().any(|c| c.live && c.transfers == 0) {
        candidates.extend(walk_candidates(ctx, board, alight));
    }

    let candidates = dedup_candidates(candidates);
    debug!(count = candidates.len(), "generated candidates");
    candidates
}

/// Stops ridden on `chain` from `board` to `alight`, wrapping past the end
/// of the chain when `alight` comes first.
fn chain_between(chain: &[LiveStopId], board: &LiveStopId, alight: &LiveStopId) -> Option<Vec<LiveStopId>> {
    let b = chain.iter().position(|s| s == board)?;
    let a = chain.iter().position(|s| s == alight)?;
    if b == a {
        return None;
    }
    let stops = if b < a {
        chain[b..=a].to_vec()
    } else {
        chain[b..].iter().chain(&chain[..=a]).cloned().collect()
    };
    Some(stops)
}

/// One candidate per route serving both stops.
pub fn direct_candidates(
    ctx: &SearchContext<'_>,
    board: &LiveStopId,
    alight: &LiveStopId,
    strategy: Strategy,
) -> Vec<TripSkeleton> {
    let (Some(board_stop), Some(alight_stop)) = (ctx.index.stop(board), ctx.index.stop(alight)) else {
        return Vec::new();
    };
    if board == alight {
        return Vec::new();
    }

    board_stop
        .route_positions
        .keys()
        .filter(|route| alight_stop.serves(route))
        .filter_map(|route| {
            let stops = ctx
                .graph
                .chain(route)
                .and_then(|chain| chain_between(chain, board, alight))
                .unwrap_or_else(|| vec![board.clone(), alight.clone()]);
            let segment = SegmentSkeleton::new(route.clone(), stops)?;
            ctx.skeleton(vec![segment], strategy)
        })
        .collect()
}

/// Candidates from the live graph's path search.
///
/// Paths that stay on one route are labelled direct unless `strategy` says
/// otherwise.
pub fn transfer_candidates(
    ctx: &SearchContext<'_>,
    board: &LiveStopId,
    alight: &LiveStopId,
    strategy: Strategy,
) -> Vec<TripSkeleton> {
    let result = find_paths(ctx.graph, board, alight, &ctx.limits());
    trace!(paths = result.paths.len(), expanded = result.expanded, "live path search");
    result
        .paths
        .iter()
        .filter_map(|path| skeleton_from_path(ctx, path, strategy))
        .collect()
}

fn skeleton_from_path(
    ctx: &SearchContext<'_>,
    path: &GraphPath<LiveStopId, LiveRouteId>,
    strategy: Strategy,
) -> Option<TripSkeleton> {
    let runs = compress_routes(path, |route| ctx.canonical(route));
    let segments: Vec<SegmentSkeleton> = runs
        .into_iter()
        .map(|run| SegmentSkeleton::new(run.route, path.stops[run.start..=run.end].to_vec()))
        .collect::<Option<_>>()?;
    let strategy = match (strategy, segments.len()) {
        (Strategy::OneTransfer, 1) => Strategy::Direct,
        (s, _) => s,
    };
    ctx.skeleton(segments, strategy)
}

/// Search the schedule feed's graph and translate the paths to live ids.
pub fn feed_candidates(ctx: &SearchContext<'_>, board: &LiveStopId, alight: &LiveStopId) -> Vec<TripSkeleton> {
    let Some(feed) = ctx.feed else {
        return Vec::new();
    };
    let (Some(from), Some(to)) = (
        feed.reconciler.live_to_feed(board),
        feed.reconciler.live_to_feed(alight),
    ) else {
        debug!(%board, %alight, "feed fallback skipped, stops not reconciled");
        return Vec::new();
    };

    let result = find_paths(feed.graph, &from.id, &to.id, &ctx.limits());
    debug!(paths = result.paths.len(), "feed fallback search");

    result
        .paths
        .iter()
        .filter_map(|path| {
            let mut segments = Vec::new();
            for run in compress_routes(path, |route| route.clone()) {
                let mut stops: Vec<LiveStopId> = Vec::new();
                for feed_stop in &path.stops[run.start..=run.end] {
                    let live = &feed.reconciler.feed_to_live(feed_stop)?.id;
                    if stops.last() != Some(live) {
                        stops.push(live.clone());
                    }
                }
                // Collapsed onto a single live stop: nothing to ride.
                if stops.len() < 2 {
                    continue;
                }
                let route = live_route_for(ctx, feed.reconciler.live_routes(&run.route), &stops)?;
                segments.push(SegmentSkeleton::new(route, stops)?);
            }
            let strategy = if segments.len() > 1 {
                Strategy::OneTransfer
            } else {
                Strategy::Direct
            };
            ctx.skeleton(segments, strategy)
        })
        .collect()
}

/// Pick the live route for a translated segment, preferring one that
/// serves both of its ends.
fn live_route_for(ctx: &SearchContext<'_>, routes: &[LiveRouteId], stops: &[LiveStopId]) -> Option<LiveRouteId> {
    let serves = |route: &LiveRouteId, stop: Option<&LiveStopId>| {
        stop.and_then(|s| ctx.index.stop(s)).is_some_and(|s| s.serves(route))
    };
    routes
        .iter()
        .find(|r| serves(r, stops.first()) && serves(r, stops.last()))
        .or_else(|| routes.first())
        .cloned()
}

/// Candidates that board or alight at a nearby alternate stop.
///
/// Pairs are tried nearest first until the pair cap or the wall-clock
/// budget runs out. Each pair prefers a direct ride over a transfer.
pub fn walk_candidates(ctx: &SearchContext<'_>, board: &LiveStopId, alight: &LiveStopId) -> Vec<TripSkeleton> {
    let deadline = Instant::now() + ctx.config.walk_budget();
    let config = ctx.config;

    let alternates = |point: LatLng, base: &LiveStopId| -> Vec<LiveStopId> {
        let mut stops: Vec<LiveStopId> = ctx
            .index
            .stops_within(point, config.walk_radius_m, config.max_alternates, base)
            .into_iter()
            .map(|(s, _)| s.id.clone())
            .collect();
        stops.push(base.clone());
        stops
    };
    let boards = alternates(ctx.origin, board);
    let alights = alternates(ctx.destination, alight);

    let mut pairs: Vec<(f64, &LiveStopId, &LiveStopId)> = Vec::new();
    for b in &boards {
        for a in &alights {
            if b == a || (b == board && a == alight) {
                continue;
            }
            if let (Some(bs), Some(as_)) = (ctx.index.stop(b), ctx.index.stop(a)) {
                pairs.push((ctx.walk_m(bs, as_), b, a));
            }
        }
    }
    pairs.sort_by(|x, y| x.0.total_cmp(&y.0).then_with(|| (x.1, x.2).cmp(&(y.1, y.2))));
    pairs.truncate(config.max_walk_pairs);

    let mut candidates = Vec::new();
    for (tried, (_, b, a)) in pairs.into_iter().enumerate() {
        if Instant::now() >= deadline {
            debug!(tried, "walk search budget exhausted");
            break;
        }
        let direct = direct_candidates(ctx, b, a, Strategy::WalkModified);
        if direct.is_empty() {
            candidates.extend(transfer_candidates(ctx, b, a, Strategy::WalkModified));
        } else {
            candidates.extend(direct);
        }
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LiveSnapshot, Route, Vehicle, VehicleId};
    use crate::geo::offset_m;
    use crate::graph::build_live_graph;
    use std::time::Duration;

    fn origin() -> LatLng {
        LatLng::new(42.3736, -71.1190)
    }

    fn id(s: &str) -> LiveStopId {
        LiveStopId::new(s)
    }

    fn vehicle(route: &str) -> Vehicle {
        Vehicle {
            id: VehicleId::new(format!("v-{route}")),
            location: Some(origin()),
            routes: [LiveRouteId::new(route)].into_iter().collect(),
            heading: None,
        }
    }

    /// R1 loops A -> B -> C. R2 runs C -> D. E sits 50 m from D on R3 with
    /// A; R3 has no vehicle.
    fn snapshot() -> LiveSnapshot {
        let o = origin();
        LiveSnapshot {
            stops: vec![
                Stop::new("A", "Alpha", o).on_route("R1", 0).on_route("R3", 0),
                Stop::new("B", "Bravo", offset_m(o, 300.0, 0.0)).on_route("R1", 1),
                Stop::new("C", "Charlie", offset_m(o, 300.0, 300.0))
                    .on_route("R1", 2)
                    .on_route("R2", 0),
                Stop::new("D", "Delta", offset_m(o, 1000.0, 1000.0)).on_route("R2", 1),
                Stop::new("E", "Echo", offset_m(o, 1000.0, 1050.0)).on_route("R3", 1),
            ],
            routes: vec![
                Route::new("R1", "Loop"),
                Route::new("R2", "Spur"),
                Route::new("R3", "Express"),
            ],
            vehicles: vec![vehicle("R1"), vehicle("R2")],
        }
    }

    fn context<'a>(
        index: &'a SnapshotIndex<'a>,
        graph: &'a LiveGraph,
        config: &'a PlannerConfig,
        from: LatLng,
        to: LatLng,
    ) -> SearchContext<'a> {
        SearchContext {
            index,
            graph,
            feed: None,
            config,
            origin: from,
            destination: to,
        }
    }

    #[test]
    fn chain_between_wraps() {
        let chain = vec![id("A"), id("B"), id("C")];
        assert_eq!(chain_between(&chain, &id("A"), &id("C")), Some(chain.clone()));
        assert_eq!(chain_between(&chain, &id("C"), &id("B")), Some(vec![id("C"), id("A"), id("B")]));
        assert_eq!(chain_between(&chain, &id("A"), &id("A")), None);
        assert_eq!(chain_between(&chain, &id("A"), &id("Z")), None);
    }

    #[test]
    fn direct_follows_chain() {
        let snap = snapshot();
        let index = SnapshotIndex::new(&snap);
        let graph = build_live_graph(&snap.stops);
        let config = PlannerConfig::default();
        let ctx = context(&index, &graph, &config, origin(), snap.stops[1].location);

        let direct = direct_candidates(&ctx, &id("C"), &id("B"), Strategy::Direct);
        assert_eq!(direct.len(), 1);
        assert_eq!(direct[0].segments()[0].stops().to_vec(), vec![id("C"), id("A"), id("B")]);
        assert!(direct[0].live);
    }

    #[test]
    fn transfer_when_no_direct() {
        let snap = snapshot();
        let index = SnapshotIndex::new(&snap);
        let graph = build_live_graph(&snap.stops);
        let config = PlannerConfig::default().with_walk_budget(Duration::ZERO);
        let ctx = context(&index, &graph, &config, snap.stops[1].location, snap.stops[3].location);

        let candidates = generate_candidates(&ctx, &id("B"), &id("D"));
        assert!(!candidates.is_empty());
        let best = &candidates[0];
        assert_eq!(best.strategy, Strategy::OneTransfer);
        assert_eq!(best.transfers, 1);
        assert_eq!(best.routes(), vec![LiveRouteId::new("R1"), LiveRouteId::new("R2")]);
        assert_eq!(best.segments()[0].stops().to_vec(), vec![id("B"), id("C")]);
        assert_eq!(best.segments()[1].stops().to_vec(), vec![id("C"), id("D")]);
    }

    #[test]
    fn dead_direct_triggers_walk_search() {
        let snap = snapshot();
        let index = SnapshotIndex::new(&snap);
        let graph = build_live_graph(&snap.stops);
        let config = PlannerConfig::default();
        // Heading for E, which only the dead R3 serves; D is 50 m away.
        let ctx = context(&index, &graph, &config, origin(), snap.stops[4].location);

        let candidates = generate_candidates(&ctx, &id("A"), &id("E"));
        let direct = candidates
            .iter()
            .find(|c| c.strategy == Strategy::Direct)
            .unwrap();
        assert!(!direct.live);
        let walk = candidates
            .iter()
            .find(|c| c.strategy == Strategy::WalkModified)
            .unwrap();
        assert_eq!(walk.alight(), &id("D"));
        assert!(walk.live);
        assert!(walk.score < direct.score);
        assert_eq!(candidates[0].strategy, Strategy::WalkModified);
    }

    #[test]
    fn walk_budget_zero_skips_alternates() {
        let snap = snapshot();
        let index = SnapshotIndex::new(&snap);
        let graph = build_live_graph(&snap.stops);
        let config = PlannerConfig::default().with_walk_budget(Duration::ZERO);
        let ctx = context(&index, &graph, &config, origin(), snap.stops[4].location);

        let candidates = generate_candidates(&ctx, &id("A"), &id("E"));
        assert!(candidates.iter().all(|c| c.strategy != Strategy::WalkModified));
    }

    #[test]
    fn live_direct_skips_walk_search() {
        let snap = snapshot();
        let index = SnapshotIndex::new(&snap);
        let graph = build_live_graph(&snap.stops);
        let config = PlannerConfig::default();
        let ctx = context(&index, &graph, &config, origin(), snap.stops[1].location);

        let candidates = generate_candidates(&ctx, &id("A"), &id("B"));
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].strategy, Strategy::Direct);
    }

    #[test]
    fn stranded_stop_only_reached_by_walking() {
        let snap = snapshot();
        let index = SnapshotIndex::new(&snap);
        let graph = build_live_graph(&snap.stops);
        let config = PlannerConfig::default();
        let ctx = context(&index, &graph, &config, snap.stops[3].location, origin());

        // Nothing leaves D; E is 50 m away and R3 runs E -> A round the loop.
        let candidates = generate_candidates(&ctx, &id("D"), &id("A"));
        assert!(!candidates.is_empty());
        assert!(candidates.iter().all(|c| c.board() != &id("D")));
        assert!(candidates.iter().all(|c| c.strategy == Strategy::WalkModified));
    }
}
