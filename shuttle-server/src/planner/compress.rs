//! Turning stop-level paths into ride segments.
//!
//! A path from the search changes route only at the stops where the rider
//! changes bus. Compression groups consecutive edges on the same route into
//! one segment; the display merge then joins segments a rider would
//! experience as one ride.

use super::paths::GraphPath;
use super::types::RideSegment;

/// A run of consecutive edges on one route.
///
/// `start` and `end` index into the path's stops; the run rides from
/// `stops[start]` to `stops[end]`.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRun<R> {
    pub route: R,
    pub start: usize,
    pub end: usize,
}

/// Group a path's edges into runs of the same canonical route.
///
/// `canonical` maps each edge's route to the identity used for grouping, so
/// two routes known to be the same line do not count as a transfer. Each
/// run keeps the route of its first edge. A path without edges yields no
/// runs.
pub fn compress_routes<S, R, C>(path: &GraphPath<S, R>, canonical: impl Fn(&R) -> C) -> Vec<RouteRun<R>>
where
    R: Clone,
    C: PartialEq,
{
    let mut runs: Vec<RouteRun<R>> = Vec::new();
    let mut current: Option<C> = None;

    for (i, route) in path.routes.iter().enumerate() {
        let key = canonical(route);
        match (runs.last_mut(), &current) {
            (Some(run), Some(prev)) if *prev == key => run.end = i + 1,
            _ => runs.push(RouteRun {
                route: route.clone(),
                start: i,
                end: i + 1,
            }),
        }
        current = Some(key);
    }

    runs
}

/// Whether a rider would see `next` as a continuation of `prev`.
fn continues(prev: &RideSegment, next: &RideSegment) -> bool {
    let same_name = match (&prev.route.name, &next.route.name) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    };
    let same_short = match (&prev.route.short_name, &next.route.short_name) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    };
    let joined = match (prev.end_stop(), next.start_stop()) {
        (Some(a), Some(b)) => a.id == b.id,
        _ => false,
    };
    same_name && same_short && joined
}

/// Merge adjacent segments that show as the same line.
///
/// The merged segment keeps its first part's route and next-bus estimate.
/// Stops are joined without repeating the boundary stop; polylines are
/// joined only when both parts have one.
pub fn merge_display(segments: Vec<RideSegment>) -> Vec<RideSegment> {
    let mut merged: Vec<RideSegment> = Vec::with_capacity(segments.len());

    for segment in segments {
        match merged.last_mut() {
            Some(prev) if continues(prev, &segment) => {
                prev.stops.extend(segment.stops.into_iter().skip(1));
                prev.polyline = match (prev.polyline.take(), segment.polyline) {
                    (Some(mut a), Some(b)) => {
                        let skip = usize::from(a.last() == b.first());
                        a.extend(b.into_iter().skip(skip));
                        Some(a)
                    }
                    _ => None,
                };
            }
            _ => merged.push(segment),
        }
    }

    merged
}
