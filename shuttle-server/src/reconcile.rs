//! Identity reconciliation between the live and schedule-feed namespaces.
//!
//! The live provider and the feed describe the same physical stops and
//! routes under unrelated ids. Stops are matched by proximity with a
//! preference for similar names; routes are matched by display name.
//!
//! A [`Reconciler`] is built once per system from the first live snapshot
//! and then reused. Stops added upstream later are not picked up until the
//! process restarts.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::domain::{FeedRouteId, FeedStopId, LiveRouteId, LiveSnapshot, LiveStopId, Route};
use crate::geo::{LatLng, haversine_m};
use crate::gtfs::GtfsFeed;

/// Candidates further than this are never matched.
pub const MAX_MATCH_DISTANCE_M: f64 = 100.0;

/// Fuzzy route-name matching ignores names this short or shorter.
const MIN_FUZZY_NAME_LEN: usize = 3;

/// The best counterpart of a stop in the other namespace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopMatch<I> {
    pub id: I,
    pub distance_m: f64,
    pub name_match: bool,
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Case-insensitive substring match in either direction.
///
/// Empty names never match; an empty string is a substring of everything.
fn names_match(a: &str, b: &str) -> bool {
    !a.is_empty() && !b.is_empty() && (a.contains(b) || b.contains(a))
}

/// Find the best match for a stop among `candidates`.
///
/// Candidates beyond `max_distance_m` are discarded. Among the rest a name
/// match beats any distance; ties go to the nearest.
pub fn match_stop<'a, I, C>(
    name: &str,
    location: LatLng,
    candidates: C,
    max_distance_m: f64,
) -> Option<StopMatch<I>>
where
    I: Clone + 'a,
    C: IntoIterator<Item = (&'a I, &'a str, LatLng)>,
{
    let name = normalize(name);
    let mut best: Option<StopMatch<&I>> = None;

    for (id, candidate_name, candidate_location) in candidates {
        let distance_m = haversine_m(location, candidate_location);
        if distance_m > max_distance_m {
            continue;
        }
        let name_match = names_match(&name, &normalize(candidate_name));

        let better = match &best {
            None => true,
            Some(b) => {
                (name_match && !b.name_match)
                    || (name_match == b.name_match && distance_m < b.distance_m)
            }
        };
        if better {
            best = Some(StopMatch {
                id,
                distance_m,
                name_match,
            });
        }
    }

    best.map(|m| StopMatch {
        id: m.id.clone(),
        distance_m: m.distance_m,
        name_match: m.name_match,
    })
}

/// Lookup from normalized feed route names to feed route ids.
#[derive(Debug, Clone, Default)]
pub struct RouteNameIndex {
    exact: HashMap<String, FeedRouteId>,
    /// Same entries in a stable order for containment matching.
    ordered: Vec<(String, FeedRouteId)>,
}

impl RouteNameIndex {
    pub fn new(feed: &GtfsFeed) -> Self {
        let mut routes: Vec<_> = feed.routes.values().collect();
        routes.sort_by(|a, b| a.id.cmp(&b.id));

        let mut index = Self::default();
        for route in routes {
            for name in [&route.long_name, &route.short_name] {
                let name = normalize(name);
                if name.is_empty() {
                    continue;
                }
                index.exact.insert(name.clone(), route.id.clone());
                index.ordered.push((name, route.id.clone()));
            }
        }
        index
    }

    /// Resolve a live route name: exact first, then containment either way.
    pub fn resolve(&self, name: &str) -> Option<&FeedRouteId> {
        let name = normalize(name);
        if name.is_empty() {
            return None;
        }
        if let Some(id) = self.exact.get(&name) {
            return Some(id);
        }
        if name.chars().count() <= MIN_FUZZY_NAME_LEN {
            return None;
        }
        self.ordered
            .iter()
            .find(|(candidate, _)| {
                candidate.chars().count() > MIN_FUZZY_NAME_LEN
                    && (candidate.contains(&name) || name.contains(candidate.as_str()))
            })
            .map(|(_, id)| id)
    }

    pub fn len(&self) -> usize {
        self.exact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }
}

/// The identity a route is compared by when compressing paths.
///
/// Two live routes that reconcile to the same feed route count as one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CanonicalRoute {
    Feed(FeedRouteId),
    Live(LiveRouteId),
}

/// Bidirectional stop and route tables for one system.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    live_to_feed: HashMap<LiveStopId, StopMatch<FeedStopId>>,
    feed_to_live: HashMap<FeedStopId, StopMatch<LiveStopId>>,
    live_route_to_feed: HashMap<LiveRouteId, FeedRouteId>,
    feed_route_to_live: HashMap<FeedRouteId, Vec<LiveRouteId>>,
}

impl Reconciler {
    /// Match every live stop and route against the feed.
    pub fn build(live: &LiveSnapshot, feed: &GtfsFeed) -> Self {
        let mut reconciler = Self::default();

        for stop in &live.stops {
            let candidates = feed
                .stops
                .values()
                .map(|s| (&s.id, s.name.as_str(), s.location));
            match match_stop(&stop.name, stop.location, candidates, MAX_MATCH_DISTANCE_M) {
                Some(m) => {
                    // A feed stop claimed by several live stops maps back to the nearest.
                    let reverse = StopMatch {
                        id: stop.id.clone(),
                        distance_m: m.distance_m,
                        name_match: m.name_match,
                    };
                    let keep_existing = reconciler
                        .feed_to_live
                        .get(&m.id)
                        .is_some_and(|existing| existing.distance_m <= reverse.distance_m);
                    if !keep_existing {
                        reconciler.feed_to_live.insert(m.id.clone(), reverse);
                    }
                    reconciler.live_to_feed.insert(stop.id.clone(), m);
                }
                None => {
                    debug!(stop = %stop.id, name = %stop.name, "no feed match for live stop");
                }
            }
        }

        let names = RouteNameIndex::new(feed);
        let mut live_routes: Vec<&Route> = live.routes.iter().collect();
        live_routes.sort_by(|a, b| a.id.cmp(&b.id));
        for route in live_routes {
            let resolved = [route.name.as_deref(), route.short_name.as_deref()]
                .into_iter()
                .flatten()
                .find_map(|name| names.resolve(name));
            if let Some(feed_route) = resolved {
                reconciler
                    .live_route_to_feed
                    .insert(route.id.clone(), feed_route.clone());
                reconciler
                    .feed_route_to_live
                    .entry(feed_route.clone())
                    .or_default()
                    .push(route.id.clone());
            }
        }

        info!(
            stops_matched = reconciler.live_to_feed.len(),
            stops_unmatched = live.stops.len() - reconciler.live_to_feed.len(),
            routes_matched = reconciler.live_route_to_feed.len(),
            route_names = names.len(),
            "built live/feed reconciliation"
        );
        reconciler
    }

    pub fn live_to_feed(&self, stop: &LiveStopId) -> Option<&StopMatch<FeedStopId>> {
        self.live_to_feed.get(stop)
    }

    pub fn feed_to_live(&self, stop: &FeedStopId) -> Option<&StopMatch<LiveStopId>> {
        self.feed_to_live.get(stop)
    }

    pub fn feed_route(&self, route: &LiveRouteId) -> Option<&FeedRouteId> {
        self.live_route_to_feed.get(route)
    }

    /// Live routes that reconcile to `route`, in id order.
    pub fn live_routes(&self, route: &FeedRouteId) -> &[LiveRouteId] {
        self.feed_route_to_live
            .get(route)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The reconciled feed route when one resolves, else the live route.
    pub fn canonical_route(&self, route: &LiveRouteId) -> CanonicalRoute {
        match self.feed_route(route) {
            Some(feed) => CanonicalRoute::Feed(feed.clone()),
            None => CanonicalRoute::Live(route.clone()),
        }
    }

    pub fn matched_stops(&self) -> usize {
        self.live_to_feed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Stop;
    use crate::geo::offset_m;
    use crate::gtfs::{FeedRoute, FeedStop};

    fn origin() -> LatLng {
        LatLng::new(42.3736, -71.1190)
    }

    fn feed_stop(id: &str, name: &str, location: LatLng) -> FeedStop {
        FeedStop {
            id: FeedStopId::new(id),
            name: name.to_string(),
            location,
        }
    }

    fn feed_route(id: &str, short: &str, long: &str) -> FeedRoute {
        FeedRoute {
            id: FeedRouteId::new(id),
            short_name: short.to_string(),
            long_name: long.to_string(),
            color: None,
        }
    }

    fn feed() -> GtfsFeed {
        let o = origin();
        let mut feed = GtfsFeed::default();
        for stop in [
            feed_stop("F1", "Quad", o),
            feed_stop("F2", "Science Center", offset_m(o, 0.0, 5.0)),
            feed_stop("F3", "Far Away", offset_m(o, 500.0, 0.0)),
        ] {
            feed.stops.insert(stop.id.clone(), stop);
        }
        for route in [
            feed_route("QSD", "QSD", "Quad SEC Direct"),
            feed_route("ME", "", "Mather Express"),
        ] {
            feed.routes.insert(route.id.clone(), route);
        }
        feed
    }

    fn candidates(feed: &GtfsFeed) -> Vec<(&FeedStopId, &str, LatLng)> {
        feed.stops
            .values()
            .map(|s| (&s.id, s.name.as_str(), s.location))
            .collect()
    }

    #[test]
    fn name_match_beats_closer_candidate() {
        let feed = feed();
        // 2 m from Science Center, 3 m from Quad; the name decides.
        let query = offset_m(origin(), 0.0, 3.0);
        let m = match_stop("Quad", query, candidates(&feed), MAX_MATCH_DISTANCE_M).unwrap();
        assert_eq!(m.id, FeedStopId::new("F1"));
        assert!(m.name_match);
    }

    #[test]
    fn exact_name_at_zero_distance() {
        let feed = feed();
        let m = match_stop(" QUAD ", origin(), candidates(&feed), MAX_MATCH_DISTANCE_M).unwrap();
        assert_eq!(m.id, FeedStopId::new("F1"));
        assert_eq!(m.distance_m, 0.0);
        assert!(m.name_match);
    }

    #[test]
    fn nearest_wins_without_name_match() {
        let feed = feed();
        let query = offset_m(origin(), 0.0, 4.0);
        let m = match_stop("Unrelated", query, candidates(&feed), MAX_MATCH_DISTANCE_M).unwrap();
        assert_eq!(m.id, FeedStopId::new("F2"));
        assert!(!m.name_match);
    }

    #[test]
    fn nothing_within_radius() {
        let feed = feed();
        let query = offset_m(origin(), -300.0, 0.0);
        assert!(match_stop("Quad", query, candidates(&feed), MAX_MATCH_DISTANCE_M).is_none());
    }

    #[test]
    fn empty_name_is_not_a_name_match() {
        let feed = feed();
        let query = offset_m(origin(), 0.0, 4.0);
        let m = match_stop("", query, candidates(&feed), MAX_MATCH_DISTANCE_M).unwrap();
        assert!(!m.name_match);
        assert_eq!(m.id, FeedStopId::new("F2"));
    }

    #[test]
    fn route_names_exact_then_containment() {
        let index = RouteNameIndex::new(&feed());
        assert_eq!(index.resolve("quad sec direct"), Some(&FeedRouteId::new("QSD")));
        assert_eq!(index.resolve("QSD"), Some(&FeedRouteId::new("QSD")));
        assert_eq!(index.resolve("Mather Express (AM)"), Some(&FeedRouteId::new("ME")));
        assert_eq!(index.resolve("Mather"), Some(&FeedRouteId::new("ME")));
        // Too short for containment, and not an exact name.
        assert_eq!(index.resolve("sec"), None);
        assert_eq!(index.resolve(""), None);
    }

    #[test]
    fn short_name_guard_counts_characters() {
        let mut feed = GtfsFeed::default();
        let route = feed_route("X", "", "Süd Express");
        feed.routes.insert(route.id.clone(), route);
        let index = RouteNameIndex::new(&feed);
        // Three characters but four bytes.
        assert_eq!(index.resolve("Süd"), None);
        assert_eq!(index.resolve("Süd Exp"), Some(&FeedRouteId::new("X")));
    }

    #[test]
    fn reconciler_both_directions() {
        let feed = feed();
        let o = origin();
        let live = LiveSnapshot {
            stops: vec![
                Stop::new("L1", "Quad", offset_m(o, 1.0, 0.0)),
                Stop::new("L2", "Quad Stop B", offset_m(o, 10.0, 0.0)),
                Stop::new("L9", "Nowhere", offset_m(o, -900.0, 0.0)),
            ],
            routes: vec![
                Route::new("777", "Quad SEC Direct"),
                Route::new("778", "Quad SEC Direct (Late)"),
                Route::new("900", "Overnight"),
            ],
            vehicles: vec![],
        };
        let r = Reconciler::build(&live, &feed);

        assert_eq!(r.matched_stops(), 2);
        assert_eq!(
            r.live_to_feed(&LiveStopId::new("L1")).map(|m| &m.id),
            Some(&FeedStopId::new("F1"))
        );
        // F1 is claimed by both L1 and L2; the nearer one maps back.
        assert_eq!(
            r.feed_to_live(&FeedStopId::new("F1")).map(|m| &m.id),
            Some(&LiveStopId::new("L1"))
        );
        assert!(r.live_to_feed(&LiveStopId::new("L9")).is_none());

        assert_eq!(
            r.canonical_route(&LiveRouteId::new("777")),
            CanonicalRoute::Feed(FeedRouteId::new("QSD"))
        );
        assert_eq!(
            r.canonical_route(&LiveRouteId::new("900")),
            CanonicalRoute::Live(LiveRouteId::new("900"))
        );
        assert_eq!(
            r.live_routes(&FeedRouteId::new("QSD")),
            &[LiveRouteId::new("777"), LiveRouteId::new("778")]
        );
    }
}
