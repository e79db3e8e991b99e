//! Route graph over the schedule feed.

use tracing::info;

use crate::domain::FeedRouteId;
use crate::geo::haversine_m;
use crate::gtfs::GtfsFeed;

use super::{Edge, FeedGraph};

/// Build the feed graph from every trip's stop sequence.
///
/// Consecutive stop times become directed edges, one per
/// `(from, to, route)` no matter how many trips share it. Each route's chain
/// is its longest trip.
pub fn build_feed_graph(feed: &GtfsFeed) -> FeedGraph {
    let mut graph = FeedGraph::new();

    let mut trips: Vec<_> = feed.trips.values().collect();
    trips.sort_by(|a, b| a.id.cmp(&b.id));

    for trip in trips {
        let times = feed.stop_times_for(&trip.id);
        for pair in times.windows(2) {
            let (from, to) = (&pair[0].stop, &pair[1].stop);
            if from == to {
                continue;
            }
            let distance_m = match (feed.stops.get(from), feed.stops.get(to)) {
                (Some(a), Some(b)) => haversine_m(a.location, b.location),
                _ => 0.0,
            };
            graph.add_edge(
                from.clone(),
                Edge {
                    to: to.clone(),
                    route: trip.route.clone(),
                    distance_m,
                },
            );
        }
    }

    let mut routes: Vec<&FeedRouteId> = feed.trips.values().map(|t| &t.route).collect();
    routes.sort();
    routes.dedup();
    for route in routes {
        let chain = feed.stop_chain_for_route(route, None);
        if !chain.is_empty() {
            graph.set_chain(route.clone(), chain);
        }
    }

    info!(
        stops = graph.stop_count(),
        edges = graph.edge_count(),
        "built schedule-feed route graph"
    );
    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FeedStopId, FeedTripId};
    use crate::geo::{LatLng, offset_m};
    use crate::gtfs::{FeedStop, FeedTrip, StopTime};

    fn feed() -> GtfsFeed {
        let o = LatLng::new(42.3736, -71.1190);
        let mut feed = GtfsFeed::default();
        for (id, loc) in [
            ("A", o),
            ("B", offset_m(o, 100.0, 0.0)),
            ("C", offset_m(o, 200.0, 0.0)),
        ] {
            feed.stops.insert(
                FeedStopId::new(id),
                FeedStop {
                    id: FeedStopId::new(id),
                    name: id.to_string(),
                    location: loc,
                },
            );
        }
        for (trip, route, seq) in [
            ("T1", "R1", vec!["A", "B", "C"]),
            ("T2", "R1", vec!["A", "B"]),
            ("T3", "R2", vec!["C", "A"]),
        ] {
            let trip_id = FeedTripId::new(trip);
            feed.trips.insert(
                trip_id.clone(),
                FeedTrip {
                    id: trip_id.clone(),
                    route: FeedRouteId::new(route),
                    service_id: "wk".into(),
                    direction: None,
                    shape: None,
                },
            );
            let times = seq
                .iter()
                .enumerate()
                .map(|(i, s)| StopTime {
                    trip: trip_id.clone(),
                    stop: FeedStopId::new(*s),
                    sequence: i as u32 + 1,
                    arrival: String::new(),
                    departure: String::new(),
                })
                .collect();
            feed.stop_times.insert(trip_id, times);
        }
        feed
    }

    #[test]
    fn edges_deduplicated_across_trips() {
        let graph = build_feed_graph(&feed());
        let from_a = graph.edges_from(&FeedStopId::new("A"));
        assert_eq!(from_a.len(), 1);
        assert_eq!(from_a[0].to, FeedStopId::new("B"));
        assert!((from_a[0].distance_m - 100.0).abs() < 0.01);
        // A->B on R1, B->C on R1, C->A on R2
        assert_eq!(graph.edge_count(), 3);
    }

    #[test]
    fn chain_is_longest_trip() {
        let graph = build_feed_graph(&feed());
        let chain = graph.chain(&FeedRouteId::new("R1")).unwrap();
        assert_eq!(chain.len(), 3);
        assert_eq!(graph.chain(&FeedRouteId::new("R2")).unwrap().len(), 2);
    }
}
