//! Route graph over live-tracking stops.

use std::collections::BTreeMap;

use tracing::debug;

use crate::domain::{LiveRouteId, Stop};
use crate::geo::haversine_m;

use super::{Edge, LiveGraph};

/// Build the live graph from the stops of one snapshot.
///
/// Stops are grouped by route and ordered by their position on it; each
/// consecutive pair gets one directed edge in travel order.
pub fn build_live_graph(stops: &[Stop]) -> LiveGraph {
    let mut by_route: BTreeMap<&LiveRouteId, Vec<(u32, &Stop)>> = BTreeMap::new();
    for stop in stops {
        for (route, position) in &stop.route_positions {
            by_route.entry(route).or_default().push((*position, stop));
        }
    }

    let mut graph = LiveGraph::new();
    for (route, mut members) in by_route {
        members.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.id.cmp(&b.1.id)));

        for pair in members.windows(2) {
            let (from, to) = (pair[0].1, pair[1].1);
            if from.id == to.id {
                continue;
            }
            graph.add_edge(
                from.id.clone(),
                Edge {
                    to: to.id.clone(),
                    route: route.clone(),
                    distance_m: haversine_m(from.location, to.location),
                },
            );
        }

        let chain = members.iter().map(|(_, s)| s.id.clone()).collect();
        graph.set_chain(route.clone(), chain);
    }

    debug!(
        stops = graph.stop_count(),
        edges = graph.edge_count(),
        "built live route graph"
    );
    graph
}
