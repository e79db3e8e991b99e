//! Static schedule feed (GTFS).
//!
//! Loaded once at startup from a feed directory and immutable afterwards.
//! The planner uses it for two things: a second route graph when the live
//! topology has no path, and shape polylines for ride geometry.

mod error;
mod load;
mod types;

use std::collections::HashMap;
use std::path::Path;

use tracing::info;

use crate::domain::{FeedRouteId, FeedStopId, FeedTripId, ShapeId};
use crate::geo::LatLng;

pub use error::FeedError;
pub use types::{FeedRoute, FeedStop, FeedTrip, StopTime};

/// Every table of a loaded feed.
#[derive(Debug, Clone, Default)]
pub struct GtfsFeed {
    pub stops: HashMap<FeedStopId, FeedStop>,
    pub routes: HashMap<FeedRouteId, FeedRoute>,
    pub trips: HashMap<FeedTripId, FeedTrip>,
    /// Per trip, sorted by stop sequence.
    pub stop_times: HashMap<FeedTripId, Vec<StopTime>>,
    /// Per shape, sorted by point sequence.
    pub shapes: HashMap<ShapeId, Vec<LatLng>>,
}

impl GtfsFeed {
    /// Load `stops.txt`, `routes.txt`, `trips.txt`, `stop_times.txt` and
    /// (if present) `shapes.txt` from `dir`.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, FeedError> {
        let dir = dir.as_ref();
        info!(path = %dir.display(), "loading schedule feed");

        let feed = Self {
            stops: load::load_stops(dir)?,
            routes: load::load_routes(dir)?,
            trips: load::load_trips(dir)?,
            stop_times: load::load_stop_times(dir)?,
            shapes: load::load_shapes(dir)?,
        };

        info!(
            stops = feed.stops.len(),
            routes = feed.routes.len(),
            trips = feed.trips.len(),
            shapes = feed.shapes.len(),
            "schedule feed loaded"
        );
        Ok(feed)
    }

    /// Trips of `route`, restricted to one direction when `direction` is set.
    pub fn trips_for_route<'a>(
        &'a self,
        route: &FeedRouteId,
        direction: Option<u8>,
    ) -> impl Iterator<Item = &'a FeedTrip> + use<'a> {
        let route = route.clone();
        self.trips
            .values()
            .filter(move |t| t.route == route && direction.is_none_or(|d| t.direction == Some(d)))
    }

    /// Direction ids the route's trips declare, ascending.
    pub fn directions_for_route(&self, route: &FeedRouteId) -> Vec<u8> {
        let mut directions: Vec<u8> = self
            .trips_for_route(route, None)
            .filter_map(|t| t.direction)
            .collect();
        directions.sort_unstable();
        directions.dedup();
        directions
    }

    pub fn stop_times_for(&self, trip: &FeedTripId) -> &[StopTime] {
        self.stop_times.get(trip).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The most frequent shape among the route's trips in `direction` (any
    /// direction when `None`).
    ///
    /// Ties go to the lowest shape id so the choice is stable across loads.
    pub fn shape_for_route(&self, route: &FeedRouteId, direction: Option<u8>) -> Option<&[LatLng]> {
        let mut counts: HashMap<&ShapeId, usize> = HashMap::new();
        for trip in self.trips_for_route(route, direction) {
            if let Some(shape) = trip.shape.as_ref().filter(|s| self.shapes.contains_key(*s)) {
                *counts.entry(shape).or_default() += 1;
            }
        }
        let best = counts
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))?
            .0;
        self.shapes.get(best).map(Vec::as_slice)
    }

    /// The route's trip with the most stop times.
    pub fn longest_trip(&self, route: &FeedRouteId, direction: Option<u8>) -> Option<&FeedTrip> {
        self.trips_for_route(route, direction).max_by(|a, b| {
            self.stop_times_for(&a.id)
                .len()
                .cmp(&self.stop_times_for(&b.id).len())
                .then_with(|| b.id.cmp(&a.id))
        })
    }

    /// Ordered stops of the route's longest trip.
    pub fn stop_chain_for_route(&self, route: &FeedRouteId, direction: Option<u8>) -> Vec<FeedStopId> {
        self.longest_trip(route, direction)
            .map(|trip| {
                self.stop_times_for(&trip.id)
                    .iter()
                    .map(|st| st.stop.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_feed(dir: &Path) {
        fs::write(
            dir.join("stops.txt"),
            "\u{feff}stop_id,stop_name,stop_lat,stop_lon\n\
             A,Quad,42.3817,-71.1250\n\
             B,Mather House,42.3686,-71.1153\n\
             C,Widener Gate,42.3734,-71.1167\n",
        )
        .unwrap();
        fs::write(
            dir.join("routes.txt"),
            "route_id,route_short_name,route_long_name,route_color\n\
             R1,QE,Quad Express,A51C30\n\
             R2,,Mather Express,\n",
        )
        .unwrap();
        fs::write(
            dir.join("trips.txt"),
            "route_id,service_id,trip_id,direction_id,shape_id\n\
             R1,wk,T1,0,S1\n\
             R1,wk,T2,0,S1\n\
             R1,wk,T3,1,S2\n\
             R2,wk,T4,,\n",
        )
        .unwrap();
        fs::write(
            dir.join("stop_times.txt"),
            "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n\
             T1,08:05:00,08:05:00,C,2\n\
             T1,08:00:00,08:00:00,A,1\n\
             T2,09:00:00,09:00:00,A,1\n\
             T2,09:05:00,09:05:00,C,2\n\
             T2,09:10:00,09:10:00,B,3\n\
             T4,10:00:00,10:00:00,B,1\n",
        )
        .unwrap();
        fs::write(
            dir.join("shapes.txt"),
            "shape_id,shape_pt_lat,shape_pt_lon,shape_pt_sequence\n\
             S1,42.3734,-71.1167,2\n\
             S1,42.3817,-71.1250,1\n\
             S2,42.0,-71.0,1\n\
             S2,42.1,-71.0,2\n",
        )
        .unwrap();
    }

    #[test]
    fn load_full_feed() {
        let dir = tempdir().unwrap();
        write_feed(dir.path());
        let feed = GtfsFeed::load(dir.path()).unwrap();

        assert_eq!(feed.stops.len(), 3);
        assert_eq!(feed.routes.len(), 2);
        assert_eq!(feed.trips.len(), 4);

        let quad = &feed.stops[&FeedStopId::new("A")];
        assert_eq!(quad.name, "Quad");

        let r2 = &feed.routes[&FeedRouteId::new("R2")];
        assert_eq!(r2.short_name, "");
        assert_eq!(r2.color, None);

        let t1 = feed.stop_times_for(&FeedTripId::new("T1"));
        let seq: Vec<_> = t1.iter().map(|st| st.stop.as_str()).collect();
        assert_eq!(seq, vec!["A", "C"]);

        let s1 = &feed.shapes[&ShapeId::new("S1")];
        assert_eq!(s1[0], LatLng::new(42.3817, -71.1250));
    }

    #[test]
    fn shapes_file_is_optional() {
        let dir = tempdir().unwrap();
        write_feed(dir.path());
        fs::remove_file(dir.path().join("shapes.txt")).unwrap();
        let feed = GtfsFeed::load(dir.path()).unwrap();
        assert!(feed.shapes.is_empty());
        assert!(feed.shape_for_route(&FeedRouteId::new("R1"), None).is_none());
    }

    #[test]
    fn missing_table_is_an_error() {
        let dir = tempdir().unwrap();
        let err = GtfsFeed::load(dir.path()).unwrap_err();
        assert!(matches!(err, FeedError::Io { ref file, .. } if file == "stops.txt"));
    }

    #[test]
    fn most_frequent_shape_wins() {
        let dir = tempdir().unwrap();
        write_feed(dir.path());
        let feed = GtfsFeed::load(dir.path()).unwrap();
        let shape = feed.shape_for_route(&FeedRouteId::new("R1"), None).unwrap();
        assert_eq!(shape.len(), 2);
        assert_eq!(shape[1], LatLng::new(42.3734, -71.1167));
    }

    #[test]
    fn shape_filtered_by_direction() {
        let dir = tempdir().unwrap();
        write_feed(dir.path());
        let feed = GtfsFeed::load(dir.path()).unwrap();
        let r1 = FeedRouteId::new("R1");

        assert_eq!(feed.directions_for_route(&r1), vec![0, 1]);
        assert!(feed.directions_for_route(&FeedRouteId::new("R2")).is_empty());

        let inbound = feed.shape_for_route(&r1, Some(1)).unwrap();
        assert_eq!(inbound[0], LatLng::new(42.0, -71.0));
        assert!(feed.shape_for_route(&r1, Some(7)).is_none());
    }

    #[test]
    fn chain_uses_longest_trip() {
        let dir = tempdir().unwrap();
        write_feed(dir.path());
        let feed = GtfsFeed::load(dir.path()).unwrap();
        let r1 = FeedRouteId::new("R1");
        let ids = |chain: Vec<FeedStopId>| chain.iter().map(|s| s.as_str().to_string()).collect::<Vec<_>>();

        assert_eq!(ids(feed.stop_chain_for_route(&r1, None)), vec!["A", "C", "B"]);
        assert_eq!(ids(feed.stop_chain_for_route(&r1, Some(0))), vec!["A", "C", "B"]);
        // T3 runs direction 1 but has no stop times.
        assert!(feed.stop_chain_for_route(&r1, Some(1)).is_empty());
        assert!(feed.stop_chain_for_route(&FeedRouteId::new("nope"), None).is_empty());
    }
}
