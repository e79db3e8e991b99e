//! Schedule-feed entities.

use serde::Serialize;

use crate::domain::{FeedRouteId, FeedStopId, FeedTripId, ShapeId};
use crate::geo::LatLng;

/// A stop in the schedule-feed namespace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedStop {
    pub id: FeedStopId,
    pub name: String,
    pub location: LatLng,
}

/// A route in the schedule-feed namespace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedRoute {
    pub id: FeedRouteId,
    pub short_name: String,
    pub long_name: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedTrip {
    pub id: FeedTripId,
    pub route: FeedRouteId,
    pub service_id: String,
    pub direction: Option<u8>,
    pub shape: Option<ShapeId>,
}

/// One scheduled call of a trip at a stop.
#[derive(Debug, Clone, PartialEq)]
pub struct StopTime {
    pub trip: FeedTripId,
    pub stop: FeedStopId,
    pub sequence: u32,
    /// `HH:MM:SS`, possibly past 24:00 for after-midnight service.
    pub arrival: String,
    pub departure: String,
}
