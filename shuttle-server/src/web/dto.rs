//! Data transfer objects for web requests and responses.

use serde::{Deserialize, Serialize};

use crate::domain::{LiveRouteId, Route, Stop, Vehicle, VehicleId};
use crate::planner::{Snap, StopRef};

/// Query selecting a system.
#[derive(Debug, Deserialize)]
pub struct SystemQuery {
    /// PassioGO system id (defaults to the configured system)
    pub system_id: Option<String>,
}

/// Query for the nearest stop to a point.
#[derive(Debug, Deserialize)]
pub struct PointQuery {
    pub lat: f64,
    pub lng: f64,
    pub system_id: Option<String>,
}

/// Query for a trip between two points.
#[derive(Debug, Deserialize)]
pub struct TripQuery {
    /// Origin latitude
    pub lat: f64,

    /// Origin longitude
    pub lng: f64,

    /// Destination latitude
    pub lat2: f64,

    /// Destination longitude
    pub lng2: f64,

    pub system_id: Option<String>,

    /// Include the scored candidate list
    #[serde(default)]
    pub debug: bool,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

/// Nearest stop to a point; both fields are null when the system has no
/// stops.
#[derive(Debug, Serialize)]
pub struct NearestStopResponse {
    pub stop: Option<StopRef>,
    pub distance_m: Option<f64>,
}

/// Both ends of a trip snapped to stops.
#[derive(Debug, Serialize)]
pub struct MatchStopsResponse {
    pub origin: Snap,
    pub destination: Snap,
}

/// A vehicle with its route's display data.
#[derive(Debug, Serialize)]
pub struct VehicleResult {
    /// Vehicle id
    pub id: VehicleId,

    /// First route the vehicle reports, if any
    pub route_id: Option<LiveRouteId>,

    /// Display name of that route
    pub route_name: Option<String>,

    pub lat: Option<f64>,
    pub lng: Option<f64>,

    /// Compass heading in degrees
    pub heading: Option<f64>,

    /// Route colour as `#rrggbb`
    pub color: Option<String>,
}

impl VehicleResult {
    pub fn new(vehicle: &Vehicle, route: Option<&Route>) -> Self {
        Self {
            id: vehicle.id.clone(),
            route_id: vehicle.routes.iter().next().cloned(),
            route_name: route.and_then(|r| r.name.clone()),
            lat: vehicle.location.map(|l| l.lat),
            lng: vehicle.location.map(|l| l.lng),
            heading: vehicle.heading,
            color: route.and_then(|r| r.color.as_deref()).map(hex_color),
        }
    }
}

/// Prefix a colour with `#` if it lacks one.
fn hex_color(color: &str) -> String {
    if color.starts_with('#') {
        color.to_string()
    } else {
        format!("#{color}")
    }
}

/// Convert stops to their display form.
pub fn stop_results(stops: &[Stop]) -> Vec<StopRef> {
    stops.iter().map(StopRef::from).collect()
}

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
