//! Trip requests and results.

use serde::Serialize;

use crate::domain::{DomainError, LiveStopId, Route, Stop, SystemId, validate_coordinate};
use crate::eta::NextBus;
use crate::geo::LatLng;

use super::skeleton::{Strategy, TripSkeleton};

/// Request to plan a trip between two points.
#[derive(Debug, Clone)]
pub struct TripRequest {
    pub system: SystemId,
    pub origin: LatLng,
    pub destination: LatLng,
    /// Attach the scored candidate list to the result.
    pub debug: bool,
}

impl TripRequest {
    /// Create a request, validating both coordinates.
    pub fn new(
        system: SystemId,
        origin: (f64, f64),
        destination: (f64, f64),
    ) -> Result<Self, DomainError> {
        Ok(Self {
            system,
            origin: validate_coordinate(origin.0, origin.1)?,
            destination: validate_coordinate(destination.0, destination.1)?,
            debug: false,
        })
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

/// A stop as shown to the rider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopRef {
    pub id: LiveStopId,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

impl StopRef {
    pub fn location(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

impl From<&Stop> for StopRef {
    fn from(stop: &Stop) -> Self {
        Self {
            id: stop.id.clone(),
            name: stop.name.clone(),
            lat: stop.location.lat,
            lng: stop.location.lng,
        }
    }
}

/// A requested point snapped to its nearest stop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snap {
    pub location: LatLng,
    pub nearest_stop: StopRef,
    pub distance_m: f64,
}

/// One ride on one route, ready for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RideSegment {
    pub route: Route,
    pub stops: Vec<StopRef>,
    /// Path drawn for the ride, from the feed shape or the stop coordinates.
    pub polyline: Option<Vec<LatLng>>,
    pub next_bus: Option<NextBus>,
}

impl RideSegment {
    pub fn start_stop(&self) -> Option<&StopRef> {
        self.stops.first()
    }

    pub fn end_stop(&self) -> Option<&StopRef> {
        self.stops.last()
    }
}

/// A scored candidate, reported when debugging.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateSummary {
    pub strategy: Strategy,
    pub routes: Vec<String>,
    pub board: LiveStopId,
    pub alight: LiveStopId,
    pub transfers: usize,
    pub walk_m: f64,
    pub live: bool,
    pub score: f64,
}

impl From<&TripSkeleton> for CandidateSummary {
    fn from(skeleton: &TripSkeleton) -> Self {
        Self {
            strategy: skeleton.strategy,
            routes: skeleton.routes().iter().map(|r| r.to_string()).collect(),
            board: skeleton.board().clone(),
            alight: skeleton.alight().clone(),
            transfers: skeleton.transfers,
            walk_m: skeleton.walk_m,
            live: skeleton.live,
            score: skeleton.score,
        }
    }
}

/// A planned trip.
#[derive(Debug, Clone, Serialize)]
pub struct Trip {
    pub system_id: SystemId,
    pub origin: Snap,
    pub destination: Snap,
    /// How the chosen trip was generated. `None` when no ride is needed.
    pub strategy: Option<Strategy>,
    pub live: bool,
    pub transfers: usize,
    pub walk_m: f64,
    pub segments: Vec<RideSegment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidates: Option<Vec<CandidateSummary>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn system() -> SystemId {
        SystemId::new(831).unwrap()
    }

    #[test]
    fn request_validates_coordinates() {
        assert!(TripRequest::new(system(), (42.37, -71.12), (42.38, -71.11)).is_ok());
        assert!(matches!(
            TripRequest::new(system(), (91.0, 0.0), (0.0, 0.0)),
            Err(DomainError::InvalidLatitude(_))
        ));
        assert!(matches!(
            TripRequest::new(system(), (0.0, 0.0), (0.0, f64::NAN)),
            Err(DomainError::InvalidLongitude(_))
        ));
    }

    #[test]
    fn stop_ref_from_stop() {
        let stop = Stop::new("7", "Quad", LatLng::new(42.38, -71.12));
        let r = StopRef::from(&stop);
        assert_eq!(r.id.as_str(), "7");
        assert_eq!(r.location(), stop.location);
    }

    #[test]
    fn debug_candidates_skipped_when_absent() {
        let stop = StopRef::from(&Stop::new("1", "A", LatLng::new(0.0, 0.0)));
        let snap = Snap {
            location: LatLng::new(0.0, 0.0),
            nearest_stop: stop,
            distance_m: 0.0,
        };
        let trip = Trip {
            system_id: system(),
            origin: snap.clone(),
            destination: snap,
            strategy: None,
            live: false,
            transfers: 0,
            walk_m: 0.0,
            segments: vec![],
            candidates: None,
        };
        let json = serde_json::to_value(&trip).unwrap();
        assert!(json.get("candidates").is_none());
        assert_eq!(json["system_id"], 831);
        assert_eq!(json["origin"]["nearest_stop"]["id"], "1");
    }
}
