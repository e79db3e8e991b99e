//! Live-tracking records: stops, routes, vehicles.
//!
//! These are refreshed from the provider on every request and never mutated
//! locally.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use super::{DomainError, LiveRouteId, LiveStopId, SystemId, VehicleId};
use crate::geo::{LatLng, haversine_m};

/// Validate a user-supplied coordinate.
pub fn validate_coordinate(lat: f64, lng: f64) -> Result<LatLng, DomainError> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(DomainError::InvalidLatitude(lat));
    }
    if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
        return Err(DomainError::InvalidLongitude(lng));
    }
    Ok(LatLng::new(lat, lng))
}

/// A stop in the live-tracking namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct Stop {
    pub id: LiveStopId,
    pub name: String,
    pub location: LatLng,
    /// Ordinal position of this stop on each route that serves it.
    pub route_positions: BTreeMap<LiveRouteId, u32>,
}

impl Stop {
    pub fn new(id: impl Into<LiveStopId>, name: impl Into<String>, location: LatLng) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            location,
            route_positions: BTreeMap::new(),
        }
    }

    /// Builder-style helper to record a route position.
    pub fn on_route(mut self, route: impl Into<LiveRouteId>, position: u32) -> Self {
        self.route_positions.insert(route.into(), position);
        self
    }

    pub fn serves(&self, route: &LiveRouteId) -> bool {
        self.route_positions.contains_key(route)
    }
}

/// A route in the live-tracking namespace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    pub id: LiveRouteId,
    pub name: Option<String>,
    pub short_name: Option<String>,
    pub color: Option<String>,
}

impl Route {
    pub fn new(id: impl Into<LiveRouteId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            short_name: None,
            color: None,
        }
    }

    /// A route known only by id.
    pub fn unnamed(id: LiveRouteId) -> Self {
        Self {
            id,
            name: None,
            short_name: None,
            color: None,
        }
    }
}

/// A live vehicle.
#[derive(Debug, Clone, PartialEq)]
pub struct Vehicle {
    pub id: VehicleId,
    /// `None` when the provider has no fix for this vehicle.
    pub location: Option<LatLng>,
    /// Every route this vehicle reports. Usually one, sometimes several.
    pub routes: BTreeSet<LiveRouteId>,
    pub heading: Option<f64>,
}

impl Vehicle {
    pub fn serves(&self, route: &LiveRouteId) -> bool {
        self.routes.contains(route)
    }
}

/// A transit system the provider serves.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitSystem {
    pub id: SystemId,
    pub name: String,
    pub username: Option<String>,
    pub homepage: Option<String>,
}

/// One provider fetch: every stop, route, and vehicle of a system.
#[derive(Debug, Clone, Default)]
pub struct LiveSnapshot {
    pub stops: Vec<Stop>,
    pub routes: Vec<Route>,
    pub vehicles: Vec<Vehicle>,
}

/// Lookup tables over a [`LiveSnapshot`].
#[derive(Debug)]
pub struct SnapshotIndex<'a> {
    pub snapshot: &'a LiveSnapshot,
    stops: HashMap<&'a LiveStopId, &'a Stop>,
    routes: HashMap<&'a LiveRouteId, &'a Route>,
}

impl<'a> SnapshotIndex<'a> {
    pub fn new(snapshot: &'a LiveSnapshot) -> Self {
        Self {
            snapshot,
            stops: snapshot.stops.iter().map(|s| (&s.id, s)).collect(),
            routes: snapshot.routes.iter().map(|r| (&r.id, r)).collect(),
        }
    }

    pub fn stop(&self, id: &LiveStopId) -> Option<&'a Stop> {
        self.stops.get(id).copied()
    }

    pub fn route(&self, id: &LiveRouteId) -> Option<&'a Route> {
        self.routes.get(id).copied()
    }

    /// Whether any vehicle with a position is currently assigned to `route`.
    pub fn has_live_vehicle(&self, route: &LiveRouteId) -> bool {
        self.snapshot
            .vehicles
            .iter()
            .any(|v| v.location.is_some() && v.serves(route))
    }

    /// The stop nearest to `point`, with its distance in metres.
    pub fn nearest_stop(&self, point: LatLng) -> Option<(&'a Stop, f64)> {
        self.snapshot
            .stops
            .iter()
            .map(|s| (s, haversine_m(point, s.location)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Up to `limit` stops within `radius_m` of `point`, nearest first,
    /// excluding `exclude`.
    pub fn stops_within(
        &self,
        point: LatLng,
        radius_m: f64,
        limit: usize,
        exclude: &LiveStopId,
    ) -> Vec<(&'a Stop, f64)> {
        let mut nearby: Vec<(&Stop, f64)> = self
            .snapshot
            .stops
            .iter()
            .filter(|s| &s.id != exclude)
            .map(|s| (s, haversine_m(point, s.location)))
            .filter(|(_, d)| *d <= radius_m)
            .collect();
        nearby.sort_by(|a, b| a.1.total_cmp(&b.1));
        nearby.truncate(limit);
        nearby
    }
}
