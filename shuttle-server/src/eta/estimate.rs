//! Distance and time from a vehicle to a boarding stop.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::trace;

use crate::domain::{LiveRouteId, SystemId, Vehicle, VehicleId};
use crate::geo::{LatLng, LocalProjection, haversine_m, path_length_m, project_onto_segment};

use super::EtaConfig;
use super::history::{PositionSample, VehicleHistory};
use super::speed::{SpeedSource, smoothed_speed};

/// How the distance to the boarding stop was measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceSource {
    /// Within the near-stop radius; treated as zero.
    NearStop,
    /// Along the route's stop chain.
    Chain,
    /// Straight line, because no usable chain was available.
    StraightLine,
}

/// A route's stops in travel order, as coordinates.
#[derive(Debug, Clone, Copy)]
pub struct RouteChain<'a> {
    pub points: &'a [LatLng],
    /// Index of the boarding stop in `points`.
    pub boarding: usize,
}

/// The vehicle expected to serve a segment, with its estimates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NextBus {
    pub vehicle_id: VehicleId,
    pub location: LatLng,
    pub distance_to_boarding_m: f64,
    pub distance_source: DistanceSource,
    pub speed_m_s: f64,
    pub speed_source: SpeedSource,
    pub eta_to_boarding_s: Option<f64>,
    pub eta_to_boarding_min: Option<f64>,
    pub ride_eta_s: Option<f64>,
    pub segment_eta_s: Option<f64>,
}

/// Distance a vehicle still has to travel along a looping route to reach
/// the boarding stop.
///
/// The chain is treated as a closed loop starting and ending at the boarding
/// stop. The vehicle is projected onto the nearest leg of that loop and the
/// distance is what remains of the loop past the projected point. Returns
/// `None` for chains too short to form a loop.
pub fn loop_distance_to_stop(vehicle: LatLng, chain: RouteChain<'_>) -> Option<f64> {
    let n = chain.points.len();
    if n < 2 || chain.boarding >= n {
        return None;
    }

    let boarding = chain.points[chain.boarding];
    let projection = LocalProjection::new(boarding);
    let ring: Vec<_> = (0..=n)
        .map(|i| projection.project(chain.points[(chain.boarding + i) % n]))
        .collect();
    let v = projection.project(vehicle);

    let mut travelled = 0.0;
    let mut best: Option<(f64, f64)> = None;
    for leg in ring.windows(2) {
        let length = leg[0].distance(leg[1]);
        let p = project_onto_segment(v, leg[0], leg[1]);
        if best.is_none_or(|(d, _)| p.distance_sq < d) {
            best = Some((p.distance_sq, travelled + p.t * length));
        }
        travelled += length;
    }

    best.map(|(_, arc)| (travelled - arc).max(0.0))
}

/// Estimates arrivals and records vehicle positions as a side effect.
#[derive(Debug, Clone)]
pub struct EtaEstimator {
    config: EtaConfig,
    history: Arc<VehicleHistory>,
}

impl EtaEstimator {
    pub fn new(config: EtaConfig) -> Self {
        let history = Arc::new(VehicleHistory::new(config.history_cap));
        Self { config, history }
    }

    pub fn history(&self) -> &Arc<VehicleHistory> {
        &self.history
    }

    /// The vehicle on `route` nearest `boarding` in a straight line, among
    /// those reporting a position.
    pub fn choose_vehicle<'v>(
        vehicles: &'v [Vehicle],
        route: &LiveRouteId,
        boarding: LatLng,
    ) -> Option<(&'v Vehicle, LatLng, f64)> {
        vehicles
            .iter()
            .filter(|v| v.serves(route))
            .filter_map(|v| v.location.map(|loc| (v, loc, haversine_m(loc, boarding))))
            .min_by(|a, b| a.2.total_cmp(&b.2).then_with(|| a.0.id.cmp(&b.0.id)))
    }

    /// Distance from `vehicle` to the boarding stop and how it was measured.
    pub fn distance_to_boarding(
        &self,
        vehicle: LatLng,
        boarding: LatLng,
        chain: Option<RouteChain<'_>>,
    ) -> (f64, DistanceSource) {
        let straight = haversine_m(vehicle, boarding);
        if straight <= self.config.near_stop_radius_m {
            return (0.0, DistanceSource::NearStop);
        }
        match chain.and_then(|c| loop_distance_to_stop(vehicle, c)) {
            Some(d) => (d, DistanceSource::Chain),
            None => (straight, DistanceSource::StraightLine),
        }
    }

    /// Estimate the next bus for a segment.
    ///
    /// `segment` is the ordered coordinates of the stops ridden, boarding
    /// stop first. Returns `None` when no vehicle on the route reports a
    /// position.
    pub fn next_bus(
        &self,
        system: SystemId,
        route: &LiveRouteId,
        segment: &[LatLng],
        chain: Option<RouteChain<'_>>,
        vehicles: &[Vehicle],
        now: DateTime<Utc>,
    ) -> Option<NextBus> {
        let boarding = *segment.first()?;
        let (vehicle, location, _) = Self::choose_vehicle(vehicles, route, boarding)?;

        let samples = self
            .history
            .record(system, &vehicle.id, PositionSample { location, at: now });
        let speed = smoothed_speed(&samples, &self.config);

        let (distance, distance_source) = self.distance_to_boarding(location, boarding, chain);
        let eta_to_boarding_s = (speed.m_per_s > 0.0).then(|| distance / speed.m_per_s);
        let ride_eta_s = ride_eta_s(segment, speed.m_per_s);
        let segment_eta_s = match (eta_to_boarding_s, ride_eta_s) {
            (Some(board), Some(ride)) => Some(board + ride),
            _ => None,
        };

        trace!(
            vehicle = %vehicle.id,
            route = %route,
            distance,
            speed = speed.m_per_s,
            "next bus estimated"
        );

        Some(NextBus {
            vehicle_id: vehicle.id.clone(),
            location,
            distance_to_boarding_m: distance,
            distance_source,
            speed_m_s: speed.m_per_s,
            speed_source: speed.source,
            eta_to_boarding_s,
            eta_to_boarding_min: eta_to_boarding_s.map(|s| s / 60.0),
            ride_eta_s,
            segment_eta_s,
        })
    }
}

impl Default for EtaEstimator {
    fn default() -> Self {
        Self::new(EtaConfig::default())
    }
}

/// Time to ride through `stops` at `speed` m/s.
pub fn ride_eta_s(stops: &[LatLng], speed: f64) -> Option<f64> {
    if stops.len() < 2 || !speed.is_finite() || speed <= 0.0 {
        return None;
    }
    Some(path_length_m(stops) / speed)
}
