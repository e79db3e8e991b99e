//! Attaching live ETAs and geometry to candidate skeletons.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::domain::{LiveRouteId, LiveStopId, Route, SnapshotIndex, Stop, SystemId};
use crate::eta::{EtaEstimator, NextBus, RouteChain, ride_eta_s};
use crate::geo::LatLng;
use crate::graph::LiveGraph;
use crate::gtfs::GtfsFeed;
use crate::reconcile::Reconciler;
use crate::shape::{runs_forward, slice_shape};

use super::error::EnrichError;
use super::geometry::GeometryMemo;
use super::skeleton::TripSkeleton;
use super::types::{RideSegment, StopRef};

/// Feed shapes and the route table needed to find them.
#[derive(Clone, Copy)]
pub struct ShapeSource<'a> {
    pub feed: &'a GtfsFeed,
    pub reconciler: &'a Reconciler,
}

/// A skeleton with its display segments filled in.
#[derive(Debug, Clone)]
pub struct EnrichedTrip {
    pub skeleton: TripSkeleton,
    pub segments: Vec<RideSegment>,
}

impl EnrichedTrip {
    /// Time until the first bus reaches the first boarding stop.
    pub fn boarding_eta_s(&self) -> Option<f64> {
        self.segments
            .first()
            .and_then(|s| s.next_bus.as_ref())
            .and_then(|b| b.eta_to_boarding_s)
    }
}

/// Enriches candidates for one request.
///
/// The vehicle estimate for a `(route, boarding stop)` pair is computed once
/// and reused across candidates, so each vehicle's position is recorded at
/// most once per request.
pub struct Enricher<'a> {
    system: SystemId,
    index: &'a SnapshotIndex<'a>,
    graph: &'a LiveGraph,
    estimator: &'a EtaEstimator,
    geometry: &'a GeometryMemo,
    shapes: Option<ShapeSource<'a>>,
    now: DateTime<Utc>,
    etas: HashMap<(LiveRouteId, LiveStopId), Option<NextBus>>,
}

impl<'a> Enricher<'a> {
    pub fn new(
        system: SystemId,
        index: &'a SnapshotIndex<'a>,
        graph: &'a LiveGraph,
        estimator: &'a EtaEstimator,
        geometry: &'a GeometryMemo,
        shapes: Option<ShapeSource<'a>>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            system,
            index,
            graph,
            estimator,
            geometry,
            shapes,
            now,
            etas: HashMap::new(),
        }
    }

    pub fn enrich(&mut self, skeleton: &TripSkeleton) -> Result<EnrichedTrip, EnrichError> {
        let mut segments = Vec::with_capacity(skeleton.segments().len());
        for segment in skeleton.segments() {
            let stops = segment
                .stops()
                .iter()
                .map(|id| self.index.stop(id).ok_or_else(|| EnrichError::UnknownStop(id.clone())))
                .collect::<Result<Vec<&Stop>, _>>()?;
            let coords: Vec<LatLng> = stops.iter().map(|s| s.location).collect();

            let route = self
                .index
                .route(segment.route())
                .cloned()
                .unwrap_or_else(|| Route::unnamed(segment.route().clone()));

            let next_bus = self.next_bus(segment.route(), segment.start(), &coords);
            let polyline = self.polyline(segment.route(), segment.stops(), &coords);

            segments.push(RideSegment {
                route,
                stops: stops.into_iter().map(StopRef::from).collect(),
                polyline: Some(polyline),
                next_bus,
            });
        }

        Ok(EnrichedTrip {
            skeleton: skeleton.clone(),
            segments,
        })
    }

    fn next_bus(&mut self, route: &LiveRouteId, board: &LiveStopId, coords: &[LatLng]) -> Option<NextBus> {
        let key = (route.clone(), board.clone());
        if let Some(cached) = self.etas.get(&key) {
            // Same vehicle and speed; only the ride differs per segment.
            return cached.clone().map(|mut bus| {
                bus.ride_eta_s = ride_eta_s(coords, bus.speed_m_s);
                bus.segment_eta_s = match (bus.eta_to_boarding_s, bus.ride_eta_s) {
                    (Some(b), Some(r)) => Some(b + r),
                    _ => None,
                };
                bus
            });
        }

        let chain_points: Option<Vec<LatLng>> = self.graph.chain(route).and_then(|chain| {
            chain
                .iter()
                .map(|id| self.index.stop(id).map(|s| s.location))
                .collect()
        });
        let boarding = self
            .graph
            .chain(route)
            .and_then(|chain| chain.iter().position(|id| id == board));
        let chain = match (&chain_points, boarding) {
            (Some(points), Some(boarding)) => Some(RouteChain { points, boarding }),
            _ => None,
        };

        let bus = self.estimator.next_bus(
            self.system,
            route,
            coords,
            chain,
            &self.index.snapshot.vehicles,
            self.now,
        );
        self.etas.insert(key, bus.clone());
        bus
    }

    fn polyline(&self, route: &LiveRouteId, stops: &[LiveStopId], coords: &[LatLng]) -> Vec<LatLng> {
        self.geometry.get_or_insert_with(self.system, route, stops, || {
            let (Some(board), Some(alight)) = (coords.first().copied(), coords.last().copied()) else {
                return coords.to_vec();
            };
            match self.shapes.and_then(|src| directed_shape(src, route, board, alight)) {
                Some(shape) => slice_shape(shape, board, alight),
                None => coords.to_vec(),
            }
        })
    }
}

/// The feed shape for `route`, preferring a direction that passes `board`
/// before `alight` over the route's most frequent shape overall.
fn directed_shape<'a>(src: ShapeSource<'a>, route: &LiveRouteId, board: LatLng, alight: LatLng) -> Option<&'a [LatLng]> {
    let feed_route = src.reconciler.feed_route(route)?;
    src.feed
        .directions_for_route(feed_route)
        .into_iter()
        .filter_map(|direction| src.feed.shape_for_route(feed_route, Some(direction)))
        .find(|shape| runs_forward(shape, board, alight))
        .or_else(|| src.feed.shape_for_route(feed_route, None))
}
