//! Choosing among enriched trips.
//!
//! Trips are grouped into categories first, so a trip with a live bus always
//! beats one without, whatever the other factors. Within a category fewer
//! transfers, less walking, and an earlier bus win in that order.

use std::cmp::Ordering;

use serde::Serialize;

use super::enrich::EnrichedTrip;
use super::skeleton::{Strategy, TripSkeleton};

/// Coarse preference class of a trip, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TripCategory {
    LiveDirect,
    LiveWalk,
    LiveTransfer,
    DeadDirect,
    DeadWalk,
    DeadTransfer,
}

impl TripCategory {
    pub fn of(skeleton: &TripSkeleton) -> Self {
        let transfer = skeleton.transfers > 0;
        let walk = skeleton.strategy == Strategy::WalkModified;
        match (skeleton.live, transfer, walk) {
            (true, true, _) => Self::LiveTransfer,
            (true, false, true) => Self::LiveWalk,
            (true, false, false) => Self::LiveDirect,
            (false, true, _) => Self::DeadTransfer,
            (false, false, true) => Self::DeadWalk,
            (false, false, false) => Self::DeadDirect,
        }
    }
}

/// Known ETAs before unknown ones.
fn cmp_eta(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare(a: &EnrichedTrip, b: &EnrichedTrip) -> Ordering {
    TripCategory::of(&a.skeleton)
        .cmp(&TripCategory::of(&b.skeleton))
        .then_with(|| a.skeleton.transfers.cmp(&b.skeleton.transfers))
        .then_with(|| a.skeleton.walk_m.total_cmp(&b.skeleton.walk_m))
        .then_with(|| cmp_eta(a.boarding_eta_s(), b.boarding_eta_s()))
        .then_with(|| a.skeleton.score.total_cmp(&b.skeleton.score))
        .then_with(|| a.skeleton.signature().cmp(&b.skeleton.signature()))
}

/// Rank trips best first.
pub fn rank_trips(mut trips: Vec<EnrichedTrip>) -> Vec<EnrichedTrip> {
    trips.sort_by(compare);
    trips
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LiveRouteId, LiveStopId, Route, VehicleId};
    use crate::eta::{DistanceSource, NextBus, SpeedSource};
    use crate::geo::LatLng;
    use crate::planner::skeleton::SegmentSkeleton;
    use crate::planner::types::RideSegment;

    pub(super) fn trip(live: bool, transfers: usize, strategy: Strategy, walk_m: f64, eta: Option<f64>) -> EnrichedTrip {
        let segments: Vec<SegmentSkeleton> = (0..=transfers)
            .map(|i| {
                SegmentSkeleton::new(
                    LiveRouteId::new(format!("R{i}")),
                    vec![LiveStopId::new(format!("S{i}")), LiveStopId::new(format!("S{}", i + 1))],
                )
                .unwrap()
            })
            .collect();
        let next_bus = eta.map(|s| NextBus {
            vehicle_id: VehicleId::new("1"),
            location: LatLng::new(0.0, 0.0),
            distance_to_boarding_m: s * 6.0,
            distance_source: DistanceSource::StraightLine,
            speed_m_s: 6.0,
            speed_source: SpeedSource::Fallback,
            eta_to_boarding_s: Some(s),
            eta_to_boarding_min: Some(s / 60.0),
            ride_eta_s: None,
            segment_eta_s: None,
        });
        EnrichedTrip {
            skeleton: TripSkeleton::with_score(segments, strategy, walk_m, live, 0.0).unwrap(),
            segments: vec![RideSegment {
                route: Route::unnamed(LiveRouteId::new("R0")),
                stops: vec![],
                polyline: None,
                next_bus,
            }],
        }
    }

    #[test]
    fn category_order() {
        let cases = [
            (true, 0, Strategy::Direct, TripCategory::LiveDirect),
            (true, 0, Strategy::WalkModified, TripCategory::LiveWalk),
            (true, 1, Strategy::WalkModified, TripCategory::LiveTransfer),
            (false, 0, Strategy::Direct, TripCategory::DeadDirect),
            (false, 0, Strategy::WalkModified, TripCategory::DeadWalk),
            (false, 1, Strategy::OneTransfer, TripCategory::DeadTransfer),
        ];
        for (live, transfers, strategy, expected) in cases {
            let t = trip(live, transfers, strategy, 0.0, None);
            assert_eq!(TripCategory::of(&t.skeleton), expected);
        }
        assert!(TripCategory::LiveTransfer < TripCategory::DeadDirect);
    }

    #[test]
    fn live_transfer_beats_dead_direct() {
        let ranked = rank_trips(vec![
            trip(false, 0, Strategy::Direct, 0.0, None),
            trip(true, 1, Strategy::OneTransfer, 300.0, Some(600.0)),
        ]);
        assert!(ranked[0].skeleton.live);
    }

    #[test]
    fn walking_then_eta_break_ties() {
        let ranked = rank_trips(vec![
            trip(true, 0, Strategy::WalkModified, 200.0, Some(10.0)),
            trip(true, 0, Strategy::WalkModified, 100.0, None),
            trip(true, 0, Strategy::WalkModified, 100.0, Some(90.0)),
        ]);
        assert_eq!(ranked[0].skeleton.walk_m, 100.0);
        assert_eq!(ranked[0].boarding_eta_s(), Some(90.0));
        assert_eq!(ranked[1].boarding_eta_s(), None);
        assert_eq!(ranked[2].skeleton.walk_m, 200.0);
    }
}
