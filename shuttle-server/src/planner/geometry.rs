//! Memo of segment polylines.
//!
//! Slicing a feed shape is pure but not free, and the same few segments are
//! requested over and over. The memo is bounded by clearing it outright
//! when full.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::domain::{LiveRouteId, LiveStopId, SystemId};
use crate::geo::LatLng;

/// Default number of polylines kept before the memo is cleared.
pub const DEFAULT_GEOMETRY_CAP: usize = 1_000;

type GeometryKey = (SystemId, LiveRouteId, Vec<LiveStopId>);

/// Polylines keyed by system, route, and the segment's stop ids.
#[derive(Debug)]
pub struct GeometryMemo {
    cap: usize,
    entries: Mutex<HashMap<GeometryKey, Vec<LatLng>>>,
}

impl GeometryMemo {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// The memoised polyline, computing and storing it on a miss.
    pub fn get_or_insert_with(
        &self,
        system: SystemId,
        route: &LiveRouteId,
        stops: &[LiveStopId],
        compute: impl FnOnce() -> Vec<LatLng>,
    ) -> Vec<LatLng> {
        let key = (system, route.clone(), stops.to_vec());
        if let Some(hit) = self.lock().get(&key) {
            return hit.clone();
        }

        let polyline = compute();
        let mut entries = self.lock();
        if entries.len() >= self.cap {
            debug!(entries = entries.len(), "geometry memo full, clearing");
            entries.clear();
        }
        entries.insert(key, polyline.clone());
        polyline
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<GeometryKey, Vec<LatLng>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for GeometryMemo {
    fn default() -> Self {
        Self::new(DEFAULT_GEOMETRY_CAP)
    }
}
