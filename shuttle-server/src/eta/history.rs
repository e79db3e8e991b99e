//! Recent positions of live vehicles.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};

use crate::domain::{SystemId, VehicleId};
use crate::geo::LatLng;

/// Samples kept per vehicle unless configured otherwise.
pub const DEFAULT_HISTORY_CAP: usize = 4;

/// One observed vehicle position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSample {
    pub location: LatLng,
    pub at: DateTime<Utc>,
}

type Ring = Arc<Mutex<VecDeque<PositionSample>>>;

/// Process-wide ring of recent samples per `(system, vehicle)`.
///
/// The outer lock is held only long enough to find or create a vehicle's
/// ring; appends lock that ring alone.
#[derive(Debug)]
pub struct VehicleHistory {
    cap: usize,
    rings: Mutex<HashMap<(SystemId, VehicleId), Ring>>,
}

impl VehicleHistory {
    pub fn new(cap: usize) -> Self {
        Self {
            cap: cap.max(1),
            rings: Mutex::new(HashMap::new()),
        }
    }

    fn ring(&self, system: SystemId, vehicle: &VehicleId) -> Ring {
        let mut rings = self.rings.lock().unwrap_or_else(PoisonError::into_inner);
        rings
            .entry((system, vehicle.clone()))
            .or_insert_with(|| Arc::new(Mutex::new(VecDeque::with_capacity(self.cap))))
            .clone()
    }

    /// Append a sample and return the vehicle's samples, oldest first.
    ///
    /// A sample no newer than the last one recorded is ignored, so looking
    /// at the same vehicle twice in one request does not evict history.
    pub fn record(
        &self,
        system: SystemId,
        vehicle: &VehicleId,
        sample: PositionSample,
    ) -> Vec<PositionSample> {
        let ring = self.ring(system, vehicle);
        let mut samples = ring.lock().unwrap_or_else(PoisonError::into_inner);

        if samples.back().is_none_or(|last| sample.at > last.at) {
            samples.push_back(sample);
            while samples.len() > self.cap {
                samples.pop_front();
            }
        }
        samples.iter().copied().collect()
    }

    /// The vehicle's samples, oldest first.
    pub fn samples(&self, system: SystemId, vehicle: &VehicleId) -> Vec<PositionSample> {
        let rings = self.rings.lock().unwrap_or_else(PoisonError::into_inner);
        match rings.get(&(system, vehicle.clone())) {
            Some(ring) => ring
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .copied()
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn vehicle_count(&self) -> usize {
        self.rings.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl Default for VehicleHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAP)
    }
}
