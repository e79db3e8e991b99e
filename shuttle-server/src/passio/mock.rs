//! In-memory live provider.
//!
//! Serves fixed snapshots as if they were live API responses. Used by the
//! planner tests and for offline development.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::domain::{LiveSnapshot, Route, Stop, SystemId, TransitSystem, Vehicle};

use super::LiveProvider;
use super::error::ProviderError;

/// Live provider backed by in-memory snapshots.
#[derive(Debug, Default)]
pub struct StaticProvider {
    systems: Mutex<HashMap<SystemId, LiveSnapshot>>,
    catalog: Mutex<Vec<TransitSystem>>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider serving a single system.
    pub fn with_system(system: SystemId, snapshot: LiveSnapshot) -> Self {
        let provider = Self::new();
        provider.set_snapshot(system, snapshot);
        provider
    }

    /// Replace the snapshot for a system.
    pub fn set_snapshot(&self, system: SystemId, snapshot: LiveSnapshot) {
        if let Ok(mut systems) = self.systems.lock() {
            systems.insert(system, snapshot);
        }
    }

    /// Replace the list returned by `list_systems`.
    pub fn set_systems(&self, systems: Vec<TransitSystem>) {
        if let Ok(mut catalog) = self.catalog.lock() {
            *catalog = systems;
        }
    }

    /// Replace only the vehicles for a system, e.g. to simulate movement.
    pub fn set_vehicles(&self, system: SystemId, vehicles: Vec<Vehicle>) {
        if let Ok(mut systems) = self.systems.lock() {
            systems.entry(system).or_default().vehicles = vehicles;
        }
    }

    /// Make every subsequent call fail as if the upstream were down.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of provider calls served so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn with_snapshot<T>(
        &self,
        system: SystemId,
        f: impl FnOnce(&LiveSnapshot) -> T,
    ) -> Result<T, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(ProviderError::Unavailable("static provider set to fail".into()));
        }
        let systems = self
            .systems
            .lock()
            .map_err(|_| ProviderError::Unavailable("static provider poisoned".into()))?;
        systems
            .get(&system)
            .map(f)
            .ok_or(ProviderError::UnknownSystem(system))
    }
}

impl LiveProvider for StaticProvider {
    async fn list_systems(&self) -> Result<Vec<TransitSystem>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(ProviderError::Unavailable("static provider set to fail".into()));
        }
        self.catalog
            .lock()
            .map(|catalog| catalog.clone())
            .map_err(|_| ProviderError::Unavailable("static provider poisoned".into()))
    }

    async fn list_stops(&self, system: SystemId) -> Result<Vec<Stop>, ProviderError> {
        self.with_snapshot(system, |s| s.stops.clone())
    }

    async fn list_routes(&self, system: SystemId) -> Result<Vec<Route>, ProviderError> {
        self.with_snapshot(system, |s| s.routes.clone())
    }

    async fn list_vehicles(&self, system: SystemId) -> Result<Vec<Vehicle>, ProviderError> {
        self.with_snapshot(system, |s| s.vehicles.clone())
    }
}
