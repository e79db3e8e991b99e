//! Live-tracking provider (PassioGO).
//!
//! The planner consumes three queries per system: stops with their route
//! positions, routes, and vehicles. A fourth lists the systems themselves. [`LiveProvider`] abstracts them so the
//! planner can be tested with [`StaticProvider`].
//!
//! Key characteristics of the upstream:
//! - Ids and coordinates arrive as either numbers or strings
//! - A vehicle reports its route under one of several keys, singular or list
//! - Data is only as fresh as the last fetch; nothing is stored locally

mod client;
mod convert;
mod error;
mod mock;
mod types;

use std::future::Future;

use crate::domain::{LiveSnapshot, Route, Stop, SystemId, TransitSystem, Vehicle};

pub use client::{PassioClient, PassioConfig};
pub use convert::{convert_routes, convert_stops, convert_systems, convert_vehicles, route_keys};
pub use error::ProviderError;
pub use mock::StaticProvider;
pub use types::{
    BusesResponse, RawRoute, RawStop, RawSystem, RoutesResponse, StopsResponse, SystemsResponse,
};

/// Source of live stop, route, and vehicle records.
pub trait LiveProvider: Send + Sync {
    /// Every system the provider serves.
    fn list_systems(&self) -> impl Future<Output = Result<Vec<TransitSystem>, ProviderError>> + Send;

    fn list_stops(
        &self,
        system: SystemId,
    ) -> impl Future<Output = Result<Vec<Stop>, ProviderError>> + Send;

    fn list_routes(
        &self,
        system: SystemId,
    ) -> impl Future<Output = Result<Vec<Route>, ProviderError>> + Send;

    fn list_vehicles(
        &self,
        system: SystemId,
    ) -> impl Future<Output = Result<Vec<Vehicle>, ProviderError>> + Send;
}

/// Fetch all three record sets concurrently.
pub async fn fetch_snapshot<P: LiveProvider>(
    provider: &P,
    system: SystemId,
) -> Result<LiveSnapshot, ProviderError> {
    let (stops, routes, vehicles) = futures::try_join!(
        provider.list_stops(system),
        provider.list_routes(system),
        provider.list_vehicles(system),
    )?;

    Ok(LiveSnapshot {
        stops,
        routes,
        vehicles,
    })
}
