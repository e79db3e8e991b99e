//! Domain types for the shuttle trip planner.
//!
//! Identifier types for both namespaces, the live-tracking records, and
//! input validation. Types enforce their invariants at construction time.

mod error;
mod ids;
mod transit;

pub use error::DomainError;
pub use ids::{
    FeedRouteId, FeedStopId, FeedTripId, LiveRouteId, LiveStopId, ShapeId, SystemId, VehicleId,
};
pub use transit::{
    LiveSnapshot, Route, SnapshotIndex, Stop, TransitSystem, Vehicle, validate_coordinate,
};
