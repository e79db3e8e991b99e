//! Shuttle trip planner.
//!
//! This module answers: "which shuttle(s) should I take from here to there,
//! and when does the next one reach my stop?"
//!
//! Planning runs in stages. Both ends snap to their nearest stops; cheap
//! candidate skeletons are generated (direct rides, one-transfer paths from
//! a bounded search, and walks to nearby alternate stops) and scored; only
//! the best few are enriched with live ETAs and geometry; the enriched trips
//! are ranked and the winner's segments merged for display.

mod candidates;
mod compress;
mod config;
mod enrich;
mod error;
mod geometry;
mod paths;
mod rank;
mod skeleton;
mod trip;
mod types;

pub use candidates::{FeedContext, SearchContext, generate_candidates};
pub use compress::{RouteRun, compress_routes, merge_display};
pub use config::PlannerConfig;
pub use enrich::{EnrichedTrip, Enricher, ShapeSource};
pub use error::{EnrichError, Endpoint, PlanError};
pub use geometry::{DEFAULT_GEOMETRY_CAP, GeometryMemo};
pub use paths::{GraphPath, PathLimits, PathSearchResult, find_paths};
pub use rank::{TripCategory, rank_trips};
pub use skeleton::{SegmentSkeleton, Strategy, TripSkeleton};
pub use trip::{FeedSource, Planner};
pub use types::{CandidateSummary, RideSegment, Snap, StopRef, Trip, TripRequest};
