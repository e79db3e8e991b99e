//! Trip planning errors.

use std::fmt;

use crate::domain::{DomainError, LiveStopId};
use crate::passio::ProviderError;

/// Which end of a trip an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Origin,
    Destination,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Origin => f.write_str("origin"),
            Endpoint::Destination => f.write_str("destination"),
        }
    }
}

/// Errors that can occur while planning a trip.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// Request failed validation
    #[error(transparent)]
    Invalid(#[from] DomainError),

    /// No stop close enough to snap to
    #[error("no stop found near {0}")]
    NoStopFound(Endpoint),

    /// Both ends snapped, but nothing connects them
    #[error("no path found between {from} and {to}")]
    NoPathFound { from: LiveStopId, to: LiveStopId },

    /// Live provider could not be reached
    #[error("upstream unavailable: {0}")]
    Upstream(#[from] ProviderError),

    /// Every candidate failed enrichment
    #[error("failed to enrich any of {candidates} candidate trips")]
    EnrichmentFailed { candidates: usize },
}

/// Why a single candidate could not be enriched.
///
/// These are logged and the candidate dropped; only when every candidate
/// fails does planning fail.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EnrichError {
    /// The cached graph refers to a stop missing from the current snapshot
    #[error("stop {0} not in current snapshot")]
    UnknownStop(LiveStopId),
}
