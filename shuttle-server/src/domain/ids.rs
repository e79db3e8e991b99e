//! Identifier types.
//!
//! Live-tracking and schedule-feed identifiers live in separate namespaces.
//! Each gets its own opaque type so a feed stop id can never be looked up in
//! the live graph by accident; crossing namespaces goes through the
//! reconciler.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::DomainError;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Arc<str>);

        impl $name {
            pub fn new(s: impl AsRef<str>) -> Self {
                Self(s.as_ref().trim().into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::new(s)
            }
        }
    };
}

string_id!(
    /// Stop id in the live-tracking namespace.
    LiveStopId
);
string_id!(
    /// Route id in the live-tracking namespace.
    LiveRouteId
);
string_id!(
    /// Stop id in the schedule-feed namespace.
    FeedStopId
);
string_id!(
    /// Route id in the schedule-feed namespace.
    FeedRouteId
);
string_id!(FeedTripId);
string_id!(ShapeId);
string_id!(
    /// Live vehicle id.
    VehicleId
);

/// A transit system served by the live-tracking provider.
///
/// System ids are positive integers.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SystemId(u32);

impl SystemId {
    pub fn new(id: u32) -> Result<Self, DomainError> {
        if id == 0 {
            return Err(DomainError::InvalidSystemId(id.to_string()));
        }
        Ok(Self(id))
    }

    pub fn parse(s: &str) -> Result<Self, DomainError> {
        let id: u32 = s
            .trim()
            .parse()
            .map_err(|_| DomainError::InvalidSystemId(s.to_string()))?;
        Self::new(id)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SystemId({})", self.0)
    }
}

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
