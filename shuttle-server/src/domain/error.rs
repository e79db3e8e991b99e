//! Domain error types.
//!
//! These errors represent input validation failures. They are raised before
//! any planning work starts.

/// Domain-level validation errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    /// Latitude outside [-90, 90] or not finite
    #[error("invalid latitude: {0}")]
    InvalidLatitude(f64),

    /// Longitude outside [-180, 180] or not finite
    #[error("invalid longitude: {0}")]
    InvalidLongitude(f64),

    /// System id is not a positive integer
    #[error("invalid system id: {0}")]
    InvalidSystemId(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = DomainError::InvalidLatitude(91.0);
        assert_eq!(err.to_string(), "invalid latitude: 91");

        let err = DomainError::InvalidLongitude(-200.5);
        assert_eq!(err.to_string(), "invalid longitude: -200.5");

        let err = DomainError::InvalidSystemId("abc".into());
        assert_eq!(err.to_string(), "invalid system id: abc");
    }
}
