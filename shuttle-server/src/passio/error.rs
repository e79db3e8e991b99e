//! Live-tracking provider error types.

use crate::domain::SystemId;

/// Errors from the live-tracking provider.
///
/// Every variant means the upstream is unavailable for this request; the
/// planner does no work without a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider returned an error status code
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Response body did not match any known shape
    #[error("JSON parse error: {message}")]
    Json {
        message: String,
        body: Option<String>,
    },

    /// Provider has no data for this system
    #[error("unknown system {0}")]
    UnknownSystem(SystemId),

    /// Provider unreachable for some other reason
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}
