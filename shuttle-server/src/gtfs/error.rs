//! Schedule-feed error types.

/// Errors that can occur while loading a schedule feed.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// A required table could not be read
    #[error("failed to read {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },

    /// A row could not be parsed
    #[error("failed to parse {file}: {source}")]
    Csv {
        file: String,
        #[source]
        source: csv::Error,
    },
}
