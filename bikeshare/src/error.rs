//! Error types for the bikeshare library.

use thiserror::Error;

/// Errors that can occur when fetching feeds or answering queries.
#[derive(Error, Debug)]
pub enum BikeshareError {
    /// A query argument is out of range or not recognised.
    ///
    /// Raised before any upstream request is made.
    #[error("Invalid argument `{field}`: {reason}")]
    InvalidArgument { field: &'static str, reason: String },

    /// No snapshot has ever been obtained and the refresh failed.
    #[error("Feed unavailable: {reason}")]
    FeedUnavailable { reason: String },

    /// Retrieving a single upstream document failed.
    #[error("Failed to fetch {feed}: {reason}")]
    FetchFailed { feed: String, reason: String },

    /// The discovery document does not list the requested feed.
    #[error("Feed {feed} not listed in discovery document")]
    FeedNotFound { feed: String },

    /// A document could not be parsed as the expected GBFS shape.
    #[error("Failed to parse {feed}: {source}")]
    Parse {
        feed: String,
        #[source]
        source: serde_json::Error,
    },

    /// IO error when reading local feed files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client error.
    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl BikeshareError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        BikeshareError::InvalidArgument {
            field,
            reason: reason.into(),
        }
    }

    /// Whether the caller can fix this error by changing the request.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, BikeshareError::InvalidArgument { .. })
    }
}

/// Result type alias using [`BikeshareError`].
pub type Result<T> = std::result::Result<T, BikeshareError>;
