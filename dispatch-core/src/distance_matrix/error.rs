use thiserror::Error;

/// Errors from [`crate::DistanceMatrixProvider::matrix`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DistanceMatrixError {
    /// No coordinates were provided.
    #[error("at least one coordinate is required")]
    EmptyInput,

    /// The remote service did not answer within the configured timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// Request URL with credentials redacted.
        url: String,
        /// Configured timeout.
        timeout_secs: u64,
    },

    /// The remote service answered with a non-success HTTP status.
    #[error("request to {url} failed with HTTP {status}: {message}")]
    HttpError {
        /// Request URL with credentials redacted.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Error detail.
        message: String,
    },

    /// The request could not be sent or the connection failed.
    #[error("network error calling {url}: {message}")]
    NetworkError {
        /// Request URL with credentials redacted.
        url: String,
        /// Error detail.
        message: String,
    },

    /// The service answered but reported a failure status.
    #[error("distance matrix service returned {status}: {message}")]
    ServiceError {
        /// Service status string such as `REQUEST_DENIED`.
        status: String,
        /// Error detail supplied by the service, if any.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("failed to parse distance matrix response: {message}")]
    ParseError {
        /// Decoder message.
        message: String,
    },

    /// The returned matrix does not match the requested point count.
    #[error("expected a {expected}x{expected} matrix, got {rows} rows")]
    DimensionMismatch {
        /// Requested side length.
        expected: usize,
        /// Rows returned.
        rows: usize,
    },

    /// The service found no route between two points.
    #[error("no route from point {from} to point {to}")]
    UnreachablePair {
        /// Origin index.
        from: usize,
        /// Destination index.
        to: usize,
    },
}
