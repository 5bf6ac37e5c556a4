//! Response types for the Google Distance Matrix API.
//!
//! Only the fields the dispatcher reads are modelled. Distances arrive in
//! metres and durations in seconds.
//!
//! See: <https://developers.google.com/maps/documentation/distance-matrix/distance-matrix>

use serde::Deserialize;

/// Top-level Distance Matrix response.
#[derive(Debug, Deserialize)]
pub struct MatrixResponse {
    /// Request status; `"OK"` on success.
    ///
    /// Failure values include `"INVALID_REQUEST"`, `"MAX_ELEMENTS_EXCEEDED"`,
    /// `"OVER_QUERY_LIMIT"` and `"REQUEST_DENIED"`.
    pub status: String,

    /// Detail supplied with a failure status.
    #[serde(default)]
    pub error_message: Option<String>,

    /// One row per origin.
    #[serde(default)]
    pub rows: Vec<MatrixRow>,
}

impl MatrixResponse {
    /// Check if the request as a whole succeeded.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == "OK"
    }
}

/// One origin's results.
#[derive(Debug, Deserialize)]
pub struct MatrixRow {
    /// One element per destination.
    pub elements: Vec<MatrixElement>,
}

/// Result for a single origin-destination pair.
#[derive(Debug, Deserialize)]
pub struct MatrixElement {
    /// Pair status; `"OK"` when a route was found.
    pub status: String,
    /// Route length, absent unless `status` is `"OK"`.
    pub distance: Option<Measure>,
    /// Travel time, absent unless `status` is `"OK"`.
    pub duration: Option<Measure>,
}

impl MatrixElement {
    /// Check if a route was found for this pair.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == "OK"
    }
}

/// A numeric quantity with its display text.
#[derive(Debug, Deserialize)]
pub struct Measure {
    /// Metres for distances, seconds for durations.
    pub value: f64,
}
