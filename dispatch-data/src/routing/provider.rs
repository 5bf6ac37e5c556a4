//! HTTP-based `DistanceMatrixProvider` using the Google Distance Matrix API.
//!
//! [`HttpDistanceMatrixProvider`] asks the remote service for driving
//! distances and durations between every pair of points in one request.
//!
//! # Architecture
//!
//! The [`DistanceMatrixProvider`] trait is synchronous so the route optimizer
//! stays embeddable in synchronous callers. This provider bridges the async
//! HTTP call to the sync interface by blocking on a Tokio runtime it owns.
//!
//! # Example
//!
//! ```no_run
//! use dispatch_data::routing::HttpDistanceMatrixProvider;
//! use dispatch_core::DistanceMatrixProvider;
//! use geo::Coord;
//!
//! let provider = HttpDistanceMatrixProvider::new("https://maps.googleapis.com/maps/api", "key")?;
//! let points = [Coord { x: 31.2357, y: 30.0444 }, Coord { x: 31.2400, y: 30.0600 }];
//!
//! let matrix = provider.matrix(&points)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::time::Duration;

use dispatch_core::{DistanceMatrix, DistanceMatrixError, DistanceMatrixProvider, Leg};
use geo::Coord;
use log::debug;
use reqwest::Client;
use thiserror::Error;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};
use url::Url;

use super::google::{MatrixElement, MatrixResponse};

/// Error type for [`HttpDistanceMatrixProvider`] construction failures.
#[derive(Debug, Error)]
pub enum ProviderBuildError {
    /// The base URL could not be parsed.
    #[error("invalid distance matrix base URL {url:?}: {source}")]
    BaseUrl {
        /// Rejected base URL.
        url: String,
        /// Parser error.
        #[source]
        source: url::ParseError,
    },
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
    /// Failed to build the Tokio runtime.
    #[error("failed to build Tokio runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Default base URL of the Google Maps web services.
pub const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api";

/// Default user agent for distance matrix requests.
pub const DEFAULT_USER_AGENT: &str = "courier-dispatch/0.1";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Configuration for [`HttpDistanceMatrixProvider`].
#[derive(Clone)]
pub struct HttpDistanceMatrixConfig {
    /// Base URL of the maps API, without the `/distancematrix/json` suffix.
    pub base_url: String,
    /// API key sent as the `key` query parameter.
    pub api_key: Option<String>,
    /// Request timeout duration.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl std::fmt::Debug for HttpDistanceMatrixConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDistanceMatrixConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl Default for HttpDistanceMatrixConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl HttpDistanceMatrixConfig {
    /// Create a new configuration with the given base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// HTTP-based distance matrix provider.
///
/// # Runtime behaviour
///
/// Outside any Tokio runtime the provider blocks on its own
/// `current_thread` runtime. Inside a multi-threaded runtime it uses that
/// runtime's handle with [`tokio::task::block_in_place`]. Inside a
/// `current_thread` runtime it falls back to its own runtime, which can
/// deadlock if the caller's runtime drives IO this request depends on.
pub struct HttpDistanceMatrixProvider {
    client: Client,
    config: HttpDistanceMatrixConfig,
    endpoint: Url,
    runtime: Runtime,
}

impl std::fmt::Debug for HttpDistanceMatrixProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDistanceMatrixProvider")
            .field("client", &self.client)
            .field("config", &self.config)
            .field("endpoint", &self.endpoint.as_str())
            .field("runtime", &"<tokio::runtime::Runtime>")
            .finish()
    }
}

impl HttpDistanceMatrixProvider {
    /// Create a provider for `base_url` authenticated with `api_key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client or Tokio
    /// runtime fails to build.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, ProviderBuildError> {
        Self::with_config(HttpDistanceMatrixConfig::new(base_url).with_api_key(api_key))
    }

    /// Create a provider with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client or Tokio
    /// runtime fails to build.
    pub fn with_config(config: HttpDistanceMatrixConfig) -> Result<Self, ProviderBuildError> {
        let endpoint = endpoint_url(&config.base_url)?;
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
            .map_err(ProviderBuildError::HttpClient)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ProviderBuildError::Runtime)?;
        Ok(Self {
            client,
            config,
            endpoint,
            runtime,
        })
    }

    /// Build the request URL for `points`.
    ///
    /// Origins and destinations are both the full point list, each encoded
    /// as `lat,lng` and separated by `|`.
    fn build_matrix_url(&self, points: &[Coord<f64>]) -> Url {
        let places = points
            .iter()
            .map(|point| format!("{},{}", point.y, point.x))
            .collect::<Vec<_>>()
            .join("|");
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("origins", &places)
                .append_pair("destinations", &places)
                .append_pair("units", "metric")
                .append_pair("mode", "driving");
            if let Some(key) = &self.config.api_key {
                query.append_pair("key", key);
            }
        }
        url
    }

    /// Fetch the matrix asynchronously.
    async fn fetch_matrix_async(
        &self,
        points: &[Coord<f64>],
    ) -> Result<DistanceMatrix, DistanceMatrixError> {
        let url = self.build_matrix_url(points);
        // Errors report the endpoint only so the key never reaches logs.
        let shown = self.endpoint.as_str();
        debug!("requesting {n}x{n} distance matrix from {shown}", n = points.len());

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(err, shown))?
            .error_for_status()
            .map_err(|err| self.convert_reqwest_error(err, shown))?;

        let matrix_response: MatrixResponse =
            response
                .json()
                .await
                .map_err(|err| DistanceMatrixError::ParseError {
                    message: err.without_url().to_string(),
                })?;

        convert_response(matrix_response, points.len())
    }

    /// Convert a reqwest error to a `DistanceMatrixError`.
    ///
    /// The request URL is stripped from the message since it carries the key.
    fn convert_reqwest_error(&self, error: reqwest::Error, url: &str) -> DistanceMatrixError {
        if error.is_timeout() {
            return DistanceMatrixError::Timeout {
                url: url.to_owned(),
                timeout_secs: self.config.timeout.as_secs(),
            };
        }

        if let Some(status) = error.status() {
            return DistanceMatrixError::HttpError {
                url: url.to_owned(),
                status: status.as_u16(),
                message: error.without_url().to_string(),
            };
        }

        DistanceMatrixError::NetworkError {
            url: url.to_owned(),
            message: error.without_url().to_string(),
        }
    }
}

fn endpoint_url(base_url: &str) -> Result<Url, ProviderBuildError> {
    let raw = format!("{}/distancematrix/json", base_url.trim_end_matches('/'));
    Url::parse(&raw).map_err(|source| ProviderBuildError::BaseUrl {
        url: base_url.to_owned(),
        source,
    })
}

/// Convert a service response into an `n x n` leg matrix.
fn convert_response(
    response: MatrixResponse,
    size: usize,
) -> Result<DistanceMatrix, DistanceMatrixError> {
    if !response.is_ok() {
        return Err(DistanceMatrixError::ServiceError {
            status: response.status,
            message: response.error_message.unwrap_or_default(),
        });
    }

    if response.rows.len() != size || response.rows.iter().any(|row| row.elements.len() != size) {
        return Err(DistanceMatrixError::DimensionMismatch {
            expected: size,
            rows: response.rows.len(),
        });
    }

    response
        .rows
        .into_iter()
        .enumerate()
        .map(|(from, row)| {
            row.elements
                .into_iter()
                .enumerate()
                .map(|(to, element)| convert_element(&element, from, to))
                .collect()
        })
        .collect()
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "callers pass finite non-negative seconds; `as` saturates above u32::MAX"
)]
fn seconds_to_minutes(seconds: f64) -> u32 {
    (seconds / 60.0).round() as u32
}

fn convert_element(
    element: &MatrixElement,
    from: usize,
    to: usize,
) -> Result<Leg, DistanceMatrixError> {
    let unreachable = DistanceMatrixError::UnreachablePair { from, to };
    if !element.is_ok() {
        return Err(unreachable);
    }
    match (&element.distance, &element.duration) {
        (Some(distance), Some(duration))
            if distance.value.is_finite()
                && distance.value >= 0.0
                && duration.value.is_finite()
                && duration.value >= 0.0 =>
        {
            Ok(Leg {
                distance_km: distance.value / 1000.0,
                duration_minutes: seconds_to_minutes(duration.value),
            })
        }
        _ => Err(unreachable),
    }
}

impl DistanceMatrixProvider for HttpDistanceMatrixProvider {
    /// Fetch the leg matrix for `points`.
    ///
    /// # Runtime requirements
    ///
    /// When called from within an existing Tokio runtime, the runtime must be
    /// multi-threaded. See the type-level documentation for the fallback.
    fn matrix(&self, points: &[Coord<f64>]) -> Result<DistanceMatrix, DistanceMatrixError> {
        if points.is_empty() {
            return Err(DistanceMatrixError::EmptyInput);
        }

        let future = self.fetch_matrix_async(points);
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(future))
            }
            _ => self.runtime.block_on(future),
        }
    }
}
