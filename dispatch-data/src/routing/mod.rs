//! Remote distance matrix providers.
//!
//! [`HttpDistanceMatrixProvider`] implements
//! [`dispatch_core::DistanceMatrixProvider`] against the Google Distance
//! Matrix API. The route optimizer wraps it in a
//! [`FallbackMatrix`](dispatch_core::FallbackMatrix), so any failure here
//! degrades to the local haversine estimate rather than failing the route.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use dispatch_core::{CourierId, OptimizeRequest, RouteOptimizer, SessionId};
//! use dispatch_data::routing::{HttpDistanceMatrixConfig, HttpDistanceMatrixProvider};
//! use dispatch_data::sqlite::SqliteDispatchStore;
//!
//! let config = HttpDistanceMatrixConfig::new("https://maps.googleapis.com/maps/api")
//!     .with_api_key("my-key")
//!     .with_timeout(Duration::from_secs(5));
//! let provider = HttpDistanceMatrixProvider::with_config(config)?;
//! let optimizer = RouteOptimizer::with_remote(provider);
//!
//! let mut store = SqliteDispatchStore::open_in_memory()?;
//! let request = OptimizeRequest::new(SessionId(1), CourierId(7));
//! let result = optimizer.optimize(&mut store, &request)?;
//! println!("{} km", result.plan.total_distance_km);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod google;
mod provider;

#[doc(hidden)]
pub mod test_support;

pub use provider::{
    DEFAULT_BASE_URL, DEFAULT_USER_AGENT, HttpDistanceMatrixConfig, HttpDistanceMatrixProvider,
    ProviderBuildError,
};
