//! Pairwise road distances and durations between coordinates.
//!
//! The [`DistanceMatrixProvider`] trait abstracts where leg costs come from.
//! [`HaversineMatrix`] answers locally from great-circle distances, remote
//! providers live in `dispatch-data`, and [`FallbackMatrix`] combines the two
//! so a failing remote service degrades to the local computation instead of
//! failing a route.

mod error;
mod fallback;
mod haversine;
mod provider;

pub use error::DistanceMatrixError;
pub use fallback::FallbackMatrix;
pub use haversine::{HaversineMatrix, MINUTES_PER_KM, estimated_leg_minutes};
pub use provider::{DistanceMatrix, DistanceMatrixProvider, Leg};
