//! Facade crate for the courier dispatch engine.
//!
//! This crate re-exports the core domain types and algorithms, and exposes
//! the SQLite store and HTTP distance matrix provider behind the
//! `store-sqlite` feature.

#![forbid(unsafe_code)]

pub use dispatch_core::{
    AssignmentConfig, AssignmentEngine, AssignmentError, AssignmentStatusReport, AssignmentStore,
    BatchOutcome, CourierId, DispatchReporting, DistanceMatrixError, DistanceMatrixProvider,
    DistributorId, FallbackMatrix, HaversineMatrix, OptimizeError, OptimizeRequest, OrderId, Page,
    RouteOptimizer, RoutePlan, RouteResult, SessionDetails, SessionFilter, SessionId,
    SessionStore, StoreError, assignment_analytics, create_session, delete_session,
    distance_km, get_session, optimization_analytics,
};

#[cfg(feature = "store-sqlite")]
pub use dispatch_data::routing::{HttpDistanceMatrixConfig, HttpDistanceMatrixProvider};
#[cfg(feature = "store-sqlite")]
pub use dispatch_data::sqlite::{SqliteDispatchStore, SqliteStoreError};
