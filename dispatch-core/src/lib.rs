//! Core domain types and algorithms for courier dispatch.
//!
//! The crate covers two workflows:
//!
//! - Batch assignment. [`AssignmentEngine::run_batch`] matches a
//!   distributor's pending orders to nearby couriers with spare capacity,
//!   balancing workload and recording an explainable audit trail.
//! - Route optimization. [`RouteOptimizer::optimize`] orders a courier's
//!   accepted stops with a nearest-neighbour heuristic over a distance
//!   matrix, then persists the route and its metrics on an optimization
//!   session.
//!
//! Persistence is abstracted behind the traits in [`store`]; the SQLite
//! implementation lives in the `dispatch-data` crate. Coordinates use the
//! `geo` convention of `x = longitude` and `y = latitude`.

#![cfg_attr(docsrs, feature(doc_cfg))]

mod assignment;
mod courier;
mod distance_matrix;
mod engine;
pub mod geo_math;
mod ids;
mod order;
mod report;
mod route;
mod session;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-support")))]
pub mod test_support;

pub use assignment::{
    AssignedOrder, Assignment, AssignmentBatch, AssignmentStatus, BatchDetail, BatchOutcome,
    BatchStatistics, CandidateSummary, ETA_HANDLING_MINUTES, ETA_MINUTES_PER_KM,
    FailedAssignment, NewAssignment, PROXIMITY_BALANCED, estimated_delivery_minutes,
};
pub use courier::{AvailableCourier, Courier, CourierStats};
pub use distance_matrix::{
    DistanceMatrix, DistanceMatrixError, DistanceMatrixProvider, FallbackMatrix, HaversineMatrix,
    Leg, MINUTES_PER_KM, estimated_leg_minutes,
};
pub use engine::{
    AssignmentConfig, AssignmentEngine, AssignmentError, CourierChoice,
    DEFAULT_MAX_ALTERNATIVES, DEFAULT_WORKLOAD_THRESHOLD, select_courier,
};
pub use geo_math::{CoordinateError, EARTH_RADIUS_KM, checked_coord, distance_between, distance_km};
pub use ids::{AssignmentId, BatchId, BuyerId, CourierId, DistributorId, OrderId, SessionId};
pub use order::{Order, OrderStatus, ParseStatusError};
pub use report::{
    AssignmentAnalytics, AssignmentSummary, DEFAULT_ASSIGNMENT_WINDOW_DAYS,
    DEFAULT_OPTIMIZATION_WINDOW_DAYS, OptimizationAnalytics, RECENT_SESSION_LIMIT,
    assignment_analytics, optimization_analytics, window_start,
};
pub use route::{
    CourierBase, DEFAULT_DEPOT_ADDRESS, DEFAULT_DEPOT_LATITUDE, DEFAULT_DEPOT_LONGITUDE, Depot,
    FUEL_LITRES_PER_KM, FUEL_PRICE_PER_LITRE, MAX_INTERMEDIATE_WAYPOINTS, OptimizeError,
    OptimizeRequest, RouteAlgorithm, RouteOptimizer, RoutePlan, RouteResult, RouteStop,
    UnknownAlgorithm, UnknownWaypointKind, Waypoint, WaypointKind, directions_url, fuel_cost,
    optimization_score, plan_nearest_neighbor, round2,
};
pub use session::{
    NewSession, OptimizationResult, OptimizationSession, OrderSequence, Page, SessionDetails,
    SessionFilter, SessionPage, SessionStatus, create_session, delete_session, get_session,
};
pub use store::{
    AssignmentStatusReport, AssignmentStore, AssignmentTransaction, BatchAnalyticsRow,
    BatchLedger, CourierDirectory, DispatchReporting, OrderIntake, SessionStore, StoreError,
};
