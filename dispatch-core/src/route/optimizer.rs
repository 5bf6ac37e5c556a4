//! Session-driven route optimization.

use chrono::Utc;
use geo::Coord;
use log::{debug, info, warn};
use thiserror::Error;

use super::{
    Depot, RouteAlgorithm, RoutePlan, RouteResult, RouteStop, UnknownAlgorithm, directions_url,
    plan_nearest_neighbor,
};
use crate::{
    CourierId, DistanceMatrixError, DistanceMatrixProvider, DistributorId, FallbackMatrix,
    HaversineMatrix, SessionId, SessionStatus, SessionStore, StoreError,
};

/// Errors from creating or running an optimization session.
#[derive(Debug, Error)]
pub enum OptimizeError {
    /// The session name was blank.
    #[error("session name must not be empty")]
    EmptyName,
    /// The requested algorithm does not exist.
    #[error(transparent)]
    UnknownAlgorithm(#[from] UnknownAlgorithm),
    /// No session has the requested id.
    #[error("optimization session {0} not found")]
    SessionNotFound(SessionId),
    /// The request names a different courier than the session.
    #[error("session {session_id} belongs to courier {expected}, not {requested}")]
    CourierMismatch {
        /// Session being optimized.
        session_id: SessionId,
        /// Courier recorded on the session.
        expected: CourierId,
        /// Courier named in the request.
        requested: CourierId,
    },
    /// The session already has a saved route.
    #[error("optimization session {0} already has a saved route")]
    AlreadyOptimized(SessionId),
    /// The courier has no open stops to sequence.
    #[error("no orders found for optimization for courier {0}")]
    NoStops(CourierId),
    /// The courier does not exist or is inactive.
    #[error("courier {0} not found or inactive")]
    CourierNotFound(CourierId),
    /// The leg matrix could not be computed.
    #[error(transparent)]
    DistanceMatrix(#[from] DistanceMatrixError),
    /// A store read or status update failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Saving the route failed; the session has been marked failed.
    #[error("failed to save route for session {session_id}")]
    Persistence {
        /// Session that was being saved.
        session_id: SessionId,
        /// Underlying store failure.
        #[source]
        source: StoreError,
    },
}

impl OptimizeError {
    /// Whether the error was raised before anything was written.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyName
                | Self::UnknownAlgorithm(_)
                | Self::SessionNotFound(_)
                | Self::CourierMismatch { .. }
                | Self::AlreadyOptimized(_)
                | Self::NoStops(_)
                | Self::CourierNotFound(_)
        )
    }
}

/// Input to [`RouteOptimizer::optimize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizeRequest {
    /// Session to run.
    pub session_id: SessionId,
    /// Courier whose stops are sequenced; must match the session.
    pub courier_id: CourierId,
    /// Restrict stops to one distributor.
    pub distributor_id: Option<DistributorId>,
    /// Strategy name.
    pub algorithm: String,
}

impl OptimizeRequest {
    /// Request using the default algorithm and no distributor filter.
    #[must_use]
    pub fn new(session_id: SessionId, courier_id: CourierId) -> Self {
        Self {
            session_id,
            courier_id,
            distributor_id: None,
            algorithm: RouteAlgorithm::default().as_str().to_owned(),
        }
    }

    /// Restrict stops to `distributor_id`.
    #[must_use]
    pub fn with_distributor(mut self, distributor_id: DistributorId) -> Self {
        self.distributor_id = Some(distributor_id);
        self
    }

    /// Use the strategy named `algorithm`.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm = algorithm.into();
        self
    }
}

/// Sequences a courier's open stops and saves the route on a session.
///
/// Leg costs come from a [`FallbackMatrix`]: a configured remote provider is
/// consulted first and any failure degrades to haversine distances.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use geo::Coord;
/// use dispatch_core::{Depot, OrderId, OrderStatus, RouteAlgorithm, RouteOptimizer, RouteStop};
///
/// let stop = RouteStop {
///     order_id: OrderId(1),
///     location: Coord { x: 31.25, y: 30.06 },
///     address: "Garden City".into(),
///     status: OrderStatus::Accepted,
///     created_at: Utc::now(),
/// };
/// let plan = RouteOptimizer::new().plan(RouteAlgorithm::NearestNeighbor, &Depot::default(), &[stop])?;
/// assert_eq!(plan.waypoints.len(), 2);
/// # Ok::<(), dispatch_core::DistanceMatrixError>(())
/// ```
#[derive(Debug, Clone)]
pub struct RouteOptimizer<P = HaversineMatrix> {
    matrix: FallbackMatrix<P>,
}

impl RouteOptimizer<HaversineMatrix> {
    /// Optimizer that only uses haversine distances.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            matrix: FallbackMatrix::local_only(),
        }
    }
}

impl Default for RouteOptimizer<HaversineMatrix> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: DistanceMatrixProvider> RouteOptimizer<P> {
    /// Optimizer that prefers `provider` for leg costs.
    #[must_use]
    pub fn with_remote(provider: P) -> Self {
        Self {
            matrix: FallbackMatrix::with_primary(provider),
        }
    }

    /// Sequence `stops` from `depot` without touching any store.
    ///
    /// # Errors
    ///
    /// Only fails if the leg matrix cannot be built, which the local
    /// fallback rules out for a non-empty point set.
    pub fn plan(
        &self,
        algorithm: RouteAlgorithm,
        depot: &Depot,
        stops: &[RouteStop],
    ) -> Result<RoutePlan, DistanceMatrixError> {
        let points: Vec<Coord<f64>> = std::iter::once(depot.location)
            .chain(stops.iter().map(|stop| stop.location))
            .collect();
        let legs = self.matrix.resolve(&points)?;
        Ok(match algorithm {
            RouteAlgorithm::NearestNeighbor => plan_nearest_neighbor(depot, stops, &legs),
        })
    }

    /// Run `request` against `store` and save the resulting route.
    ///
    /// Validation happens first and leaves the session untouched: unknown
    /// algorithm, missing session, courier mismatch, a session that is
    /// already completed, no open stops, missing or inactive courier. A saved
    /// route is final; create a new session to plan again. Once the session
    /// is marked `optimizing`, any failure marks it `failed` with the error
    /// message in its notes before the error is returned.
    ///
    /// # Errors
    ///
    /// See [`OptimizeError`].
    pub fn optimize<S: SessionStore + ?Sized>(
        &self,
        store: &mut S,
        request: &OptimizeRequest,
    ) -> Result<RouteResult, OptimizeError> {
        let algorithm = request.algorithm.parse::<RouteAlgorithm>()?;
        let session = store
            .session(request.session_id)?
            .ok_or(OptimizeError::SessionNotFound(request.session_id))?;
        if session.courier_id != request.courier_id {
            return Err(OptimizeError::CourierMismatch {
                session_id: session.id,
                expected: session.courier_id,
                requested: request.courier_id,
            });
        }
        if session.status == SessionStatus::Completed {
            return Err(OptimizeError::AlreadyOptimized(session.id));
        }

        let stops = store.route_stops(request.courier_id, request.distributor_id)?;
        if stops.is_empty() {
            return Err(OptimizeError::NoStops(request.courier_id));
        }
        let depot = match store.courier_base(request.courier_id)? {
            Some(base) if base.is_active => base.depot.unwrap_or_default(),
            _ => return Err(OptimizeError::CourierNotFound(request.courier_id)),
        };

        match self.run(store, session.id, algorithm, &depot, &stops) {
            Ok(plan) => {
                info!(
                    "session {} completed: {} stops, {} km, score {:.1}",
                    session.id,
                    stops.len(),
                    plan.total_distance_km,
                    plan.optimization_score
                );
                let map_url = directions_url(&plan.waypoints);
                Ok(RouteResult {
                    session_id: session.id,
                    plan,
                    map_url,
                })
            }
            Err(err) => {
                warn!("session {} failed: {err}", session.id);
                if let Err(mark_err) = store.mark_failed(session.id, &failure_notes(&err)) {
                    warn!("could not mark session {} failed: {mark_err}", session.id);
                }
                Err(err)
            }
        }
    }

    fn run<S: SessionStore + ?Sized>(
        &self,
        store: &mut S,
        session_id: SessionId,
        algorithm: RouteAlgorithm,
        depot: &Depot,
        stops: &[RouteStop],
    ) -> Result<RoutePlan, OptimizeError> {
        store.mark_optimizing(session_id, Utc::now())?;
        let plan = self.plan(algorithm, depot, stops)?;
        debug!(
            "session {session_id}: sequenced {} waypoints in {} ms",
            plan.waypoints.len(),
            plan.execution_time_ms
        );
        store
            .save_route(session_id, &plan, Utc::now())
            .map_err(|source| OptimizeError::Persistence { session_id, source })?;
        Ok(plan)
    }
}

/// Message stored in the notes of a failed session.
fn failure_notes(err: &OptimizeError) -> String {
    use std::error::Error as _;

    let mut notes = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        notes.push_str(": ");
        notes.push_str(&cause.to_string());
        source = cause.source();
    }
    notes
}
