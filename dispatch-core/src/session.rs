//! Route optimization sessions.
//!
//! A session is created up front with a name and target courier, moves to
//! `optimizing` when a run starts and ends as `completed` with its route
//! totals or `failed` with the error message in its notes.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    CourierId, DistributorId, OptimizeError, OrderId, ParseStatusError, RouteAlgorithm,
    SessionId, SessionStore, Waypoint, directions_url,
};

/// Lifecycle state of an optimization session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Created, not yet run.
    Pending,
    /// A run is in progress.
    Optimizing,
    /// A route has been saved.
    Completed,
    /// The last run failed; see the session notes.
    Failed,
}

impl SessionStatus {
    /// Database and wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Optimizing => "optimizing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "optimizing" => Ok(Self::Optimizing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(ParseStatusError {
                kind: "session",
                value: other.to_owned(),
            }),
        }
    }
}

/// A persisted optimization session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationSession {
    /// Session key.
    pub id: SessionId,
    /// Operator-supplied label.
    pub name: String,
    /// Courier whose stops are sequenced.
    pub courier_id: CourierId,
    /// Distributor that owns the session.
    pub distributor_id: DistributorId,
    /// Requested strategy.
    pub algorithm: RouteAlgorithm,
    /// Lifecycle state.
    pub status: SessionStatus,
    /// Rounded route distance once completed.
    pub total_distance_km: Option<f64>,
    /// Route duration once completed.
    pub total_duration_minutes: Option<u32>,
    /// Fuel estimate once completed.
    pub fuel_cost: Option<f64>,
    /// Score once completed.
    pub optimization_score: Option<f64>,
    /// Failure message of the last run.
    pub notes: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Start of the last run.
    pub started_at: Option<DateTime<Utc>>,
    /// Completion time.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Validated input for [`SessionStore::create_session`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSession {
    /// Operator-supplied label, never blank.
    pub name: String,
    /// Target courier.
    pub courier_id: CourierId,
    /// Owning distributor.
    pub distributor_id: DistributorId,
    /// Requested strategy.
    pub algorithm: RouteAlgorithm,
}

impl NewSession {
    /// Validate and build a session request.
    ///
    /// # Errors
    ///
    /// Returns [`OptimizeError::EmptyName`] for a blank name and
    /// [`OptimizeError::UnknownAlgorithm`] for an unrecognised strategy.
    ///
    /// # Examples
    /// ```
    /// use dispatch_core::{CourierId, DistributorId, NewSession, RouteAlgorithm};
    ///
    /// let session = NewSession::new("Morning run", CourierId(3), DistributorId(1), "nearest_neighbor")?;
    /// assert_eq!(session.algorithm, RouteAlgorithm::NearestNeighbor);
    /// assert!(NewSession::new(" ", CourierId(3), DistributorId(1), "nearest_neighbor").is_err());
    /// # Ok::<(), dispatch_core::OptimizeError>(())
    /// ```
    pub fn new(
        name: impl Into<String>,
        courier_id: CourierId,
        distributor_id: DistributorId,
        algorithm: &str,
    ) -> Result<Self, OptimizeError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(OptimizeError::EmptyName);
        }
        let algorithm = algorithm.parse::<RouteAlgorithm>()?;
        Ok(Self {
            name,
            courier_id,
            distributor_id,
            algorithm,
        })
    }
}

/// Position of an order within a saved route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSequence {
    /// Waypoint sequence; starts at `1`.
    pub sequence: u32,
    /// Delivered order.
    pub order_id: OrderId,
}

/// Summary row written alongside a completed route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// Strategy that produced the route.
    pub algorithm: RouteAlgorithm,
    /// Rounded route distance.
    pub total_distance_km: f64,
    /// Route duration.
    pub total_duration_minutes: u32,
    /// Fuel estimate.
    pub fuel_cost: f64,
    /// Score.
    pub optimization_score: f64,
    /// Waypoints including the depot.
    pub waypoint_count: u32,
    /// Sequencing time.
    pub execution_time_ms: u64,
}

/// A session with everything saved for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDetails {
    /// Session row.
    pub session: OptimizationSession,
    /// Ordered waypoints; empty until completed.
    pub waypoints: Vec<Waypoint>,
    /// Delivery order sequence.
    pub orders: Vec<OrderSequence>,
    /// Result row, present once completed.
    pub result: Option<OptimizationResult>,
    /// Directions link rebuilt from the saved waypoints.
    pub map_url: Option<String>,
}

impl SessionDetails {
    /// Assemble details, deriving the directions link from `waypoints`.
    #[must_use]
    pub fn new(
        session: OptimizationSession,
        waypoints: Vec<Waypoint>,
        orders: Vec<OrderSequence>,
        result: Option<OptimizationResult>,
    ) -> Self {
        let map_url = directions_url(&waypoints);
        Self {
            session,
            waypoints,
            orders,
            result,
            map_url,
        }
    }
}

/// Criteria for listing sessions. Unset fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFilter {
    /// Only sessions for this courier.
    pub courier_id: Option<CourierId>,
    /// Only sessions owned by this distributor.
    pub distributor_id: Option<DistributorId>,
    /// Only sessions in this state.
    pub status: Option<SessionStatus>,
}

impl SessionFilter {
    /// Whether `session` satisfies the filter.
    #[must_use]
    pub fn matches(&self, session: &OptimizationSession) -> bool {
        self.courier_id.is_none_or(|id| id == session.courier_id)
            && self.distributor_id.is_none_or(|id| id == session.distributor_id)
            && self.status.is_none_or(|status| status == session.status)
    }
}

/// 1-based page window for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Page number, starting at `1`.
    pub page: u32,
    /// Rows per page.
    pub limit: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self { page: 1, limit: 10 }
    }
}

impl Page {
    /// Build a page, clamping both values to at least `1`.
    #[must_use]
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    /// Rows to skip before this page.
    #[must_use]
    pub fn offset(self) -> u64 {
        u64::from(self.page.max(1) - 1) * u64::from(self.limit)
    }

    /// Number of pages needed for `total` rows.
    #[must_use]
    pub fn page_count(self, total: u64) -> u64 {
        total.div_ceil(u64::from(self.limit.max(1)))
    }
}

/// One page of sessions plus the unpaged total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionPage {
    /// Sessions on this page, newest first.
    pub sessions: Vec<OptimizationSession>,
    /// Window that was requested.
    pub page: Page,
    /// Matching sessions across all pages.
    pub total: u64,
    /// Pages needed for `total`.
    pub pages: u64,
}

/// Validate and persist a new pending session.
///
/// # Errors
///
/// Validation failures are returned before the store is touched.
pub fn create_session<S: SessionStore + ?Sized>(
    store: &mut S,
    name: &str,
    courier_id: CourierId,
    distributor_id: DistributorId,
    algorithm: &str,
) -> Result<SessionId, OptimizeError> {
    let request = NewSession::new(name, courier_id, distributor_id, algorithm)?;
    let id = store.create_session(&request, Utc::now())?;
    log::info!("created optimization session {id} for courier {courier_id}");
    Ok(id)
}

/// Load a session with its waypoints, order sequence and result.
///
/// # Errors
///
/// Returns [`OptimizeError::SessionNotFound`] when no such session exists.
pub fn get_session<S: SessionStore + ?Sized>(
    store: &S,
    session_id: SessionId,
) -> Result<SessionDetails, OptimizeError> {
    store
        .load_session(session_id)?
        .ok_or(OptimizeError::SessionNotFound(session_id))
}

/// Remove a session together with its waypoints, order sequence and result.
///
/// # Errors
///
/// Returns [`OptimizeError::SessionNotFound`] when no such session exists.
pub fn delete_session<S: SessionStore + ?Sized>(
    store: &mut S,
    session_id: SessionId,
) -> Result<(), OptimizeError> {
    if !store.delete_session(session_id)? {
        return Err(OptimizeError::SessionNotFound(session_id));
    }
    log::info!("deleted optimization session {session_id}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, 10, 0)]
    #[case(3, 10, 20)]
    #[case(0, 5, 0)]
    fn page_offsets(#[case] page: u32, #[case] limit: u32, #[case] offset: u64) {
        assert_eq!(Page::new(page, limit).offset(), offset);
    }

    #[rstest]
    fn page_count_rounds_up() {
        assert_eq!(Page::new(1, 10).page_count(21), 3);
        assert_eq!(Page::new(1, 10).page_count(0), 0);
    }

    #[rstest]
    fn unknown_algorithm_is_rejected() {
        let err = NewSession::new("Run", CourierId(1), DistributorId(1), "genetic")
            .expect_err("unknown algorithm");
        assert!(matches!(err, OptimizeError::UnknownAlgorithm(_)));
    }

    #[rstest]
    fn session_status_parses_back() {
        for status in [
            SessionStatus::Pending,
            SessionStatus::Optimizing,
            SessionStatus::Completed,
            SessionStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<SessionStatus>(), Ok(status));
        }
    }
}
