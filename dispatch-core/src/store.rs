//! Persistence seams for the dispatch engine.
//!
//! The engine never talks to a database directly. Each concern is a trait
//! with an explicit handle passed per call:
//!
//! - [`CourierDirectory`] lists dispatchable couriers with their workload.
//! - [`OrderIntake`] lists orders waiting for a courier.
//! - [`BatchLedger`] appends assignment batches and their audit rows.
//! - [`AssignmentStore`] opens the single transaction a batch runs in.
//! - [`SessionStore`] owns optimization sessions and their saved routes.
//! - [`DispatchReporting`] serves read-only dashboards.
//!
//! `dispatch-data` implements all of them over SQLite; the in-memory
//! `MemoryStore` in the `test_support` module backs unit and behaviour tests.

use std::error::Error as StdError;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    AssignmentBatch, AssignmentId, AvailableCourier, BatchDetail, BatchId, BatchStatistics,
    CourierBase, CourierId, DistributorId, NewAssignment, NewSession, OptimizationSession, Order,
    OrderId, Page, RoutePlan, RouteStop, SessionDetails, SessionFilter, SessionId, SessionPage,
};

/// Errors surfaced by store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend failed while performing `operation`.
    #[error("store operation `{operation}` failed")]
    Backend {
        /// Short name of the failing operation.
        operation: &'static str,
        /// Backend-specific cause.
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    /// A referenced row does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Table or entity name.
        entity: &'static str,
        /// Missing key.
        id: i64,
    },
    /// A write-once row already exists.
    #[error("{entity} {id} already exists")]
    AlreadyExists {
        /// Table or entity name.
        entity: &'static str,
        /// Conflicting key.
        id: i64,
    },
    /// A stored row could not be turned into a domain value.
    #[error("{entity} {id} is invalid: {reason}")]
    InvalidRow {
        /// Table or entity name.
        entity: &'static str,
        /// Offending key.
        id: i64,
        /// What was wrong with it.
        reason: String,
    },
}

impl StoreError {
    /// Wrap a backend error with the name of the operation that raised it.
    pub fn backend<E>(operation: &'static str, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Backend {
            operation,
            source: Box::new(source),
        }
    }
}

/// Dispatchable couriers.
pub trait CourierDirectory {
    /// Couriers that are active, online, have a depot and spare capacity
    /// today, ordered by current workload, then name, then id.
    ///
    /// Couriers are shared across distributors; `distributor_id` is accepted
    /// for symmetry with [`OrderIntake`].
    fn available_couriers(
        &self,
        distributor_id: DistributorId,
    ) -> Result<Vec<AvailableCourier>, StoreError>;
}

/// Orders awaiting a courier.
pub trait OrderIntake {
    /// Pending orders of `distributor_id` ordered by priority (highest first),
    /// then creation time, then id.
    fn unassigned_orders(&self, distributor_id: DistributorId) -> Result<Vec<Order>, StoreError>;
}

/// Append-only record of assignment batches.
pub trait BatchLedger {
    /// Insert the summary row for a new batch.
    fn insert_batch(
        &mut self,
        distributor_id: DistributorId,
        algorithm: &str,
        created_at: DateTime<Utc>,
    ) -> Result<BatchId, StoreError>;

    /// Insert an assignment in the `assigned` state.
    fn insert_assignment(
        &mut self,
        assignment: &NewAssignment,
        assigned_at: DateTime<Utc>,
    ) -> Result<AssignmentId, StoreError>;

    /// Record the rank and runner-up candidates for an assignment.
    fn insert_batch_detail(&mut self, detail: &BatchDetail) -> Result<(), StoreError>;

    /// Move an order from `pending` to `accepted`.
    fn mark_order_accepted(&mut self, order_id: OrderId) -> Result<(), StoreError>;

    /// Write the final counters onto the batch row.
    fn finish_batch(
        &mut self,
        batch_id: BatchId,
        statistics: &BatchStatistics,
    ) -> Result<(), StoreError>;
}

/// A unit of work holding every read and write of one batch.
///
/// Dropping the transaction without calling [`commit`](Self::commit) rolls
/// back everything written through it.
pub trait AssignmentTransaction: CourierDirectory + OrderIntake + BatchLedger {
    /// Make every write visible atomically.
    fn commit(self) -> Result<(), StoreError>
    where
        Self: Sized;
}

/// Stores able to run an assignment batch.
pub trait AssignmentStore {
    /// Transaction type borrowed from the store.
    type Transaction<'a>: AssignmentTransaction
    where
        Self: 'a;

    /// Open the transaction a batch runs in.
    ///
    /// Implementations must isolate the transaction from concurrent writers
    /// for its whole lifetime so workload counts cannot go stale mid-batch.
    fn begin_batch(&mut self) -> Result<Self::Transaction<'_>, StoreError>;
}

/// Optimization sessions and their saved routes.
pub trait SessionStore {
    /// Insert a `pending` session.
    fn create_session(
        &mut self,
        session: &NewSession,
        created_at: DateTime<Utc>,
    ) -> Result<SessionId, StoreError>;

    /// Fetch a session row.
    fn session(&self, id: SessionId) -> Result<Option<OptimizationSession>, StoreError>;

    /// Open stops for `courier_id`: orders in `accepted` or `assigned` whose
    /// assignment to the courier is still `assigned`, optionally restricted to
    /// one distributor, oldest first.
    fn route_stops(
        &self,
        courier_id: CourierId,
        distributor_id: Option<DistributorId>,
    ) -> Result<Vec<RouteStop>, StoreError>;

    /// Routing view of a courier, `None` if no such courier exists.
    fn courier_base(&self, courier_id: CourierId) -> Result<Option<CourierBase>, StoreError>;

    /// Move a session to `optimizing`, clearing any previous failure notes.
    fn mark_optimizing(
        &mut self,
        id: SessionId,
        started_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Persist a finished route atomically: waypoints, order sequence,
    /// result row and session totals, with the session moved to `completed`.
    /// A saved route is never replaced: a second save returns
    /// [`StoreError::AlreadyExists`]. On error nothing from this call is kept.
    fn save_route(
        &mut self,
        id: SessionId,
        plan: &RoutePlan,
        completed_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Move a session to `failed` with `notes` describing the cause.
    fn mark_failed(&mut self, id: SessionId, notes: &str) -> Result<(), StoreError>;

    /// Fetch a session with everything saved for it.
    fn load_session(&self, id: SessionId) -> Result<Option<SessionDetails>, StoreError>;

    /// Page through sessions matching `filter`, newest first.
    fn list_sessions(&self, filter: &SessionFilter, page: Page)
    -> Result<SessionPage, StoreError>;

    /// Sessions matching `filter` created at or after `since`, newest first.
    fn sessions_since(
        &self,
        filter: &SessionFilter,
        since: DateTime<Utc>,
    ) -> Result<Vec<OptimizationSession>, StoreError>;

    /// Delete a session and everything saved for it. Returns whether a row
    /// was removed.
    fn delete_session(&mut self, id: SessionId) -> Result<bool, StoreError>;
}

/// Live counters behind the dispatch dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssignmentStatusReport {
    /// Pending orders with no assignment at all.
    pub unassigned_orders: u32,
    /// Assignments of the distributor in a non-terminal state.
    pub active_assignments: u32,
    /// Couriers that could take an order right now.
    pub available_couriers: u32,
    /// Assignments created today.
    pub today_assignments: u32,
    /// Today's assignments already delivered.
    pub today_completed: u32,
    /// Mean distance of today's assignments.
    pub avg_distance_km: f64,
    /// Whether an assignment batch would have work to do.
    pub can_auto_assign: bool,
}

/// A batch with the lifecycle of the assignments it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchAnalyticsRow {
    /// Batch summary.
    pub batch: AssignmentBatch,
    /// Assignments linked to the batch through detail rows.
    pub linked_assignments: u32,
    /// Linked assignments that reached `delivered`.
    pub delivered_assignments: u32,
}

/// Read-only queries for dashboards.
pub trait DispatchReporting {
    /// Snapshot of the distributor's dispatch state.
    fn assignment_status(
        &self,
        distributor_id: DistributorId,
    ) -> Result<AssignmentStatusReport, StoreError>;

    /// Batches of `distributor_id` created at or after `since`, newest first.
    fn batches_since(
        &self,
        distributor_id: DistributorId,
        since: DateTime<Utc>,
    ) -> Result<Vec<BatchAnalyticsRow>, StoreError>;

    /// Page through batches of `distributor_id`, newest first.
    fn list_batches(
        &self,
        distributor_id: DistributorId,
        page: Page,
    ) -> Result<Vec<AssignmentBatch>, StoreError>;

    /// Detail rows of one batch in rank order.
    fn batch_details(&self, batch_id: BatchId) -> Result<Vec<BatchDetail>, StoreError>;
}
