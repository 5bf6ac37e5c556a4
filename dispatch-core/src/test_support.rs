//! In-memory store and provider doubles used by unit and behaviour tests.
//!
//! [`MemoryStore`] implements every store trait over plain vectors. A batch
//! transaction works on a cloned copy of the state and only writes it back on
//! commit, so dropping a transaction behaves like a rollback. Faults can be
//! injected to exercise the failure paths of the engine and optimizer.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use geo::Coord;

use crate::{
    Assignment, AssignmentBatch, AssignmentId, AssignmentStatus, AssignmentStatusReport,
    AssignmentStore, AssignmentTransaction, AvailableCourier, BatchAnalyticsRow, BatchDetail,
    BatchId, BatchLedger, BatchStatistics, BuyerId, Courier, CourierBase, CourierDirectory,
    CourierId, CourierStats, Depot, DispatchReporting, DistanceMatrix, DistanceMatrixError,
    DistanceMatrixProvider, DistributorId, NewAssignment, NewSession, OptimizationResult,
    OptimizationSession, Order, OrderId, OrderIntake, OrderSequence, OrderStatus, Page,
    RoutePlan, RouteStop, SessionDetails, SessionFilter, SessionId, SessionPage, SessionStatus,
    SessionStore, StoreError, Waypoint, WaypointKind,
};

/// Error type carried inside injected [`StoreError::Backend`] failures.
#[derive(Debug, thiserror::Error)]
#[error("injected failure")]
pub struct InjectedFailure;

/// Session operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionFault {
    /// [`SessionStore::mark_optimizing`] fails.
    MarkOptimizing,
    /// [`SessionStore::save_route`] fails.
    SaveRoute,
}

#[derive(Debug, Clone, Default)]
struct State {
    couriers: Vec<Courier>,
    orders: Vec<Order>,
    assignments: Vec<Assignment>,
    batches: Vec<AssignmentBatch>,
    details: Vec<BatchDetail>,
    sessions: Vec<OptimizationSession>,
    waypoints: BTreeMap<SessionId, Vec<Waypoint>>,
    results: BTreeMap<SessionId, OptimizationResult>,
    last_id: i64,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn open_load_today(&self, courier_id: CourierId, today: chrono::NaiveDate) -> u32 {
        let n = self
            .assignments
            .iter()
            .filter(|a| {
                a.courier_id == courier_id
                    && !a.status.is_terminal()
                    && a.assigned_at.date_naive() == today
            })
            .count();
        u32::try_from(n).unwrap_or(u32::MAX)
    }

    fn has_active_assignment(&self, order_id: OrderId) -> bool {
        self.assignments
            .iter()
            .any(|a| a.order_id == order_id && !a.status.is_terminal())
    }

    fn available(&self) -> Vec<AvailableCourier> {
        let today = Utc::now().date_naive();
        let mut available: Vec<AvailableCourier> = self
            .couriers
            .iter()
            .filter(|c| c.is_active && c.is_online)
            .filter_map(|c| {
                let depot = c.depot?;
                let load = self.open_load_today(c.id, today);
                (load < c.max_daily_orders).then(|| AvailableCourier {
                    id: c.id,
                    name: c.name.clone(),
                    depot,
                    max_daily_orders: c.max_daily_orders,
                    current_assignments: load,
                })
            })
            .collect();
        available.sort_by(|a, b| {
            a.current_assignments
                .cmp(&b.current_assignments)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.id.cmp(&b.id))
        });
        available
    }

    fn unassigned(&self, distributor_id: DistributorId) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|o| {
                o.distributor_id == distributor_id
                    && o.status == OrderStatus::Pending
                    && !self.has_active_assignment(o.id)
            })
            .cloned()
            .collect();
        orders.sort_by(|a, b| {
            b.priority_level
                .cmp(&a.priority_level)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        orders
    }

    fn session_mut(&mut self, id: SessionId) -> Result<&mut OptimizationSession, StoreError> {
        self.sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(StoreError::NotFound {
                entity: "optimization_session",
                id: id.get(),
            })
    }
}

/// In-memory implementation of every store trait.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: State,
    assignment_budget: Option<u32>,
    session_fault: Option<SessionFault>,
}

impl MemoryStore {
    /// Add an active, online courier. `depot` is `(latitude, longitude)`.
    pub fn add_courier(
        &mut self,
        name: &str,
        depot: Option<(f64, f64)>,
        max_daily_orders: u32,
    ) -> CourierId {
        let id = CourierId(self.state.next_id());
        self.state.couriers.push(Courier {
            id,
            account_id: id.get(),
            name: name.to_owned(),
            depot: depot.map(|(lat, lon)| Coord { x: lon, y: lat }),
            depot_address: depot.map(|_| format!("{name} depot")),
            max_daily_orders,
            is_active: true,
            is_online: true,
            stats: CourierStats::default(),
        });
        id
    }

    /// Toggle a courier's online flag.
    pub fn set_online(&mut self, courier_id: CourierId, online: bool) {
        if let Some(courier) = self.state.couriers.iter_mut().find(|c| c.id == courier_id) {
            courier.is_online = online;
        }
    }

    /// Toggle a courier's active flag.
    pub fn set_active(&mut self, courier_id: CourierId, active: bool) {
        if let Some(courier) = self.state.couriers.iter_mut().find(|c| c.id == courier_id) {
            courier.is_active = active;
        }
    }

    /// Add a pending order at `(latitude, longitude)`.
    pub fn add_pending_order(
        &mut self,
        distributor_id: DistributorId,
        location: (f64, f64),
        priority_level: i32,
    ) -> OrderId {
        self.insert_order(distributor_id, location, priority_level, OrderStatus::Pending)
    }

    /// Add an accepted order with an `assigned` assignment to `courier_id`,
    /// making it a stop on the courier's route.
    pub fn add_routeable_order(
        &mut self,
        courier_id: CourierId,
        distributor_id: DistributorId,
        location: (f64, f64),
    ) -> OrderId {
        let order_id = self.insert_order(distributor_id, location, 1, OrderStatus::Accepted);
        self.seed_assignment(order_id, courier_id, AssignmentStatus::Assigned, Utc::now());
        order_id
    }

    /// Give `courier_id` an existing assignment, as if made earlier.
    pub fn seed_assignment(
        &mut self,
        order_id: OrderId,
        courier_id: CourierId,
        status: AssignmentStatus,
        assigned_at: DateTime<Utc>,
    ) -> AssignmentId {
        let id = AssignmentId(self.state.next_id());
        let distributor = self
            .state
            .orders
            .iter()
            .find(|o| o.id == order_id)
            .map_or(DistributorId(0), |o| o.distributor_id);
        self.state.assignments.push(Assignment {
            id,
            order_id,
            courier_id,
            assigned_by: distributor,
            distance_km: 0.0,
            estimated_delivery_minutes: 15,
            status,
            assigned_at,
            updated_at: assigned_at,
        });
        id
    }

    /// Add `count` open assignments created today for `courier_id`.
    pub fn seed_workload(
        &mut self,
        courier_id: CourierId,
        distributor_id: DistributorId,
        count: u32,
    ) {
        for _ in 0..count {
            let order = self.insert_order(distributor_id, (0.0, 0.0), 0, OrderStatus::Accepted);
            self.seed_assignment(order, courier_id, AssignmentStatus::Accepted, Utc::now());
        }
    }

    /// Make the `n + 1`-th assignment insert of any batch fail.
    pub fn fail_after_assignments(&mut self, n: u32) {
        self.assignment_budget = Some(n);
    }

    /// Make one session operation fail from now on.
    pub fn inject_session_fault(&mut self, fault: SessionFault) {
        self.session_fault = Some(fault);
    }

    /// Current status of an order.
    #[must_use]
    pub fn order_status(&self, order_id: OrderId) -> Option<OrderStatus> {
        self.state
            .orders
            .iter()
            .find(|o| o.id == order_id)
            .map(|o| o.status)
    }

    /// Committed batches.
    #[must_use]
    pub fn batch_count(&self) -> usize {
        self.state.batches.len()
    }

    /// Committed batch summaries, oldest first.
    #[must_use]
    pub fn batches(&self) -> &[AssignmentBatch] {
        &self.state.batches
    }

    /// Committed assignments, including seeded ones.
    #[must_use]
    pub fn assignment_count(&self) -> usize {
        self.state.assignments.len()
    }

    /// Assignments of one courier.
    #[must_use]
    pub fn assignments_for(&self, courier_id: CourierId) -> Vec<Assignment> {
        self.state
            .assignments
            .iter()
            .filter(|a| a.courier_id == courier_id)
            .cloned()
            .collect()
    }

    /// Detail rows of one batch.
    #[must_use]
    pub fn details_for(&self, batch_id: BatchId) -> Vec<BatchDetail> {
        self.state
            .details
            .iter()
            .filter(|d| d.batch_id == batch_id)
            .cloned()
            .collect()
    }

    fn insert_order(
        &mut self,
        distributor_id: DistributorId,
        (lat, lon): (f64, f64),
        priority_level: i32,
        status: OrderStatus,
    ) -> OrderId {
        let id = OrderId(self.state.next_id());
        self.state.orders.push(Order {
            id,
            distributor_id,
            buyer_id: BuyerId(1),
            delivery: Coord { x: lon, y: lat },
            delivery_address: format!("Drop {id}"),
            priority_level,
            status,
            created_at: Utc::now(),
        });
        id
    }

    fn check_session_fault(
        &self,
        fault: SessionFault,
        operation: &'static str,
    ) -> Result<(), StoreError> {
        if self.session_fault == Some(fault) {
            return Err(StoreError::backend(operation, InjectedFailure));
        }
        Ok(())
    }
}

/// Batch transaction over a staged copy of a [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryTransaction<'a> {
    store: &'a mut MemoryStore,
    staged: State,
    assignments_written: u32,
}

impl AssignmentStore for MemoryStore {
    type Transaction<'a> = MemoryTransaction<'a>;

    fn begin_batch(&mut self) -> Result<Self::Transaction<'_>, StoreError> {
        let staged = self.state.clone();
        Ok(MemoryTransaction {
            store: self,
            staged,
            assignments_written: 0,
        })
    }
}

impl CourierDirectory for MemoryTransaction<'_> {
    fn available_couriers(&self, _: DistributorId) -> Result<Vec<AvailableCourier>, StoreError> {
        Ok(self.staged.available())
    }
}

impl OrderIntake for MemoryTransaction<'_> {
    fn unassigned_orders(&self, distributor_id: DistributorId) -> Result<Vec<Order>, StoreError> {
        Ok(self.staged.unassigned(distributor_id))
    }
}

impl BatchLedger for MemoryTransaction<'_> {
    fn insert_batch(
        &mut self,
        distributor_id: DistributorId,
        algorithm: &str,
        created_at: DateTime<Utc>,
    ) -> Result<BatchId, StoreError> {
        let id = BatchId(self.staged.next_id());
        self.staged.batches.push(AssignmentBatch {
            id,
            distributor_id,
            algorithm: algorithm.to_owned(),
            statistics: BatchStatistics::default(),
            created_at,
        });
        Ok(id)
    }

    fn insert_assignment(
        &mut self,
        assignment: &NewAssignment,
        assigned_at: DateTime<Utc>,
    ) -> Result<AssignmentId, StoreError> {
        if self
            .store
            .assignment_budget
            .is_some_and(|budget| self.assignments_written >= budget)
        {
            return Err(StoreError::backend("insert_assignment", InjectedFailure));
        }
        if self.staged.has_active_assignment(assignment.order_id) {
            return Err(StoreError::InvalidRow {
                entity: "delivery_assignment",
                id: assignment.order_id.get(),
                reason: "order already has an active assignment".to_owned(),
            });
        }
        self.assignments_written += 1;
        let id = AssignmentId(self.staged.next_id());
        self.staged.assignments.push(Assignment {
            id,
            order_id: assignment.order_id,
            courier_id: assignment.courier_id,
            assigned_by: assignment.assigned_by,
            distance_km: assignment.distance_km,
            estimated_delivery_minutes: assignment.estimated_delivery_minutes,
            status: AssignmentStatus::Assigned,
            assigned_at,
            updated_at: assigned_at,
        });
        Ok(id)
    }

    fn insert_batch_detail(&mut self, detail: &BatchDetail) -> Result<(), StoreError> {
        self.staged.details.push(detail.clone());
        Ok(())
    }

    fn mark_order_accepted(&mut self, order_id: OrderId) -> Result<(), StoreError> {
        let order = self
            .staged
            .orders
            .iter_mut()
            .find(|o| o.id == order_id && o.status == OrderStatus::Pending)
            .ok_or(StoreError::NotFound {
                entity: "pending order",
                id: order_id.get(),
            })?;
        order.status = OrderStatus::Accepted;
        Ok(())
    }

    fn finish_batch(
        &mut self,
        batch_id: BatchId,
        statistics: &BatchStatistics,
    ) -> Result<(), StoreError> {
        let batch = self
            .staged
            .batches
            .iter_mut()
            .find(|b| b.id == batch_id)
            .ok_or(StoreError::NotFound {
                entity: "assignment_batch",
                id: batch_id.get(),
            })?;
        batch.statistics = statistics.clone();
        Ok(())
    }
}

impl AssignmentTransaction for MemoryTransaction<'_> {
    fn commit(self) -> Result<(), StoreError> {
        self.store.state = self.staged;
        Ok(())
    }
}

impl SessionStore for MemoryStore {
    fn create_session(
        &mut self,
        session: &NewSession,
        created_at: DateTime<Utc>,
    ) -> Result<SessionId, StoreError> {
        let id = SessionId(self.state.next_id());
        self.state.sessions.push(OptimizationSession {
            id,
            name: session.name.clone(),
            courier_id: session.courier_id,
            distributor_id: session.distributor_id,
            algorithm: session.algorithm,
            status: SessionStatus::Pending,
            total_distance_km: None,
            total_duration_minutes: None,
            fuel_cost: None,
            optimization_score: None,
            notes: None,
            created_at,
            started_at: None,
            completed_at: None,
        });
        Ok(id)
    }

    fn session(&self, id: SessionId) -> Result<Option<OptimizationSession>, StoreError> {
        Ok(self.state.sessions.iter().find(|s| s.id == id).cloned())
    }

    fn route_stops(
        &self,
        courier_id: CourierId,
        distributor_id: Option<DistributorId>,
    ) -> Result<Vec<RouteStop>, StoreError> {
        let mut stops: Vec<(OrderId, RouteStop)> = self
            .state
            .orders
            .iter()
            .filter(|o| o.status.is_routeable())
            .filter(|o| distributor_id.is_none_or(|d| d == o.distributor_id))
            .filter(|o| {
                self.state.assignments.iter().any(|a| {
                    a.order_id == o.id
                        && a.courier_id == courier_id
                        && a.status == AssignmentStatus::Assigned
                })
            })
            .map(|o| {
                (o.id, RouteStop {
                    order_id: o.id,
                    location: o.delivery,
                    address: o.delivery_address.clone(),
                    status: o.status,
                    created_at: o.created_at,
                })
            })
            .collect();
        stops.sort_by(|(a_id, a), (b_id, b)| a.created_at.cmp(&b.created_at).then(a_id.cmp(b_id)));
        Ok(stops.into_iter().map(|(_, stop)| stop).collect())
    }

    fn courier_base(&self, courier_id: CourierId) -> Result<Option<CourierBase>, StoreError> {
        Ok(self
            .state
            .couriers
            .iter()
            .find(|c| c.id == courier_id)
            .map(|c| CourierBase {
                is_active: c.is_active,
                depot: c.depot.map(|location| Depot {
                    location,
                    address: c
                        .depot_address
                        .clone()
                        .unwrap_or_else(|| Depot::default().address),
                }),
            }))
    }

    fn mark_optimizing(
        &mut self,
        id: SessionId,
        started_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.check_session_fault(SessionFault::MarkOptimizing, "mark_optimizing")?;
        let session = self.state.session_mut(id)?;
        session.status = SessionStatus::Optimizing;
        session.started_at = Some(started_at);
        session.notes = None;
        Ok(())
    }

    fn save_route(
        &mut self,
        id: SessionId,
        plan: &RoutePlan,
        completed_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.check_session_fault(SessionFault::SaveRoute, "save_route")?;
        if self.state.waypoints.contains_key(&id) {
            return Err(StoreError::AlreadyExists {
                entity: "session route",
                id: id.get(),
            });
        }
        let session = self.state.session_mut(id)?;
        session.status = SessionStatus::Completed;
        session.total_distance_km = Some(plan.total_distance_km);
        session.total_duration_minutes = Some(plan.total_duration_minutes);
        session.fuel_cost = Some(plan.fuel_cost);
        session.optimization_score = Some(plan.optimization_score);
        session.completed_at = Some(completed_at);
        self.state.waypoints.insert(id, plan.waypoints.clone());
        self.state.results.insert(id, OptimizationResult {
            algorithm: plan.algorithm,
            total_distance_km: plan.total_distance_km,
            total_duration_minutes: plan.total_duration_minutes,
            fuel_cost: plan.fuel_cost,
            optimization_score: plan.optimization_score,
            waypoint_count: u32::try_from(plan.waypoints.len()).unwrap_or(u32::MAX),
            execution_time_ms: plan.execution_time_ms,
        });
        Ok(())
    }

    fn mark_failed(&mut self, id: SessionId, notes: &str) -> Result<(), StoreError> {
        let session = self.state.session_mut(id)?;
        session.status = SessionStatus::Failed;
        session.notes = Some(notes.to_owned());
        Ok(())
    }

    fn load_session(&self, id: SessionId) -> Result<Option<SessionDetails>, StoreError> {
        let Some(session) = self.session(id)? else {
            return Ok(None);
        };
        let waypoints = self.state.waypoints.get(&id).cloned().unwrap_or_default();
        let orders = waypoints
            .iter()
            .filter(|w| w.kind == WaypointKind::Delivery)
            .filter_map(|w| {
                w.order_id.map(|order_id| OrderSequence {
                    sequence: w.sequence,
                    order_id,
                })
            })
            .collect();
        Ok(Some(SessionDetails::new(
            session,
            waypoints,
            orders,
            self.state.results.get(&id).cloned(),
        )))
    }

    fn list_sessions(
        &self,
        filter: &SessionFilter,
        page: Page,
    ) -> Result<SessionPage, StoreError> {
        let matching = newest_first(&self.state.sessions, |s| filter.matches(s));
        let total = u64::try_from(matching.len()).unwrap_or(u64::MAX);
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit).unwrap_or(usize::MAX);
        Ok(SessionPage {
            sessions: matching.into_iter().skip(offset).take(limit).collect(),
            page,
            total,
            pages: page.page_count(total),
        })
    }

    fn sessions_since(
        &self,
        filter: &SessionFilter,
        since: DateTime<Utc>,
    ) -> Result<Vec<OptimizationSession>, StoreError> {
        Ok(newest_first(&self.state.sessions, |s| {
            filter.matches(s) && s.created_at >= since
        }))
    }

    fn delete_session(&mut self, id: SessionId) -> Result<bool, StoreError> {
        let before = self.state.sessions.len();
        self.state.sessions.retain(|s| s.id != id);
        self.state.waypoints.remove(&id);
        self.state.results.remove(&id);
        Ok(self.state.sessions.len() != before)
    }
}

fn newest_first(
    sessions: &[OptimizationSession],
    keep: impl Fn(&OptimizationSession) -> bool,
) -> Vec<OptimizationSession> {
    let mut matching: Vec<_> = sessions.iter().filter(|s| keep(s)).cloned().collect();
    matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    matching
}

impl DispatchReporting for MemoryStore {
    fn assignment_status(
        &self,
        distributor_id: DistributorId,
    ) -> Result<AssignmentStatusReport, StoreError> {
        let state = &self.state;
        let today = Utc::now().date_naive();
        let owned: HashSet<OrderId> = state
            .orders
            .iter()
            .filter(|o| o.distributor_id == distributor_id)
            .map(|o| o.id)
            .collect();
        let unassigned = state.unassigned(distributor_id).len();
        let mine: Vec<&Assignment> = state
            .assignments
            .iter()
            .filter(|a| owned.contains(&a.order_id))
            .collect();
        let active = mine.iter().filter(|a| !a.status.is_terminal()).count();
        let todays: Vec<&&Assignment> = mine
            .iter()
            .filter(|a| a.assigned_at.date_naive() == today)
            .collect();
        let completed = todays
            .iter()
            .filter(|a| a.status == AssignmentStatus::Delivered)
            .count();
        let avg = if todays.is_empty() {
            0.0
        } else {
            todays.iter().map(|a| a.distance_km).sum::<f64>() / f64::from(count(todays.len()))
        };
        let available = state.available().len();
        Ok(AssignmentStatusReport {
            unassigned_orders: count(unassigned),
            active_assignments: count(active),
            available_couriers: count(available),
            today_assignments: count(todays.len()),
            today_completed: count(completed),
            avg_distance_km: avg,
            can_auto_assign: unassigned > 0 && available > 0,
        })
    }

    fn batches_since(
        &self,
        distributor_id: DistributorId,
        since: DateTime<Utc>,
    ) -> Result<Vec<BatchAnalyticsRow>, StoreError> {
        let mut rows: Vec<BatchAnalyticsRow> = self
            .state
            .batches
            .iter()
            .filter(|b| b.distributor_id == distributor_id && b.created_at >= since)
            .map(|batch| {
                let linked: Vec<&Assignment> = self
                    .details_for(batch.id)
                    .iter()
                    .filter_map(|d| self.state.assignments.iter().find(|a| a.id == d.assignment_id))
                    .collect();
                BatchAnalyticsRow {
                    batch: batch.clone(),
                    linked_assignments: count(linked.len()),
                    delivered_assignments: count(
                        linked
                            .iter()
                            .filter(|a| a.status == AssignmentStatus::Delivered)
                            .count(),
                    ),
                }
            })
            .collect();
        rows.sort_by(|a, b| {
            b.batch
                .created_at
                .cmp(&a.batch.created_at)
                .then(b.batch.id.cmp(&a.batch.id))
        });
        Ok(rows)
    }

    fn list_batches(
        &self,
        distributor_id: DistributorId,
        page: Page,
    ) -> Result<Vec<AssignmentBatch>, StoreError> {
        let mut batches: Vec<AssignmentBatch> = self
            .state
            .batches
            .iter()
            .filter(|b| b.distributor_id == distributor_id)
            .cloned()
            .collect();
        batches.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit).unwrap_or(usize::MAX);
        Ok(batches.into_iter().skip(offset).take(limit).collect())
    }

    fn batch_details(&self, batch_id: BatchId) -> Result<Vec<BatchDetail>, StoreError> {
        let mut details = self.details_for(batch_id);
        details.sort_by_key(|d| d.rank);
        Ok(details)
    }
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// `DistanceMatrixProvider` that always fails, standing in for an
/// unreachable remote service.
#[derive(Debug, Clone)]
pub struct FailingDistanceMatrix {
    error: DistanceMatrixError,
}

impl FailingDistanceMatrix {
    /// Provider failing with a network error.
    #[must_use]
    pub fn network() -> Self {
        Self::with_error(DistanceMatrixError::NetworkError {
            url: "http://matrix.invalid/distancematrix/json".to_owned(),
            message: "connection refused".to_owned(),
        })
    }

    /// Provider failing with `error`.
    #[must_use]
    pub const fn with_error(error: DistanceMatrixError) -> Self {
        Self { error }
    }
}

impl DistanceMatrixProvider for FailingDistanceMatrix {
    fn matrix(&self, points: &[Coord<f64>]) -> Result<DistanceMatrix, DistanceMatrixError> {
        if points.is_empty() {
            return Err(DistanceMatrixError::EmptyInput);
        }
        Err(self.error.clone())
    }
}
