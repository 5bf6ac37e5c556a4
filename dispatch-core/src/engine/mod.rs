//! Batch assignment of pending orders to couriers.
//!
//! [`AssignmentEngine::run_batch`] reads a distributor's unassigned orders and
//! the available couriers inside one store transaction, places each order with
//! [`select_courier`], and commits the batch with its audit rows in one go.
//! Orders that cannot be placed are reported back without aborting the run;
//! any store failure rolls back the whole batch.

mod selection;

use std::{collections::HashSet, time::Instant};

use chrono::Utc;
use log::{debug, info, warn};
use thiserror::Error;

pub use selection::{CourierChoice, select_courier};

use crate::{
    AssignedOrder, AssignmentStore, AssignmentTransaction, BatchDetail, BatchLedger, BatchOutcome,
    BatchStatistics, CourierDirectory, DistributorId, FailedAssignment, NewAssignment,
    OrderIntake, PROXIMITY_BALANCED, StoreError, estimated_delivery_minutes,
};

/// Default maximum gap between a candidate's workload and the lightest one.
pub const DEFAULT_WORKLOAD_THRESHOLD: u32 = 2;

/// Default number of runner-up couriers recorded per assignment.
pub const DEFAULT_MAX_ALTERNATIVES: usize = 3;

/// Errors that abort an assignment batch.
#[derive(Debug, Error)]
pub enum AssignmentError {
    /// Distributor ids are positive.
    #[error("invalid distributor id {0}")]
    InvalidDistributor(DistributorId),
    /// The store failed; nothing from the batch was persisted.
    #[error("assignment batch rolled back")]
    Store(#[from] StoreError),
}

/// Configuration for [`AssignmentEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignmentConfig {
    /// Maximum allowed gap between a candidate's open-assignment count and
    /// the minimum among candidates.
    pub workload_threshold: u32,
    /// Runner-up couriers recorded per assignment.
    pub max_alternatives: usize,
}

impl Default for AssignmentConfig {
    fn default() -> Self {
        Self {
            workload_threshold: DEFAULT_WORKLOAD_THRESHOLD,
            max_alternatives: DEFAULT_MAX_ALTERNATIVES,
        }
    }
}

impl AssignmentConfig {
    /// Set the workload threshold.
    #[must_use]
    pub const fn with_workload_threshold(mut self, threshold: u32) -> Self {
        self.workload_threshold = threshold;
        self
    }

    /// Set how many alternatives are recorded.
    #[must_use]
    pub const fn with_max_alternatives(mut self, count: usize) -> Self {
        self.max_alternatives = count;
        self
    }
}

/// Matches orders to couriers by proximity with workload balancing.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssignmentEngine {
    config: AssignmentConfig,
}

impl AssignmentEngine {
    /// Engine with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine with explicit configuration.
    #[must_use]
    pub const fn with_config(config: AssignmentConfig) -> Self {
        Self { config }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &AssignmentConfig {
        &self.config
    }

    /// Assign every unassigned order of `distributor_id`.
    ///
    /// With no pending orders the call succeeds without writing anything.
    /// With orders but no available courier the outcome is unsuccessful,
    /// every order is listed as failed and nothing is written.
    ///
    /// # Errors
    ///
    /// Returns [`AssignmentError::Store`] if any read or write fails, in
    /// which case the whole batch is rolled back.
    pub fn run_batch<S: AssignmentStore + ?Sized>(
        &self,
        store: &mut S,
        distributor_id: DistributorId,
    ) -> Result<BatchOutcome, AssignmentError> {
        if distributor_id.get() <= 0 {
            return Err(AssignmentError::InvalidDistributor(distributor_id));
        }
        let started = Instant::now();
        let mut tx = store.begin_batch()?;

        let orders = tx.unassigned_orders(distributor_id)?;
        if orders.is_empty() {
            debug!("distributor {distributor_id}: no unassigned orders");
            return Ok(BatchOutcome {
                success: true,
                message: "No unassigned orders found".to_owned(),
                batch_id: None,
                assignments: Vec::new(),
                failed_assignments: Vec::new(),
                statistics: BatchStatistics {
                    execution_time_ms: elapsed_ms(started),
                    ..BatchStatistics::default()
                },
            });
        }

        let couriers = tx.available_couriers(distributor_id)?;
        let total_orders = count(orders.len());
        if couriers.is_empty() {
            warn!(
                "distributor {distributor_id}: {total_orders} orders waiting but no courier available"
            );
            return Ok(BatchOutcome {
                success: false,
                message: "No available couriers found".to_owned(),
                batch_id: None,
                assignments: Vec::new(),
                failed_assignments: orders
                    .iter()
                    .map(|order| FailedAssignment {
                        order_id: order.id,
                        reason: "No available couriers found".to_owned(),
                    })
                    .collect(),
                statistics: BatchStatistics::unassigned(total_orders, elapsed_ms(started)),
            });
        }

        let batch_id = tx.insert_batch(distributor_id, PROXIMITY_BALANCED, Utc::now())?;
        let mut loads: Vec<u32> = couriers.iter().map(|c| c.current_assignments).collect();
        let mut assignments = Vec::new();
        let mut failed = Vec::new();

        for (position, order) in orders.iter().enumerate() {
            let Some(choice) = select_courier(
                &couriers,
                &loads,
                order.delivery,
                self.config.workload_threshold,
                self.config.max_alternatives,
            ) else {
                warn!("order {}: no suitable courier", order.id);
                failed.push(FailedAssignment {
                    order_id: order.id,
                    reason: "No suitable courier found".to_owned(),
                });
                continue;
            };
            let courier = choice.courier;
            if !courier.has_capacity_for(choice.load) {
                warn!("order {}: courier {} is at capacity", order.id, courier.id);
                failed.push(FailedAssignment {
                    order_id: order.id,
                    reason: format!("Courier {} has reached maximum capacity", courier.name),
                });
                continue;
            }

            let eta = estimated_delivery_minutes(choice.distance_km);
            let assignment_id = tx.insert_assignment(
                &NewAssignment {
                    order_id: order.id,
                    courier_id: courier.id,
                    assigned_by: distributor_id,
                    distance_km: choice.distance_km,
                    estimated_delivery_minutes: eta,
                },
                Utc::now(),
            )?;
            tx.insert_batch_detail(&BatchDetail {
                batch_id,
                assignment_id,
                rank: count(position + 1),
                alternatives: choice.alternatives,
            })?;
            tx.mark_order_accepted(order.id)?;
            if let Some(load) = loads.get_mut(choice.index) {
                *load += 1;
            }

            debug!(
                "order {} -> courier {} ({:.2} km, load {})",
                order.id, courier.id, choice.distance_km, choice.load
            );
            assignments.push(AssignedOrder {
                assignment_id,
                order_id: order.id,
                courier_id: courier.id,
                courier_name: courier.name.clone(),
                distance_km: choice.distance_km,
                estimated_delivery_minutes: eta,
                reasoning: format!(
                    "Selected based on distance ({:.2}km) and workload balance ({} current assignments)",
                    choice.distance_km, choice.load
                ),
            });
        }

        let statistics = summarise(total_orders, &assignments, &failed, elapsed_ms(started));
        tx.finish_batch(batch_id, &statistics)?;
        tx.commit()?;

        info!(
            "batch {batch_id} for distributor {distributor_id}: {} of {} orders assigned to {} couriers",
            statistics.assigned_orders, statistics.total_orders, statistics.couriers_used
        );
        Ok(BatchOutcome {
            success: true,
            message: format!(
                "Successfully assigned {} orders to {} couriers",
                statistics.assigned_orders, statistics.couriers_used
            ),
            batch_id: Some(batch_id),
            assignments,
            failed_assignments: failed,
            statistics,
        })
    }
}

fn summarise(
    total_orders: u32,
    assignments: &[AssignedOrder],
    failed: &[FailedAssignment],
    execution_time_ms: u64,
) -> BatchStatistics {
    let distances: Vec<f64> = assignments.iter().map(|a| a.distance_km).collect();
    let couriers_used: HashSet<_> = assignments.iter().map(|a| a.courier_id).collect();
    let (avg, min, max) = if distances.is_empty() {
        (0.0, 0.0, 0.0)
    } else {
        let sum: f64 = distances.iter().sum();
        (
            sum / f64::from(count(distances.len())),
            distances.iter().copied().fold(f64::INFINITY, f64::min),
            distances.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        )
    };
    BatchStatistics {
        total_orders,
        assigned_orders: count(assignments.len()),
        failed_assignments: count(failed.len()),
        couriers_used: count(couriers_used.len()),
        avg_distance_km: avg,
        min_distance_km: min,
        max_distance_km: max,
        execution_time_ms,
    }
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{OrderStatus, test_support::MemoryStore};
    use rstest::{fixture, rstest};

    const DISTRIBUTOR: DistributorId = DistributorId(1);

    #[fixture]
    fn store() -> MemoryStore {
        MemoryStore::default()
    }

    #[rstest]
    fn empty_intake_is_a_successful_no_op(mut store: MemoryStore) {
        store.add_courier("Amal", Some((30.0, 31.0)), 5);
        let outcome = AssignmentEngine::new()
            .run_batch(&mut store, DISTRIBUTOR)
            .expect("batch");
        assert!(outcome.success);
        assert!(outcome.batch_id.is_none());
        assert_eq!(outcome.statistics.total_orders, 0);
        assert_eq!(store.batch_count(), 0);
    }

    #[rstest]
    fn no_couriers_fails_every_order_without_writes(mut store: MemoryStore) {
        let a = store.add_pending_order(DISTRIBUTOR, (30.1, 31.0), 1);
        let b = store.add_pending_order(DISTRIBUTOR, (30.2, 31.0), 1);
        let outcome = AssignmentEngine::new()
            .run_batch(&mut store, DISTRIBUTOR)
            .expect("batch");
        assert!(!outcome.success);
        let failed: Vec<_> = outcome.failed_assignments.iter().map(|f| f.order_id).collect();
        assert_eq!(failed, vec![a, b]);
        assert_eq!(outcome.statistics.failed_assignments, 2);
        assert_eq!(store.batch_count(), 0);
        assert_eq!(store.order_status(a), Some(OrderStatus::Pending));
    }

    #[rstest]
    fn assigns_and_records_audit_rows(mut store: MemoryStore) {
        let near = store.add_courier("Near", Some((30.1, 31.0)), 5);
        store.add_courier("Far", Some((30.9, 31.0)), 5);
        let order = store.add_pending_order(DISTRIBUTOR, (30.1, 31.0), 1);

        let outcome = AssignmentEngine::new()
            .run_batch(&mut store, DISTRIBUTOR)
            .expect("batch");

        assert!(outcome.success);
        assert_eq!(outcome.assignments.len(), 1);
        assert_eq!(outcome.assignments[0].courier_id, near);
        assert_eq!(outcome.assignments[0].estimated_delivery_minutes, 15);
        assert_eq!(store.order_status(order), Some(OrderStatus::Accepted));

        let batch_id = outcome.batch_id.expect("batch id");
        let details = store.details_for(batch_id);
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].rank, 1);
        assert_eq!(details[0].alternatives.len(), 1);
    }

    #[rstest]
    fn live_counters_spread_load(mut store: MemoryStore) {
        // One courier sits on top of every drop-off; the other is further out.
        let close = store.add_courier("Close", Some((30.0, 31.0)), 10);
        let other = store.add_courier("Other", Some((30.05, 31.0)), 10);
        for _ in 0..4 {
            store.add_pending_order(DISTRIBUTOR, (30.0, 31.0), 1);
        }
        let outcome = AssignmentEngine::new()
            .run_batch(&mut store, DISTRIBUTOR)
            .expect("batch");
        let picks: Vec<_> = outcome.assignments.iter().map(|a| a.courier_id).collect();
        // Close takes three orders before the window excludes it.
        assert_eq!(picks, vec![close, close, close, other]);
    }

    #[rstest]
    fn capacity_exhaustion_is_a_per_order_failure(mut store: MemoryStore) {
        store.add_courier("Solo", Some((30.0, 31.0)), 1);
        store.add_pending_order(DISTRIBUTOR, (30.0, 31.0), 1);
        let second = store.add_pending_order(DISTRIBUTOR, (30.0, 31.0), 1);
        let outcome = AssignmentEngine::new()
            .run_batch(&mut store, DISTRIBUTOR)
            .expect("batch");
        assert!(outcome.success);
        assert_eq!(outcome.statistics.assigned_orders, 1);
        assert_eq!(outcome.failed_assignments[0].order_id, second);
        assert_eq!(store.order_status(second), Some(OrderStatus::Pending));
    }

    #[rstest]
    fn store_failure_rolls_back_everything(mut store: MemoryStore) {
        store.add_courier("Amal", Some((30.0, 31.0)), 10);
        let first = store.add_pending_order(DISTRIBUTOR, (30.0, 31.0), 1);
        store.add_pending_order(DISTRIBUTOR, (30.0, 31.0), 1);
        store.fail_after_assignments(1);

        let err = AssignmentEngine::new()
            .run_batch(&mut store, DISTRIBUTOR)
            .expect_err("injected failure");
        assert!(matches!(err, AssignmentError::Store(_)));
        assert_eq!(store.batch_count(), 0);
        assert_eq!(store.assignment_count(), 0);
        assert_eq!(store.order_status(first), Some(OrderStatus::Pending));
    }

    #[rstest]
    fn statistics_cover_successful_assignments(mut store: MemoryStore) {
        store.add_courier("A", Some((30.0, 31.0)), 10);
        store.add_pending_order(DISTRIBUTOR, (30.1, 31.0), 1);
        store.add_pending_order(DISTRIBUTOR, (30.2, 31.0), 1);
        let outcome = AssignmentEngine::new()
            .run_batch(&mut store, DISTRIBUTOR)
            .expect("batch");
        let stats = &outcome.statistics;
        assert!(stats.min_distance_km < stats.max_distance_km);
        let midpoint = (stats.min_distance_km + stats.max_distance_km) / 2.0;
        assert!((stats.avg_distance_km - midpoint).abs() < 1e-9);
        assert_eq!(stats.couriers_used, 1);
    }

    #[rstest]
    fn non_positive_distributor_is_rejected(mut store: MemoryStore) {
        let err = AssignmentEngine::new()
            .run_batch(&mut store, DistributorId(0))
            .expect_err("invalid distributor");
        assert!(matches!(err, AssignmentError::InvalidDistributor(_)));
    }
}
