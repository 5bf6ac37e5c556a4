//! The batch transaction and its append-only writes.

use chrono::{DateTime, Utc};
use dispatch_core::{
    AssignmentId, AssignmentStatus, AssignmentTransaction, AvailableCourier, BatchDetail,
    BatchId, BatchLedger, BatchStatistics, CourierDirectory, DistributorId, NewAssignment, Order,
    OrderId, OrderIntake, StoreError,
};
use rusqlite::{Transaction, params};

use super::{
    codec::{encode_time, encode_u64, store_error},
    directory,
};

/// One assignment batch running inside a `BEGIN IMMEDIATE` transaction.
///
/// Dropping the value without calling
/// [`commit`](AssignmentTransaction::commit) rolls every write back.
#[derive(Debug)]
pub struct SqliteBatchTransaction<'conn> {
    transaction: Transaction<'conn>,
}

impl<'conn> SqliteBatchTransaction<'conn> {
    pub(crate) const fn new(transaction: Transaction<'conn>) -> Self {
        Self { transaction }
    }
}

impl CourierDirectory for SqliteBatchTransaction<'_> {
    fn available_couriers(
        &self,
        _distributor_id: DistributorId,
    ) -> Result<Vec<AvailableCourier>, StoreError> {
        directory::available_couriers(&self.transaction, Utc::now())
    }
}

impl OrderIntake for SqliteBatchTransaction<'_> {
    fn unassigned_orders(&self, distributor_id: DistributorId) -> Result<Vec<Order>, StoreError> {
        directory::unassigned_orders(&self.transaction, distributor_id)
    }
}

impl BatchLedger for SqliteBatchTransaction<'_> {
    fn insert_batch(
        &mut self,
        distributor_id: DistributorId,
        algorithm: &str,
        created_at: DateTime<Utc>,
    ) -> Result<BatchId, StoreError> {
        self.transaction
            .execute(
                "INSERT INTO assignment_batches (distributor_id, algorithm, created_at)
                 VALUES (?1, ?2, ?3)",
                params![distributor_id.get(), algorithm, encode_time(created_at)],
            )
            .map_err(store_error("insert batch", "assignment_batch", 0))?;
        Ok(BatchId(self.transaction.last_insert_rowid()))
    }

    fn insert_assignment(
        &mut self,
        assignment: &NewAssignment,
        assigned_at: DateTime<Utc>,
    ) -> Result<AssignmentId, StoreError> {
        let stamp = encode_time(assigned_at);
        self.transaction
            .execute(
                "INSERT INTO delivery_assignments (
                    order_id,
                    courier_id,
                    assigned_by,
                    distance_km,
                    estimated_delivery_minutes,
                    status,
                    assigned_at,
                    updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                params![
                    assignment.order_id.get(),
                    assignment.courier_id.get(),
                    assignment.assigned_by.get(),
                    assignment.distance_km,
                    assignment.estimated_delivery_minutes,
                    AssignmentStatus::Assigned.as_str(),
                    stamp,
                ],
            )
            .map_err(store_error(
                "insert assignment",
                "delivery_assignment",
                assignment.order_id.get(),
            ))?;
        Ok(AssignmentId(self.transaction.last_insert_rowid()))
    }

    fn insert_batch_detail(&mut self, detail: &BatchDetail) -> Result<(), StoreError> {
        let alternatives = serde_json::to_string(&detail.alternatives)
            .map_err(|err| StoreError::backend("encode alternatives", err))?;
        self.transaction
            .execute(
                "INSERT INTO assignment_batch_details (batch_id, assignment_id, rank, alternatives)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    detail.batch_id.get(),
                    detail.assignment_id.get(),
                    detail.rank,
                    alternatives,
                ],
            )
            .map(|_| ())
            .map_err(store_error(
                "insert batch detail",
                "assignment_batch",
                detail.batch_id.get(),
            ))
    }

    fn mark_order_accepted(&mut self, order_id: OrderId) -> Result<(), StoreError> {
        let changed = self
            .transaction
            .execute(
                "UPDATE orders SET status = 'accepted' WHERE id = ?1 AND status = 'pending'",
                [order_id.get()],
            )
            .map_err(store_error("accept order", "order", order_id.get()))?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                entity: "pending order",
                id: order_id.get(),
            });
        }
        Ok(())
    }

    fn finish_batch(
        &mut self,
        batch_id: BatchId,
        statistics: &BatchStatistics,
    ) -> Result<(), StoreError> {
        let changed = self
            .transaction
            .execute(
                "UPDATE assignment_batches SET
                    total_orders = ?2,
                    assigned_orders = ?3,
                    failed_assignments = ?4,
                    couriers_used = ?5,
                    avg_distance_km = ?6,
                    min_distance_km = ?7,
                    max_distance_km = ?8,
                    execution_time_ms = ?9
                 WHERE id = ?1",
                params![
                    batch_id.get(),
                    statistics.total_orders,
                    statistics.assigned_orders,
                    statistics.failed_assignments,
                    statistics.couriers_used,
                    statistics.avg_distance_km,
                    statistics.min_distance_km,
                    statistics.max_distance_km,
                    encode_u64(statistics.execution_time_ms),
                ],
            )
            .map_err(store_error("finish batch", "assignment_batch", batch_id.get()))?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                entity: "assignment_batch",
                id: batch_id.get(),
            });
        }
        Ok(())
    }
}

impl AssignmentTransaction for SqliteBatchTransaction<'_> {
    fn commit(self) -> Result<(), StoreError> {
        self.transaction
            .commit()
            .map_err(|err| StoreError::backend("commit batch", err))
    }
}
