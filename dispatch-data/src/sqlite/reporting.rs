//! Dashboard queries.

use chrono::{DateTime, Utc};
use dispatch_core::{
    AssignmentBatch, AssignmentStatusReport, BatchAnalyticsRow, BatchDetail, BatchId,
    BatchStatistics, DispatchReporting, DistributorId, Page, StoreError,
};
use rusqlite::{Row, params};

use super::{
    SqliteDispatchStore,
    codec::{
        encode_time, encode_u64, json_column, query_error, time_column, today_bounds, u64_column,
    },
    directory,
};

const BATCH_COLUMNS: &str = "
    b.id,
    b.distributor_id,
    b.algorithm,
    b.total_orders,
    b.assigned_orders,
    b.failed_assignments,
    b.couriers_used,
    b.avg_distance_km,
    b.min_distance_km,
    b.max_distance_km,
    b.execution_time_ms,
    b.created_at";

fn batch_from_row(row: &Row<'_>) -> rusqlite::Result<AssignmentBatch> {
    Ok(AssignmentBatch {
        id: row.get::<_, i64>(0)?.into(),
        distributor_id: row.get::<_, i64>(1)?.into(),
        algorithm: row.get(2)?,
        statistics: BatchStatistics {
            total_orders: row.get(3)?,
            assigned_orders: row.get(4)?,
            failed_assignments: row.get(5)?,
            couriers_used: row.get(6)?,
            avg_distance_km: row.get(7)?,
            min_distance_km: row.get(8)?,
            max_distance_km: row.get(9)?,
            execution_time_ms: u64_column(row, 10)?,
        },
        created_at: time_column(row, 11)?,
    })
}

impl DispatchReporting for SqliteDispatchStore {
    fn assignment_status(
        &self,
        distributor_id: DistributorId,
    ) -> Result<AssignmentStatusReport, StoreError> {
        let unassigned_orders: u32 = self
            .connection
            .query_row(
                "SELECT COUNT(*) FROM orders AS o
                 WHERE o.distributor_id = ?1
                   AND o.status = 'pending'
                   AND NOT EXISTS (
                       SELECT 1 FROM delivery_assignments AS a
                       WHERE a.order_id = o.id
                         AND a.status NOT IN ('delivered', 'failed')
                   )",
                [distributor_id.get()],
                |row| row.get(0),
            )
            .map_err(query_error("count unassigned orders", "order"))?;

        let active_assignments: u32 = self
            .connection
            .query_row(
                "SELECT COUNT(*)
                 FROM delivery_assignments AS a
                 JOIN orders AS o ON o.id = a.order_id
                 WHERE o.distributor_id = ?1
                   AND a.status NOT IN ('delivered', 'failed')",
                [distributor_id.get()],
                |row| row.get(0),
            )
            .map_err(query_error("count active assignments", "delivery_assignment"))?;

        let (start, end) = today_bounds(Utc::now());
        let (today_assignments, today_completed, avg_distance_km): (u32, u32, f64) = self
            .connection
            .query_row(
                "SELECT
                    COUNT(*),
                    COALESCE(SUM(CASE WHEN a.status = 'delivered' THEN 1 ELSE 0 END), 0),
                    COALESCE(AVG(a.distance_km), 0.0)
                 FROM delivery_assignments AS a
                 JOIN orders AS o ON o.id = a.order_id
                 WHERE o.distributor_id = ?1
                   AND a.assigned_at >= ?2
                   AND a.assigned_at < ?3",
                params![distributor_id.get(), start, end],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(query_error("summarise today's assignments", "delivery_assignment"))?;

        let available = directory::available_couriers(&self.connection, Utc::now())?;
        let available_couriers = u32::try_from(available.len()).unwrap_or(u32::MAX);

        Ok(AssignmentStatusReport {
            unassigned_orders,
            active_assignments,
            available_couriers,
            today_assignments,
            today_completed,
            avg_distance_km,
            can_auto_assign: unassigned_orders > 0 && available_couriers > 0,
        })
    }

    fn batches_since(
        &self,
        distributor_id: DistributorId,
        since: DateTime<Utc>,
    ) -> Result<Vec<BatchAnalyticsRow>, StoreError> {
        let mut statement = self
            .connection
            .prepare_cached(&format!(
                "SELECT
                    {BATCH_COLUMNS},
                    COUNT(a.id),
                    COALESCE(SUM(CASE WHEN a.status = 'delivered' THEN 1 ELSE 0 END), 0)
                 FROM assignment_batches AS b
                 LEFT JOIN assignment_batch_details AS d ON d.batch_id = b.id
                 LEFT JOIN delivery_assignments AS a ON a.id = d.assignment_id
                 WHERE b.distributor_id = ?1 AND b.created_at >= ?2
                 GROUP BY b.id
                 ORDER BY b.created_at DESC, b.id DESC"
            ))
            .map_err(query_error("prepare batch analytics", "assignment_batch"))?;
        let rows = statement
            .query_map(params![distributor_id.get(), encode_time(since)], |row| {
                Ok(BatchAnalyticsRow {
                    batch: batch_from_row(row)?,
                    linked_assignments: row.get(12)?,
                    delivered_assignments: row.get(13)?,
                })
            })
            .map_err(query_error("query batch analytics", "assignment_batch"))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(query_error("read batch analytics", "assignment_batch"))
    }

    fn list_batches(
        &self,
        distributor_id: DistributorId,
        page: Page,
    ) -> Result<Vec<AssignmentBatch>, StoreError> {
        let mut statement = self
            .connection
            .prepare_cached(&format!(
                "SELECT {BATCH_COLUMNS}
                 FROM assignment_batches AS b
                 WHERE b.distributor_id = ?1
                 ORDER BY b.created_at DESC, b.id DESC
                 LIMIT ?2 OFFSET ?3"
            ))
            .map_err(query_error("prepare batch listing", "assignment_batch"))?;
        let rows = statement
            .query_map(
                params![distributor_id.get(), page.limit, encode_u64(page.offset())],
                batch_from_row,
            )
            .map_err(query_error("list batches", "assignment_batch"))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(query_error("read batches", "assignment_batch"))
    }

    fn batch_details(&self, batch_id: BatchId) -> Result<Vec<BatchDetail>, StoreError> {
        let mut statement = self
            .connection
            .prepare_cached(
                "SELECT batch_id, assignment_id, rank, alternatives
                 FROM assignment_batch_details
                 WHERE batch_id = ?1
                 ORDER BY rank",
            )
            .map_err(query_error("prepare batch details", "assignment_batch"))?;
        let rows = statement
            .query_map([batch_id.get()], |row| {
                Ok(BatchDetail {
                    batch_id: row.get::<_, i64>(0)?.into(),
                    assignment_id: row.get::<_, i64>(1)?.into(),
                    rank: row.get(2)?,
                    alternatives: json_column(row, 3)?,
                })
            })
            .map_err(query_error("query batch details", "assignment_batch"))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(query_error("read batch details", "assignment_batch"))
    }
}
