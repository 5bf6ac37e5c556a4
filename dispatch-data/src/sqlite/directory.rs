//! Courier availability and order intake queries.

use chrono::{DateTime, Utc};
use dispatch_core::{
    AvailableCourier, CourierDirectory, DistributorId, Order, OrderIntake, StoreError,
};
use rusqlite::{Connection, Row, params};

use super::{
    SqliteDispatchStore,
    codec::{coord_columns, parsed_column, query_error, time_column, today_bounds},
};

/// Open assignments per courier are counted for the current UTC day only.
const AVAILABLE_COURIERS: &str = "
    SELECT id, name, depot_latitude, depot_longitude, max_daily_orders, open_today
    FROM (
        SELECT
            c.id,
            c.name,
            c.depot_latitude,
            c.depot_longitude,
            c.max_daily_orders,
            (
                SELECT COUNT(*)
                FROM delivery_assignments AS a
                WHERE a.courier_id = c.id
                  AND a.status NOT IN ('delivered', 'failed')
                  AND a.assigned_at >= ?1
                  AND a.assigned_at < ?2
            ) AS open_today
        FROM couriers AS c
        WHERE c.is_active = 1
          AND c.is_online = 1
          AND c.depot_latitude IS NOT NULL
          AND c.depot_longitude IS NOT NULL
    )
    WHERE open_today < max_daily_orders
    ORDER BY open_today ASC, name ASC, id ASC";

const UNASSIGNED_ORDERS: &str = "
    SELECT
        o.id,
        o.distributor_id,
        o.buyer_id,
        o.delivery_latitude,
        o.delivery_longitude,
        o.delivery_address,
        o.priority_level,
        o.status,
        o.created_at
    FROM orders AS o
    WHERE o.distributor_id = ?1
      AND o.status = 'pending'
      AND NOT EXISTS (
          SELECT 1
          FROM delivery_assignments AS a
          WHERE a.order_id = o.id
            AND a.status NOT IN ('delivered', 'failed')
      )
    ORDER BY o.priority_level DESC, o.created_at ASC, o.id ASC";

pub(crate) fn available_couriers(
    connection: &Connection,
    now: DateTime<Utc>,
) -> Result<Vec<AvailableCourier>, StoreError> {
    let (start, end) = today_bounds(now);
    let mut statement = connection
        .prepare_cached(AVAILABLE_COURIERS)
        .map_err(query_error("prepare available couriers", "courier"))?;
    let rows = statement
        .query_map(params![start, end], courier_from_row)
        .map_err(query_error("query available couriers", "courier"))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(query_error("read available couriers", "courier"))
}

fn courier_from_row(row: &Row<'_>) -> rusqlite::Result<AvailableCourier> {
    Ok(AvailableCourier {
        id: row.get::<_, i64>(0)?.into(),
        name: row.get(1)?,
        depot: coord_columns(row, 2, 3)?,
        max_daily_orders: row.get(4)?,
        current_assignments: row.get(5)?,
    })
}

pub(crate) fn unassigned_orders(
    connection: &Connection,
    distributor_id: DistributorId,
) -> Result<Vec<Order>, StoreError> {
    let mut statement = connection
        .prepare_cached(UNASSIGNED_ORDERS)
        .map_err(query_error("prepare unassigned orders", "order"))?;
    let rows = statement
        .query_map([distributor_id.get()], order_from_row)
        .map_err(query_error("query unassigned orders", "order"))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(query_error("read unassigned orders", "order"))
}

fn order_from_row(row: &Row<'_>) -> rusqlite::Result<Order> {
    Ok(Order {
        id: row.get::<_, i64>(0)?.into(),
        distributor_id: row.get::<_, i64>(1)?.into(),
        buyer_id: row.get::<_, i64>(2)?.into(),
        delivery: coord_columns(row, 3, 4)?,
        delivery_address: row.get(5)?,
        priority_level: row.get(6)?,
        status: parsed_column(row, 7)?,
        created_at: time_column(row, 8)?,
    })
}

impl CourierDirectory for SqliteDispatchStore {
    fn available_couriers(
        &self,
        _distributor_id: DistributorId,
    ) -> Result<Vec<AvailableCourier>, StoreError> {
        available_couriers(&self.connection, Utc::now())
    }
}

impl OrderIntake for SqliteDispatchStore {
    fn unassigned_orders(&self, distributor_id: DistributorId) -> Result<Vec<Order>, StoreError> {
        unassigned_orders(&self.connection, distributor_id)
    }
}
