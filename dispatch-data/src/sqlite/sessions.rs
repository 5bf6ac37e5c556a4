//! Optimization sessions and their saved routes.

use chrono::{DateTime, Utc};
use dispatch_core::{
    CourierBase, CourierId, Depot, DistributorId, NewSession, OptimizationResult,
    OptimizationSession, OrderSequence, Page, RoutePlan, RouteStop, SessionDetails,
    SessionFilter, SessionId, SessionPage, SessionStatus, SessionStore, StoreError, Waypoint,
    WaypointKind,
};
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params};

use super::{
    SqliteDispatchStore,
    codec::{
        coord_columns, encode_time, encode_u64, optional_coord_columns, optional_time_column,
        parsed_column, query_error, store_error, time_column, u64_column,
    },
};

const SESSION_COLUMNS: &str = "
    id,
    name,
    courier_id,
    distributor_id,
    algorithm,
    status,
    total_distance_km,
    total_duration_minutes,
    fuel_cost,
    optimization_score,
    notes,
    created_at,
    started_at,
    completed_at";

const FILTER_CLAUSE: &str = "
    (?1 IS NULL OR courier_id = ?1)
    AND (?2 IS NULL OR distributor_id = ?2)
    AND (?3 IS NULL OR status = ?3)";

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<OptimizationSession> {
    Ok(OptimizationSession {
        id: row.get::<_, i64>(0)?.into(),
        name: row.get(1)?,
        courier_id: row.get::<_, i64>(2)?.into(),
        distributor_id: row.get::<_, i64>(3)?.into(),
        algorithm: parsed_column(row, 4)?,
        status: parsed_column(row, 5)?,
        total_distance_km: row.get(6)?,
        total_duration_minutes: row.get(7)?,
        fuel_cost: row.get(8)?,
        optimization_score: row.get(9)?,
        notes: row.get(10)?,
        created_at: time_column(row, 11)?,
        started_at: optional_time_column(row, 12)?,
        completed_at: optional_time_column(row, 13)?,
    })
}

fn waypoint_from_row(row: &Row<'_>) -> rusqlite::Result<Waypoint> {
    Ok(Waypoint {
        sequence: row.get(0)?,
        latitude: row.get(1)?,
        longitude: row.get(2)?,
        address: row.get(3)?,
        kind: parsed_column(row, 4)?,
        order_id: row.get::<_, Option<i64>>(5)?.map(Into::into),
        distance_from_previous_km: row.get(6)?,
        duration_from_previous_minutes: row.get(7)?,
    })
}

fn result_from_row(row: &Row<'_>) -> rusqlite::Result<OptimizationResult> {
    Ok(OptimizationResult {
        algorithm: parsed_column(row, 0)?,
        total_distance_km: row.get(1)?,
        total_duration_minutes: row.get(2)?,
        fuel_cost: row.get(3)?,
        optimization_score: row.get(4)?,
        waypoint_count: row.get(5)?,
        execution_time_ms: u64_column(row, 6)?,
    })
}

fn filter_params(filter: &SessionFilter) -> (Option<i64>, Option<i64>, Option<&'static str>) {
    (
        filter.courier_id.map(CourierId::get),
        filter.distributor_id.map(DistributorId::get),
        filter.status.map(SessionStatus::as_str),
    )
}

fn require_change(changed: usize, id: SessionId) -> Result<(), StoreError> {
    if changed == 0 {
        return Err(StoreError::NotFound {
            entity: "optimization_session",
            id: id.get(),
        });
    }
    Ok(())
}

fn fetch_session(
    connection: &Connection,
    id: SessionId,
) -> Result<Option<OptimizationSession>, StoreError> {
    connection
        .query_row(
            &format!("SELECT {SESSION_COLUMNS} FROM optimization_sessions WHERE id = ?1"),
            [id.get()],
            session_from_row,
        )
        .optional()
        .map_err(store_error("load session", "optimization_session", id.get()))
}

fn write_route(
    transaction: &Transaction<'_>,
    id: SessionId,
    plan: &RoutePlan,
    completed_at: DateTime<Utc>,
) -> Result<(), StoreError> {
    let fail = |operation| store_error(operation, "optimization_session", id.get());
    let saved: bool = transaction
        .query_row(
            "SELECT EXISTS (SELECT 1 FROM route_waypoints WHERE session_id = ?1)
                OR EXISTS (SELECT 1 FROM optimization_results WHERE session_id = ?1)",
            [id.get()],
            |row| row.get(0),
        )
        .map_err(fail("check saved route"))?;
    if saved {
        return Err(StoreError::AlreadyExists {
            entity: "session route",
            id: id.get(),
        });
    }

    {
        let mut insert_waypoint = transaction
            .prepare_cached(
                "INSERT INTO route_waypoints (
                    session_id,
                    sequence,
                    latitude,
                    longitude,
                    address,
                    kind,
                    order_id,
                    distance_from_previous_km,
                    duration_from_previous_minutes
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )
            .map_err(fail("prepare waypoint insert"))?;
        let mut insert_order = transaction
            .prepare_cached(
                "INSERT INTO session_orders (session_id, order_id, sequence) VALUES (?1, ?2, ?3)",
            )
            .map_err(fail("prepare session order insert"))?;
        for waypoint in &plan.waypoints {
            insert_waypoint
                .execute(params![
                    id.get(),
                    waypoint.sequence,
                    waypoint.latitude,
                    waypoint.longitude,
                    waypoint.address,
                    waypoint.kind.as_str(),
                    waypoint.order_id.map(|order| order.get()),
                    waypoint.distance_from_previous_km,
                    waypoint.duration_from_previous_minutes,
                ])
                .map_err(fail("insert waypoint"))?;
            if let (WaypointKind::Delivery, Some(order_id)) = (waypoint.kind, waypoint.order_id) {
                insert_order
                    .execute(params![id.get(), order_id.get(), waypoint.sequence])
                    .map_err(fail("insert session order"))?;
            }
        }
    }

    let waypoint_count = u32::try_from(plan.waypoints.len()).unwrap_or(u32::MAX);
    transaction
        .execute(
            "INSERT INTO optimization_results (
                session_id,
                algorithm,
                total_distance_km,
                total_duration_minutes,
                fuel_cost,
                optimization_score,
                waypoint_count,
                execution_time_ms
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id.get(),
                plan.algorithm.as_str(),
                plan.total_distance_km,
                plan.total_duration_minutes,
                plan.fuel_cost,
                plan.optimization_score,
                waypoint_count,
                encode_u64(plan.execution_time_ms),
            ],
        )
        .map_err(fail("insert optimization result"))?;

    let changed = transaction
        .execute(
            "UPDATE optimization_sessions SET
                status = 'completed',
                total_distance_km = ?2,
                total_duration_minutes = ?3,
                fuel_cost = ?4,
                optimization_score = ?5,
                notes = NULL,
                completed_at = ?6
             WHERE id = ?1",
            params![
                id.get(),
                plan.total_distance_km,
                plan.total_duration_minutes,
                plan.fuel_cost,
                plan.optimization_score,
                encode_time(completed_at),
            ],
        )
        .map_err(fail("complete session"))?;
    require_change(changed, id)
}

impl SessionStore for SqliteDispatchStore {
    fn create_session(
        &mut self,
        session: &NewSession,
        created_at: DateTime<Utc>,
    ) -> Result<SessionId, StoreError> {
        self.connection
            .execute(
                "INSERT INTO optimization_sessions (
                    name,
                    courier_id,
                    distributor_id,
                    algorithm,
                    status,
                    created_at
                ) VALUES (?1, ?2, ?3, ?4, 'pending', ?5)",
                params![
                    session.name,
                    session.courier_id.get(),
                    session.distributor_id.get(),
                    session.algorithm.as_str(),
                    encode_time(created_at),
                ],
            )
            .map_err(query_error("create session", "optimization_session"))?;
        Ok(SessionId(self.connection.last_insert_rowid()))
    }

    fn session(&self, id: SessionId) -> Result<Option<OptimizationSession>, StoreError> {
        fetch_session(&self.connection, id)
    }

    fn route_stops(
        &self,
        courier_id: CourierId,
        distributor_id: Option<DistributorId>,
    ) -> Result<Vec<RouteStop>, StoreError> {
        let mut statement = self
            .connection
            .prepare_cached(
                "SELECT
                    o.id,
                    o.delivery_latitude,
                    o.delivery_longitude,
                    o.delivery_address,
                    o.status,
                    o.created_at
                 FROM orders AS o
                 JOIN delivery_assignments AS a ON a.order_id = o.id
                 WHERE a.courier_id = ?1
                   AND a.status = 'assigned'
                   AND o.status IN ('accepted', 'assigned')
                   AND (?2 IS NULL OR o.distributor_id = ?2)
                 ORDER BY o.created_at ASC, o.id ASC",
            )
            .map_err(query_error("prepare route stops", "order"))?;
        let rows = statement
            .query_map(
                params![courier_id.get(), distributor_id.map(DistributorId::get)],
                |row| {
                    Ok(RouteStop {
                        order_id: row.get::<_, i64>(0)?.into(),
                        location: coord_columns(row, 1, 2)?,
                        address: row.get(3)?,
                        status: parsed_column(row, 4)?,
                        created_at: time_column(row, 5)?,
                    })
                },
            )
            .map_err(query_error("query route stops", "order"))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(query_error("read route stops", "order"))
    }

    fn courier_base(&self, courier_id: CourierId) -> Result<Option<CourierBase>, StoreError> {
        self.connection
            .query_row(
                "SELECT is_active, depot_latitude, depot_longitude, depot_address
                 FROM couriers WHERE id = ?1",
                [courier_id.get()],
                |row| {
                    let location = optional_coord_columns(row, 1, 2)?;
                    let address: Option<String> = row.get(3)?;
                    Ok(CourierBase {
                        is_active: row.get(0)?,
                        depot: location.map(|location| Depot {
                            location,
                            address: address.unwrap_or_else(|| Depot::default().address),
                        }),
                    })
                },
            )
            .optional()
            .map_err(store_error("load courier", "courier", courier_id.get()))
    }

    fn mark_optimizing(
        &mut self,
        id: SessionId,
        started_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let changed = self
            .connection
            .execute(
                "UPDATE optimization_sessions
                 SET status = 'optimizing', started_at = ?2, notes = NULL
                 WHERE id = ?1",
                params![id.get(), encode_time(started_at)],
            )
            .map_err(store_error("mark optimizing", "optimization_session", id.get()))?;
        require_change(changed, id)
    }

    fn save_route(
        &mut self,
        id: SessionId,
        plan: &RoutePlan,
        completed_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let transaction = self
            .connection
            .transaction()
            .map_err(|err| StoreError::backend("begin route save", err))?;
        write_route(&transaction, id, plan, completed_at)?;
        transaction
            .commit()
            .map_err(|err| StoreError::backend("commit route save", err))
    }

    fn mark_failed(&mut self, id: SessionId, notes: &str) -> Result<(), StoreError> {
        let changed = self
            .connection
            .execute(
                "UPDATE optimization_sessions SET status = 'failed', notes = ?2 WHERE id = ?1",
                params![id.get(), notes],
            )
            .map_err(store_error("mark failed", "optimization_session", id.get()))?;
        require_change(changed, id)
    }

    fn load_session(&self, id: SessionId) -> Result<Option<SessionDetails>, StoreError> {
        let Some(session) = fetch_session(&self.connection, id)? else {
            return Ok(None);
        };
        let fail = |operation| store_error(operation, "optimization_session", id.get());

        let mut statement = self
            .connection
            .prepare_cached(
                "SELECT
                    sequence,
                    latitude,
                    longitude,
                    address,
                    kind,
                    order_id,
                    distance_from_previous_km,
                    duration_from_previous_minutes
                 FROM route_waypoints WHERE session_id = ?1 ORDER BY sequence",
            )
            .map_err(fail("prepare waypoints"))?;
        let waypoints = statement
            .query_map([id.get()], waypoint_from_row)
            .map_err(fail("query waypoints"))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(fail("read waypoints"))?;

        let mut statement = self
            .connection
            .prepare_cached(
                "SELECT sequence, order_id FROM session_orders
                 WHERE session_id = ?1 ORDER BY sequence",
            )
            .map_err(fail("prepare session orders"))?;
        let orders = statement
            .query_map([id.get()], |row| {
                Ok(OrderSequence {
                    sequence: row.get(0)?,
                    order_id: row.get::<_, i64>(1)?.into(),
                })
            })
            .map_err(fail("query session orders"))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(fail("read session orders"))?;

        let result = self
            .connection
            .query_row(
                "SELECT
                    algorithm,
                    total_distance_km,
                    total_duration_minutes,
                    fuel_cost,
                    optimization_score,
                    waypoint_count,
                    execution_time_ms
                 FROM optimization_results WHERE session_id = ?1",
                [id.get()],
                result_from_row,
            )
            .optional()
            .map_err(fail("load optimization result"))?;

        Ok(Some(SessionDetails::new(session, waypoints, orders, result)))
    }

    fn list_sessions(
        &self,
        filter: &SessionFilter,
        page: Page,
    ) -> Result<SessionPage, StoreError> {
        let (courier, distributor, status) = filter_params(filter);
        let total: i64 = self
            .connection
            .query_row(
                &format!("SELECT COUNT(*) FROM optimization_sessions WHERE {FILTER_CLAUSE}"),
                params![courier, distributor, status],
                |row| row.get(0),
            )
            .map_err(query_error("count sessions", "optimization_session"))?;
        let total = u64::try_from(total).unwrap_or(0);

        let mut statement = self
            .connection
            .prepare_cached(&format!(
                "SELECT {SESSION_COLUMNS} FROM optimization_sessions
                 WHERE {FILTER_CLAUSE}
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?4 OFFSET ?5"
            ))
            .map_err(query_error("prepare session listing", "optimization_session"))?;
        let sessions = statement
            .query_map(
                params![
                    courier,
                    distributor,
                    status,
                    page.limit,
                    encode_u64(page.offset()),
                ],
                session_from_row,
            )
            .map_err(query_error("list sessions", "optimization_session"))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(query_error("read sessions", "optimization_session"))?;

        Ok(SessionPage {
            sessions,
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
        let (courier, distributor, status) = filter_params(filter);
        let mut statement = self
            .connection
            .prepare_cached(&format!(
                "SELECT {SESSION_COLUMNS} FROM optimization_sessions
                 WHERE {FILTER_CLAUSE} AND created_at >= ?4
                 ORDER BY created_at DESC, id DESC"
            ))
            .map_err(query_error("prepare session window", "optimization_session"))?;
        let rows = statement
            .query_map(
                params![courier, distributor, status, encode_time(since)],
                session_from_row,
            )
            .map_err(query_error("query session window", "optimization_session"))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(query_error("read session window", "optimization_session"))
    }

    fn delete_session(&mut self, id: SessionId) -> Result<bool, StoreError> {
        // Waypoints, order sequence and result rows cascade.
        let deleted = self
            .connection
            .execute("DELETE FROM optimization_sessions WHERE id = ?1", [id.get()])
            .map_err(store_error("delete session", "optimization_session", id.get()))?;
        Ok(deleted > 0)
    }
}
