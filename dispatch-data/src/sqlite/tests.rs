//! Unit tests for the SQLite dispatch store.

use chrono::{Duration, Utc};
use dispatch_core::{
    AssignmentEngine, AssignmentStore, AssignmentTransaction, BatchId, BatchLedger,
    BatchStatistics, CourierDirectory, CourierId, DispatchReporting, DistributorId,
    NewAssignment, OptimizeError, OptimizeRequest, OrderId, OrderIntake, OrderStatus, Page,
    RouteOptimizer, SessionFilter, SessionId, SessionStatus, SessionStore, StoreError,
    create_session, delete_session,
};
use rstest::{fixture, rstest};
use rusqlite::{Connection, params};

use super::{
    SCHEMA_VERSION, SqliteDispatchStore, SqliteStoreError, codec::encode_time, initialise_schema,
};

const DISTRIBUTOR: DistributorId = DistributorId(1);

fn insert_courier(
    store: &SqliteDispatchStore,
    name: &str,
    depot: Option<(f64, f64)>,
    max: u32,
) -> CourierId {
    store
        .connection()
        .execute(
            "INSERT INTO couriers (
                account_id, name, depot_latitude, depot_longitude, depot_address,
                max_daily_orders, is_active, is_online
            ) VALUES (1, ?1, ?2, ?3, ?4, ?5, 1, 1)",
            params![
                name,
                depot.map(|(lat, _)| lat),
                depot.map(|(_, lon)| lon),
                format!("{name} depot"),
                max,
            ],
        )
        .expect("insert courier");
    CourierId(store.connection().last_insert_rowid())
}

fn insert_order(
    store: &SqliteDispatchStore,
    at: (f64, f64),
    priority: i32,
    age_minutes: i64,
) -> OrderId {
    let created_at = Utc::now() - Duration::minutes(age_minutes);
    store
        .connection()
        .execute(
            "INSERT INTO orders (
                distributor_id, buyer_id, delivery_latitude, delivery_longitude,
                delivery_address, priority_level, status, created_at
            ) VALUES (?1, 42, ?2, ?3, 'Drop', ?4, 'pending', ?5)",
            params![DISTRIBUTOR.get(), at.0, at.1, priority, encode_time(created_at)],
        )
        .expect("insert order");
    OrderId(store.connection().last_insert_rowid())
}

fn insert_assignment(
    store: &SqliteDispatchStore,
    order: OrderId,
    courier: CourierId,
    status: &str,
) {
    let now = encode_time(Utc::now());
    store
        .connection()
        .execute(
            "INSERT INTO delivery_assignments (
                order_id, courier_id, assigned_by, distance_km,
                estimated_delivery_minutes, status, assigned_at, updated_at
            ) VALUES (?1, ?2, ?3, 1.0, 18, ?4, ?5, ?5)",
            params![order.get(), courier.get(), DISTRIBUTOR.get(), status, now],
        )
        .expect("insert assignment");
}

fn order_status(store: &SqliteDispatchStore, order: OrderId) -> String {
    store
        .connection()
        .query_row("SELECT status FROM orders WHERE id = ?1", [order.get()], |row| {
            row.get(0)
        })
        .expect("read order status")
}

fn table_count(store: &SqliteDispatchStore, table: &str) -> i64 {
    store
        .connection()
        .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .expect("count rows")
}

#[fixture]
fn store() -> SqliteDispatchStore {
    SqliteDispatchStore::open_in_memory().expect("open in-memory store")
}

#[rstest]
fn rejects_newer_schema_version() {
    let mut connection = Connection::open_in_memory().expect("open connection");
    initialise_schema(&mut connection).expect("initialise schema");
    connection
        .execute(
            "UPDATE dispatch_schema_version SET version = ?1",
            [SCHEMA_VERSION + 1],
        )
        .expect("bump version");

    let err = SqliteDispatchStore::from_connection(connection).expect_err("version mismatch");
    assert!(matches!(
        err,
        SqliteStoreError::VersionMismatch { expected, found }
            if expected == SCHEMA_VERSION && found == SCHEMA_VERSION + 1
    ));
}

#[rstest]
fn available_couriers_skip_offline_full_and_depotless(store: SqliteDispatchStore) {
    let busy = insert_courier(&store, "Busy", Some((30.0, 31.0)), 5);
    let idle = insert_courier(&store, "Idle", Some((30.1, 31.1)), 5);
    let full = insert_courier(&store, "Full", Some((30.2, 31.2)), 1);
    insert_courier(&store, "Nowhere", None, 5);
    let offline = insert_courier(&store, "Offline", Some((30.3, 31.3)), 5);
    store
        .connection()
        .execute("UPDATE couriers SET is_online = 0 WHERE id = ?1", [offline.get()])
        .expect("take courier offline");

    let order = insert_order(&store, (30.0, 31.0), 1, 5);
    insert_assignment(&store, order, busy, "accepted");
    let other = insert_order(&store, (30.0, 31.0), 1, 5);
    insert_assignment(&store, other, full, "assigned");
    let done = insert_order(&store, (30.0, 31.0), 1, 5);
    insert_assignment(&store, done, idle, "delivered");

    let couriers = store.available_couriers(DISTRIBUTOR).expect("query couriers");
    let ids: Vec<CourierId> = couriers.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![idle, busy]);
    assert_eq!(couriers[0].current_assignments, 0);
    assert_eq!(couriers[1].current_assignments, 1);
}

#[rstest]
fn intake_orders_by_priority_then_age(store: SqliteDispatchStore) {
    let older = insert_order(&store, (30.0, 31.0), 1, 30);
    let newer = insert_order(&store, (30.0, 31.0), 1, 10);
    let urgent = insert_order(&store, (30.0, 31.0), 5, 1);
    let courier = insert_courier(&store, "Held", Some((30.0, 31.0)), 5);
    let held = insert_order(&store, (30.0, 31.0), 9, 1);
    insert_assignment(&store, held, courier, "assigned");

    let orders = store.unassigned_orders(DISTRIBUTOR).expect("query intake");
    let ids: Vec<OrderId> = orders.iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![urgent, older, newer]);
    assert!(orders.iter().all(|o| o.status == OrderStatus::Pending));
}

#[rstest]
fn dropped_batch_transaction_rolls_back(mut store: SqliteDispatchStore) {
    let order = insert_order(&store, (30.0, 31.0), 1, 5);
    let courier = insert_courier(&store, "Ana", Some((30.0, 31.0)), 5);
    {
        let mut tx = store.begin_batch().expect("begin batch");
        tx.insert_batch(DISTRIBUTOR, "proximity_balanced", Utc::now())
            .expect("insert batch");
        tx.insert_assignment(
            &NewAssignment {
                order_id: order,
                courier_id: courier,
                assigned_by: DISTRIBUTOR,
                distance_km: 0.0,
                estimated_delivery_minutes: 15,
            },
            Utc::now(),
        )
        .expect("insert assignment");
        tx.mark_order_accepted(order).expect("accept order");
    }
    assert_eq!(table_count(&store, "assignment_batches"), 0);
    assert_eq!(table_count(&store, "delivery_assignments"), 0);
    assert_eq!(order_status(&store, order), "pending");
}

#[rstest]
fn accepting_a_non_pending_order_is_not_found(mut store: SqliteDispatchStore) {
    let order = insert_order(&store, (30.0, 31.0), 1, 5);
    store
        .connection()
        .execute("UPDATE orders SET status = 'delivered' WHERE id = ?1", [order.get()])
        .expect("deliver order");
    let mut tx = store.begin_batch().expect("begin batch");
    let err = tx.mark_order_accepted(order).expect_err("order is not pending");
    assert!(matches!(err, StoreError::NotFound { entity: "pending order", .. }));
}

#[rstest]
fn second_open_assignment_for_an_order_is_rejected(mut store: SqliteDispatchStore) {
    let order = insert_order(&store, (30.0, 31.0), 1, 5);
    let courier = insert_courier(&store, "Ana", Some((30.0, 31.0)), 5);
    insert_assignment(&store, order, courier, "assigned");
    let mut tx = store.begin_batch().expect("begin batch");
    let result = tx.insert_assignment(
        &NewAssignment {
            order_id: order,
            courier_id: courier,
            assigned_by: DISTRIBUTOR,
            distance_km: 0.0,
            estimated_delivery_minutes: 15,
        },
        Utc::now(),
    );
    assert!(matches!(result, Err(StoreError::Backend { .. })));
}

#[rstest]
fn finishing_an_unknown_batch_is_not_found(mut store: SqliteDispatchStore) {
    let mut tx = store.begin_batch().expect("begin batch");
    let err = tx
        .finish_batch(BatchId(99), &BatchStatistics::default())
        .expect_err("no such batch");
    assert!(matches!(err, StoreError::NotFound { id: 99, .. }));
    tx.commit().expect("commit empty transaction");
}

#[rstest]
fn batch_is_persisted_with_details(mut store: SqliteDispatchStore) {
    let north = insert_courier(&store, "North", Some((30.2, 31.24)), 10);
    insert_courier(&store, "South", Some((29.9, 31.24)), 10);
    let order = insert_order(&store, (30.21, 31.24), 1, 5);

    let outcome = AssignmentEngine::new()
        .run_batch(&mut store, DISTRIBUTOR)
        .expect("run batch");
    let batch_id = outcome.batch_id.expect("batch written");
    assert_eq!(outcome.assignments[0].courier_id, north);
    assert_eq!(order_status(&store, order), "accepted");

    let details = store.batch_details(batch_id).expect("load details");
    assert_eq!(details.len(), 1);
    assert_eq!(details[0].rank, 1);
    assert_eq!(details[0].alternatives.len(), 1);
    assert_eq!(details[0].alternatives[0].name, "South");

    let batches = store.list_batches(DISTRIBUTOR, Page::default()).expect("list batches");
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].statistics.assigned_orders, 1);
    assert_eq!(batches[0].statistics.couriers_used, 1);

    let since = Utc::now() - Duration::days(1);
    let rows = store.batches_since(DISTRIBUTOR, since).expect("batch analytics");
    assert_eq!(rows[0].linked_assignments, 1);
    assert_eq!(rows[0].delivered_assignments, 0);
}

#[rstest]
fn status_report_counts_today(store: SqliteDispatchStore) {
    let courier = insert_courier(&store, "Ana", Some((30.0, 31.0)), 10);
    insert_order(&store, (30.0, 31.0), 1, 5);
    let active = insert_order(&store, (30.0, 31.0), 1, 5);
    insert_assignment(&store, active, courier, "in_transit");
    let delivered = insert_order(&store, (30.0, 31.0), 1, 5);
    insert_assignment(&store, delivered, courier, "delivered");
    store
        .connection()
        .execute("UPDATE orders SET status = 'delivered' WHERE id = ?1", [delivered.get()])
        .expect("deliver order");

    let report = store.assignment_status(DISTRIBUTOR).expect("status report");
    assert_eq!(report.unassigned_orders, 1);
    assert_eq!(report.active_assignments, 1);
    assert_eq!(report.available_couriers, 1);
    assert_eq!(report.today_assignments, 2);
    assert_eq!(report.today_completed, 1);
    assert!((report.avg_distance_km - 1.0).abs() < 1e-9);
    assert!(report.can_auto_assign);
}

#[rstest]
fn order_with_failed_assignment_is_counted_and_taken_again(mut store: SqliteDispatchStore) {
    let courier = insert_courier(&store, "Ana", Some((30.0, 31.0)), 10);
    let retry = insert_order(&store, (30.0, 31.0), 1, 5);
    insert_assignment(&store, retry, courier, "failed");

    let report = store.assignment_status(DISTRIBUTOR).expect("status report");
    assert_eq!(report.unassigned_orders, 1);
    assert!(report.can_auto_assign);
    let intake = store.unassigned_orders(DISTRIBUTOR).expect("intake");
    assert_eq!(intake.len(), 1);

    let outcome = AssignmentEngine::new()
        .run_batch(&mut store, DISTRIBUTOR)
        .expect("run batch");
    assert_eq!(outcome.statistics.assigned_orders, 1);
    let report = store.assignment_status(DISTRIBUTOR).expect("status after batch");
    assert_eq!(report.unassigned_orders, 0);
}

#[rstest]
fn route_is_saved_and_reloaded(mut store: SqliteDispatchStore) {
    let courier = insert_courier(&store, "Ana", Some((30.0444, 31.2357)), 10);
    let far = insert_order(&store, (30.08, 31.2357), 1, 30);
    let near = insert_order(&store, (30.05, 31.2357), 1, 20);
    for order in [far, near] {
        insert_assignment(&store, order, courier, "assigned");
        store
            .connection()
            .execute("UPDATE orders SET status = 'accepted' WHERE id = ?1", [order.get()])
            .expect("accept order");
    }

    let session = create_session(&mut store, "Morning", courier, DISTRIBUTOR, "nearest_neighbor")
        .expect("create session");
    let result = RouteOptimizer::new()
        .optimize(&mut store, &OptimizeRequest::new(session, courier))
        .expect("optimize route");
    assert_eq!(result.plan.stop_count(), 2);

    let details = store
        .load_session(session)
        .expect("load session")
        .expect("session exists");
    assert_eq!(details.session.status, SessionStatus::Completed);
    assert_eq!(details.waypoints.len(), 3);
    let visited: Vec<OrderId> = details.orders.iter().map(|o| o.order_id).collect();
    assert_eq!(visited, vec![near, far]);
    let saved = details.result.expect("result row");
    assert_eq!(saved.waypoint_count, 3);
    assert_eq!(saved.total_distance_km, result.plan.total_distance_km);

    let err = RouteOptimizer::new()
        .optimize(&mut store, &OptimizeRequest::new(session, courier))
        .expect_err("completed session cannot be rerun");
    assert!(matches!(err, OptimizeError::AlreadyOptimized(id) if id == session));
    let err = store
        .save_route(session, &result.plan, Utc::now())
        .expect_err("saved route is write-once");
    assert!(matches!(err, StoreError::AlreadyExists { .. }));
    let reloaded = store
        .load_session(session)
        .expect("reload session")
        .expect("session exists");
    assert_eq!(reloaded.waypoints, details.waypoints);
    assert_eq!(reloaded.session.status, SessionStatus::Completed);
    assert_eq!(table_count(&store, "route_waypoints"), 3);

    delete_session(&mut store, session).expect("delete session");
    assert_eq!(table_count(&store, "route_waypoints"), 0);
    assert_eq!(table_count(&store, "session_orders"), 0);
    assert_eq!(table_count(&store, "optimization_results"), 0);
}

#[rstest]
fn sessions_are_listed_newest_first_with_filters(mut store: SqliteDispatchStore) {
    let courier = insert_courier(&store, "Ana", Some((30.0, 31.0)), 10);
    for n in 0..5 {
        create_session(&mut store, &format!("Run {n}"), courier, DISTRIBUTOR, "nearest_neighbor")
            .expect("create session");
    }
    let last = store
        .list_sessions(&SessionFilter::default(), Page::new(1, 1))
        .expect("first page");
    let newest = last.sessions[0].id;
    store.mark_failed(newest, "distance service down").expect("fail session");

    let page = store
        .list_sessions(&SessionFilter::default(), Page::new(2, 2))
        .expect("second page");
    assert_eq!(page.total, 5);
    assert_eq!(page.pages, 3);
    assert_eq!(page.sessions.len(), 2);
    assert!(page.sessions[0].id > page.sessions[1].id);

    let failed = store
        .list_sessions(
            &SessionFilter {
                status: Some(SessionStatus::Failed),
                ..SessionFilter::default()
            },
            Page::default(),
        )
        .expect("failed sessions");
    assert_eq!(failed.total, 1);
    assert_eq!(failed.sessions[0].notes.as_deref(), Some("distance service down"));

    let recent = store
        .sessions_since(
            &SessionFilter {
                courier_id: Some(courier),
                ..SessionFilter::default()
            },
            Utc::now() - Duration::hours(1),
        )
        .expect("recent sessions");
    assert_eq!(recent.len(), 5);
}

#[rstest]
fn marking_a_missing_session_is_not_found(mut store: SqliteDispatchStore) {
    let err = store
        .mark_optimizing(SessionId(7), Utc::now())
        .expect_err("no such session");
    assert!(matches!(err, StoreError::NotFound { id: 7, .. }));
    assert!(!store.delete_session(SessionId(7)).expect("delete"));
}
