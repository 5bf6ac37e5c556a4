//! Tests for session listing, deletion and the dashboard aggregates.

use dispatch_core::{
    AssignmentEngine, CourierId, DEFAULT_OPTIMIZATION_WINDOW_DAYS, DispatchReporting,
    DistributorId, OptimizeError, OptimizeRequest, Page, RouteOptimizer, SessionFilter,
    SessionId, SessionStatus, SessionStore, assignment_analytics, create_session, delete_session,
    get_session, optimization_analytics, test_support::MemoryStore,
};
use rstest::{fixture, rstest};

const DISTRIBUTOR: DistributorId = DistributorId(4);

struct Fleet {
    store: MemoryStore,
    courier: CourierId,
}

#[fixture]
fn fleet() -> Fleet {
    let mut store = MemoryStore::default();
    let courier = store.add_courier("Hana", Some((30.05, 31.23)), 10);
    store.add_routeable_order(courier, DISTRIBUTOR, (30.06, 31.24));
    Fleet { store, courier }
}

fn sessions(fleet: &mut Fleet, count: usize) -> Vec<SessionId> {
    (0..count)
        .map(|n| {
            create_session(
                &mut fleet.store,
                &format!("Run {n}"),
                fleet.courier,
                DISTRIBUTOR,
                "nearest_neighbor",
            )
            .expect("create session")
        })
        .collect()
}

#[rstest]
fn blank_names_are_rejected(mut fleet: Fleet) {
    let err = create_session(&mut fleet.store, "  ", fleet.courier, DISTRIBUTOR, "nearest_neighbor")
        .expect_err("blank name");
    assert!(matches!(err, OptimizeError::EmptyName));
}

#[rstest]
fn listing_pages_newest_first(mut fleet: Fleet) {
    let ids = sessions(&mut fleet, 12);
    let filter = SessionFilter {
        distributor_id: Some(DISTRIBUTOR),
        ..SessionFilter::default()
    };

    let first = fleet
        .store
        .list_sessions(&filter, Page::default())
        .expect("first page");
    assert_eq!(first.total, 12);
    assert_eq!(first.pages, 2);
    assert_eq!(first.sessions.len(), 10);
    assert_eq!(first.sessions[0].id, ids[11]);

    let second = fleet
        .store
        .list_sessions(&filter, Page::new(2, 10))
        .expect("second page");
    assert_eq!(second.sessions.len(), 2);
    assert_eq!(second.sessions[1].id, ids[0]);
}

#[rstest]
fn listing_filters_by_status(mut fleet: Fleet) {
    let ids = sessions(&mut fleet, 3);
    RouteOptimizer::new()
        .optimize(&mut fleet.store, &OptimizeRequest::new(ids[1], fleet.courier))
        .expect("optimize");

    let completed = SessionFilter {
        status: Some(SessionStatus::Completed),
        ..SessionFilter::default()
    };
    let page = fleet
        .store
        .list_sessions(&completed, Page::default())
        .expect("list");
    assert_eq!(page.total, 1);
    assert_eq!(page.sessions[0].id, ids[1]);
}

#[rstest]
fn deleting_removes_the_route(mut fleet: Fleet) {
    let ids = sessions(&mut fleet, 1);
    RouteOptimizer::new()
        .optimize(&mut fleet.store, &OptimizeRequest::new(ids[0], fleet.courier))
        .expect("optimize");

    delete_session(&mut fleet.store, ids[0]).expect("delete");
    assert!(matches!(
        get_session(&fleet.store, ids[0]),
        Err(OptimizeError::SessionNotFound(_))
    ));
    assert!(matches!(
        delete_session(&mut fleet.store, ids[0]),
        Err(OptimizeError::SessionNotFound(_))
    ));
}

#[rstest]
fn optimization_analytics_summarise_the_window(mut fleet: Fleet) {
    let ids = sessions(&mut fleet, 2);
    let plan = RouteOptimizer::new()
        .optimize(&mut fleet.store, &OptimizeRequest::new(ids[0], fleet.courier))
        .expect("optimize")
        .plan;

    let filter = SessionFilter {
        courier_id: Some(fleet.courier),
        ..SessionFilter::default()
    };
    let report = optimization_analytics(&fleet.store, &filter, DEFAULT_OPTIMIZATION_WINDOW_DAYS)
        .expect("analytics");
    assert_eq!(report.total_sessions, 2);
    assert_eq!(report.completed_sessions, 1);
    assert_eq!(report.failed_sessions, 0);
    // Only the completed session carries totals.
    assert_eq!(report.avg_distance_km, plan.total_distance_km);
    assert_eq!(report.recent_sessions.len(), 2);
}

#[rstest]
fn assignment_reports_follow_batches() {
    let mut store = MemoryStore::default();
    store.add_courier("Omar", Some((30.0, 31.0)), 10);
    store.add_pending_order(DISTRIBUTOR, (30.01, 31.0), 2);
    store.add_pending_order(DISTRIBUTOR, (30.02, 31.0), 1);

    let before = store.assignment_status(DISTRIBUTOR).expect("status");
    assert_eq!(before.unassigned_orders, 2);
    assert!(before.can_auto_assign);

    let outcome = AssignmentEngine::new()
        .run_batch(&mut store, DISTRIBUTOR)
        .expect("batch");
    let batch = outcome.batch_id.expect("batch id");

    let after = store.assignment_status(DISTRIBUTOR).expect("status");
    assert_eq!(after.unassigned_orders, 0);
    assert_eq!(after.active_assignments, 2);
    assert_eq!(after.today_assignments, 2);
    assert!(!after.can_auto_assign);

    let analytics = assignment_analytics(&store, DISTRIBUTOR, 7).expect("analytics");
    assert_eq!(analytics.summary.total_batches, 1);
    assert_eq!(analytics.summary.total_assigned, 2);
    assert_eq!(analytics.summary.assignment_rate, 1.0);

    let listed = store.list_batches(DISTRIBUTOR, Page::default()).expect("batches");
    assert_eq!(listed.len(), 1);
    let details = store.batch_details(batch).expect("details");
    assert_eq!(details.len(), 2);
}
