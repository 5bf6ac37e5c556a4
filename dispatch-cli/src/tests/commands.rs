//! End-to-end command tests against temporary SQLite databases.

use super::helpers::{DISTRIBUTOR, Workspace, run_cli, run_json};
use super::*;
use crate::database::InitReport;
use crate::optimize::{CreatedSession, MatrixProviderBuilder};
use crate::sessions::DeletedSession;
use dispatch_core::{
    AssignmentAnalytics, AssignmentBatch, AssignmentStatusReport, BatchDetail, BatchOutcome,
    DistanceMatrixError, DistanceMatrixProvider, OptimizationAnalytics, OptimizeError,
    RouteResult, RouteStop, SessionDetails, SessionId, SessionPage, SessionStatus, WaypointKind,
};
use dispatch_data::routing::{HttpDistanceMatrixConfig, test_support::StubDistanceMatrixProvider};
use rstest::{fixture, rstest};

#[fixture]
fn workspace() -> Workspace {
    Workspace::new()
}

fn assign(workspace: &Workspace) -> BatchOutcome {
    let distributor = DISTRIBUTOR.to_string();
    run_json(&[
        "dispatch",
        "assign",
        "--database",
        workspace.database(),
        "--distributor-id",
        &distributor,
    ])
}

fn create(workspace: &Workspace, courier: i64) -> SessionId {
    let courier = courier.to_string();
    let distributor = DISTRIBUTOR.to_string();
    let created: CreatedSession = run_json(&[
        "dispatch",
        "create",
        "--database",
        workspace.database(),
        "--name",
        "Morning run",
        "--courier-id",
        &courier,
        "--distributor-id",
        &distributor,
    ]);
    created.session_id
}

struct FailingMatrixBuilder;

impl MatrixProviderBuilder for FailingMatrixBuilder {
    fn build(
        &self,
        config: &HttpDistanceMatrixConfig,
    ) -> Result<Box<dyn DistanceMatrixProvider>, CliError> {
        Ok(Box::new(StubDistanceMatrixProvider::with_error(
            DistanceMatrixError::NetworkError {
                url: config.base_url.clone(),
                message: "connection refused".to_owned(),
            },
        )))
    }
}

#[rstest]
fn init_reports_the_schema_version(workspace: Workspace) {
    let report: InitReport = run_json(&["dispatch", "init", "--database", workspace.database()]);
    assert_eq!(report.database.as_str(), workspace.database());
    assert_eq!(report.schema_version, dispatch_data::sqlite::SCHEMA_VERSION);
}

#[rstest]
fn assign_places_every_order_and_updates_status(workspace: Workspace) {
    let courier = workspace.seed_courier_with_orders();

    let outcome = assign(&workspace);
    assert!(outcome.success);
    assert_eq!(outcome.assignments.len(), 2);
    assert!(outcome.batch_id.is_some());
    assert!(outcome.assignments.iter().all(|a| a.courier_id.get() == courier));

    let distributor = DISTRIBUTOR.to_string();
    let status: AssignmentStatusReport = run_json(&[
        "dispatch",
        "status",
        "--database",
        workspace.database(),
        "--distributor-id",
        &distributor,
    ]);
    assert_eq!(status.unassigned_orders, 0);
    assert_eq!(status.active_assignments, 2);
    assert_eq!(status.today_assignments, 2);
    assert!(!status.can_auto_assign);
}

#[rstest]
fn batches_list_and_detail_views(workspace: Workspace) {
    workspace.seed_courier_with_orders();
    let outcome = assign(&workspace);
    let batch_id = outcome.batch_id.expect("batch written").to_string();
    let distributor = DISTRIBUTOR.to_string();

    let batches: Vec<AssignmentBatch> = run_json(&[
        "dispatch",
        "batches",
        "--database",
        workspace.database(),
        "--distributor-id",
        &distributor,
    ]);
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].statistics.assigned_orders, 2);

    let details: Vec<BatchDetail> = run_json(&[
        "dispatch",
        "batches",
        "--database",
        workspace.database(),
        "--batch-id",
        &batch_id,
    ]);
    let ranks: Vec<u32> = details.iter().map(|d| d.rank).collect();
    assert_eq!(ranks, vec![1, 2]);

    let analytics: AssignmentAnalytics = run_json(&[
        "dispatch",
        "analytics",
        "--database",
        workspace.database(),
        "--distributor-id",
        &distributor,
        "--days",
        "1",
    ]);
    assert_eq!(analytics.summary.total_batches, 1);
    assert_eq!(analytics.summary.total_assigned, 2);
}

#[rstest]
fn optimize_saves_a_route_that_show_reloads(workspace: Workspace) {
    let courier = workspace.seed_courier_with_orders();
    assign(&workspace);
    let courier_arg = courier.to_string();

    let stops: Vec<RouteStop> = run_json(&[
        "dispatch",
        "stops",
        "--database",
        workspace.database(),
        "--courier-id",
        &courier_arg,
    ]);
    assert_eq!(stops.len(), 2);

    let session = create(&workspace, courier).to_string();
    let result: RouteResult = run_json(&[
        "dispatch",
        "optimize",
        "--database",
        workspace.database(),
        "--session-id",
        &session,
        "--courier-id",
        &courier_arg,
    ]);
    assert_eq!(result.plan.waypoints.len(), 3);
    assert_eq!(result.plan.waypoints[0].kind, WaypointKind::Depot);
    assert!(result.map_url.is_some());

    let details: SessionDetails = run_json(&[
        "dispatch",
        "show",
        "--database",
        workspace.database(),
        "--session-id",
        &session,
    ]);
    assert_eq!(details.session.status, SessionStatus::Completed);
    assert_eq!(details.orders.len(), 2);
    let saved: Vec<_> = details.waypoints.iter().map(|w| w.order_id).collect();
    let planned: Vec<_> = result.plan.waypoints.iter().map(|w| w.order_id).collect();
    assert_eq!(saved, planned);
    assert!(details.map_url.is_some());
    assert_eq!(details.map_url, result.map_url);

    let page: SessionPage = run_json(&[
        "dispatch",
        "sessions",
        "--database",
        workspace.database(),
        "--status",
        "completed",
    ]);
    assert_eq!(page.total, 1);

    let performance: OptimizationAnalytics = run_json(&[
        "dispatch",
        "performance",
        "--database",
        workspace.database(),
        "--courier-id",
        &courier_arg,
    ]);
    assert_eq!(performance.completed_sessions, 1);
}

#[rstest]
fn remote_matrix_failure_still_produces_a_route(workspace: Workspace) {
    let courier = workspace.seed_courier_with_orders();
    assign(&workspace);
    let session = create(&workspace, courier).to_string();
    let courier_arg = courier.to_string();

    let cli = Cli::try_parse_from([
        "dispatch",
        "optimize",
        "--database",
        workspace.database(),
        "--session-id",
        &session,
        "--courier-id",
        &courier_arg,
        "--matrix-api-key",
        "test-key",
    ])
    .expect("parse optimize");
    let Command::Optimize(args) = cli.command else {
        panic!("expected optimize command");
    };
    let mut buffer = Vec::new();
    run_optimize_with(args, &FailingMatrixBuilder, &mut buffer).expect("optimize succeeds");

    let result: RouteResult = serde_json::from_slice(&buffer).expect("route JSON");
    assert_eq!(result.plan.stop_count(), 2);
    assert!(result.plan.total_distance_km > 0.0);
}

#[rstest]
fn delete_removes_the_session(workspace: Workspace) {
    let courier = workspace.add_courier("Amal", (30.0444, 31.2357), 5);
    let session = create(&workspace, courier);
    let session_arg = session.to_string();

    let deleted: DeletedSession = run_json(&[
        "dispatch",
        "delete",
        "--database",
        workspace.database(),
        "--session-id",
        &session_arg,
    ]);
    assert_eq!(deleted.session_id, session);

    let (result, _) = run_cli(&[
        "dispatch",
        "show",
        "--database",
        workspace.database(),
        "--session-id",
        &session_arg,
    ]);
    match result {
        Err(CliError::Optimize(OptimizeError::SessionNotFound(id))) => assert_eq!(id, session),
        other => panic!("expected SessionNotFound, found {other:?}"),
    }
}

#[rstest]
fn optimize_without_stops_leaves_the_session_pending(workspace: Workspace) {
    let courier = workspace.add_courier("Amal", (30.0444, 31.2357), 5);
    let session = create(&workspace, courier);
    let session_arg = session.to_string();
    let courier_arg = courier.to_string();

    let (result, stdout) = run_cli(&[
        "dispatch",
        "optimize",
        "--database",
        workspace.database(),
        "--session-id",
        &session_arg,
        "--courier-id",
        &courier_arg,
    ]);
    match result {
        Err(CliError::Optimize(OptimizeError::NoStops(id))) => assert_eq!(id.get(), courier),
        other => panic!("expected NoStops, found {other:?}"),
    }
    assert!(stdout.is_empty());

    let details: SessionDetails = run_json(&[
        "dispatch",
        "show",
        "--database",
        workspace.database(),
        "--session-id",
        &session_arg,
    ]);
    assert_eq!(details.session.status, SessionStatus::Pending);
}

#[rstest]
fn unknown_session_status_is_rejected(workspace: Workspace) {
    let (result, _) = run_cli(&[
        "dispatch",
        "sessions",
        "--database",
        workspace.database(),
        "--status",
        "archived",
    ]);
    match result {
        Err(CliError::InvalidSessionStatus(err)) => assert_eq!(err.value, "archived"),
        other => panic!("expected InvalidSessionStatus, found {other:?}"),
    }
}

#[rstest]
fn unknown_subcommand_is_an_argument_error() {
    let (result, _) = run_cli(&["dispatch", "teleport"]);
    assert!(matches!(result, Err(CliError::ArgumentParsing(_))));
}
