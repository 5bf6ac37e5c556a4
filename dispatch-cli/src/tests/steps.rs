//! Behaviour-driven step definitions driving the dispatch CLI scenarios.

use super::helpers::{DISTRIBUTOR, Workspace, run_json};
use super::*;
use crate::optimize::{CreatedSession, MatrixProviderBuilder};
use crate::reports::ENV_STATUS_DATABASE;
use dispatch_core::{
    BatchOutcome, DistanceMatrixError, DistanceMatrixProvider, RouteResult, SessionId,
};
use dispatch_data::routing::{HttpDistanceMatrixConfig, test_support::StubDistanceMatrixProvider};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::{Cell, RefCell};

#[derive(Debug)]
struct DispatchWorld {
    workspace: Workspace,
    courier: Cell<Option<i64>>,
    session: Cell<Option<SessionId>>,
    remote_down: Cell<bool>,
    stdout: RefCell<Vec<u8>>,
    result: RefCell<Option<Result<(), CliError>>>,
}

impl DispatchWorld {
    fn new() -> Self {
        Self {
            workspace: Workspace::new(),
            courier: Cell::new(None),
            session: Cell::new(None),
            remote_down: Cell::new(false),
            stdout: RefCell::new(Vec::new()),
            result: RefCell::new(None),
        }
    }

    fn courier(&self) -> i64 {
        self.courier.get().expect("courier seeded")
    }

    fn run(&self, argv: &[String]) {
        let parsed = Cli::try_parse_from(argv).map_err(CliError::from);
        let mut buffer = self.stdout.borrow_mut();
        let outcome = parsed.and_then(|cli| match cli.command {
            Command::Optimize(args) if self.remote_down.get() => {
                run_optimize_with(args, &UnreachableMatrixBuilder, &mut *buffer)
            }
            command => execute(command, &mut *buffer),
        });
        self.result.replace(Some(outcome));
    }

    fn stdout(&self) -> String {
        String::from_utf8(self.stdout.borrow().clone()).expect("stdout utf-8")
    }

    fn expect_success(&self) {
        let borrowed = self.result.borrow();
        let result = borrowed.as_ref().expect("result recorded");
        if let Err(err) = result {
            panic!("expected success, found {err}");
        }
    }
}

#[fixture]
fn world() -> DispatchWorld {
    DispatchWorld::new()
}

struct UnreachableMatrixBuilder;

impl MatrixProviderBuilder for UnreachableMatrixBuilder {
    fn build(
        &self,
        config: &HttpDistanceMatrixConfig,
    ) -> Result<Box<dyn DistanceMatrixProvider>, CliError> {
        Ok(Box::new(StubDistanceMatrixProvider::with_error(
            DistanceMatrixError::Timeout {
                url: config.base_url.clone(),
                timeout_secs: 10,
            },
        )))
    }
}

#[given("a dispatch database with one courier and two pending orders")]
fn database_with_courier_and_orders(#[from(world)] world: &DispatchWorld) {
    let courier = world.workspace.seed_courier_with_orders();
    world.courier.set(Some(courier));
}

#[given("the orders have been assigned")]
fn orders_have_been_assigned(#[from(world)] world: &DispatchWorld) {
    let distributor = DISTRIBUTOR.to_string();
    let outcome: BatchOutcome = run_json(&[
        "dispatch",
        "assign",
        "--database",
        world.workspace.database(),
        "--distributor-id",
        &distributor,
    ]);
    assert_eq!(outcome.assignments.len(), 2);
}

#[given("an optimization session for the courier")]
fn optimization_session_for_courier(#[from(world)] world: &DispatchWorld) {
    let courier = world.courier().to_string();
    let distributor = DISTRIBUTOR.to_string();
    let created: CreatedSession = run_json(&[
        "dispatch",
        "create",
        "--database",
        world.workspace.database(),
        "--name",
        "Evening run",
        "--courier-id",
        &courier,
        "--distributor-id",
        &distributor,
    ]);
    world.session.set(Some(created.session_id));
}

#[given("the distance matrix service is unavailable")]
fn distance_matrix_service_unavailable(#[from(world)] world: &DispatchWorld) {
    world.remote_down.set(true);
}

#[when("I run the assign command")]
fn run_assign_command(#[from(world)] world: &DispatchWorld) {
    world.run(&[
        "dispatch".to_owned(),
        "assign".to_owned(),
        format!("--{ARG_DATABASE}"),
        world.workspace.database().to_owned(),
        format!("--{ARG_DISTRIBUTOR_ID}"),
        DISTRIBUTOR.to_string(),
    ]);
}

#[when("I run the optimize command")]
fn run_optimize_command(#[from(world)] world: &DispatchWorld) {
    let session = world.session.get().expect("session created");
    let mut argv = vec![
        "dispatch".to_owned(),
        "optimize".to_owned(),
        format!("--{ARG_DATABASE}"),
        world.workspace.database().to_owned(),
        format!("--{ARG_SESSION_ID}"),
        session.to_string(),
        format!("--{ARG_COURIER_ID}"),
        world.courier().to_string(),
    ];
    if world.remote_down.get() {
        argv.extend([format!("--{ARG_MATRIX_API_KEY}"), "test-key".to_owned()]);
    }
    world.run(&argv);
}

#[when("I run the status command without a database")]
fn run_status_without_database(#[from(world)] world: &DispatchWorld) {
    world.run(&[
        "dispatch".to_owned(),
        "status".to_owned(),
        format!("--{ARG_DISTRIBUTOR_ID}"),
        DISTRIBUTOR.to_string(),
    ]);
}

#[then("the command succeeds and both orders are assigned")]
fn command_assigns_both_orders(#[from(world)] world: &DispatchWorld) {
    world.expect_success();
    let outcome: BatchOutcome =
        serde_json::from_str(&world.stdout()).expect("output should be a batch outcome");
    assert!(outcome.success);
    assert_eq!(outcome.statistics.total_orders, 2);
    assert_eq!(outcome.statistics.assigned_orders, 2);
    assert_eq!(outcome.statistics.couriers_used, 1);
}

#[then("the command succeeds and prints a route through both stops")]
fn command_prints_route(#[from(world)] world: &DispatchWorld) {
    world.expect_success();
    let result: RouteResult =
        serde_json::from_str(&world.stdout()).expect("output should be a route result");
    assert_eq!(Some(result.session_id), world.session.get());
    assert_eq!(result.plan.stop_count(), 2);
    let sequence: Vec<u32> = result.plan.waypoints.iter().map(|w| w.sequence).collect();
    assert_eq!(sequence, vec![0, 1, 2]);
}

#[then("the command fails because the database is missing")]
fn command_fails_missing_database(#[from(world)] world: &DispatchWorld) {
    let borrowed = world.result.borrow();
    let error = borrowed
        .as_ref()
        .expect("result recorded")
        .as_ref()
        .expect_err("expected error");
    match error {
        CliError::MissingArgument { field, env } => {
            assert_eq!(*field, ARG_DATABASE);
            assert_eq!(*env, ENV_STATUS_DATABASE);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

macro_rules! register_dispatch_scenario {
    ($fn_name:ident, $scenario_title:literal) => {
        #[scenario(path = "tests/features/dispatch_commands.feature", name = $scenario_title)]
        fn $fn_name(#[from(world)] world: DispatchWorld) {
            let _ = world;
        }
    };
}

register_dispatch_scenario!(
    assign_from_command_line,
    "assigning pending orders from the command line"
);
register_dispatch_scenario!(
    optimize_from_command_line,
    "optimizing a courier route from the command line"
);
register_dispatch_scenario!(
    optimize_with_distance_service_down,
    "optimizing while the distance service is down"
);
register_dispatch_scenario!(
    reject_missing_database,
    "rejecting a command without a database"
);
