//! Command-line interface for the courier dispatch engine.
//!
//! Every subcommand opens the SQLite dispatch database named by
//! `--database`, performs one operation and prints its result as pretty
//! JSON on stdout. Options can also come from configuration files or
//! `DISPATCH_CMDS_<COMMAND>_<OPTION>` environment variables.
#![forbid(unsafe_code)]

mod assign;
mod database;
mod error;
mod optimize;
mod output;
mod reports;
mod sessions;

use std::io::Write;

use clap::{Parser, Subcommand};

pub use error::CliError;

use assign::{AssignArgs, run_assign_with};
use database::{InitArgs, run_init_with};
use optimize::{
    CreateArgs, DefaultMatrixProviderBuilder, OptimizeArgs, StopsArgs, run_create_with,
    run_optimize_with, run_stops_with,
};
use reports::{
    AnalyticsArgs, BatchesArgs, PerformanceArgs, StatusArgs, run_analytics_with,
    run_batches_with, run_performance_with, run_status_with,
};
use sessions::{
    DeleteArgs, SessionsArgs, ShowArgs, run_delete_with, run_sessions_with, run_show_with,
};

pub(crate) const ARG_DATABASE: &str = "database";
pub(crate) const ARG_DISTRIBUTOR_ID: &str = "distributor-id";
pub(crate) const ARG_COURIER_ID: &str = "courier-id";
pub(crate) const ARG_SESSION_ID: &str = "session-id";
pub(crate) const ARG_BATCH_ID: &str = "batch-id";
pub(crate) const ARG_NAME: &str = "name";
pub(crate) const ARG_ALGORITHM: &str = "algorithm";
pub(crate) const ARG_STATUS: &str = "status";
pub(crate) const ARG_DAYS: &str = "days";
pub(crate) const ARG_PAGE: &str = "page";
pub(crate) const ARG_LIMIT: &str = "limit";
pub(crate) const ARG_WORKLOAD_THRESHOLD: &str = "workload-threshold";
pub(crate) const ARG_MATRIX_BASE_URL: &str = "matrix-base-url";
pub(crate) const ARG_MATRIX_API_KEY: &str = "matrix-api-key";
pub(crate) const ARG_MATRIX_TIMEOUT_SECS: &str = "matrix-timeout-secs";

/// Run the dispatch CLI with the current process arguments and environment.
///
/// # Errors
///
/// Returns the first argument, configuration, store or output failure.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let mut stdout = std::io::stdout().lock();
    execute(cli.command, &mut stdout)
}

fn execute(command: Command, writer: &mut dyn Write) -> Result<(), CliError> {
    match command {
        Command::Init(args) => run_init_with(args, writer),
        Command::Assign(args) => run_assign_with(args, writer),
        Command::Status(args) => run_status_with(args, writer),
        Command::Analytics(args) => run_analytics_with(args, writer),
        Command::Batches(args) => run_batches_with(args, writer),
        Command::Stops(args) => run_stops_with(args, writer),
        Command::Create(args) => run_create_with(args, writer),
        Command::Optimize(args) => {
            run_optimize_with(args, &DefaultMatrixProviderBuilder, writer)
        }
        Command::Show(args) => run_show_with(args, writer),
        Command::Sessions(args) => run_sessions_with(args, writer),
        Command::Performance(args) => run_performance_with(args, writer),
        Command::Delete(args) => run_delete_with(args, writer),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "dispatch",
    about = "Assign orders to couriers and optimize delivery routes",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create or upgrade the dispatch database schema.
    Init(InitArgs),
    /// Run an assignment batch for a distributor.
    Assign(AssignArgs),
    /// Show the live assignment dashboard for a distributor.
    Status(StatusArgs),
    /// Summarise recent assignment batches.
    Analytics(AnalyticsArgs),
    /// List assignment batches or show one batch's audit trail.
    Batches(BatchesArgs),
    /// List the open stops a courier could be routed through.
    Stops(StopsArgs),
    /// Create a pending optimization session.
    Create(CreateArgs),
    /// Optimize a session's route and save it.
    Optimize(OptimizeArgs),
    /// Show a session with its saved route.
    Show(ShowArgs),
    /// List optimization sessions.
    Sessions(SessionsArgs),
    /// Summarise recent optimization sessions.
    Performance(PerformanceArgs),
    /// Delete an optimization session and its route.
    Delete(DeleteArgs),
}

pub(crate) fn require<T>(
    value: Option<T>,
    field: &'static str,
    env: &'static str,
) -> Result<T, CliError> {
    value.ok_or(CliError::MissingArgument { field, env })
}

#[cfg(test)]
mod tests;
