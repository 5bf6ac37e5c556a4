//! Dashboard subcommands: `status`, `analytics`, `batches` and
//! `performance`.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use dispatch_core::{
    BatchId, DEFAULT_ASSIGNMENT_WINDOW_DAYS, DEFAULT_OPTIMIZATION_WINDOW_DAYS, DispatchReporting,
    DistributorId, assignment_analytics, optimization_analytics,
};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_BATCH_ID, ARG_COURIER_ID, ARG_DATABASE, ARG_DAYS, ARG_DISTRIBUTOR_ID, ARG_LIMIT, ARG_PAGE,
    ARG_STATUS, CliError,
    database::open_store,
    output::write_json,
    require,
    sessions::{page_from, session_filter},
};

pub(crate) const ENV_STATUS_DATABASE: &str = "DISPATCH_CMDS_STATUS_DATABASE";
pub(crate) const ENV_STATUS_DISTRIBUTOR_ID: &str = "DISPATCH_CMDS_STATUS_DISTRIBUTOR_ID";
pub(crate) const ENV_ANALYTICS_DATABASE: &str = "DISPATCH_CMDS_ANALYTICS_DATABASE";
pub(crate) const ENV_ANALYTICS_DISTRIBUTOR_ID: &str = "DISPATCH_CMDS_ANALYTICS_DISTRIBUTOR_ID";
pub(crate) const ENV_BATCHES_DATABASE: &str = "DISPATCH_CMDS_BATCHES_DATABASE";
pub(crate) const ENV_BATCHES_DISTRIBUTOR_ID: &str = "DISPATCH_CMDS_BATCHES_DISTRIBUTOR_ID";
pub(crate) const ENV_PERFORMANCE_DATABASE: &str = "DISPATCH_CMDS_PERFORMANCE_DATABASE";

/// CLI arguments for the `status` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "status",
    about = "Show the live assignment dashboard for a distributor"
)]
#[ortho_config(prefix = "DISPATCH")]
pub(crate) struct StatusArgs {
    /// Path to the SQLite dispatch database.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Distributor to report on.
    #[arg(long = ARG_DISTRIBUTOR_ID, value_name = "id")]
    #[serde(default)]
    pub(crate) distributor_id: Option<i64>,
}

pub(crate) fn run_status_with(args: StatusArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let database = require(merged.database, ARG_DATABASE, ENV_STATUS_DATABASE)?;
    let distributor_id = require(
        merged.distributor_id,
        ARG_DISTRIBUTOR_ID,
        ENV_STATUS_DISTRIBUTOR_ID,
    )?;
    let store = open_store(&database)?;
    let report = store.assignment_status(DistributorId(distributor_id))?;
    write_json(writer, &report)
}

/// CLI arguments for the `analytics` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "analytics",
    long_about = "Summarise the distributor's assignment batches over the \
                 last few days: orders considered, assignment rate, delivery \
                 success and average distance.",
    about = "Summarise recent assignment batches"
)]
#[ortho_config(prefix = "DISPATCH")]
pub(crate) struct AnalyticsArgs {
    /// Path to the SQLite dispatch database.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Distributor to report on.
    #[arg(long = ARG_DISTRIBUTOR_ID, value_name = "id")]
    #[serde(default)]
    pub(crate) distributor_id: Option<i64>,
    /// Look-back window in days (default 7).
    #[arg(long = ARG_DAYS, value_name = "days")]
    #[serde(default)]
    pub(crate) days: Option<u32>,
}

pub(crate) fn run_analytics_with(
    args: AnalyticsArgs,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let database = require(merged.database, ARG_DATABASE, ENV_ANALYTICS_DATABASE)?;
    let distributor_id = require(
        merged.distributor_id,
        ARG_DISTRIBUTOR_ID,
        ENV_ANALYTICS_DISTRIBUTOR_ID,
    )?;
    let days = merged.days.unwrap_or(DEFAULT_ASSIGNMENT_WINDOW_DAYS);
    let store = open_store(&database)?;
    let analytics = assignment_analytics(&store, DistributorId(distributor_id), days)?;
    write_json(writer, &analytics)
}

/// CLI arguments for the `batches` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "batches",
    long_about = "List a distributor's assignment batches newest first, or \
                 with --batch-id print the audit rows of one batch, \
                 including the couriers that were passed over.",
    about = "List assignment batches or show one batch's audit trail"
)]
#[ortho_config(prefix = "DISPATCH")]
pub(crate) struct BatchesArgs {
    /// Path to the SQLite dispatch database.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Distributor whose batches are listed.
    #[arg(long = ARG_DISTRIBUTOR_ID, value_name = "id")]
    #[serde(default)]
    pub(crate) distributor_id: Option<i64>,
    /// Show the audit rows of this batch instead of listing.
    #[arg(long = ARG_BATCH_ID, value_name = "id")]
    #[serde(default)]
    pub(crate) batch_id: Option<i64>,
    /// Page number, starting at 1.
    #[arg(long = ARG_PAGE, value_name = "page")]
    #[serde(default)]
    pub(crate) page: Option<u32>,
    /// Rows per page.
    #[arg(long = ARG_LIMIT, value_name = "rows")]
    #[serde(default)]
    pub(crate) limit: Option<u32>,
}

pub(crate) fn run_batches_with(args: BatchesArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let database = require(merged.database, ARG_DATABASE, ENV_BATCHES_DATABASE)?;
    if let Some(batch_id) = merged.batch_id {
        let store = open_store(&database)?;
        let details = store.batch_details(BatchId(batch_id))?;
        return write_json(writer, &details);
    }
    let distributor_id = require(
        merged.distributor_id,
        ARG_DISTRIBUTOR_ID,
        ENV_BATCHES_DISTRIBUTOR_ID,
    )?;
    let store = open_store(&database)?;
    let batches = store.list_batches(
        DistributorId(distributor_id),
        page_from(merged.page, merged.limit),
    )?;
    write_json(writer, &batches)
}

/// CLI arguments for the `performance` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "performance",
    about = "Summarise recent optimization sessions"
)]
#[ortho_config(prefix = "DISPATCH")]
pub(crate) struct PerformanceArgs {
    /// Path to the SQLite dispatch database.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Only sessions for this courier.
    #[arg(long = ARG_COURIER_ID, value_name = "id")]
    #[serde(default)]
    pub(crate) courier_id: Option<i64>,
    /// Only sessions owned by this distributor.
    #[arg(long = ARG_DISTRIBUTOR_ID, value_name = "id")]
    #[serde(default)]
    pub(crate) distributor_id: Option<i64>,
    /// Only sessions in this state.
    #[arg(long = ARG_STATUS, value_name = "status")]
    #[serde(default)]
    pub(crate) status: Option<String>,
    /// Look-back window in days (default 30).
    #[arg(long = ARG_DAYS, value_name = "days")]
    #[serde(default)]
    pub(crate) days: Option<u32>,
}

pub(crate) fn run_performance_with(
    args: PerformanceArgs,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let database = require(merged.database, ARG_DATABASE, ENV_PERFORMANCE_DATABASE)?;
    let filter = session_filter(
        merged.courier_id,
        merged.distributor_id,
        merged.status.as_deref(),
    )?;
    let days = merged.days.unwrap_or(DEFAULT_OPTIMIZATION_WINDOW_DAYS);
    let store = open_store(&database)?;
    let analytics = optimization_analytics(&store, &filter, days)?;
    write_json(writer, &analytics)
}
