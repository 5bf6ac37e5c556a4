//! Session subcommands: `show`, `sessions` and `delete`.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use dispatch_core::{
    CourierId, DistributorId, Page, SessionFilter, SessionId, SessionStatus, SessionStore,
    delete_session, get_session,
};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_COURIER_ID, ARG_DATABASE, ARG_DISTRIBUTOR_ID, ARG_LIMIT, ARG_PAGE, ARG_SESSION_ID,
    ARG_STATUS, CliError, database::open_store, output::write_json, require,
};

pub(crate) const ENV_SHOW_DATABASE: &str = "DISPATCH_CMDS_SHOW_DATABASE";
pub(crate) const ENV_SHOW_SESSION_ID: &str = "DISPATCH_CMDS_SHOW_SESSION_ID";
pub(crate) const ENV_SESSIONS_DATABASE: &str = "DISPATCH_CMDS_SESSIONS_DATABASE";
pub(crate) const ENV_DELETE_DATABASE: &str = "DISPATCH_CMDS_DELETE_DATABASE";
pub(crate) const ENV_DELETE_SESSION_ID: &str = "DISPATCH_CMDS_DELETE_SESSION_ID";

/// Build a session filter from optional CLI values.
pub(crate) fn session_filter(
    courier_id: Option<i64>,
    distributor_id: Option<i64>,
    status: Option<&str>,
) -> Result<SessionFilter, CliError> {
    let status = status
        .map(str::parse::<SessionStatus>)
        .transpose()
        .map_err(CliError::InvalidSessionStatus)?;
    Ok(SessionFilter {
        courier_id: courier_id.map(CourierId),
        distributor_id: distributor_id.map(DistributorId),
        status,
    })
}

/// Page window with unset values taken from [`Page::default`].
pub(crate) fn page_from(page: Option<u32>, limit: Option<u32>) -> Page {
    let defaults = Page::default();
    Page::new(page.unwrap_or(defaults.page), limit.unwrap_or(defaults.limit))
}

/// CLI arguments for the `show` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(name = "show", about = "Show a session with its saved route")]
#[ortho_config(prefix = "DISPATCH")]
pub(crate) struct ShowArgs {
    /// Path to the SQLite dispatch database.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Session to show.
    #[arg(long = ARG_SESSION_ID, value_name = "id")]
    #[serde(default)]
    pub(crate) session_id: Option<i64>,
}

pub(crate) fn run_show_with(args: ShowArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let database = require(merged.database, ARG_DATABASE, ENV_SHOW_DATABASE)?;
    let session_id = require(merged.session_id, ARG_SESSION_ID, ENV_SHOW_SESSION_ID)?;
    let store = open_store(&database)?;
    let details = get_session(&store, SessionId(session_id))?;
    write_json(writer, &details)
}

/// CLI arguments for the `sessions` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "sessions",
    long_about = "List optimization sessions newest first, optionally \
                 filtered by courier, distributor or status, one page at a \
                 time.",
    about = "List optimization sessions"
)]
#[ortho_config(prefix = "DISPATCH")]
pub(crate) struct SessionsArgs {
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
    /// Page number, starting at 1.
    #[arg(long = ARG_PAGE, value_name = "page")]
    #[serde(default)]
    pub(crate) page: Option<u32>,
    /// Rows per page.
    #[arg(long = ARG_LIMIT, value_name = "rows")]
    #[serde(default)]
    pub(crate) limit: Option<u32>,
}

pub(crate) fn run_sessions_with(
    args: SessionsArgs,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let database = require(merged.database, ARG_DATABASE, ENV_SESSIONS_DATABASE)?;
    let filter = session_filter(
        merged.courier_id,
        merged.distributor_id,
        merged.status.as_deref(),
    )?;
    let store = open_store(&database)?;
    let page = store.list_sessions(&filter, page_from(merged.page, merged.limit))?;
    write_json(writer, &page)
}

/// CLI arguments for the `delete` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(name = "delete", about = "Delete an optimization session and its route")]
#[ortho_config(prefix = "DISPATCH")]
pub(crate) struct DeleteArgs {
    /// Path to the SQLite dispatch database.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Session to delete.
    #[arg(long = ARG_SESSION_ID, value_name = "id")]
    #[serde(default)]
    pub(crate) session_id: Option<i64>,
}

/// Result printed by `delete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct DeletedSession {
    /// Session that was removed.
    pub(crate) session_id: SessionId,
}

pub(crate) fn run_delete_with(args: DeleteArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let database = require(merged.database, ARG_DATABASE, ENV_DELETE_DATABASE)?;
    let session_id = SessionId(require(
        merged.session_id,
        ARG_SESSION_ID,
        ENV_DELETE_SESSION_ID,
    )?);
    let mut store = open_store(&database)?;
    delete_session(&mut store, session_id)?;
    write_json(writer, &DeletedSession { session_id })
}
