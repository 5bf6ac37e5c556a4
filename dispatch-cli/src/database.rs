//! Database opening and the `init` subcommand.

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use dispatch_data::sqlite::{SCHEMA_VERSION, SqliteDispatchStore};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{ARG_DATABASE, CliError, output::write_json, require};

pub(crate) const ENV_INIT_DATABASE: &str = "DISPATCH_CMDS_INIT_DATABASE";

/// Open the dispatch database at `path`, creating and migrating it as needed.
pub(crate) fn open_store(path: &Utf8Path) -> Result<SqliteDispatchStore, CliError> {
    SqliteDispatchStore::open(path).map_err(|source| CliError::OpenStore {
        path: path.to_path_buf(),
        source,
    })
}

/// CLI arguments for the `init` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "init",
    about = "Create or upgrade the dispatch database schema"
)]
#[ortho_config(prefix = "DISPATCH")]
pub(crate) struct InitArgs {
    /// Path to the SQLite dispatch database.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
}

/// Result printed by `init`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct InitReport {
    /// Database that was initialised.
    pub(crate) database: Utf8PathBuf,
    /// Schema version now recorded in it.
    pub(crate) schema_version: i64,
}

pub(crate) fn run_init_with(args: InitArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let database = require(merged.database, ARG_DATABASE, ENV_INIT_DATABASE)?;
    open_store(&database)?;
    log::info!("initialised dispatch database at {database}");
    write_json(
        writer,
        &InitReport {
            database,
            schema_version: SCHEMA_VERSION,
        },
    )
}
