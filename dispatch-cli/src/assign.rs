//! The `assign` subcommand.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use dispatch_core::{AssignmentConfig, AssignmentEngine, DistributorId};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_DATABASE, ARG_DISTRIBUTOR_ID, ARG_WORKLOAD_THRESHOLD, CliError, database::open_store,
    output::write_json, require,
};

pub(crate) const ENV_ASSIGN_DATABASE: &str = "DISPATCH_CMDS_ASSIGN_DATABASE";
pub(crate) const ENV_ASSIGN_DISTRIBUTOR_ID: &str = "DISPATCH_CMDS_ASSIGN_DISTRIBUTOR_ID";

/// CLI arguments for the `assign` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "assign",
    long_about = "Match the distributor's pending orders to nearby couriers \
                 with spare capacity, balancing workload, and commit the \
                 batch with its audit trail in one transaction.",
    about = "Run an assignment batch for a distributor"
)]
#[ortho_config(prefix = "DISPATCH")]
pub(crate) struct AssignArgs {
    /// Path to the SQLite dispatch database.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Distributor whose pending orders are assigned.
    #[arg(long = ARG_DISTRIBUTOR_ID, value_name = "id")]
    #[serde(default)]
    pub(crate) distributor_id: Option<i64>,
    /// Largest allowed gap between a candidate's workload and the lightest.
    #[arg(long = ARG_WORKLOAD_THRESHOLD, value_name = "count")]
    #[serde(default)]
    pub(crate) workload_threshold: Option<u32>,
}

impl AssignArgs {
    pub(crate) fn into_config(self) -> Result<AssignConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        AssignConfig::try_from(merged)
    }
}

/// Resolved `assign` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AssignConfig {
    pub(crate) database: Utf8PathBuf,
    pub(crate) distributor_id: DistributorId,
    pub(crate) engine: AssignmentConfig,
}

impl TryFrom<AssignArgs> for AssignConfig {
    type Error = CliError;

    fn try_from(args: AssignArgs) -> Result<Self, Self::Error> {
        let database = require(args.database, ARG_DATABASE, ENV_ASSIGN_DATABASE)?;
        let distributor_id = require(
            args.distributor_id,
            ARG_DISTRIBUTOR_ID,
            ENV_ASSIGN_DISTRIBUTOR_ID,
        )?;
        let engine = args.workload_threshold.map_or_else(
            AssignmentConfig::default,
            |threshold| AssignmentConfig::default().with_workload_threshold(threshold),
        );
        Ok(Self {
            database,
            distributor_id: DistributorId(distributor_id),
            engine,
        })
    }
}

pub(crate) fn run_assign_with(args: AssignArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    let mut store = open_store(&config.database)?;
    let outcome =
        AssignmentEngine::with_config(config.engine).run_batch(&mut store, config.distributor_id)?;
    write_json(writer, &outcome)
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<AssignConfig, CliError> {
    let merged = AssignArgs::merge_from_layers(layers).map_err(CliError::from)?;
    AssignConfig::try_from(merged)
}
