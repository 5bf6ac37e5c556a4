//! Route subcommands: `stops`, `create` and `optimize`.

use std::{io::Write, time::Duration};

use camino::Utf8PathBuf;
use clap::Parser;
use dispatch_core::{
    CourierId, DistanceMatrixProvider, DistributorId, OptimizeRequest, RouteAlgorithm,
    RouteOptimizer, SessionId, SessionStore, create_session,
};
use dispatch_data::routing::{
    DEFAULT_BASE_URL, HttpDistanceMatrixConfig, HttpDistanceMatrixProvider,
};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_ALGORITHM, ARG_COURIER_ID, ARG_DATABASE, ARG_DISTRIBUTOR_ID, ARG_MATRIX_API_KEY,
    ARG_MATRIX_BASE_URL, ARG_MATRIX_TIMEOUT_SECS, ARG_NAME, ARG_SESSION_ID, CliError,
    database::open_store, output::write_json, require,
};

pub(crate) const ENV_STOPS_DATABASE: &str = "DISPATCH_CMDS_STOPS_DATABASE";
pub(crate) const ENV_STOPS_COURIER_ID: &str = "DISPATCH_CMDS_STOPS_COURIER_ID";
pub(crate) const ENV_CREATE_DATABASE: &str = "DISPATCH_CMDS_CREATE_DATABASE";
pub(crate) const ENV_CREATE_NAME: &str = "DISPATCH_CMDS_CREATE_NAME";
pub(crate) const ENV_CREATE_COURIER_ID: &str = "DISPATCH_CMDS_CREATE_COURIER_ID";
pub(crate) const ENV_CREATE_DISTRIBUTOR_ID: &str = "DISPATCH_CMDS_CREATE_DISTRIBUTOR_ID";
pub(crate) const ENV_OPTIMIZE_DATABASE: &str = "DISPATCH_CMDS_OPTIMIZE_DATABASE";
pub(crate) const ENV_OPTIMIZE_SESSION_ID: &str = "DISPATCH_CMDS_OPTIMIZE_SESSION_ID";
pub(crate) const ENV_OPTIMIZE_COURIER_ID: &str = "DISPATCH_CMDS_OPTIMIZE_COURIER_ID";

/// CLI arguments for the `stops` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "stops",
    about = "List the open stops a courier could be routed through"
)]
#[ortho_config(prefix = "DISPATCH")]
pub(crate) struct StopsArgs {
    /// Path to the SQLite dispatch database.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Courier whose stops are listed.
    #[arg(long = ARG_COURIER_ID, value_name = "id")]
    #[serde(default)]
    pub(crate) courier_id: Option<i64>,
    /// Only stops for orders of this distributor.
    #[arg(long = ARG_DISTRIBUTOR_ID, value_name = "id")]
    #[serde(default)]
    pub(crate) distributor_id: Option<i64>,
}

pub(crate) fn run_stops_with(args: StopsArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let database = require(merged.database, ARG_DATABASE, ENV_STOPS_DATABASE)?;
    let courier_id = require(merged.courier_id, ARG_COURIER_ID, ENV_STOPS_COURIER_ID)?;
    let store = open_store(&database)?;
    let stops = store.route_stops(
        CourierId(courier_id),
        merged.distributor_id.map(DistributorId),
    )?;
    write_json(writer, &stops)
}

/// CLI arguments for the `create` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(name = "create", about = "Create a pending optimization session")]
#[ortho_config(prefix = "DISPATCH")]
pub(crate) struct CreateArgs {
    /// Path to the SQLite dispatch database.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Label shown to operators.
    #[arg(long = ARG_NAME, value_name = "text")]
    #[serde(default)]
    pub(crate) name: Option<String>,
    /// Courier whose stops the session will sequence.
    #[arg(long = ARG_COURIER_ID, value_name = "id")]
    #[serde(default)]
    pub(crate) courier_id: Option<i64>,
    /// Distributor that owns the session.
    #[arg(long = ARG_DISTRIBUTOR_ID, value_name = "id")]
    #[serde(default)]
    pub(crate) distributor_id: Option<i64>,
    /// Sequencing strategy (default `nearest_neighbor`).
    #[arg(long = ARG_ALGORITHM, value_name = "name")]
    #[serde(default)]
    pub(crate) algorithm: Option<String>,
}

/// Result printed by `create`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct CreatedSession {
    /// Key of the new session.
    pub(crate) session_id: SessionId,
}

pub(crate) fn run_create_with(args: CreateArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let database = require(merged.database, ARG_DATABASE, ENV_CREATE_DATABASE)?;
    let name = require(merged.name, ARG_NAME, ENV_CREATE_NAME)?;
    let courier_id = require(merged.courier_id, ARG_COURIER_ID, ENV_CREATE_COURIER_ID)?;
    let distributor_id = require(
        merged.distributor_id,
        ARG_DISTRIBUTOR_ID,
        ENV_CREATE_DISTRIBUTOR_ID,
    )?;
    let algorithm = merged
        .algorithm
        .unwrap_or_else(|| RouteAlgorithm::default().as_str().to_owned());
    let mut store = open_store(&database)?;
    let session_id = create_session(
        &mut store,
        &name,
        CourierId(courier_id),
        DistributorId(distributor_id),
        &algorithm,
    )?;
    write_json(writer, &CreatedSession { session_id })
}

/// CLI arguments for the `optimize` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "optimize",
    long_about = "Sequence the courier's open stops from their depot and save \
                 the route on the session. Leg costs come from the remote \
                 distance matrix service when an API key is configured and \
                 fall back to great-circle distances otherwise.",
    about = "Optimize a session's route and save it"
)]
#[ortho_config(prefix = "DISPATCH")]
pub(crate) struct OptimizeArgs {
    /// Path to the SQLite dispatch database.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Session to run.
    #[arg(long = ARG_SESSION_ID, value_name = "id")]
    #[serde(default)]
    pub(crate) session_id: Option<i64>,
    /// Courier whose stops are sequenced; must match the session.
    #[arg(long = ARG_COURIER_ID, value_name = "id")]
    #[serde(default)]
    pub(crate) courier_id: Option<i64>,
    /// Only route orders of this distributor.
    #[arg(long = ARG_DISTRIBUTOR_ID, value_name = "id")]
    #[serde(default)]
    pub(crate) distributor_id: Option<i64>,
    /// Sequencing strategy (default `nearest_neighbor`).
    #[arg(long = ARG_ALGORITHM, value_name = "name")]
    #[serde(default)]
    pub(crate) algorithm: Option<String>,
    /// Base URL of the distance matrix service.
    #[arg(long = ARG_MATRIX_BASE_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) matrix_base_url: Option<String>,
    /// API key for the distance matrix service; unset means local only.
    #[arg(long = ARG_MATRIX_API_KEY, value_name = "key")]
    #[serde(default)]
    pub(crate) matrix_api_key: Option<String>,
    /// Request timeout for the distance matrix service.
    #[arg(long = ARG_MATRIX_TIMEOUT_SECS, value_name = "seconds")]
    #[serde(default)]
    pub(crate) matrix_timeout_secs: Option<u64>,
}

impl OptimizeArgs {
    pub(crate) fn into_config(self) -> Result<OptimizeConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        OptimizeConfig::try_from(merged)
    }
}

/// Resolved `optimize` command configuration.
#[derive(Debug, Clone)]
pub(crate) struct OptimizeConfig {
    pub(crate) database: Utf8PathBuf,
    pub(crate) request: OptimizeRequest,
    /// Remote matrix settings; `None` when no API key is configured.
    pub(crate) matrix: Option<HttpDistanceMatrixConfig>,
}

impl TryFrom<OptimizeArgs> for OptimizeConfig {
    type Error = CliError;

    fn try_from(args: OptimizeArgs) -> Result<Self, Self::Error> {
        let database = require(args.database, ARG_DATABASE, ENV_OPTIMIZE_DATABASE)?;
        let session_id = require(args.session_id, ARG_SESSION_ID, ENV_OPTIMIZE_SESSION_ID)?;
        let courier_id = require(args.courier_id, ARG_COURIER_ID, ENV_OPTIMIZE_COURIER_ID)?;

        let mut request = OptimizeRequest::new(SessionId(session_id), CourierId(courier_id));
        if let Some(distributor_id) = args.distributor_id {
            request = request.with_distributor(DistributorId(distributor_id));
        }
        if let Some(algorithm) = args.algorithm {
            request = request.with_algorithm(algorithm);
        }

        let matrix = args.matrix_api_key.map(|api_key| {
            let base_url = args
                .matrix_base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
            let config = HttpDistanceMatrixConfig::new(base_url).with_api_key(api_key);
            match args.matrix_timeout_secs {
                Some(secs) => config.with_timeout(Duration::from_secs(secs)),
                None => config,
            }
        });

        Ok(Self {
            database,
            request,
            matrix,
        })
    }
}

/// Builds the remote distance matrix provider for an `optimize` run.
pub(crate) trait MatrixProviderBuilder {
    fn build(
        &self,
        config: &HttpDistanceMatrixConfig,
    ) -> Result<Box<dyn DistanceMatrixProvider>, CliError>;
}

pub(crate) struct DefaultMatrixProviderBuilder;

impl MatrixProviderBuilder for DefaultMatrixProviderBuilder {
    fn build(
        &self,
        config: &HttpDistanceMatrixConfig,
    ) -> Result<Box<dyn DistanceMatrixProvider>, CliError> {
        let provider = HttpDistanceMatrixProvider::with_config(config.clone()).map_err(|source| {
            CliError::BuildDistanceMatrixProvider {
                base_url: config.base_url.clone(),
                source,
            }
        })?;
        Ok(Box::new(provider))
    }
}

pub(crate) fn run_optimize_with(
    args: OptimizeArgs,
    builder: &dyn MatrixProviderBuilder,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    let mut store = open_store(&config.database)?;
    let result = match &config.matrix {
        Some(matrix) => {
            let provider = builder.build(matrix)?;
            RouteOptimizer::with_remote(provider).optimize(&mut store, &config.request)?
        }
        None => RouteOptimizer::new().optimize(&mut store, &config.request)?,
    };
    write_json(writer, &result)
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<OptimizeConfig, CliError> {
    let merged = OptimizeArgs::merge_from_layers(layers).map_err(CliError::from)?;
    OptimizeConfig::try_from(merged)
}
