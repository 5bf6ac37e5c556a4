//! Error types emitted by the dispatch CLI.
//!
//! Keep this error type reasonably small, as every command helper returns
//! `Result<_, CliError>`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use dispatch_core::{AssignmentError, OptimizeError, ParseStatusError, StoreError};
use dispatch_data::routing::ProviderBuildError;
use dispatch_data::sqlite::SqliteStoreError;
use thiserror::Error;

/// Errors emitted by the dispatch CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        /// Long flag name of the option.
        field: &'static str,
        /// Environment variable that can supply it.
        env: &'static str,
    },
    /// A session status filter is not a known status.
    #[error("invalid --status value: {0}")]
    InvalidSessionStatus(#[source] ParseStatusError),
    /// Opening or migrating the dispatch database failed.
    #[error("failed to open dispatch database at {path:?}: {source}")]
    OpenStore {
        /// Database path that was requested.
        path: Utf8PathBuf,
        /// Underlying store error.
        #[source]
        source: SqliteStoreError,
    },
    /// A store query failed.
    #[error("store query failed: {0}")]
    Store(#[from] StoreError),
    /// The assignment batch was aborted and rolled back.
    #[error("assignment failed: {0}")]
    Assignment(#[from] AssignmentError),
    /// Creating, running, loading or deleting a session failed.
    #[error("route optimization failed: {0}")]
    Optimize(#[from] OptimizeError),
    /// Constructing the remote distance matrix provider failed.
    #[error("failed to build distance matrix provider for {base_url:?}: {source}")]
    BuildDistanceMatrixProvider {
        /// Base URL the provider was configured with.
        base_url: String,
        /// Underlying construction error.
        #[source]
        source: ProviderBuildError,
    },
    /// Serialising a command result failed.
    #[error("failed to serialise command output: {0}")]
    SerialiseOutput(#[source] serde_json::Error),
    /// Writing a command result failed.
    #[error("failed to write command output: {0}")]
    WriteOutput(#[source] std::io::Error),
}
