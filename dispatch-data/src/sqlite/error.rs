//! Errors raised while opening or migrating a dispatch database.

use camino::Utf8PathBuf;
use rusqlite::Error as SqliteError;
use thiserror::Error;

/// Errors returned when opening a [`SqliteDispatchStore`](super::SqliteDispatchStore).
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// The database file could not be opened or created.
    #[error("failed to open dispatch database at {path}")]
    Open {
        /// Requested database path.
        path: Utf8PathBuf,
        /// Underlying SQLite error.
        #[source]
        source: SqliteError,
    },
    /// A connection pragma could not be applied.
    #[error("failed to set SQLite pragma `{pragma}`")]
    Pragma {
        /// Pragma name.
        pragma: &'static str,
        /// Underlying SQLite error.
        #[source]
        source: SqliteError,
    },
    /// A schema statement failed.
    #[error("failed to execute migration step '{step}'")]
    Migration {
        /// Short description of the statement.
        step: &'static str,
        /// Underlying SQLite error.
        #[source]
        source: SqliteError,
    },
    /// The database was created by an incompatible version.
    #[error(
        "expected dispatch schema version {expected} but found {found}; apply migrations before retrying"
    )]
    VersionMismatch {
        /// Version this build understands.
        expected: i64,
        /// Version recorded in the database.
        found: i64,
    },
}
