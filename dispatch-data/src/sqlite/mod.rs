//! SQLite persistence for the dispatch engine.
//!
//! [`SqliteDispatchStore`] implements every store trait from
//! `dispatch-core` over a single connection:
//! - [`schema`] creates the tables and records the schema version.
//! - `directory` answers courier availability and order intake queries.
//! - `ledger` writes assignment batches inside a `BEGIN IMMEDIATE`
//!   transaction so concurrent batches cannot double-book a courier.
//! - `sessions` stores optimization sessions and their routes.
//! - `reporting` serves the dashboard aggregates.
#![forbid(unsafe_code)]

mod codec;
mod directory;
mod error;
mod ledger;
mod reporting;
mod schema;
mod sessions;

use camino::Utf8Path;
use dispatch_core::{AssignmentStore, StoreError};
use rusqlite::{Connection, TransactionBehavior};

pub use error::SqliteStoreError;
pub use ledger::SqliteBatchTransaction;
pub use schema::{SCHEMA_VERSION, initialise_schema};

/// Dispatch store backed by one SQLite connection.
///
/// # Examples
/// ```
/// use dispatch_core::{DistributorId, OrderIntake};
/// use dispatch_data::sqlite::SqliteDispatchStore;
///
/// let store = SqliteDispatchStore::open_in_memory().expect("open store");
/// let orders = store
///     .unassigned_orders(DistributorId(1))
///     .expect("query intake");
/// assert!(orders.is_empty());
/// ```
#[derive(Debug)]
pub struct SqliteDispatchStore {
    connection: Connection,
}

impl SqliteDispatchStore {
    /// Open or create the database at `path` and bring its schema up to date.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Open`] when the file cannot be opened and
    /// the schema errors from [`initialise_schema`] otherwise.
    pub fn open(path: &Utf8Path) -> Result<Self, SqliteStoreError> {
        let connection =
            Connection::open(path.as_std_path()).map_err(|source| SqliteStoreError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_connection(connection)
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    ///
    /// See [`SqliteDispatchStore::open`].
    pub fn open_in_memory() -> Result<Self, SqliteStoreError> {
        let connection =
            Connection::open_in_memory().map_err(|source| SqliteStoreError::Open {
                path: ":memory:".into(),
                source,
            })?;
        Self::from_connection(connection)
    }

    /// Wrap an existing connection, initialising the schema on it.
    ///
    /// # Errors
    ///
    /// Propagates [`initialise_schema`] failures.
    pub fn from_connection(mut connection: Connection) -> Result<Self, SqliteStoreError> {
        initialise_schema(&mut connection)?;
        Ok(Self { connection })
    }

    /// Borrow the underlying connection, for seeding couriers and orders
    /// owned by other systems.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.connection
    }
}

impl AssignmentStore for SqliteDispatchStore {
    type Transaction<'a> = SqliteBatchTransaction<'a>;

    fn begin_batch(&mut self) -> Result<Self::Transaction<'_>, StoreError> {
        let transaction = self
            .connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|err| StoreError::backend("begin batch", err))?;
        Ok(SqliteBatchTransaction::new(transaction))
    }
}

#[cfg(test)]
mod tests;
