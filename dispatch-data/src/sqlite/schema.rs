//! Table definitions for the dispatch database.

use rusqlite::{Connection, OptionalExtension, Transaction};

use super::SqliteStoreError;

/// Schema version written by [`initialise_schema`].
pub const SCHEMA_VERSION: i64 = 1;

/// Create every dispatch table, index and the version marker.
///
/// Statements are idempotent, so the function is safe to call on every open.
/// A database stamped with a different version is rejected.
///
/// # Examples
/// ```
/// use rusqlite::Connection;
/// use dispatch_data::sqlite::{SCHEMA_VERSION, initialise_schema};
///
/// let mut conn = Connection::open_in_memory().expect("create in-memory database");
/// initialise_schema(&mut conn).expect("create dispatch schema");
/// initialise_schema(&mut conn).expect("second run is a no-op");
///
/// let version: i64 = conn
///     .query_row("SELECT version FROM dispatch_schema_version", [], |row| row.get(0))
///     .expect("read schema version");
/// assert_eq!(version, SCHEMA_VERSION);
/// ```
pub fn initialise_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    connection
        .pragma_update(None, "foreign_keys", true)
        .map_err(|source| SqliteStoreError::Pragma {
            pragma: "foreign_keys",
            source,
        })?;

    let transaction = connection
        .transaction()
        .map_err(|source| SqliteStoreError::Migration {
            step: "begin schema transaction",
            source,
        })?;

    create_directory_tables(&transaction)?;
    create_ledger_tables(&transaction)?;
    create_session_tables(&transaction)?;
    create_indexes(&transaction)?;
    ensure_schema_version(&transaction)?;

    transaction
        .commit()
        .map_err(|source| SqliteStoreError::Migration {
            step: "commit schema transaction",
            source,
        })
}

fn create_directory_tables(transaction: &Transaction<'_>) -> Result<(), SqliteStoreError> {
    run_migration_step(
        transaction,
        "create couriers",
        "CREATE TABLE IF NOT EXISTS couriers (
            id INTEGER PRIMARY KEY,
            account_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            depot_latitude REAL,
            depot_longitude REAL,
            depot_address TEXT,
            max_daily_orders INTEGER NOT NULL DEFAULT 20 CHECK (max_daily_orders >= 0),
            is_active INTEGER NOT NULL DEFAULT 1,
            is_online INTEGER NOT NULL DEFAULT 0,
            total_deliveries INTEGER NOT NULL DEFAULT 0,
            rating REAL
        )",
    )?;
    run_migration_step(
        transaction,
        "create orders",
        "CREATE TABLE IF NOT EXISTS orders (
            id INTEGER PRIMARY KEY,
            distributor_id INTEGER NOT NULL,
            buyer_id INTEGER NOT NULL,
            delivery_latitude REAL NOT NULL,
            delivery_longitude REAL NOT NULL,
            delivery_address TEXT NOT NULL DEFAULT '',
            priority_level INTEGER NOT NULL DEFAULT 1,
            status TEXT NOT NULL DEFAULT 'pending',
            created_at TEXT NOT NULL
        )",
    )
}

fn create_ledger_tables(transaction: &Transaction<'_>) -> Result<(), SqliteStoreError> {
    run_migration_step(
        transaction,
        "create delivery_assignments",
        "CREATE TABLE IF NOT EXISTS delivery_assignments (
            id INTEGER PRIMARY KEY,
            order_id INTEGER NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
            courier_id INTEGER NOT NULL REFERENCES couriers(id) ON DELETE CASCADE,
            assigned_by INTEGER NOT NULL,
            distance_km REAL NOT NULL,
            estimated_delivery_minutes INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'assigned',
            assigned_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
    )?;
    run_migration_step(
        transaction,
        "create assignment_batches",
        "CREATE TABLE IF NOT EXISTS assignment_batches (
            id INTEGER PRIMARY KEY,
            distributor_id INTEGER NOT NULL,
            algorithm TEXT NOT NULL,
            total_orders INTEGER NOT NULL DEFAULT 0,
            assigned_orders INTEGER NOT NULL DEFAULT 0,
            failed_assignments INTEGER NOT NULL DEFAULT 0,
            couriers_used INTEGER NOT NULL DEFAULT 0,
            avg_distance_km REAL NOT NULL DEFAULT 0,
            min_distance_km REAL NOT NULL DEFAULT 0,
            max_distance_km REAL NOT NULL DEFAULT 0,
            execution_time_ms INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )",
    )?;
    run_migration_step(
        transaction,
        "create assignment_batch_details",
        "CREATE TABLE IF NOT EXISTS assignment_batch_details (
            id INTEGER PRIMARY KEY,
            batch_id INTEGER NOT NULL REFERENCES assignment_batches(id) ON DELETE CASCADE,
            assignment_id INTEGER NOT NULL REFERENCES delivery_assignments(id) ON DELETE CASCADE,
            rank INTEGER NOT NULL CHECK (rank > 0),
            alternatives TEXT NOT NULL DEFAULT '[]'
        )",
    )
}

fn create_session_tables(transaction: &Transaction<'_>) -> Result<(), SqliteStoreError> {
    run_migration_step(
        transaction,
        "create optimization_sessions",
        "CREATE TABLE IF NOT EXISTS optimization_sessions (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL CHECK (length(trim(name)) > 0),
            courier_id INTEGER NOT NULL,
            distributor_id INTEGER NOT NULL,
            algorithm TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            total_distance_km REAL,
            total_duration_minutes INTEGER,
            fuel_cost REAL,
            optimization_score REAL,
            notes TEXT,
            created_at TEXT NOT NULL,
            started_at TEXT,
            completed_at TEXT
        )",
    )?;
    run_migration_step(
        transaction,
        "create route_waypoints",
        "CREATE TABLE IF NOT EXISTS route_waypoints (
            session_id INTEGER NOT NULL REFERENCES optimization_sessions(id) ON DELETE CASCADE,
            sequence INTEGER NOT NULL,
            latitude REAL NOT NULL,
            longitude REAL NOT NULL,
            address TEXT,
            kind TEXT NOT NULL,
            order_id INTEGER,
            distance_from_previous_km REAL NOT NULL,
            duration_from_previous_minutes INTEGER NOT NULL,
            PRIMARY KEY (session_id, sequence)
        ) WITHOUT ROWID",
    )?;
    run_migration_step(
        transaction,
        "create session_orders",
        "CREATE TABLE IF NOT EXISTS session_orders (
            session_id INTEGER NOT NULL REFERENCES optimization_sessions(id) ON DELETE CASCADE,
            order_id INTEGER NOT NULL,
            sequence INTEGER NOT NULL,
            PRIMARY KEY (session_id, order_id)
        ) WITHOUT ROWID",
    )?;
    run_migration_step(
        transaction,
        "create optimization_results",
        "CREATE TABLE IF NOT EXISTS optimization_results (
            session_id INTEGER PRIMARY KEY REFERENCES optimization_sessions(id) ON DELETE CASCADE,
            algorithm TEXT NOT NULL,
            total_distance_km REAL NOT NULL,
            total_duration_minutes INTEGER NOT NULL,
            fuel_cost REAL NOT NULL,
            optimization_score REAL NOT NULL,
            waypoint_count INTEGER NOT NULL,
            execution_time_ms INTEGER NOT NULL
        )",
    )
}

fn create_indexes(transaction: &Transaction<'_>) -> Result<(), SqliteStoreError> {
    run_migration_step(
        transaction,
        "index open assignments per order",
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_delivery_assignments_open_order
            ON delivery_assignments(order_id)
            WHERE status NOT IN ('delivered', 'failed')",
    )?;
    run_migration_step(
        transaction,
        "index assignments per courier",
        "CREATE INDEX IF NOT EXISTS idx_delivery_assignments_courier
            ON delivery_assignments(courier_id, status, assigned_at)",
    )?;
    run_migration_step(
        transaction,
        "index orders intake",
        "CREATE INDEX IF NOT EXISTS idx_orders_intake
            ON orders(distributor_id, status, priority_level DESC, created_at)",
    )?;
    run_migration_step(
        transaction,
        "index batches per distributor",
        "CREATE INDEX IF NOT EXISTS idx_assignment_batches_distributor
            ON assignment_batches(distributor_id, created_at)",
    )?;
    run_migration_step(
        transaction,
        "index sessions per courier",
        "CREATE INDEX IF NOT EXISTS idx_optimization_sessions_courier
            ON optimization_sessions(courier_id, created_at)",
    )
}

fn ensure_schema_version(transaction: &Transaction<'_>) -> Result<(), SqliteStoreError> {
    run_migration_step(
        transaction,
        "create schema version table",
        "CREATE TABLE IF NOT EXISTS dispatch_schema_version (
            version INTEGER PRIMARY KEY CHECK (version > 0),
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        ) WITHOUT ROWID",
    )?;

    let existing_version: Option<i64> = transaction
        .query_row(
            "SELECT version FROM dispatch_schema_version LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(|source| SqliteStoreError::Migration {
            step: "read schema version",
            source,
        })?;

    match existing_version {
        Some(version) if version == SCHEMA_VERSION => Ok(()),
        Some(found) => Err(SqliteStoreError::VersionMismatch {
            expected: SCHEMA_VERSION,
            found,
        }),
        None => transaction
            .execute(
                "INSERT INTO dispatch_schema_version (version) VALUES (?1)",
                [SCHEMA_VERSION],
            )
            .map(|_| ())
            .map_err(|source| SqliteStoreError::Migration {
                step: "record schema version",
                source,
            }),
    }
}

fn run_migration_step(
    transaction: &Transaction<'_>,
    step: &'static str,
    sql: &str,
) -> Result<(), SqliteStoreError> {
    transaction
        .execute(sql, [])
        .map(|_| ())
        .map_err(|source| SqliteStoreError::Migration { step, source })
}
