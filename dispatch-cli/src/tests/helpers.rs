//! Test helpers for seeding dispatch databases and running commands.

use super::*;
use camino::Utf8PathBuf;
use chrono::{SecondsFormat, Utc};
use dispatch_data::sqlite::SqliteDispatchStore;
use rusqlite::params;
use serde::de::DeserializeOwned;
use tempfile::TempDir;

pub(super) const DISTRIBUTOR: i64 = 7;

/// A temporary directory holding one initialised dispatch database.
#[derive(Debug)]
pub(super) struct Workspace {
    _dir: TempDir,
    database: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        let database = root.join("dispatch.db");
        SqliteDispatchStore::open(&database).expect("initialise database");
        Self {
            _dir: dir,
            database,
        }
    }

    pub(super) fn database(&self) -> &str {
        self.database.as_str()
    }

    fn store(&self) -> SqliteDispatchStore {
        SqliteDispatchStore::open(&self.database).expect("open database")
    }

    /// Insert an active, online courier based at `depot` (latitude, longitude).
    pub(super) fn add_courier(&self, name: &str, depot: (f64, f64), max_daily_orders: u32) -> i64 {
        let store = self.store();
        store
            .connection()
            .execute(
                "INSERT INTO couriers (
                    account_id, name, depot_latitude, depot_longitude, depot_address,
                    max_daily_orders, is_active, is_online
                ) VALUES (1, ?1, ?2, ?3, ?4, ?5, 1, 1)",
                params![name, depot.0, depot.1, format!("{name} depot"), max_daily_orders],
            )
            .expect("insert courier");
        store.connection().last_insert_rowid()
    }

    /// Insert a pending order for [`DISTRIBUTOR`] dropping at `at`.
    pub(super) fn add_order(&self, at: (f64, f64), priority: i32) -> i64 {
        let store = self.store();
        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        store
            .connection()
            .execute(
                "INSERT INTO orders (
                    distributor_id, buyer_id, delivery_latitude, delivery_longitude,
                    delivery_address, priority_level, status, created_at
                ) VALUES (?1, 42, ?2, ?3, 'Drop', ?4, 'pending', ?5)",
                params![DISTRIBUTOR, at.0, at.1, priority, created_at],
            )
            .expect("insert order");
        store.connection().last_insert_rowid()
    }

    /// One courier in central Cairo and two pending orders nearby.
    pub(super) fn seed_courier_with_orders(&self) -> i64 {
        let courier = self.add_courier("Amal", (30.0444, 31.2357), 5);
        self.add_order((30.0500, 31.2400), 2);
        self.add_order((30.0600, 31.2500), 1);
        courier
    }
}

/// Parse `argv` and run the resulting command against an in-memory stdout.
pub(super) fn run_cli(argv: &[&str]) -> (Result<(), CliError>, String) {
    let mut buffer = Vec::new();
    let result = Cli::try_parse_from(argv)
        .map_err(CliError::from)
        .and_then(|cli| execute(cli.command, &mut buffer));
    let stdout = String::from_utf8(buffer).expect("stdout utf-8");
    (result, stdout)
}

/// Run `argv`, require success and decode the printed JSON.
pub(super) fn run_json<T: DeserializeOwned>(argv: &[&str]) -> T {
    let (result, stdout) = run_cli(argv);
    if let Err(err) = result {
        panic!("command {argv:?} failed: {err}");
    }
    serde_json::from_str(&stdout).expect("command should print JSON")
}
