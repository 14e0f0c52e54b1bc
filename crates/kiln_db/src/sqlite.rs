//! SQLite-backed build database.
//!
//! Layout:
//!
//! ```sql
//! info(id INTEGER PRIMARY KEY CHECK (id = 0),
//!      store_version INTEGER, client_version INTEGER, iteration INTEGER)
//! rule_results(key TEXT PRIMARY KEY, payload BLOB)
//! ```
//!
//! `payload` holds a [`record`](crate::record) encoded [`RuleResult`]. The
//! iteration is stored as the bit pattern of the `u64` in SQLite's signed
//! 64-bit integer, so every value round-trips.
//!
//! A build window is a single `IMMEDIATE` transaction: `build_started` begins
//! it and `build_complete` commits it. Dropping the database mid-build rolls
//! the window back, leaving the previous build's state intact.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use kiln_config::DatabaseConfig;
use kiln_manifest::Rule;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::{debug, error, info, warn};

use crate::db::{BuildDb, BuildWindow};
use crate::error::DbError;
use crate::record::{decode_record, encode_record};
use crate::result::RuleResult;

/// Version of the table layout above. Increment on any change to it; a
/// mismatch resets the database just like a client schema change.
const STORE_FORMAT_VERSION: u32 = 1;

const CREATE_INFO: &str = "
    CREATE TABLE IF NOT EXISTS info (
        id INTEGER PRIMARY KEY CHECK (id = 0),
        store_version INTEGER NOT NULL,
        client_version INTEGER NOT NULL,
        iteration INTEGER NOT NULL
    );";

const CREATE_RULE_RESULTS: &str = "
    CREATE TABLE IF NOT EXISTS rule_results (
        key TEXT PRIMARY KEY,
        payload BLOB NOT NULL
    );";

/// A durable [`BuildDb`] stored in a single SQLite file.
///
/// The connection sits behind a mutex so that `&SqliteBuildDb` can be shared
/// with read-only inspection threads outside a build window.
pub struct SqliteBuildDb {
    path: PathBuf,
    conn: Mutex<Connection>,
    window: BuildWindow,
    /// Whether `build_started` managed to open a transaction. If it could
    /// not, writes in the window commit one statement at a time.
    in_transaction: bool,
}

impl SqliteBuildDb {
    /// Opens the database at `path` with default settings.
    pub fn open(path: &Path, client_schema_version: u32) -> Result<Self, DbError> {
        let config = DatabaseConfig {
            schema_version: client_schema_version,
            ..DatabaseConfig::default()
        };
        Self::open_with(path, &config)
    }

    /// Opens the database configured for a project.
    ///
    /// The path in `config` is resolved against `project_dir`.
    pub fn open_from_config(project_dir: &Path, config: &DatabaseConfig) -> Result<Self, DbError> {
        Self::open_with(&config.resolve_path(project_dir), config)
    }

    /// Opens the database at `path` with the schema version and SQLite
    /// settings from `config`; `config.path` is ignored.
    ///
    /// Missing parent directories and the file itself are created. A stored
    /// schema version different from `config.schema_version` silently
    /// discards all results and resets the iteration to 0.
    pub fn open_with(path: &Path, config: &DatabaseConfig) -> Result<Self, DbError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| DbError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        conn.execute_batch(&format!(
            "PRAGMA journal_mode={}; PRAGMA synchronous={};",
            config.journal_mode.as_pragma(),
            config.synchronous.as_pragma(),
        ))?;
        initialize(&mut conn, config.schema_version)?;

        info!(
            path = %path.display(),
            schema_version = config.schema_version,
            "opened build database"
        );

        Ok(Self {
            path: path.to_path_buf(),
            conn: Mutex::new(conn),
            window: BuildWindow::default(),
            in_transaction: false,
        })
    }

    /// The database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic elsewhere while holding the lock leaves the connection
        // itself usable.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn conn_mut(&mut self) -> &mut Connection {
        self.conn.get_mut().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Creates the tables, resetting them if the stored versions differ.
fn initialize(conn: &mut Connection, client_version: u32) -> Result<(), DbError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    tx.execute_batch(CREATE_INFO)?;

    let stored: Option<(i64, i64)> = tx
        .query_row(
            "SELECT store_version, client_version FROM info WHERE id = 0",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let expected = (i64::from(STORE_FORMAT_VERSION), i64::from(client_version));
    if stored != Some(expected) {
        if let Some((store_version, old_client)) = stored {
            info!(
                old_store_version = store_version,
                old_schema_version = old_client,
                schema_version = client_version,
                "schema version changed, clearing build database"
            );
        }
        tx.execute_batch("DROP TABLE IF EXISTS rule_results; DELETE FROM info;")?;
        tx.execute(
            "INSERT INTO info (id, store_version, client_version, iteration) VALUES (0, ?1, ?2, 0)",
            params![expected.0, expected.1],
        )?;
    }

    tx.execute_batch(CREATE_RULE_RESULTS)?;
    tx.commit()?;
    Ok(())
}

impl BuildDb for SqliteBuildDb {
    fn current_iteration(&self) -> Result<u64, DbError> {
        let raw: Option<i64> = self
            .conn()
            .query_row("SELECT iteration FROM info WHERE id = 0", [], |row| {
                row.get(0)
            })
            .optional()?;
        let raw = raw.ok_or_else(|| DbError::Corrupt {
            key: "iteration".to_string(),
            reason: "info row is missing".to_string(),
        })?;
        Ok(raw as u64)
    }

    fn set_current_iteration(&mut self, value: u64) -> Result<(), DbError> {
        self.window.require("set_current_iteration");
        let updated = self.conn_mut().execute(
            "UPDATE info SET iteration = ?1 WHERE id = 0",
            params![value as i64],
        )?;
        if updated == 0 {
            return Err(DbError::Corrupt {
                key: "iteration".to_string(),
                reason: "info row is missing".to_string(),
            });
        }
        Ok(())
    }

    fn lookup_rule_result(&self, rule: &Rule) -> Result<Option<RuleResult>, DbError> {
        let payload: Option<Vec<u8>> = self
            .conn()
            .query_row(
                "SELECT payload FROM rule_results WHERE key = ?1",
                params![rule.name()],
                |row| row.get(0),
            )
            .optional()?;
        payload
            .map(|raw| decode_record(rule.name(), &raw))
            .transpose()
    }

    fn set_rule_result(&mut self, rule: &Rule, result: &RuleResult) -> Result<(), DbError> {
        self.window.require("set_rule_result");

        let mut stored = result.clone();
        stored.dedup_dependencies();
        let payload = encode_record(&stored)?;

        self.conn_mut().execute(
            "INSERT INTO rule_results (key, payload) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET payload = excluded.payload",
            params![rule.name(), payload],
        )?;
        Ok(())
    }

    fn build_started(&mut self) {
        self.window.start();
        match self.conn_mut().execute_batch("BEGIN IMMEDIATE") {
            Ok(()) => self.in_transaction = true,
            Err(e) => warn!(
                error = %e,
                "could not begin build transaction, committing writes individually"
            ),
        }
        debug!(path = %self.path.display(), "build started");
    }

    fn build_complete(&mut self) {
        self.window.finish();
        if std::mem::take(&mut self.in_transaction) {
            let conn = self.conn_mut();
            if let Err(e) = conn.execute_batch("COMMIT") {
                error!(error = %e, "failed to commit build results");
                if let Err(e) = conn.execute_batch("ROLLBACK") {
                    error!(error = %e, "failed to roll back build transaction");
                }
            }
        }
        debug!(path = %self.path.display(), "build complete");
    }

    fn is_building(&self) -> bool {
        self.window.is_active()
    }

    fn rule_keys(&self) -> Result<Vec<String>, DbError> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT key FROM rule_results ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }
}

impl Drop for SqliteBuildDb {
    fn drop(&mut self) {
        if self.in_transaction {
            warn!(
                path = %self.path.display(),
                "build database closed mid-build, discarding uncommitted results"
            );
            if let Err(e) = self.conn_mut().execute_batch("ROLLBACK") {
                error!(error = %e, "failed to roll back build transaction");
            }
        }
    }
}
