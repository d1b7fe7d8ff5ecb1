//! `SQLite` substrate and its migration runner.
//!
//! Each storage key is one row of the `kv` table. Compare-and-swap runs in
//! an `IMMEDIATE` transaction, which takes the database write lock before
//! reading, so two processes sharing the file cannot both advance a counter
//! from the same value.

use std::fmt;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use crate::substrate::{CasOutcome, Substrate, SubstrateError};

// ---------------------------------------------------------------------------
// Embedded migrations
// ---------------------------------------------------------------------------

/// Forward-only SQL migrations, embedded at compile time.
/// Index 0 → version 1.
const MIGRATIONS: &[&str] = &[include_str!("../migrations/001_kv_store.sql")];

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

impl From<rusqlite::Error> for SubstrateError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// SqliteSubstrate
// ---------------------------------------------------------------------------

/// Substrate backed by one row of a `SQLite` key-value table.
pub struct SqliteSubstrate {
    conn: Mutex<Connection>,
    key: String,
}

impl fmt::Debug for SqliteSubstrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteSubstrate")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl SqliteSubstrate {
    /// Open (or create) the database at `path` and bind to `key`.
    ///
    /// Enables WAL, sets a busy timeout so concurrent writers wait instead
    /// of failing, and applies pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`SubstrateError::Database`] if the file cannot be opened or
    /// a migration fails.
    pub fn open(path: &Path, key: &str) -> Result<Self, SubstrateError> {
        let conn = Connection::open(path)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::debug!(journal_mode = %mode, "opened sqlite substrate");
        Self::init(conn, key)
    }

    /// Private in-memory database, mainly for tests.
    ///
    /// # Errors
    ///
    /// Returns [`SubstrateError::Database`] if a migration fails.
    pub fn open_in_memory(key: &str) -> Result<Self, SubstrateError> {
        Self::init(Connection::open_in_memory()?, key)
    }

    fn init(mut conn: Connection, key: &str) -> Result<Self, SubstrateError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        run_migrations(&mut conn)?;
        tracing::debug!(key, "sqlite substrate ready");
        Ok(Self {
            conn: Mutex::new(conn),
            key: key.to_owned(),
        })
    }

    /// Current schema version (`PRAGMA user_version`).
    ///
    /// # Errors
    ///
    /// Returns [`SubstrateError`] if the pragma query fails.
    pub fn schema_version(&self) -> Result<i32, SubstrateError> {
        let conn = self.conn.lock()?;
        Ok(schema_version(&conn)?)
    }
}

impl Substrate for SqliteSubstrate {
    fn read(&self) -> Result<Option<String>, SubstrateError> {
        let conn = self.conn.lock()?;
        Ok(select_value(&conn, &self.key)?)
    }

    fn write(&self, value: &str) -> Result<(), SubstrateError> {
        let conn = self.conn.lock()?;
        upsert_value(&conn, &self.key, value)?;
        Ok(())
    }

    fn compare_and_swap(
        &self,
        expected: Option<&str>,
        value: &str,
    ) -> Result<CasOutcome, SubstrateError> {
        let mut conn = self.conn.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current = select_value(&tx, &self.key)?;
        if current.as_deref() != expected {
            // Dropping the transaction rolls it back.
            return Ok(CasOutcome::Conflict);
        }

        upsert_value(&tx, &self.key, value)?;
        tx.commit()?;
        Ok(CasOutcome::Swapped)
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn select_value(conn: &Connection, key: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
        row.get(0)
    })
    .optional()
}

fn upsert_value(conn: &Connection, key: &str, value: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO kv (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET
             value = excluded.value,
             updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
        params![key, value],
    )?;
    Ok(())
}

fn schema_version(conn: &Connection) -> rusqlite::Result<i32> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
}

/// Apply all pending migrations, each in its own transaction with the
/// `user_version` bump.
fn run_migrations(conn: &mut Connection) -> Result<(), SubstrateError> {
    let current = schema_version(conn)?;

    for (idx, sql) in MIGRATIONS.iter().enumerate() {
        let version = idx
            .checked_add(1)
            .and_then(|v| i32::try_from(v).ok())
            .ok_or_else(|| SubstrateError::Database("migration index overflow".into()))?;

        if version <= current {
            continue;
        }

        let tx = conn.transaction()?;
        tx.execute_batch(sql).map_err(|e| {
            SubstrateError::Database(format!("migration {version} failed: {e}"))
        })?;
        tx.pragma_update(None, "user_version", version)?;
        tx.commit()?;

        tracing::info!(version, "applied kv migration");
    }

    Ok(())
}
