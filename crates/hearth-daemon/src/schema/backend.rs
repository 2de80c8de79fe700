//! Schema introspection and statement execution.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{Connection, params};
use thiserror::Error;

use super::checks::RECONCILIATION_LEDGER_TABLE;

/// Errors from a [`SchemaBackend`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SchemaError {
    /// Database error from `SQLite`.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The shared connection mutex was poisoned by a panicking holder.
    #[error("database connection lock poisoned")]
    LockPoisoned,
}

/// What the reconciler needs from the database.
///
/// Calls block; the reconciler runs them off the async executor.
pub trait SchemaBackend: Send + Sync {
    /// Verifies the database can be read at all.
    fn ping(&self) -> Result<(), SchemaError>;

    /// Whether `table` exists.
    fn table_exists(&self, table: &str) -> Result<bool, SchemaError>;

    /// Whether `column` exists on `table`. `false` if the table is missing.
    fn column_exists(&self, table: &str, column: &str) -> Result<bool, SchemaError>;

    /// Runs a DDL statement.
    fn execute(&self, statement: &str) -> Result<(), SchemaError>;

    /// Appends `check_id` to the reconciliation ledger.
    fn record_applied(&self, check_id: &str) -> Result<(), SchemaError>;
}

/// [`SchemaBackend`] over a shared `SQLite` connection.
///
/// Introspection goes through `sqlite_master` and `pragma_table_info`.
#[derive(Debug, Clone)]
pub struct SqliteSchemaBackend {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSchemaBackend {
    /// Wraps a connection shared with other components.
    #[must_use]
    pub const fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SchemaError> {
        self.conn.lock().map_err(|_| SchemaError::LockPoisoned)
    }
}

impl SchemaBackend for SqliteSchemaBackend {
    fn ping(&self) -> Result<(), SchemaError> {
        // Reading sqlite_master forces SQLite to validate the file header.
        let conn = self.lock()?;
        conn.query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| {
            row.get::<_, i64>(0)
        })?;
        Ok(())
    }

    fn table_exists(&self, table: &str) -> Result<bool, SchemaError> {
        let conn = self.lock()?;
        let exists = conn.query_row(
            "SELECT EXISTS( \
                 SELECT 1 FROM sqlite_master \
                 WHERE type = 'table' AND name = ?1 \
             )",
            params![table],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn column_exists(&self, table: &str, column: &str) -> Result<bool, SchemaError> {
        let conn = self.lock()?;
        let exists = conn.query_row(
            "SELECT EXISTS( \
                 SELECT 1 FROM pragma_table_info(?1) \
                 WHERE name = ?2 \
             )",
            params![table, column],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn execute(&self, statement: &str) -> Result<(), SchemaError> {
        let conn = self.lock()?;
        conn.execute_batch(statement)?;
        Ok(())
    }

    fn record_applied(&self, check_id: &str) -> Result<(), SchemaError> {
        let applied_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX));
        let conn = self.lock()?;
        conn.execute(
            &format!(
                "INSERT INTO {RECONCILIATION_LEDGER_TABLE} (check_id, applied_at) VALUES (?1, ?2)"
            ),
            params![check_id, applied_at],
        )?;
        Ok(())
    }
}
