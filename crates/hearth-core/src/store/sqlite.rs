//! `SQLite`-backed progression store.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rusqlite::{Connection, OpenFlags, OptionalExtension, Row, params};

use super::{ProgressionStore, StoreError, StoredProgression};

/// Opens (creating if needed) the platform database.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or the busy timeout cannot
/// be set.
pub fn open_database(path: &Path, busy_timeout: Duration) -> rusqlite::Result<Connection> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    conn.busy_timeout(busy_timeout)?;
    Ok(conn)
}

/// Progression store over a shared `SQLite` connection.
#[derive(Debug, Clone)]
pub struct SqliteUserStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteUserStore {
    /// Wraps a connection shared with other components.
    #[must_use]
    pub const fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Opens the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self, StoreError> {
        let conn = open_database(path, busy_timeout)?;
        Ok(Self::new(Arc::new(Mutex::new(conn))))
    }

    /// The underlying shared connection.
    #[must_use]
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Looks up one user's progression.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn find(&self, id: i64) -> Result<Option<StoredProgression>, StoreError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT id, username, experience_points, level FROM users WHERE id = ?1",
                params![id],
                map_progression,
            )
            .optional()?;
        Ok(row)
    }

    /// The `limit` users with the most XP, ties broken by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn top_by_xp(&self, limit: u32) -> Result<Vec<StoredProgression>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, username, experience_points, level FROM users \
             ORDER BY experience_points DESC, id ASC LIMIT ?1",
        )?;
        let users = stmt
            .query_map(params![limit], map_progression)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }
}

impl ProgressionStore for SqliteUserStore {
    fn load_all(&self) -> Result<Vec<StoredProgression>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, username, experience_points, level FROM users ORDER BY id ASC",
        )?;
        let users = stmt
            .query_map([], map_progression)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    fn update_level(&self, id: i64, level: u64) -> Result<(), StoreError> {
        let level = i64::try_from(level).map_err(|_| StoreError::OutOfRange {
            field: "level",
            value: level,
        })?;
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE users SET level = ?1, level_updated_at = ?2 WHERE id = ?3",
            params![level, unix_now(), id],
        )?;
        if changed == 0 {
            return Err(StoreError::UserNotFound { id });
        }
        Ok(())
    }
}

fn map_progression(row: &Row<'_>) -> rusqlite::Result<StoredProgression> {
    Ok(StoredProgression {
        id: row.get(0)?,
        username: row.get(1)?,
        experience_points: row.get(2)?,
        level: row.get(3)?,
    })
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_store() -> SqliteUserStore {
        let conn = Connection::open_in_memory().expect("open in-memory sqlite");
        conn.execute_batch(
            "CREATE TABLE users (
                 id INTEGER PRIMARY KEY,
                 username TEXT NOT NULL,
                 experience_points INTEGER NOT NULL DEFAULT 0,
                 level INTEGER NOT NULL DEFAULT 1,
                 level_updated_at INTEGER
             );
             INSERT INTO users (id, username, experience_points, level) VALUES
                 (1, 'ada', 250, 1),
                 (2, 'brook', 9000, 7),
                 (3, 'cyd', 250, 2);",
        )
        .expect("seed users");
        SqliteUserStore::new(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_load_all_orders_by_id() {
        let store = seeded_store();
        let rows = store.load_all().unwrap();

        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(rows[1].username, "brook");
        assert_eq!(rows[1].experience_points, 9000);
    }

    #[test]
    fn test_update_level_stamps_row() {
        let store = seeded_store();
        store.update_level(1, 2).unwrap();

        let conn = store.connection();
        let conn = conn.lock().unwrap();
        let (level, stamped): (i64, Option<i64>) = conn
            .query_row(
                "SELECT level, level_updated_at FROM users WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(level, 2);
        assert!(stamped.is_some());
    }

    #[test]
    fn test_update_unknown_user_is_an_error() {
        let store = seeded_store();
        let err = store.update_level(99, 3).unwrap_err();
        assert!(matches!(err, StoreError::UserNotFound { id: 99 }));
    }

    #[test]
    fn test_update_rejects_levels_beyond_i64() {
        let store = seeded_store();
        let err = store.update_level(1, u64::MAX).unwrap_err();
        assert!(matches!(err, StoreError::OutOfRange { field: "level", .. }));
    }

    #[test]
    fn test_find_and_leaderboard() {
        let store = seeded_store();

        assert_eq!(store.find(3).unwrap().unwrap().username, "cyd");
        assert!(store.find(42).unwrap().is_none());

        let top: Vec<i64> = store.top_by_xp(2).unwrap().iter().map(|r| r.id).collect();
        assert_eq!(top, vec![2, 1]);
    }

    #[test]
    fn test_missing_users_table_surfaces_database_error() {
        let conn = Connection::open_in_memory().unwrap();
        let store = SqliteUserStore::new(Arc::new(Mutex::new(conn)));
        assert!(matches!(store.load_all(), Err(StoreError::Database(_))));
    }
}
