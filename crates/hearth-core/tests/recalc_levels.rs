//! End-to-end recalculation against an on-disk `SQLite` database.

use std::time::Duration;

use hearth_core::leveling::LevelCurve;
use hearth_core::recalc::{RecalcOptions, RecalcSummary, recalculate_levels};
use hearth_core::store::{ProgressionStore, SqliteUserStore, open_database};
use tempfile::TempDir;

const STALE_STAMP: i64 = 1_600_000_000;

fn seed(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("hearth.db");
    let conn = open_database(&path, Duration::from_secs(1)).expect("open database");
    conn.execute_batch(&format!(
        "CREATE TABLE users (
             id INTEGER PRIMARY KEY,
             username TEXT NOT NULL,
             experience_points INTEGER NOT NULL DEFAULT 0,
             level INTEGER NOT NULL DEFAULT 1,
             level_updated_at INTEGER
         );
         INSERT INTO users VALUES
             (1, 'ash', 0, 1, {STALE_STAMP}),
             (2, 'birch', 99, 2, {STALE_STAMP}),
             (3, 'cedar', 1000, 5, {STALE_STAMP}),
             (4, 'dogwood', 1000000, 9, {STALE_STAMP});"
    ))
    .expect("seed users");
    path
}

fn levels_and_stamps(store: &SqliteUserStore) -> Vec<(i64, i64, i64)> {
    let conn = store.connection();
    let conn = conn.lock().expect("lock");
    let mut stmt = conn
        .prepare("SELECT id, level, level_updated_at FROM users ORDER BY id")
        .expect("prepare");
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
        .expect("query")
        .collect::<Result<Vec<_>, _>>()
        .expect("rows");
    rows
}

#[test]
fn test_recalculation_matches_curve_and_leaves_correct_rows_alone() {
    let dir = TempDir::new().expect("temp dir");
    let path = seed(&dir);
    let store = SqliteUserStore::open(&path, Duration::from_secs(1)).expect("open store");
    let curve = LevelCurve::linear(100).expect("curve");

    let summary = recalculate_levels(&store, &curve, RecalcOptions::default()).expect("recalc");

    assert_eq!(
        summary,
        RecalcSummary {
            total: 4,
            updated: 2,
            unchanged: 2,
            invalid: 0,
        }
    );

    for row in store.load_all().expect("load") {
        let xp = u64::try_from(row.experience_points).expect("non-negative");
        assert_eq!(
            u64::try_from(row.level).expect("positive"),
            curve.level_from_xp(xp),
            "user {} has a stale level",
            row.username
        );
    }

    let rows = levels_and_stamps(&store);
    assert_eq!(rows[0], (1, 1, STALE_STAMP));
    assert_eq!(rows[2], (3, 5, STALE_STAMP));
    assert_eq!(rows[1].1, 1);
    assert_ne!(rows[1].2, STALE_STAMP);
    assert_eq!(rows[3].1, 141);
    assert_ne!(rows[3].2, STALE_STAMP);
}

#[test]
fn test_rerun_after_completion_changes_nothing() {
    let dir = TempDir::new().expect("temp dir");
    let path = seed(&dir);
    let store = SqliteUserStore::open(&path, Duration::from_secs(1)).expect("open store");
    let curve = LevelCurve::linear(100).expect("curve");

    recalculate_levels(&store, &curve, RecalcOptions::default()).expect("first run");
    let before = levels_and_stamps(&store);
    let summary = recalculate_levels(&store, &curve, RecalcOptions::default()).expect("rerun");

    assert_eq!(summary.updated, 0);
    assert_eq!(summary.unchanged, 4);
    assert_eq!(levels_and_stamps(&store), before);
}
