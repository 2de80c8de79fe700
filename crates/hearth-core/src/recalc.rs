//! One-shot recalculation of the cached `level` column.
//!
//! Run after the threshold curve changes. Every stored row is compared
//! against `level_from_xp(experience_points)` and corrected with a
//! single-row update. There is no run-wide transaction: a crash part-way
//! leaves processed rows correct and the rest untouched, and re-running only
//! touches rows that are still inconsistent.

use serde::Serialize;
use tracing::{error, info};

use crate::leveling::{LevelCurve, level_from_stored, xp_from_stored};
use crate::store::{ProgressionStore, StoreError};

/// Options for [`recalculate_levels`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecalcOptions {
    /// Report corrections without writing them.
    pub dry_run: bool,
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecalcSummary {
    /// Rows examined.
    pub total: usize,
    /// Rows whose level was corrected (or would be, in a dry run).
    pub updated: usize,
    /// Rows already consistent.
    pub unchanged: usize,
    /// Rows skipped because the stored XP is negative.
    pub invalid: usize,
}

/// Brings every stored `level` back into agreement with the curve.
///
/// Rows are processed sequentially, one update at a time. A row with a
/// negative stored XP is logged and skipped; it is a data defect, not a
/// reason to abandon the rest of the run.
///
/// # Errors
///
/// Any storage error aborts the run and is returned. Rows already written
/// stay written.
pub fn recalculate_levels<S>(
    store: &S,
    curve: &LevelCurve,
    options: RecalcOptions,
) -> Result<RecalcSummary, StoreError>
where
    S: ProgressionStore + ?Sized,
{
    let rows = store.load_all()?;
    let mut summary = RecalcSummary {
        total: rows.len(),
        ..RecalcSummary::default()
    };

    for row in rows {
        let xp = match xp_from_stored(row.experience_points) {
            Ok(xp) => xp,
            Err(e) => {
                error!(user_id = row.id, username = %row.username, error = %e, "skipping user");
                summary.invalid += 1;
                continue;
            },
        };

        let new_level = curve.level_from_xp(xp);
        if level_from_stored(row.level).ok() == Some(new_level) {
            summary.unchanged += 1;
            continue;
        }

        if options.dry_run {
            info!(
                user_id = row.id,
                username = %row.username,
                xp,
                old_level = row.level,
                new_level,
                "would correct level"
            );
        } else {
            store.update_level(row.id, new_level)?;
            info!(
                user_id = row.id,
                username = %row.username,
                xp,
                old_level = row.level,
                new_level,
                "corrected level"
            );
        }
        summary.updated += 1;
    }

    info!(
        total = summary.total,
        updated = summary.updated,
        unchanged = summary.unchanged,
        invalid = summary.invalid,
        dry_run = options.dry_run,
        "level recalculation complete"
    );
    Ok(summary)
}
