//! `hearth recalc-levels`: re-derive cached levels after a curve change.

use std::io::Write;

use anyhow::{Context, Result};
use hearth_core::config::HearthConfig;
use hearth_core::leveling::LevelCurve;
use hearth_core::recalc::{RecalcOptions, recalculate_levels};
use hearth_core::store::SqliteUserStore;
use tracing::info;

use super::require_database;

/// Runs one recalculation pass and prints its summary.
pub fn run(config: &HearthConfig, dry_run: bool, out: &mut impl Write) -> Result<()> {
    let curve = LevelCurve::from_config(&config.leveling).context("invalid [leveling] config")?;
    let path = &config.database.path;
    require_database(path)?;
    let store = SqliteUserStore::open(path, config.database.busy_timeout())
        .with_context(|| format!("failed to open database at {}", path.display()))?;

    info!(database = %path.display(), curve = ?curve, dry_run, "recalculating levels");
    let summary = recalculate_levels(&store, &curve, RecalcOptions { dry_run })
        .context("level recalculation failed")?;

    let updated = if dry_run { "would update:" } else { "updated:" };
    writeln!(out, "users examined:  {}", summary.total)?;
    writeln!(out, "{updated:<17}{}", summary.updated)?;
    writeln!(out, "unchanged:       {}", summary.unchanged)?;
    writeln!(out, "invalid:         {}", summary.invalid)?;
    Ok(())
}
