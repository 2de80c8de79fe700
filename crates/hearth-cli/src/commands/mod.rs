//! Subcommand implementations.
//!
//! Each command writes its human-readable report to the writer it is given.

use std::path::Path;

use anyhow::{Result, bail};

pub mod level;
pub mod recalc;
pub mod reconcile;

/// Refuses to operate on a database file that does not exist yet, since
/// opening it would silently create an empty one.
fn require_database(path: &Path) -> Result<()> {
    if !path.exists() {
        bail!("database {} does not exist", path.display());
    }
    Ok(())
}
