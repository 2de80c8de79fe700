//! `hearth reconcile`: run the schema reconciler by hand.

use std::io::Write;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use hearth_core::config::HearthConfig;
use hearth_core::store::open_database;
use hearth_daemon::schema::{
    CheckOutcome, ReconciliationReport, RunStatus, SchemaReconciler, SqliteSchemaBackend,
    expected_checks,
};

use super::require_database;

/// Reconciles the configured database and prints the per-check report.
///
/// Failed checks are part of the report, not an error.
pub fn run(config: &HearthConfig, out: &mut impl Write) -> Result<()> {
    let path = &config.database.path;
    require_database(path)?;
    let conn = open_database(path, config.database.busy_timeout())
        .with_context(|| format!("failed to open database at {}", path.display()))?;

    let reconciler = SchemaReconciler::new(
        Arc::new(SqliteSchemaBackend::new(Arc::new(Mutex::new(conn)))),
        expected_checks(),
    )
    .with_timeout(config.reconciler.timeout());

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    let report = rt.block_on(reconciler.reconcile());

    write_report(&report, out)
}

fn write_report(report: &ReconciliationReport, out: &mut impl Write) -> Result<()> {
    for check in &report.checks {
        match &check.outcome {
            CheckOutcome::Applied => writeln!(out, "applied          {}", check.id)?,
            CheckOutcome::AlreadyPresent => writeln!(out, "already present  {}", check.id)?,
            CheckOutcome::Failed { reason } => {
                writeln!(out, "FAILED           {}: {reason}", check.id)?;
            },
        }
    }
    match &report.status {
        RunStatus::Completed => writeln!(
            out,
            "completed: {} applied, {} already present, {} failed",
            report.applied(),
            report.already_present(),
            report.failed()
        )?,
        RunStatus::Aborted { reason } => writeln!(out, "aborted: {reason}")?,
        RunStatus::TimedOut { after_ms } => writeln!(out, "timed out after {after_ms} ms")?,
    }
    Ok(())
}
