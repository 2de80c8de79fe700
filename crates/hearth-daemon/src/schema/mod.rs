//! Startup schema reconciliation.
//!
//! Brings an existing database up to the shape the current application
//! expects, using only additive changes: missing tables are created and
//! missing columns are added. Each [`SchemaCheck`] introspects first and only
//! runs its statement when the piece is absent, so a fully reconciled database
//! sees no writes at all.
//!
//! Reconciliation is best-effort. A failing check is logged and the run moves
//! on; the only early exit is an unreachable database. [`SchemaReconciler`]
//! wraps the run in a once-per-process guard that concurrent callers share.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::{Arc, Mutex};
//!
//! use hearth_daemon::schema::{SchemaReconciler, SqliteSchemaBackend, expected_checks};
//!
//! # async fn startup(conn: rusqlite::Connection) {
//! let backend = SqliteSchemaBackend::new(Arc::new(Mutex::new(conn)));
//! let reconciler = SchemaReconciler::new(Arc::new(backend), expected_checks());
//! let report = reconciler.reconcile().await;
//! assert_eq!(reconciler.runs(), 1);
//! println!("{} applied", report.applied());
//! # }
//! ```

mod backend;
mod checks;
mod reconciler;


pub use backend::{SchemaBackend, SchemaError, SqliteSchemaBackend};
pub use checks::{RECONCILIATION_LEDGER_TABLE, SchemaCheck, expected_checks};
pub use reconciler::{
    CheckOutcome, CheckReport, ReconciliationReport, RunStatus, SchemaReconciler,
    reconcile_checks,
};
