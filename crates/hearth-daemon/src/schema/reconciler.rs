//! Best-effort reconciliation and the run-once guard.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};

use super::backend::{SchemaBackend, SchemaError};
use super::checks::SchemaCheck;

/// Result of one check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckOutcome {
    /// The statement ran and the schema now has the piece.
    Applied,
    /// The schema already had the piece; nothing ran.
    AlreadyPresent,
    /// Introspection or the statement failed.
    Failed {
        /// Error text from the backend.
        reason: String,
    },
}

/// A check and what happened to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    /// [`SchemaCheck::id`].
    pub id: String,
    /// Outcome.
    #[serde(flatten)]
    pub outcome: CheckOutcome,
}

/// How the run as a whole ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    /// Every check was attempted.
    Completed,
    /// The run stopped before attempting checks.
    Aborted {
        /// Why.
        reason: String,
    },
    /// The run did not finish within the configured bound.
    TimedOut {
        /// The bound, in milliseconds.
        after_ms: u64,
    },
}

/// Aggregated outcome of a reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    /// Run status.
    #[serde(flatten)]
    pub status: RunStatus,
    /// Per-check outcomes, in the order attempted.
    pub checks: Vec<CheckReport>,
}

impl ReconciliationReport {
    fn ended(status: RunStatus) -> Self {
        Self {
            status,
            checks: Vec::new(),
        }
    }

    fn count(&self, pred: impl Fn(&CheckOutcome) -> bool) -> usize {
        self.checks.iter().filter(|c| pred(&c.outcome)).count()
    }

    /// Checks whose statement ran.
    #[must_use]
    pub fn applied(&self) -> usize {
        self.count(|o| matches!(o, CheckOutcome::Applied))
    }

    /// Checks that were already satisfied.
    #[must_use]
    pub fn already_present(&self) -> usize {
        self.count(|o| matches!(o, CheckOutcome::AlreadyPresent))
    }

    /// Checks that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, CheckOutcome::Failed { .. }))
    }

    /// The failed checks.
    pub fn failures(&self) -> impl Iterator<Item = &CheckReport> {
        self.checks
            .iter()
            .filter(|c| matches!(c.outcome, CheckOutcome::Failed { .. }))
    }

    /// Completed with no failed check.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.status == RunStatus::Completed && self.failed() == 0
    }
}

/// Attempts every check in order against `backend`.
///
/// A failing check is logged and recorded; later checks still run. Only an
/// unreachable backend stops the run early, with [`RunStatus::Aborted`].
pub fn reconcile_checks<B>(backend: &B, checks: &[SchemaCheck]) -> ReconciliationReport
where
    B: SchemaBackend + ?Sized,
{
    if let Err(e) = backend.ping() {
        error!(error = %e, "schema reconciliation aborted: database unreachable");
        return ReconciliationReport::ended(RunStatus::Aborted {
            reason: format!("database unreachable: {e}"),
        });
    }

    let mut reports = Vec::with_capacity(checks.len());
    for check in checks {
        let id = check.id();
        let outcome = match apply_check(backend, check) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(check = %id, error = %e, "schema check failed, continuing");
                CheckOutcome::Failed {
                    reason: e.to_string(),
                }
            },
        };

        match outcome {
            CheckOutcome::Applied => {
                info!(check = %id, "schema check applied");
                if let Err(e) = backend.record_applied(&id) {
                    warn!(check = %id, error = %e, "failed to record applied check");
                }
            },
            CheckOutcome::AlreadyPresent => debug!(check = %id, "schema check already present"),
            CheckOutcome::Failed { .. } => {},
        }
        reports.push(CheckReport { id, outcome });
    }

    ReconciliationReport {
        status: RunStatus::Completed,
        checks: reports,
    }
}

fn apply_check<B>(backend: &B, check: &SchemaCheck) -> Result<CheckOutcome, SchemaError>
where
    B: SchemaBackend + ?Sized,
{
    let present = |b: &B| match check {
        SchemaCheck::AddColumn { table, column, .. } => b.column_exists(table, column),
        SchemaCheck::CreateTable { table, .. } => b.table_exists(table),
    };

    if present(backend)? {
        return Ok(CheckOutcome::AlreadyPresent);
    }
    match backend.execute(&check.statement()) {
        Ok(()) => Ok(CheckOutcome::Applied),
        // Another process may have applied it between introspection and
        // execution.
        Err(e) if present(backend).unwrap_or(false) => {
            warn!(check = %check.id(), error = %e, "schema check raced, now present");
            Ok(CheckOutcome::AlreadyPresent)
        },
        Err(e) => Err(e),
    }
}

/// Latest state of the single reconciliation run; `None` while in flight.
type ReportReceiver = watch::Receiver<Option<Arc<ReconciliationReport>>>;

/// Runs reconciliation at most once per instance.
///
/// Construct one at startup and share it (`Arc`) with every path that needs
/// the schema to be ready. The first [`reconcile`](Self::reconcile) call
/// spawns the run as its own task; concurrent callers await that same run;
/// later callers get the memoised report immediately. Dropping a caller
/// never cancels or restarts the run. The guard is never reset.
pub struct SchemaReconciler {
    backend: Arc<dyn SchemaBackend>,
    checks: Arc<[SchemaCheck]>,
    timeout: Option<Duration>,
    outcome: OnceLock<ReportReceiver>,
    runs: AtomicUsize,
}

impl std::fmt::Debug for SchemaReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaReconciler")
            .field("checks", &self.checks.len())
            .field("timeout", &self.timeout)
            .field("done", &self.is_done())
            .finish_non_exhaustive()
    }
}

impl SchemaReconciler {
    /// A reconciler over `checks`, with no timeout.
    #[must_use]
    pub fn new(backend: Arc<dyn SchemaBackend>, checks: Vec<SchemaCheck>) -> Self {
        Self {
            backend,
            checks: checks.into(),
            timeout: None,
            outcome: OnceLock::new(),
            runs: AtomicUsize::new(0),
        }
    }

    /// Bounds the run. On expiry the guard is still marked done.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Runs reconciliation if it has not run yet, and returns its report.
    ///
    /// Never fails: every failure mode is folded into the report. Must be
    /// called from within a Tokio runtime.
    pub async fn reconcile(&self) -> Arc<ReconciliationReport> {
        let mut rx = self.outcome.get_or_init(|| self.start()).clone();
        let report = match rx.wait_for(Option::is_some).await {
            Ok(current) => (*current).clone(),
            Err(_) => None,
        };
        report.unwrap_or_else(|| {
            // The run task was dropped with its runtime before reporting.
            Arc::new(ReconciliationReport::ended(RunStatus::Aborted {
                reason: "reconciliation task ended without a report".to_string(),
            }))
        })
    }

    /// The report, if reconciliation has finished.
    #[must_use]
    pub fn report(&self) -> Option<Arc<ReconciliationReport>> {
        self.outcome.get().and_then(|rx| (*rx.borrow()).clone())
    }

    /// Whether the guard has reached its terminal state.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.report().is_some()
    }

    /// How many times the check sequence has started (0 or 1).
    #[must_use]
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::Acquire)
    }

    /// Spawns the one and only run. Called once, under the `OnceLock`.
    fn start(&self) -> ReportReceiver {
        self.runs.fetch_add(1, Ordering::AcqRel);
        info!(checks = self.checks.len(), "starting schema reconciliation");

        let (tx, rx) = watch::channel(None);
        let backend = Arc::clone(&self.backend);
        let checks = Arc::clone(&self.checks);
        let timeout = self.timeout;
        tokio::spawn(async move {
            let report = run(backend, checks, timeout).await;
            tx.send_replace(Some(Arc::new(report)));
        });
        rx
    }
}

async fn run(
    backend: Arc<dyn SchemaBackend>,
    checks: Arc<[SchemaCheck]>,
    timeout: Option<Duration>,
) -> ReconciliationReport {
    let task = tokio::task::spawn_blocking(move || reconcile_checks(backend.as_ref(), &checks));

    let report = match timeout {
        Some(limit) => match tokio::time::timeout(limit, task).await {
            Ok(joined) => from_join(joined),
            Err(_) => {
                error!(
                    timeout_ms = duration_ms(limit),
                    "schema reconciliation timed out, continuing startup"
                );
                ReconciliationReport::ended(RunStatus::TimedOut {
                    after_ms: duration_ms(limit),
                })
            },
        },
        None => from_join(task.await),
    };

    match &report.status {
        RunStatus::Completed if report.failed() == 0 => info!(
            applied = report.applied(),
            already_present = report.already_present(),
            "schema reconciliation complete"
        ),
        RunStatus::Completed => warn!(
            applied = report.applied(),
            already_present = report.already_present(),
            failed = report.failed(),
            "schema reconciliation finished with failures"
        ),
        RunStatus::Aborted { .. } | RunStatus::TimedOut { .. } => {},
    }
    report
}

fn from_join(joined: Result<ReconciliationReport, JoinError>) -> ReconciliationReport {
    joined.unwrap_or_else(|e| {
        error!(error = %e, "schema reconciliation task failed");
        ReconciliationReport::ended(RunStatus::Aborted {
            reason: format!("reconciliation task failed: {e}"),
        })
    })
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
