//! hearth-daemon - progression API server.
//!
//! On start the daemon reconciles the database schema once, then serves the
//! read-only progression API until interrupted. Reconciliation problems are
//! logged and reported on `/health`; they never prevent startup. Failing to
//! open the database or bind the listener does.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use hearth_core::config::{DEFAULT_CONFIG_FILE, HearthConfig};
use hearth_core::leveling::LevelCurve;
use hearth_core::store::{SqliteUserStore, open_database};
use hearth_daemon::http;
use hearth_daemon::schema::{RunStatus, SchemaReconciler, SqliteSchemaBackend, expected_checks};
use hearth_daemon::state::AppState;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// hearth-daemon - progression API server
#[derive(Parser, Debug)]
#[command(name = "hearth-daemon")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Path to the `SQLite` database (overrides `[database] path`)
    #[arg(long)]
    database: Option<PathBuf>,

    /// Address to listen on (overrides `[server] listen`)
    #[arg(long)]
    listen: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log to file instead of stdout
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let runtime = tokio::runtime::Runtime::new().context("failed to create Tokio runtime")?;
    runtime.block_on(async_main(args))
}

async fn async_main(args: Args) -> Result<()> {
    init_tracing(&args)?;

    let mut config = HearthConfig::load_or_default(&args.config)
        .with_context(|| format!("failed to load configuration from {}", args.config.display()))?;
    if let Some(path) = args.database {
        config.database.path = path;
    }
    if let Some(listen) = args.listen {
        config.server.listen = listen;
    }
    let curve = LevelCurve::from_config(&config.leveling).context("invalid [leveling] config")?;

    info!(
        database = %config.database.path.display(),
        curve = ?curve,
        "starting hearth-daemon"
    );

    let conn = open_database(&config.database.path, config.database.busy_timeout())
        .with_context(|| {
            format!(
                "failed to open database at {}",
                config.database.path.display()
            )
        })?;
    let conn = Arc::new(Mutex::new(conn));

    let reconciler = Arc::new(
        SchemaReconciler::new(
            Arc::new(SqliteSchemaBackend::new(Arc::clone(&conn))),
            expected_checks(),
        )
        .with_timeout(config.reconciler.timeout()),
    );
    let report = reconciler.reconcile().await;
    match &report.status {
        RunStatus::Completed => {
            for failure in report.failures() {
                warn!(check = %failure.id, "schema check left unapplied");
            }
        },
        RunStatus::Aborted { reason } => {
            error!(reason = %reason, "schema reconciliation aborted, continuing startup");
        },
        RunStatus::TimedOut { after_ms } => {
            error!(after_ms, "schema reconciliation timed out, continuing startup");
        },
    }

    let state = AppState::new(SqliteUserStore::new(conn), curve, reconciler);
    let app = http::router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.server.listen))?;
    info!(addr = %config.server.listen, "progression API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server error")?;

    info!("hearth-daemon stopped");
    Ok(())
}

fn init_tracing(args: &Args) -> Result<()> {
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    if let Some(log_file) = &args.log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
            .context("failed to open log file")?;

        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(file)
                    .with_ansi(false),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
    Ok(())
}

async fn shutdown_signal() {
    wait_for_shutdown(tokio::signal::ctrl_c()).await;
}

/// Resolves once `signal` fires. If the signal cannot be listened for, never
/// resolves: the server keeps running instead of stopping at startup.
async fn wait_for_shutdown<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => info!("received Ctrl-C, shutting down"),
        Err(e) => {
            error!(error = %e, "failed to listen for Ctrl-C, graceful shutdown disabled");
            std::future::pending::<()>().await;
        },
    }
}
