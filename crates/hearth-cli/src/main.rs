//! hearth - operator CLI for the hearth community platform
//!
//! Reports go to stdout; logs go to stderr.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hearth_core::config::{DEFAULT_CONFIG_FILE, HearthConfig};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;

/// hearth - operator CLI for the hearth community platform
#[derive(Parser, Debug)]
#[command(name = "hearth")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Path to the `SQLite` database (overrides `[database] path`)
    #[arg(long)]
    database: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Recompute every user's cached level from their XP
    RecalcLevels {
        /// Report corrections without writing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the level and progress an XP total maps to
    Level {
        /// Total experience points
        xp: u64,
    },

    /// Run the startup schema reconciliation once and print its report
    Reconcile,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let mut config = HearthConfig::load_or_default(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;
    if let Some(path) = cli.database {
        config.database.path = path;
    }

    let mut out = std::io::stdout().lock();
    match cli.command {
        Commands::RecalcLevels { dry_run } => commands::recalc::run(&config, dry_run, &mut out),
        Commands::Level { xp } => commands::level::run(&config, xp, &mut out),
        Commands::Reconcile => commands::reconcile::run(&config, &mut out),
    }
}
