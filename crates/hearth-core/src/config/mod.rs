//! Configuration parsing and management.
//!
//! Both binaries read the same `hearth.toml`:
//!
//! ```toml
//! [database]
//! path = "/var/lib/hearth/hearth.db"
//! busy_timeout_ms = 5000
//!
//! [leveling]
//! curve = "quadratic"   # linear | quadratic | exponential
//! base_xp = 100
//! growth_factor = 2     # exponential only
//!
//! [reconciler]
//! timeout_secs = 30     # 0 disables the timeout
//!
//! [server]
//! listen = "127.0.0.1:8080"
//! ```
//!
//! Every field has a default, so an empty file (or no file) is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::leveling::{DEFAULT_BASE_XP, LevelCurve};

/// Default config file name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "hearth.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct HearthConfig {
    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Threshold curve selection.
    #[serde(default)]
    pub leveling: LevelingConfig,

    /// Startup schema reconciliation.
    #[serde(default)]
    pub reconciler: ReconcilerConfig,

    /// Read-only progression API.
    #[serde(default)]
    pub server: ServerConfig,
}

impl HearthConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load configuration from `path` if it exists, defaults otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read, parsed, or
    /// validated.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and validate configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or a value is out of range.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Checks values serde cannot.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        LevelCurve::from_config(&self.leveling)
            .map_err(|e| ConfigError::Validation(format!("[leveling] {e}")))?;
        if self.server.listen.trim().is_empty() {
            return Err(ConfigError::Validation(
                "[server] listen must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Path to the `SQLite` database file.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    /// How long a statement waits on a locked database.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl DatabaseConfig {
    /// `busy_timeout_ms` as a [`Duration`].
    #[must_use]
    pub const fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("hearth.db")
}

const fn default_busy_timeout_ms() -> u64 {
    5_000
}

/// Which threshold curve shape to use.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CurveKind {
    /// `base * L`
    Linear,
    /// `base * L^2`
    #[default]
    Quadratic,
    /// `base * growth_factor^(L - 1)`
    Exponential,
}

/// Leveling curve configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LevelingConfig {
    /// Curve shape.
    #[serde(default)]
    pub curve: CurveKind,

    /// XP cost of level 1.
    #[serde(default = "default_base_xp")]
    pub base_xp: u64,

    /// Per-level multiplier for the exponential curve.
    #[serde(default = "default_growth_factor")]
    pub growth_factor: u64,
}

impl Default for LevelingConfig {
    fn default() -> Self {
        Self {
            curve: CurveKind::default(),
            base_xp: default_base_xp(),
            growth_factor: default_growth_factor(),
        }
    }
}

const fn default_base_xp() -> u64 {
    DEFAULT_BASE_XP
}

const fn default_growth_factor() -> u64 {
    2
}

/// Schema reconciler configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ReconcilerConfig {
    /// Upper bound on reconciliation at startup. `0` means unbounded.
    #[serde(default = "default_reconcile_timeout_secs")]
    pub timeout_secs: u64,
}

impl ReconcilerConfig {
    /// The timeout, or `None` when disabled.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        if self.timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.timeout_secs))
        }
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_reconcile_timeout_secs(),
        }
    }
}

const fn default_reconcile_timeout_secs() -> u64 {
    30
}

/// API server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Socket address to bind.
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

fn default_listen() -> String {
    "127.0.0.1:8080".to_string()
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error reading configuration file.
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Validation error.
    #[error("configuration validation failed: {0}")]
    Validation(String),
}
