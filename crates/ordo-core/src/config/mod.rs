//! Configuration parsing and management.
//!
//! Ordo is configured from a small TOML file (or programmatically). The
//! settings cover the database location and the two timeout knobs: how
//! long an operation may wait for a contended counter key, and SQLite's
//! own busy timeout.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from configuration loading.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// I/O error reading the file.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Semantic validation failure.
    #[error("invalid config: {0}")]
    Validation(String),
}

/// Top-level Ordo configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrdoConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Upper bound on waiting for a contended counter key, in
    /// milliseconds. Expiry surfaces a retryable `LockTimeout`.
    #[serde(default = "default_lock_wait_ms")]
    pub lock_wait_ms: u64,

    /// SQLite busy timeout, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("ordo.db")
}

const fn default_lock_wait_ms() -> u64 {
    5_000
}

const fn default_busy_timeout_ms() -> u64 {
    5_000
}

impl Default for OrdoConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            lock_wait_ms: default_lock_wait_ms(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl OrdoConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates semantic constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if a bound is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lock_wait_ms == 0 {
            return Err(ConfigError::Validation(
                "lock_wait_ms must be greater than zero; unbounded blocking is not supported"
                    .to_string(),
            ));
        }
        if self.busy_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "busy_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Lock wait bound as a [`Duration`].
    #[must_use]
    pub const fn lock_wait(&self) -> Duration {
        Duration::from_millis(self.lock_wait_ms)
    }

    /// Busy timeout as a [`Duration`].
    #[must_use]
    pub const fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}
