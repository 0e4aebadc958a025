//! User-wide kitpm settings.
//!
//! The global configuration lives at `~/.kitpm/config.toml`
//! (`%LOCALAPPDATA%\kitpm\config.toml` on Windows) and tunes how kitpm works
//! rather than what a project contains; project settings belong in the ledger.
//! The `--config` flag or the `KITPM_CONFIG` environment variable points kitpm
//! at another file.
//!
//! # File Format
//!
//! ```toml
//! # Concurrent fetches during add and update
//! fetch_concurrency = 8
//!
//! # Retries after a transient fetch failure
//! fetch_retries = 3
//!
//! # Context lines around changes in rendered diffs
//! diff_context_lines = 3
//!
//! # Seconds to wait for another kitpm process to release the project
//! lock_timeout_secs = 30
//! ```
//!
//! Every key is optional; a missing file means all defaults.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::constants::{
    DEFAULT_DIFF_CONTEXT_LINES, DEFAULT_FETCH_CONCURRENCY, DEFAULT_FETCH_RETRIES,
    default_lock_timeout,
};
use crate::core::KitpmError;

/// Environment variable overriding the global config location.
pub const CONFIG_PATH_ENV: &str = "KITPM_CONFIG";

const fn default_fetch_concurrency() -> usize {
    DEFAULT_FETCH_CONCURRENCY
}

const fn default_fetch_retries() -> usize {
    DEFAULT_FETCH_RETRIES
}

const fn default_diff_context_lines() -> usize {
    DEFAULT_DIFF_CONTEXT_LINES
}

fn default_lock_timeout_secs() -> u64 {
    default_lock_timeout().as_secs()
}

/// Global configuration for kitpm.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GlobalConfig {
    /// Maximum concurrent item fetches
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,

    /// Retries after a transient fetch failure
    #[serde(default = "default_fetch_retries")]
    pub fetch_retries: usize,

    #[serde(default = "default_diff_context_lines")]
    pub diff_context_lines: usize,

    /// How long to wait for the project lock
    #[serde(default = "default_lock_timeout_secs")]
    pub lock_timeout_secs: u64,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            fetch_concurrency: default_fetch_concurrency(),
            fetch_retries: default_fetch_retries(),
            diff_context_lines: default_diff_context_lines(),
            lock_timeout_secs: default_lock_timeout_secs(),
        }
    }
}

impl GlobalConfig {
    /// Load from `path`, or from `KITPM_CONFIG`, or from the default location.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, is not valid TOML,
    /// or fails validation.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => match std::env::var_os(CONFIG_PATH_ENV) {
                Some(path) => PathBuf::from(path),
                None => Self::default_path()?,
            },
        };

        if fs::try_exists(&path).await.unwrap_or(false) {
            Self::load_from(&path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read global config from {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse global config from {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Platform default path of the global config file.
    ///
    /// - **Windows**: `%LOCALAPPDATA%\kitpm\config.toml`
    /// - **Unix/macOS**: `~/.kitpm/config.toml`
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("kitpm")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".kitpm")
        };

        Ok(config_dir.join("config.toml"))
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }

    fn validate(&self) -> Result<(), KitpmError> {
        if self.fetch_concurrency == 0 {
            return Err(KitpmError::ConfigError {
                message: "fetch_concurrency must be at least 1".to_string(),
            });
        }
        if self.lock_timeout_secs == 0 {
            return Err(KitpmError::ConfigError {
                message: "lock_timeout_secs must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
