//! Project-level file locking for cross-process coordination.
//!
//! Commands that write components or the ledger hold an exclusive lock at
//! `{project_dir}/.kitpm/.locks/{lock_name}.lock` for their whole run, so two
//! concurrent `kitpm` processes never interleave writes. The lock is released and
//! the lock file removed when the [`ProjectLock`] is dropped.
//!
//! File operations run under `spawn_blocking` to keep the tokio workers free.

use crate::constants::{
    MAX_BACKOFF_DELAY_MS, STARTING_BACKOFF_DELAY_MS, STATE_DIR_NAME, default_lock_timeout,
};
use anyhow::{Context, Result};
use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;
use tracing::debug;

/// An exclusive, process-safe lock on a project.
///
/// # Example
///
/// ```rust,no_run
/// use kitpm_cli::utils::project_lock::ProjectLock;
/// use std::path::Path;
///
/// # async fn example() -> anyhow::Result<()> {
/// let _lock = ProjectLock::acquire(Path::new("."), "project").await?;
/// // write components and the ledger...
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ProjectLock {
    /// The lock is held for as long as this handle is open
    _file: Arc<File>,
    lock_name: String,
    lock_path: PathBuf,
}

impl Drop for ProjectLock {
    fn drop(&mut self) {
        debug!(lock_name = %self.lock_name, "Project lock released");
        if let Err(e) = std::fs::remove_file(&self.lock_path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            debug!(lock_name = %self.lock_name, error = %e, "Failed to remove lock file");
        }
    }
}

impl ProjectLock {
    /// Acquire the named lock with the default timeout.
    pub async fn acquire(project_dir: &Path, lock_name: &str) -> Result<Self> {
        Self::acquire_with_timeout(project_dir, lock_name, default_lock_timeout()).await
    }

    /// Acquire the named lock, polling with exponential backoff (10ms up to
    /// 500ms) until `timeout` elapses.
    pub async fn acquire_with_timeout(
        project_dir: &Path,
        lock_name: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let display_name = format!("project:{lock_name}");
        debug!(lock_name = %display_name, "Waiting for project lock");

        let locks_dir = project_dir.join(STATE_DIR_NAME).join(".locks");
        tokio::fs::create_dir_all(&locks_dir).await.with_context(|| {
            format!("Failed to create project locks directory: {}", locks_dir.display())
        })?;

        let lock_path = locks_dir.join(format!("{lock_name}.lock"));

        let open_path = lock_path.clone();
        let file = tokio::task::spawn_blocking(move || {
            OpenOptions::new().create(true).write(true).truncate(false).open(&open_path)
        })
        .await
        .with_context(|| "spawn_blocking panicked")?
        .with_context(|| format!("Failed to open lock file: {}", lock_path.display()))?;
        let file = Arc::new(file);

        let start = std::time::Instant::now();
        let backoff = ExponentialBackoff::from_millis(STARTING_BACKOFF_DELAY_MS)
            .max_delay(Duration::from_millis(MAX_BACKOFF_DELAY_MS));

        for delay in backoff {
            let candidate = Arc::clone(&file);
            let locked = tokio::task::spawn_blocking(move || candidate.try_lock_exclusive())
                .await
                .with_context(|| "spawn_blocking panicked")?;

            match locked {
                Ok(true) => {
                    debug!(
                        lock_name = %display_name,
                        wait_ms = start.elapsed().as_millis(),
                        "Project lock acquired"
                    );
                    return Ok(Self {
                        _file: file,
                        lock_name: display_name,
                        lock_path,
                    });
                }
                Ok(false) | Err(_) => {
                    let remaining = timeout.saturating_sub(start.elapsed());
                    if remaining.is_zero() {
                        break;
                    }
                    tokio::time::sleep(delay.min(remaining)).await;
                }
            }
        }

        Err(anyhow::anyhow!(
            "Timeout acquiring project lock '{lock_name}' after {timeout:?}. \
             Another kitpm process may be running in this project."
        ))
    }
}
