//! The project files the installer and update engine read and write.
//!
//! [`Workspace`] is the only way the core touches component files, so the
//! update engine can be exercised against an in-memory workspace in unit
//! tests. [`FsWorkspace`] is the real implementation rooted at the
//! project directory; in dry-run mode it reports writes without performing them.

use anyhow::{Result, anyhow};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::registry::is_safe_relative_path;
use crate::utils::fs::{atomic_write, prune_empty_dirs, read_optional};

/// Project-relative file access.
///
/// Paths are `/`-separated and relative to the project root.
pub trait Workspace {
    /// Current content of `path`, `None` when the file does not exist.
    fn read(&self, path: &str) -> Result<Option<Vec<u8>>>;

    /// Replace the content of `path`, creating parent directories.
    fn write(&self, path: &str, content: &[u8]) -> Result<()>;

    /// Delete `path`. Deleting a missing file is not an error.
    fn remove(&self, path: &str) -> Result<()>;
}

/// Workspace backed by the project directory.
#[derive(Debug, Clone)]
pub struct FsWorkspace {
    root: PathBuf,
    dry_run: bool,
}

impl FsWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            dry_run: false,
        }
    }

    /// Report writes and removals instead of performing them.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        if !is_safe_relative_path(path) {
            return Err(anyhow!("Refusing to access '{path}' outside the project"));
        }
        Ok(self.root.join(path))
    }
}

impl Workspace for FsWorkspace {
    fn read(&self, path: &str) -> Result<Option<Vec<u8>>> {
        read_optional(&self.resolve(path)?)
    }

    fn write(&self, path: &str, content: &[u8]) -> Result<()> {
        let target = self.resolve(path)?;
        if self.dry_run {
            info!("[dry-run] would write {} ({} bytes)", path, content.len());
            return Ok(());
        }
        debug!("Writing {}", target.display());
        atomic_write(&target, content)
    }

    fn remove(&self, path: &str) -> Result<()> {
        let target = self.resolve(path)?;
        if self.dry_run {
            info!("[dry-run] would remove {}", path);
            return Ok(());
        }
        match fs::remove_file(&target) {
            Ok(()) => {
                debug!("Removed {}", target.display());
                prune_empty_dirs(&target, &self.root)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(anyhow!("Failed to remove {}: {e}", target.display())),
        }
    }
}

/// In-memory workspace for tests.
///
/// Paths listed with [`fail_writes_to`](Self::fail_writes_to) reject writes,
/// which lets callers exercise partial-failure handling.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryWorkspace {
    files: std::cell::RefCell<std::collections::BTreeMap<String, Vec<u8>>>,
    failing: std::cell::RefCell<Vec<String>>,
}

#[cfg(test)]
impl MemoryWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file.
    pub fn insert(&self, path: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.files.borrow_mut().insert(path.into(), content.into());
    }

    /// Make every later write to `path` fail.
    pub fn fail_writes_to(&self, path: impl Into<String>) {
        self.failing.borrow_mut().push(path.into());
    }

    /// Content of `path` as UTF-8, for assertions.
    pub fn get_string(&self, path: &str) -> Option<String> {
        self.files.borrow().get(path).map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.borrow().contains_key(path)
    }

    /// All stored paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        self.files.borrow().keys().cloned().collect()
    }
}

#[cfg(test)]
impl Workspace for MemoryWorkspace {
    fn read(&self, path: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.files.borrow().get(path).cloned())
    }

    fn write(&self, path: &str, content: &[u8]) -> Result<()> {
        if self.failing.borrow().iter().any(|failing| failing == path) {
            return Err(anyhow!("Permission denied: {path}"));
        }
        self.files.borrow_mut().insert(path.to_string(), content.to_vec());
        Ok(())
    }

    fn remove(&self, path: &str) -> Result<()> {
        self.files.borrow_mut().remove(path);
        Ok(())
    }
}
