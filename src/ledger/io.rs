//! Loading and saving the ledger file.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::migration::{MigrationOutcome, migrate};
use super::Ledger;
use crate::constants::LEDGER_FILE_NAME;
use crate::core::KitpmError;
use crate::utils::fs::atomic_write;

/// Reads and writes a project's `kitpm.toml`.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    path: PathBuf,
}

impl LedgerStore {
    /// Store for the ledger in `project_dir`.
    pub fn new(project_dir: &Path) -> Self {
        Self {
            path: project_dir.join(LEDGER_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the ledger with a report of what migration changed, or `None` when
    /// the file does not exist.
    ///
    /// An outdated ledger is migrated and written back before it is returned.
    ///
    /// # Errors
    ///
    /// [`KitpmError::LedgerCorruption`] when the file cannot be parsed. The file
    /// is never reset or overwritten in that case.
    pub fn load_migrated(&self) -> Result<Option<MigrationOutcome>> {
        if !self.path.exists() {
            debug!("No ledger at {}", self.path.display());
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read ledger: {}", self.path.display()))?;

        let raw: toml::Table = toml::from_str(&content).map_err(|e| KitpmError::LedgerCorruption {
            file: self.path.display().to_string(),
            reason: e.message().to_string(),
        })?;

        let outcome = migrate(raw, &self.path.display().to_string())?;

        if outcome.migrated {
            info!(
                changes = outcome.changes.len(),
                "Migrated ledger {} to the current schema",
                self.path.display()
            );
            self.save(&outcome.ledger)?;
        }

        Ok(Some(outcome))
    }

    /// Atomically write the ledger.
    pub fn save(&self, ledger: &Ledger) -> Result<()> {
        let content = ledger.to_toml_string()?;
        atomic_write(&self.path, content.as_bytes())
            .with_context(|| format!("Failed to save ledger: {}", self.path.display()))?;
        debug!("Saved ledger with {} entries", ledger.installed.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{FileChecksum, LedgerEntry};
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_returns_none() {
        let temp = TempDir::new().unwrap();
        let store = LedgerStore::new(temp.path());

        assert!(store.load_migrated().unwrap().is_none());
        assert!(!store.exists());
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let store = LedgerStore::new(temp.path());

        let mut ledger = Ledger::default();
        ledger.upsert_entry(LedgerEntry::new(
            "button",
            "main",
            vec![FileChecksum::new("components/ui/button.tsx", "sha256:01")],
        ));
        store.save(&ledger).unwrap();

        let loaded = store.load_migrated().unwrap().unwrap();
        assert!(!loaded.migrated);
        assert_eq!(loaded.ledger, ledger);
        assert!(!temp.path().join("kitpm.toml.tmp").exists());
    }

    #[test]
    fn test_load_persists_migration() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("kitpm.toml");
        fs::write(&path, "ref = \"v2\"\nlegacy = 1\n").unwrap();

        let store = LedgerStore::new(temp.path());
        let outcome = store.load_migrated().unwrap().unwrap();
        assert!(outcome.migrated);
        assert_eq!(outcome.ledger.git_ref, "v2");

        let on_disk = fs::read_to_string(&path).unwrap();
        assert!(on_disk.contains("schema_version = 2"));
        assert!(on_disk.contains("legacy = 1"));

        let again = store.load_migrated().unwrap().unwrap();
        assert!(!again.migrated);
    }

    #[test]
    fn test_corrupt_ledger_is_not_reset() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("kitpm.toml");
        fs::write(&path, "ref = [unterminated").unwrap();

        let store = LedgerStore::new(temp.path());
        let err = store.load_migrated().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<KitpmError>(),
            Some(KitpmError::LedgerCorruption { .. })
        ));
        assert_eq!(fs::read_to_string(&path).unwrap(), "ref = [unterminated");
    }
}
