//! Writing fetched components into the project.
//!
//! For every fetched file the installer:
//!
//! 1. maps the logical registry path to a project path through the alias map
//!    ([`paths::resolve_alias_path`]),
//! 2. rewrites `@registry/...` specifiers for the project's import style
//!    ([`imports`]),
//! 3. writes the result through the [`Workspace`], and
//! 4. checksums the bytes that were written.
//!
//! The ledger entry is upserted only once every file of the item has been
//! written. A failed write leaves the files already written in place but no
//! entry, so "absent from the ledger" always means "never completed" and the
//! next attempt is treated as a fresh install.
//!
//! [`Installer::install_all`] is the fresh-install batch: it refuses to write
//! anything if any item failed to fetch, then installs in dependency order and
//! withholds items whose dependencies failed.

pub mod imports;
pub mod paths;

use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

use crate::core::KitpmError;
use crate::fetch::{FetchResults, FetchedItem};
use crate::ledger::checksum::compute_checksum;
use crate::ledger::{FileChecksum, ImportStyle, Ledger, LedgerEntry};
use crate::registry::RegistryEntry;
use crate::workspace::Workspace;

use imports::{ImportRewrite, rewrite_content};
use paths::resolve_alias_path;

/// Project layout settings taken from the ledger.
#[derive(Debug, Clone)]
pub struct InstallSettings {
    /// Ref recorded as the version of installed entries
    pub git_ref: String,
    pub import_style: ImportStyle,
    pub import_prefix: String,
    pub aliases: BTreeMap<String, String>,
}

impl InstallSettings {
    #[must_use]
    pub fn from_ledger(ledger: &Ledger) -> Self {
        Self {
            git_ref: ledger.git_ref.clone(),
            import_style: ledger.import_style,
            import_prefix: ledger.import_prefix.clone(),
            aliases: ledger.aliases.clone(),
        }
    }

    /// Same settings, targeting another ref.
    #[must_use]
    pub fn with_ref(mut self, git_ref: impl Into<String>) -> Self {
        self.git_ref = git_ref.into();
        self
    }

    fn rewrite(&self) -> ImportRewrite<'_> {
        ImportRewrite {
            style: self.import_style,
            prefix: &self.import_prefix,
            aliases: &self.aliases,
        }
    }
}

/// A file ready to be written: final path, final bytes, and their checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedFile {
    /// Path as declared by the registry
    pub logical_path: String,
    /// Project-relative path after alias resolution
    pub target_path: String,
    pub content: Vec<u8>,
    pub checksum: String,
}

/// Compute the exact files an item would install, without writing anything.
#[must_use]
pub fn prepare_item(item: &FetchedItem, settings: &InstallSettings) -> Vec<PreparedFile> {
    let rewrite = settings.rewrite();

    item.files
        .iter()
        .map(|file| {
            let target_path = resolve_alias_path(&file.path, &settings.aliases);
            let content = rewrite_content(&file.content, &target_path, &rewrite);
            let checksum = compute_checksum(&content);
            PreparedFile {
                logical_path: file.path.clone(),
                target_path,
                content,
                checksum,
            }
        })
        .collect()
}

/// A successfully installed item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledItem {
    pub name: String,
    pub written_paths: Vec<String>,
}

/// Outcome of a fresh-install batch.
#[derive(Debug, Default)]
pub struct InstallSummary {
    /// Items installed, in installation order
    pub installed: Vec<InstalledItem>,
    /// Items that could not be installed, in installation order
    pub failed: Vec<(String, KitpmError)>,
}

impl InstallSummary {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn written_paths(&self) -> impl Iterator<Item = &str> {
        self.installed.iter().flat_map(|item| item.written_paths.iter().map(String::as_str))
    }
}

/// Writes components through a [`Workspace`] and records them in the ledger.
pub struct Installer<'a, W: Workspace + ?Sized> {
    workspace: &'a W,
    settings: InstallSettings,
}

impl<'a, W: Workspace + ?Sized> Installer<'a, W> {
    pub fn new(workspace: &'a W, settings: InstallSettings) -> Self {
        Self {
            workspace,
            settings,
        }
    }

    pub fn settings(&self) -> &InstallSettings {
        &self.settings
    }

    /// Install one fetched item and upsert its ledger entry.
    ///
    /// # Errors
    ///
    /// [`KitpmError::FileWrite`] for the first file that could not be written.
    /// Files written before it stay on disk and the ledger is left untouched.
    pub fn install(&self, item: &FetchedItem, ledger: &mut Ledger) -> Result<InstalledItem, KitpmError> {
        let prepared = prepare_item(item, &self.settings);
        let mut written_paths = Vec::with_capacity(prepared.len());
        let mut checksums = Vec::with_capacity(prepared.len());

        for file in prepared {
            if let Err(e) = self.workspace.write(&file.target_path, &file.content) {
                if !written_paths.is_empty() {
                    warn!(
                        "'{}' is partially installed; written so far: {}",
                        item.name,
                        written_paths.join(", ")
                    );
                }
                return Err(KitpmError::FileWrite {
                    path: file.target_path,
                    reason: format!("{e:#}"),
                });
            }
            debug!("Installed {} -> {}", file.logical_path, file.target_path);
            checksums.push(FileChecksum::new(file.target_path.clone(), file.checksum));
            written_paths.push(file.target_path);
        }

        ledger.upsert_entry(LedgerEntry::new(&item.name, &self.settings.git_ref, checksums));
        info!("Installed '{}' ({} files)", item.name, written_paths.len());

        Ok(InstalledItem {
            name: item.name.clone(),
            written_paths,
        })
    }

    /// Install a batch in the given order, which must list dependencies first.
    ///
    /// Nothing is written if any item of `plan` failed to fetch; that fetch error
    /// is returned. Otherwise each item is installed in turn. An item whose
    /// dependency failed is not installed and is reported as failed too.
    pub fn install_all(
        &self,
        plan: &[RegistryEntry],
        fetched: &FetchResults,
        ledger: &mut Ledger,
    ) -> Result<InstallSummary, KitpmError> {
        let mut items: Vec<&FetchedItem> = Vec::with_capacity(plan.len());
        for entry in plan {
            match fetched.get(&entry.name) {
                Some(Ok(item)) => items.push(item),
                Some(Err(e)) => return Err(e.clone()),
                None => {
                    return Err(KitpmError::Fetch {
                        item: entry.name.clone(),
                        git_ref: self.settings.git_ref.clone(),
                        reason: "item was not fetched".to_string(),
                    });
                }
            }
        }

        let mut summary = InstallSummary::default();
        let mut failed: HashSet<String> = HashSet::new();

        for (entry, item) in plan.iter().zip(items) {
            if let Some(dependency) = entry.dependencies.iter().find(|dep| failed.contains(*dep)) {
                warn!("Skipping '{}': dependency '{}' failed", entry.name, dependency);
                failed.insert(entry.name.clone());
                summary.failed.push((
                    entry.name.clone(),
                    KitpmError::Other {
                        message: format!("dependency '{dependency}' failed to install"),
                    },
                ));
                continue;
            }

            match self.install(item, ledger) {
                Ok(installed) => summary.installed.push(installed),
                Err(e) => {
                    warn!("Failed to install '{}': {}", entry.name, e);
                    failed.insert(entry.name.clone());
                    summary.failed.push((entry.name.clone(), e));
                }
            }
        }

        Ok(summary)
    }
}
