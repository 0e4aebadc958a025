//! The installed-component ledger (`kitpm.toml`).
//!
//! The ledger is the project's persisted state: which upstream ref it tracks,
//! how registry paths map into the project, and one [`LedgerEntry`] per
//! installed component with the checksums of the files that were written.
//!
//! ```toml
//! schema_version = 2
//! ref = "main"
//! import_style = "alias"
//! source = "https://raw.githubusercontent.com/kitpm/registry/{ref}/{path}"
//! import_prefix = "@/"
//!
//! [aliases]
//! primitives = "components/ui"
//! shared = "lib"
//!
//! [[installed]]
//! name = "button"
//! version = "main"
//! installed_at = "2026-10-18T09:12:44Z"
//! modified = false
//!
//! [[installed.checksums]]
//! path = "components/ui/button.tsx"
//! checksum = "sha256:9f2c..."
//! ```
//!
//! Entry operations are plain methods over the in-memory value and never touch
//! the disk; [`io::LedgerStore`] loads (migrating on the way) and saves it.
//! Keys the current schema does not know are carried in `extra` and written
//! back unchanged.

pub mod checksum;
pub mod io;
pub mod migration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::constants::{CURRENT_SCHEMA_VERSION, DEFAULT_IMPORT_PREFIX, DEFAULT_REF, DEFAULT_SOURCE};
use crate::core::KitpmError;

pub use io::LedgerStore;
pub use migration::{MigrationOutcome, migrate};

/// How references to other registry items are rewritten on install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStyle {
    /// `@registry/primitives/button` becomes `@/components/ui/button`
    #[default]
    Alias,
    /// `@registry/primitives/button` becomes a path relative to the importing file
    Relative,
}

impl fmt::Display for ImportStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alias => write!(f, "alias"),
            Self::Relative => write!(f, "relative"),
        }
    }
}

impl FromStr for ImportStyle {
    type Err = KitpmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "alias" => Ok(Self::Alias),
            "relative" => Ok(Self::Relative),
            other => Err(KitpmError::ConfigError {
                message: format!("Unknown import style '{other}', expected 'alias' or 'relative'"),
            }),
        }
    }
}

/// Checksum of one installed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChecksum {
    /// Project-relative path the file was written to
    pub path: String,
    /// `sha256:<hex>` of the written bytes
    pub checksum: String,
}

impl FileChecksum {
    pub fn new(path: impl Into<String>, checksum: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            checksum: checksum.into(),
        }
    }
}

/// One installed component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Canonical registry name
    pub name: String,
    /// Upstream ref the component was installed from
    pub version: String,
    pub installed_at: DateTime<Utc>,
    /// Set when local content is known to differ from what kitpm installed
    #[serde(default)]
    pub modified: bool,
    #[serde(default)]
    pub checksums: Vec<FileChecksum>,
    /// Keys this version does not understand, preserved on save
    #[serde(skip)]
    pub extra: toml::Table,
}

impl LedgerEntry {
    /// A freshly installed, unmodified entry stamped with the current time.
    pub fn new(name: impl Into<String>, version: impl Into<String>, checksums: Vec<FileChecksum>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            installed_at: Utc::now(),
            modified: false,
            checksums,
            extra: toml::Table::new(),
        }
    }

    /// Recorded checksum for a project-relative path.
    #[must_use]
    pub fn checksum_for(&self, path: &str) -> Option<&str> {
        self.checksums.iter().find(|c| c.path == path).map(|c| c.checksum.as_str())
    }
}

/// Default alias map: logical registry prefix to project directory.
#[must_use]
pub fn default_aliases() -> BTreeMap<String, String> {
    [
        ("primitives", "components/ui"),
        ("shared", "lib"),
        ("patterns", "components/patterns"),
        ("faces", "faces"),
    ]
    .into_iter()
    .map(|(alias, target)| (alias.to_string(), target.to_string()))
    .collect()
}

/// The project ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    pub schema_version: u32,
    /// Upstream ref the project currently tracks
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub import_style: ImportStyle,
    /// Upstream location: URL template with `{ref}` and `{path}`, or a directory
    pub source: String,
    /// Prefix for alias-style imports
    pub import_prefix: String,
    pub aliases: BTreeMap<String, String>,
    #[serde(default)]
    pub installed: Vec<LedgerEntry>,
    /// Top-level keys this version does not understand, preserved on save
    #[serde(skip)]
    pub extra: toml::Table,
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            git_ref: DEFAULT_REF.to_string(),
            import_style: ImportStyle::default(),
            source: DEFAULT_SOURCE.to_string(),
            import_prefix: DEFAULT_IMPORT_PREFIX.to_string(),
            aliases: default_aliases(),
            installed: Vec::new(),
            extra: toml::Table::new(),
        }
    }
}

impl Ledger {
    /// Look up an installed entry.
    #[must_use]
    pub fn get_entry(&self, name: &str) -> Option<&LedgerEntry> {
        self.installed.iter().find(|entry| entry.name == name)
    }

    /// Whether `name` is installed.
    #[must_use]
    pub fn is_installed(&self, name: &str) -> bool {
        self.get_entry(name).is_some()
    }

    /// Insert or replace the entry with the same name.
    ///
    /// A replaced entry keeps its position and its unknown keys.
    pub fn upsert_entry(&mut self, mut entry: LedgerEntry) {
        match self.installed.iter_mut().find(|existing| existing.name == entry.name) {
            Some(existing) => {
                for (key, value) in std::mem::take(&mut existing.extra) {
                    entry.extra.entry(key).or_insert(value);
                }
                *existing = entry;
            }
            None => self.installed.push(entry),
        }
    }

    /// Remove an entry, returning it if it existed.
    pub fn remove_entry(&mut self, name: &str) -> Option<LedgerEntry> {
        let position = self.installed.iter().position(|entry| entry.name == name)?;
        Some(self.installed.remove(position))
    }

    /// Serialize to TOML, merging preserved unknown keys back in.
    pub fn to_toml_string(&self) -> Result<String> {
        let mut table = toml::Table::try_from(self).context("Failed to serialize ledger")?;

        if let Some(toml::Value::Array(entries)) = table.get_mut("installed") {
            for (value, entry) in entries.iter_mut().zip(&self.installed) {
                if let toml::Value::Table(entry_table) = value {
                    for (key, extra) in &entry.extra {
                        entry_table.entry(key.clone()).or_insert_with(|| extra.clone());
                    }
                }
            }
        }

        for (key, value) in &self.extra {
            table.entry(key.clone()).or_insert_with(|| value.clone());
        }

        toml::to_string_pretty(&table).context("Failed to serialize ledger")
    }
}
