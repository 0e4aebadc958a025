//! Registry catalog lookup.
//!
//! The registry is a read-only catalog mapping item names to the files they
//! install and the items they depend on. The resolver only sees the
//! [`RegistryLookup`] trait; [`StaticRegistry`] is the in-memory catalog the CLI
//! builds from the upstream `registry/index.toml`.
//!
//! # Index Format
//!
//! ```toml
//! [[items]]
//! name = "modal"
//! description = "Accessible dialog"
//! dependencies = ["button", "shared/utils"]
//!
//! [[items.files]]
//! path = "primitives/modal.tsx"
//! source = "registry/primitives/modal.tsx"   # optional, defaults to "registry/<path>"
//! ```
//!
//! Validation happens once, at load time: names must be unique and non-empty,
//! file paths must be relative and must not escape the project.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Component, Path};
use strsim::levenshtein;

use crate::core::KitpmError;

/// Maximum Levenshtein distance, as a percentage of the name length, for suggestions.
const SIMILARITY_THRESHOLD_PERCENT: usize = 50;

/// A file declared by a registry item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryFile {
    /// Logical install path, e.g. `primitives/button.tsx`, rewritten through the project's aliases.
    pub path: String,
    /// Location of the content in the upstream source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl RegistryFile {
    /// Create a file whose upstream location defaults to `registry/<path>`.
    #[cfg(test)]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            source: None,
        }
    }

    /// Path of this file in the upstream source.
    #[must_use]
    pub fn remote_source_path(&self) -> String {
        self.source.clone().unwrap_or_else(|| format!("registry/{}", self.path))
    }
}

/// A registry item: its files and declared dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// Canonical item name (`button`, `shared/utils`, ...)
    pub name: String,
    /// Free-form description shown by the CLI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Files installed by this item
    #[serde(default)]
    pub files: Vec<RegistryFile>,
    /// Canonical names of the items this one depends on, in declared order
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl RegistryEntry {
    /// Create an entry with no files.
    pub fn new(name: impl Into<String>, dependencies: &[&str]) -> Self {
        Self {
            name: name.into(),
            description: None,
            files: Vec::new(),
            dependencies: dependencies.iter().map(|d| (*d).to_string()).collect(),
        }
    }

    /// Builder-style helper adding a file with the default upstream location.
    #[cfg(test)]
    #[must_use]
    pub fn with_file(mut self, path: impl Into<String>) -> Self {
        self.files.push(RegistryFile::new(path));
        self
    }
}

/// Read-only lookup of registry items by canonical name.
///
/// `Ok(None)` means "not in the registry" and is data for the resolver. An
/// `Err` is an unexpected failure of the catalog itself.
pub trait RegistryLookup {
    /// Look up an item by canonical name.
    fn lookup(&self, name: &str) -> Result<Option<RegistryEntry>>;
}

/// In-memory registry catalog.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    entries: Vec<RegistryEntry>,
    index: HashMap<String, usize>,
}

#[derive(Debug, Deserialize)]
struct RegistryIndex {
    #[serde(default)]
    items: Vec<RegistryEntry>,
}

impl StaticRegistry {
    /// Build a registry from entries, validating them.
    pub fn new(entries: Vec<RegistryEntry>) -> Result<Self, KitpmError> {
        let mut index = HashMap::with_capacity(entries.len());

        for (position, entry) in entries.iter().enumerate() {
            validate_entry(entry)?;
            if index.insert(entry.name.clone(), position).is_some() {
                return Err(KitpmError::RegistryIndexInvalid {
                    reason: format!("duplicate item '{}'", entry.name),
                });
            }
        }

        Ok(Self {
            entries,
            index,
        })
    }

    /// Parse and validate a TOML registry index.
    pub fn from_toml_str(content: &str) -> Result<Self, KitpmError> {
        let parsed: RegistryIndex =
            toml::from_str(content).map_err(|e| KitpmError::RegistryIndexInvalid {
                reason: e.to_string(),
            })?;
        Self::new(parsed.items)
    }

    /// Get an entry by name without cloning.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RegistryEntry> {
        self.index.get(name).map(|&position| &self.entries[position])
    }

    /// All entries in index order.
    #[must_use]
    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    /// Number of items in the registry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Up to three registry names close to `name`, closest first.
    #[must_use]
    pub fn suggest(&self, name: &str) -> Vec<String> {
        let max_distance = (name.len() * SIMILARITY_THRESHOLD_PERCENT / 100).max(1);
        let mut scored: Vec<(usize, &str)> = self
            .entries
            .iter()
            .map(|entry| (levenshtein(name, &entry.name), entry.name.as_str()))
            .filter(|(distance, _)| *distance <= max_distance)
            .collect();
        scored.sort();
        scored.into_iter().take(3).map(|(_, candidate)| candidate.to_string()).collect()
    }
}

impl RegistryLookup for StaticRegistry {
    fn lookup(&self, name: &str) -> Result<Option<RegistryEntry>> {
        Ok(self.get(name).cloned())
    }
}

fn validate_entry(entry: &RegistryEntry) -> Result<(), KitpmError> {
    if entry.name.trim().is_empty() {
        return Err(KitpmError::RegistryIndexInvalid {
            reason: "item with an empty name".to_string(),
        });
    }

    for file in &entry.files {
        if !is_safe_relative_path(&file.path) {
            return Err(KitpmError::RegistryIndexInvalid {
                reason: format!("item '{}' declares unsafe file path '{}'", entry.name, file.path),
            });
        }
    }

    if entry.dependencies.iter().any(|dep| dep.trim().is_empty()) {
        return Err(KitpmError::RegistryIndexInvalid {
            reason: format!("item '{}' declares an empty dependency name", entry.name),
        });
    }

    Ok(())
}

/// A path is safe when it is non-empty, relative and never climbs out with `..`.
pub(crate) fn is_safe_relative_path(path: &str) -> bool {
    if path.trim().is_empty() || path.starts_with('/') || path.starts_with('\\') {
        return false;
    }
    Path::new(path).components().all(|component| matches!(component, Component::Normal(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = r#"
[[items]]
name = "button"
description = "A button"
[[items.files]]
path = "primitives/button.tsx"

[[items]]
name = "modal"
dependencies = ["button", "shared/utils"]
[[items.files]]
path = "primitives/modal.tsx"
source = "src/modal.tsx"

[[items]]
name = "shared/utils"
[[items.files]]
path = "shared/utils.ts"
"#;

    #[test]
    fn test_from_toml_str() {
        let registry = StaticRegistry::from_toml_str(INDEX).unwrap();
        assert_eq!(registry.len(), 3);

        let modal = registry.lookup("modal").unwrap().unwrap();
        assert_eq!(modal.dependencies, vec!["button", "shared/utils"]);
        assert_eq!(modal.files[0].remote_source_path(), "src/modal.tsx");

        let button = registry.get("button").unwrap();
        assert_eq!(button.files[0].remote_source_path(), "registry/primitives/button.tsx");
        assert_eq!(button.description.as_deref(), Some("A button"));

        assert!(registry.lookup("dialog").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = StaticRegistry::new(vec![
            RegistryEntry::new("button", &[]),
            RegistryEntry::new("button", &[]),
        ]);
        assert!(matches!(result, Err(KitpmError::RegistryIndexInvalid { .. })));
    }

    #[test]
    fn test_unsafe_paths_rejected() {
        for path in ["../escape.ts", "/etc/passwd", "", "a/../../b"] {
            let entry = RegistryEntry::new("evil", &[]).with_file(path);
            assert!(StaticRegistry::new(vec![entry]).is_err(), "path {path:?} should be rejected");
        }
    }

    #[test]
    fn test_malformed_index_rejected() {
        let result = StaticRegistry::from_toml_str("[[items]]\nname = 3");
        assert!(matches!(result, Err(KitpmError::RegistryIndexInvalid { .. })));
    }

    #[test]
    fn test_suggest() {
        let registry = StaticRegistry::from_toml_str(INDEX).unwrap();
        assert_eq!(registry.suggest("buton"), vec!["button"]);
        assert_eq!(registry.suggest("modl")[0], "modal");
        assert!(registry.suggest("completely-different").is_empty());
    }
}
