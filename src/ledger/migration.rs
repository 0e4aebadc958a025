//! Forward migration of raw ledger data.
//!
//! Migration works on the parsed-but-untyped TOML table so it can see which
//! keys are missing or malformed before serde fills anything in. It only ever
//! adds: absent fields get their defaults, an unrecognized `import_style` is
//! reset to `alias`, and every such fix is described in
//! [`MigrationOutcome::changes`]. Keys it does not understand are moved into the
//! `extra` tables of [`Ledger`] and [`LedgerEntry`] and written back verbatim.
//!
//! Running migration on its own output produces no changes.

use toml::{Table, Value};
use tracing::debug;

use super::{Ledger, LedgerEntry, default_aliases};
use crate::constants::{
    CURRENT_SCHEMA_VERSION, DEFAULT_IMPORT_PREFIX, DEFAULT_REF, DEFAULT_SOURCE,
};
use crate::core::KitpmError;

const LEDGER_KEYS: &[&str] =
    &["schema_version", "ref", "import_style", "source", "import_prefix", "aliases", "installed"];

const ENTRY_KEYS: &[&str] = &["name", "version", "installed_at", "modified", "checksums"];

/// Result of migrating a raw ledger.
#[derive(Debug, Clone)]
pub struct MigrationOutcome {
    /// Whether anything had to change
    pub migrated: bool,
    /// Human-readable description of each change
    pub changes: Vec<String>,
    pub ledger: Ledger,
}

/// Migrate a raw ledger table to the current schema.
///
/// `file` names the ledger in error messages.
///
/// # Errors
///
/// - [`KitpmError::LedgerVersionTooNew`] when the ledger was written by a newer kitpm
/// - [`KitpmError::LedgerCorruption`] when a field cannot be interpreted at all
///   (for example `installed` is not a list, or an entry has no name)
pub fn migrate(mut raw: Table, file: &str) -> Result<MigrationOutcome, KitpmError> {
    let mut changes = Vec::new();
    let corrupt = |reason: String| KitpmError::LedgerCorruption {
        file: file.to_string(),
        reason,
    };

    match raw.get("schema_version") {
        None => {
            changes.push(format!("Added schema_version = {CURRENT_SCHEMA_VERSION}"));
        }
        Some(Value::Integer(found)) => {
            let found = u32::try_from(*found)
                .map_err(|_| corrupt(format!("invalid schema_version {found}")))?;
            if found > CURRENT_SCHEMA_VERSION {
                return Err(KitpmError::LedgerVersionTooNew {
                    found,
                    supported: CURRENT_SCHEMA_VERSION,
                });
            }
            if found < CURRENT_SCHEMA_VERSION {
                changes.push(format!(
                    "Upgraded schema_version from {found} to {CURRENT_SCHEMA_VERSION}"
                ));
            }
        }
        Some(other) => {
            return Err(corrupt(format!("schema_version must be an integer, found {}", other.type_str())));
        }
    }
    raw.insert("schema_version".to_string(), Value::Integer(i64::from(CURRENT_SCHEMA_VERSION)));

    fill_string(&mut raw, "ref", DEFAULT_REF, &mut changes);
    fill_string(&mut raw, "source", DEFAULT_SOURCE, &mut changes);
    fill_string(&mut raw, "import_prefix", DEFAULT_IMPORT_PREFIX, &mut changes);

    match raw.get("import_style") {
        None => {
            changes.push("Added import_style = \"alias\"".to_string());
            raw.insert("import_style".to_string(), Value::String("alias".to_string()));
        }
        Some(Value::String(style)) if style == "alias" || style == "relative" => {}
        Some(other) => {
            changes.push(format!("Reset invalid import_style {other} to \"alias\""));
            raw.insert("import_style".to_string(), Value::String("alias".to_string()));
        }
    }

    migrate_aliases(&mut raw, &mut changes).map_err(corrupt)?;

    let entries = match raw.remove("installed") {
        None => {
            changes.push("Added empty installed list".to_string());
            Vec::new()
        }
        Some(Value::Array(values)) => values,
        Some(other) => {
            return Err(corrupt(format!("installed must be a list, found {}", other.type_str())));
        }
    };

    let git_ref = raw.get("ref").and_then(Value::as_str).unwrap_or(DEFAULT_REF).to_string();
    let mut installed = Vec::with_capacity(entries.len());
    for (position, value) in entries.into_iter().enumerate() {
        let Value::Table(table) = value else {
            return Err(corrupt(format!("installed[{position}] is not a table")));
        };
        installed.push(migrate_entry(table, position, &git_ref, &mut changes).map_err(corrupt)?);
    }

    let (known, extra) = split_known(raw, LEDGER_KEYS);
    let mut ledger: Ledger =
        Value::Table(known).try_into().map_err(|e: toml::de::Error| corrupt(e.message().to_string()))?;
    ledger.installed = installed;
    ledger.extra = extra;

    for change in &changes {
        debug!("Ledger migration: {}", change);
    }

    Ok(MigrationOutcome {
        migrated: !changes.is_empty(),
        changes,
        ledger,
    })
}

fn fill_string(raw: &mut Table, key: &str, default: &str, changes: &mut Vec<String>) {
    match raw.get(key) {
        Some(Value::String(_)) => {}
        Some(other) => {
            changes.push(format!("Reset invalid {key} {other} to \"{default}\""));
            raw.insert(key.to_string(), Value::String(default.to_string()));
        }
        None => {
            changes.push(format!("Added {key} = \"{default}\""));
            raw.insert(key.to_string(), Value::String(default.to_string()));
        }
    }
}

fn migrate_aliases(raw: &mut Table, changes: &mut Vec<String>) -> Result<(), String> {
    let aliases = match raw.entry("aliases".to_string()).or_insert_with(|| {
        changes.push("Added default aliases".to_string());
        Value::Table(
            default_aliases().into_iter().map(|(k, v)| (k, Value::String(v))).collect(),
        )
    }) {
        Value::Table(table) => table,
        other => return Err(format!("aliases must be a table, found {}", other.type_str())),
    };

    for (alias, target) in default_aliases() {
        if !aliases.contains_key(&alias) {
            changes.push(format!("Added alias {alias} = \"{target}\""));
            aliases.insert(alias, Value::String(target));
        }
    }

    if let Some((alias, _)) = aliases.iter().find(|(_, target)| !target.is_str()) {
        return Err(format!("alias '{alias}' must map to a string"));
    }

    Ok(())
}

/// Recorded for entries whose install time was never written down.
const UNKNOWN_INSTALL_TIME: &str = "1970-01-01T00:00:00Z";

fn migrate_entry(
    mut table: Table,
    position: usize,
    git_ref: &str,
    changes: &mut Vec<String>,
) -> Result<LedgerEntry, String> {
    let label = match table.get("name").and_then(Value::as_str) {
        Some(name) => name.to_string(),
        None => return Err(format!("installed[{position}] has no name")),
    };

    if !table.contains_key("version") {
        changes.push(format!("Added version = \"{git_ref}\" to '{label}'"));
        table.insert("version".to_string(), Value::String(git_ref.to_string()));
    }
    if !table.contains_key("installed_at") {
        changes.push(format!("Added installed_at = \"{UNKNOWN_INSTALL_TIME}\" to '{label}'"));
        table.insert("installed_at".to_string(), Value::String(UNKNOWN_INSTALL_TIME.to_string()));
    }

    if !table.contains_key("modified") {
        changes.push(format!("Added modified = false to '{label}'"));
        table.insert("modified".to_string(), Value::Boolean(false));
    }
    if !table.contains_key("checksums") {
        changes.push(format!("Added empty checksums to '{label}'"));
        table.insert("checksums".to_string(), Value::Array(Vec::new()));
    }

    let (known, extra) = split_known(table, ENTRY_KEYS);
    let mut entry: LedgerEntry = Value::Table(known)
        .try_into()
        .map_err(|e: toml::de::Error| format!("installed entry '{label}': {}", e.message()))?;
    entry.extra = extra;
    Ok(entry)
}

/// Split a table into the keys in `known` and everything else.
fn split_known(table: Table, known: &[&str]) -> (Table, Table) {
    table.into_iter().partition(|(key, _)| known.contains(&key.as_str()))
}
