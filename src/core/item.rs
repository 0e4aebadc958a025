//! Item references and the item-name parser.
//!
//! Users name registry items with short strings: `button`, `shared/utils`,
//! `patterns/card-grid`, `faces/landing`. This module turns those strings into
//! typed [`ItemReference`]s. The parser never deduplicates; that is the
//! resolver's job.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::KitpmError;

/// The namespace an item lives in.
///
/// Namespaces determine the item's canonical registry name and, through the
/// project's aliases, where its files land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    /// Unprefixed building blocks (`button`, `dialog`)
    Primitive,
    /// Modules shared between items (`shared/utils`)
    Shared,
    /// Composites built from primitives (`patterns/card-grid`)
    Pattern,
    /// Page-level bundles (`faces/landing`)
    Face,
}

impl Namespace {
    /// The raw-name prefix for this namespace, `None` for primitives.
    #[must_use]
    pub const fn prefix(self) -> Option<&'static str> {
        match self {
            Self::Primitive => None,
            Self::Shared => Some("shared/"),
            Self::Pattern => Some("patterns/"),
            Self::Face => Some("faces/"),
        }
    }

    /// Detect the namespace of a raw name from its prefix.
    ///
    /// Returns the namespace and the remainder after the prefix.
    fn split(raw: &str) -> (Self, &str) {
        for namespace in [Self::Shared, Self::Pattern, Self::Face] {
            if let Some(rest) = namespace.prefix().and_then(|prefix| raw.strip_prefix(prefix)) {
                return (namespace, rest);
            }
        }
        (Self::Primitive, raw)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive => write!(f, "primitive"),
            Self::Shared => write!(f, "shared"),
            Self::Pattern => write!(f, "pattern"),
            Self::Face => write!(f, "face"),
        }
    }
}

impl FromStr for Namespace {
    type Err = KitpmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "primitive" | "primitives" => Ok(Self::Primitive),
            "shared" => Ok(Self::Shared),
            "pattern" | "patterns" => Ok(Self::Pattern),
            "face" | "faces" => Ok(Self::Face),
            _ => Err(KitpmError::ConfigError {
                message: format!("Unknown namespace '{s}'"),
            }),
        }
    }
}

/// A typed reference to a registry item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemReference {
    /// Namespace derived from the raw name's prefix
    pub namespace: Namespace,
    /// Name without the namespace prefix
    pub name: String,
}

impl ItemReference {
    /// Create a reference from its parts.
    pub fn new(namespace: Namespace, name: impl Into<String>) -> Self {
        Self {
            namespace,
            name: name.into(),
        }
    }

    /// The name used for registry lookups and ledger entries.
    ///
    /// Primitives use their bare name; other namespaces keep their prefix.
    ///
    /// ```rust
    /// use kitpm_cli::core::parse_item;
    ///
    /// assert_eq!(parse_item("button").unwrap().canonical_name(), "button");
    /// assert_eq!(parse_item("shared/utils").unwrap().canonical_name(), "shared/utils");
    /// ```
    #[must_use]
    pub fn canonical_name(&self) -> String {
        match self.namespace.prefix() {
            Some(prefix) => format!("{prefix}{}", self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for ItemReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical_name())
    }
}

/// Parse a raw item name into an [`ItemReference`].
///
/// Surrounding whitespace is ignored. Fails with
/// [`KitpmError::InvalidItemName`] when nothing is left to name, which covers an
/// empty string and a bare prefix such as `shared/`.
///
/// # Examples
///
/// ```rust
/// use kitpm_cli::core::{parse_item, Namespace};
///
/// let item = parse_item("patterns/card-grid").unwrap();
/// assert_eq!(item.namespace, Namespace::Pattern);
/// assert_eq!(item.name, "card-grid");
///
/// // Unknown prefixes are part of a primitive's name
/// let item = parse_item("forms/input").unwrap();
/// assert_eq!(item.namespace, Namespace::Primitive);
/// assert_eq!(item.name, "forms/input");
/// ```
pub fn parse_item(raw: &str) -> Result<ItemReference, KitpmError> {
    let trimmed = raw.trim();
    let (namespace, name) = Namespace::split(trimmed);

    if name.is_empty() {
        return Err(KitpmError::InvalidItemName {
            raw: raw.to_string(),
        });
    }

    Ok(ItemReference::new(namespace, name))
}

/// Result of parsing a batch of raw names.
#[derive(Debug, Clone, Default)]
pub struct ParsedItems {
    /// Every parsed item, in input order, duplicates included
    pub items: Vec<ItemReference>,
    /// The same items grouped by namespace, each group in input order
    pub by_namespace: BTreeMap<Namespace, Vec<ItemReference>>,
}

/// Parse a batch of raw names, preserving order and duplicates.
///
/// The first invalid name aborts the batch with its error.
pub fn parse_items<S: AsRef<str>>(raws: &[S]) -> Result<ParsedItems, KitpmError> {
    let mut parsed = ParsedItems::default();

    for raw in raws {
        let item = parse_item(raw.as_ref())?;
        parsed.by_namespace.entry(item.namespace).or_default().push(item.clone());
        parsed.items.push(item);
    }

    Ok(parsed)
}
