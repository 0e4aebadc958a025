//! Rewriting references between registry items.
//!
//! Registry sources refer to each other with quoted `@registry/<logical path>`
//! specifiers, for example `import { cn } from "@registry/shared/utils"`. On
//! install these are rewritten to the project's layout: through the alias map,
//! then either prefixed with `import_prefix` or made relative to the importing
//! file. The rewrite is plain text substitution; sources are never parsed.

use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::sync::LazyLock;

use super::paths::{relative_import, resolve_alias_path};
use crate::constants::REGISTRY_IMPORT_MARKER;
use crate::ledger::ImportStyle;

// The quote is matched on both sides and compared in the replacer; the regex
// crate has no backreferences.
static REGISTRY_IMPORT: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(&format!(r#"(["'`]){}([^"'`\s]+)(["'`])"#, regex::escape(REGISTRY_IMPORT_MARKER)))
        .ok()
});

const STRIPPED_EXTENSIONS: &[&str] = &[".tsx", ".ts", ".jsx", ".js", ".mjs"];

/// Settings that decide how a specifier is rewritten.
#[derive(Debug, Clone, Copy)]
pub struct ImportRewrite<'a> {
    pub style: ImportStyle,
    pub prefix: &'a str,
    pub aliases: &'a BTreeMap<String, String>,
}

impl ImportRewrite<'_> {
    /// Rewrite every registry specifier in `source`, which will be written to
    /// the project-relative path `target_path`.
    #[must_use]
    pub fn apply(&self, source: &str, target_path: &str) -> String {
        let Some(pattern) = REGISTRY_IMPORT.as_ref() else {
            return source.to_string();
        };
        pattern
            .replace_all(source, |caps: &Captures<'_>| {
                if caps[1] != caps[3] {
                    return caps[0].to_string();
                }
                let quote = &caps[1];
                format!("{quote}{}{quote}", self.specifier_for(&caps[2], target_path))
            })
            .into_owned()
    }

    fn specifier_for(&self, logical: &str, target_path: &str) -> String {
        let resolved = resolve_alias_path(logical, self.aliases);
        let resolved = strip_code_extension(&resolved);

        match self.style {
            ImportStyle::Alias => format!("{}{resolved}", self.prefix),
            ImportStyle::Relative => relative_import(target_path, resolved),
        }
    }
}

fn strip_code_extension(path: &str) -> &str {
    STRIPPED_EXTENSIONS.iter().find_map(|ext| path.strip_suffix(ext)).unwrap_or(path)
}

/// Rewrite registry specifiers in `content` when it is UTF-8 text.
///
/// Non-text content is returned unchanged.
#[must_use]
pub fn rewrite_content(content: &[u8], target_path: &str, rewrite: &ImportRewrite<'_>) -> Vec<u8> {
    match std::str::from_utf8(content) {
        Ok(text) if text.contains(REGISTRY_IMPORT_MARKER) => {
            rewrite.apply(text, target_path).into_bytes()
        }
        _ => content.to_vec(),
    }
}
