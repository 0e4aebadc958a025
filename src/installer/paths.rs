//! Mapping logical registry paths to project paths.

use std::collections::BTreeMap;

/// Resolve a logical registry path through the alias map.
///
/// The longest alias that matches on a `/` boundary wins; with no match the
/// logical path is used as-is.
///
/// ```rust
/// use kitpm_cli::installer::paths::resolve_alias_path;
/// use std::collections::BTreeMap;
///
/// let aliases = BTreeMap::from([
///     ("primitives".to_string(), "components/ui".to_string()),
///     ("primitives/forms".to_string(), "components/forms".to_string()),
/// ]);
///
/// assert_eq!(resolve_alias_path("primitives/button.tsx", &aliases), "components/ui/button.tsx");
/// assert_eq!(resolve_alias_path("primitives/forms/input.tsx", &aliases), "components/forms/input.tsx");
/// assert_eq!(resolve_alias_path("hooks/use-toast.ts", &aliases), "hooks/use-toast.ts");
/// ```
#[must_use]
pub fn resolve_alias_path(logical: &str, aliases: &BTreeMap<String, String>) -> String {
    let best = aliases
        .iter()
        .filter_map(|(alias, target)| {
            let alias = alias.trim_end_matches('/');
            let rest = logical.strip_prefix(alias)?;
            if rest.is_empty() {
                Some((alias.len(), target.trim_end_matches('/').to_string()))
            } else {
                rest.strip_prefix('/').map(|rest| {
                    let target = target.trim_end_matches('/');
                    let joined = if target.is_empty() {
                        rest.to_string()
                    } else {
                        format!("{target}/{rest}")
                    };
                    (alias.len(), joined)
                })
            }
        })
        .max_by_key(|(len, _)| *len);

    best.map_or_else(|| logical.to_string(), |(_, resolved)| resolved)
}

/// Relative import specifier from the file at `from_file` to `to_path`.
///
/// Both paths are project-relative and `/`-separated. The result always starts
/// with `./` or `../`.
#[must_use]
pub fn relative_import(from_file: &str, to_path: &str) -> String {
    let from_dir: Vec<&str> = match from_file.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').filter(|s| !s.is_empty()).collect(),
        None => Vec::new(),
    };
    let target: Vec<&str> = to_path.split('/').filter(|s| !s.is_empty()).collect();

    let common = from_dir.iter().zip(&target).take_while(|(a, b)| a == b).count();
    let ups = from_dir.len() - common;
    let rest = target[common..].join("/");

    if ups == 0 {
        format!("./{rest}")
    } else {
        format!("{}{rest}", "../".repeat(ups))
    }
}
