//! Print the dependency tree of registry items.
//!
//! ```bash
//! kitpm tree modal
//! kitpm tree              # every installed item
//! ```
//!
//! Missing dependencies and cycles are shown in the tree instead of failing.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::common::{CommandContext, canonical_names, fetch_registry};
use crate::core::KitpmError;
use crate::resolver::DependencyGraph;

/// Show dependency trees.
#[derive(Args, Debug, Clone, Default)]
pub struct TreeCommand {
    /// Root items (default: every installed item)
    #[arg(value_name = "ITEM")]
    pub items: Vec<String>,

    /// Ref to read the registry at (default: the project's ref)
    #[arg(long = "ref", value_name = "REF")]
    pub git_ref: Option<String>,
}

impl TreeCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let ledger = ctx.load_ledger()?.unwrap_or_default();
        let roots: Vec<String> = if self.items.is_empty() {
            ledger.installed.iter().map(|entry| entry.name.clone()).collect()
        } else {
            canonical_names(&self.items)?
        };
        if roots.is_empty() {
            println!("No items installed");
            return Ok(());
        }

        let target = self.git_ref.clone().unwrap_or_else(|| ledger.git_ref.clone());
        let service = ctx.fetch_service(&ledger)?;
        let registry = fetch_registry(&service, &target).await?;

        let graph = DependencyGraph::from_entries(registry.entries());
        for root in &roots {
            if !graph.contains(root) {
                return Err(KitpmError::ItemNotFound {
                    name: root.clone(),
                }
                .into());
            }
        }

        for root in &roots {
            let tree = graph.to_tree_string(root);
            for line in tree.lines() {
                if line.ends_with("(missing)") || line.ends_with("(circular reference)") {
                    println!("{}", line.yellow());
                } else {
                    println!("{line}");
                }
            }

            let total = graph.get_transitive_deps(root).into_iter().filter(|dep| dep != root).count();
            println!("{}", format!("{total} dependencies in total").dimmed());
        }
        Ok(())
    }
}
