//! Uninstall items.
//!
//! ```bash
//! kitpm remove modal
//! kitpm remove modal --force   # also delete files edited since install
//! ```
//!
//! Only files whose content still matches the checksum recorded at install are
//! deleted; edited files stay unless `--force` is given. The ledger entry is
//! always removed.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::collections::HashSet;
use tracing::debug;

use super::common::{CommandContext, canonical_names};
use crate::core::KitpmError;
use crate::ledger::Ledger;
use crate::ledger::checksum::verify_checksum;
use crate::resolver::DependencyGraph;
use crate::utils::ProjectLock;
use crate::workspace::{FsWorkspace, Workspace};

/// Remove items from the project.
#[derive(Args, Debug, Clone)]
pub struct RemoveCommand {
    #[arg(required = true, value_name = "ITEM")]
    pub items: Vec<String>,

    /// Delete files even if they were edited
    #[arg(short, long)]
    pub force: bool,

    /// Show what would be removed without changing anything
    #[arg(long)]
    pub dry_run: bool,
}

impl RemoveCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let names = canonical_names(&self.items)?;
        let _lock = ProjectLock::acquire_with_timeout(&ctx.project_dir, "project", ctx.config.lock_timeout())
            .await?;
        let mut ledger = ctx.require_ledger()?;

        if let Some(name) = names.iter().find(|name| !ledger.is_installed(name)) {
            return Err(KitpmError::NotInstalled {
                name: name.clone(),
            }
            .into());
        }

        self.warn_about_dependents(ctx, &ledger, &names).await;

        let workspace = FsWorkspace::new(&ctx.project_dir).with_dry_run(self.dry_run);
        for name in &names {
            let Some(entry) = ledger.remove_entry(name) else {
                continue;
            };

            let mut kept = Vec::new();
            for recorded in &entry.checksums {
                let Some(local) = workspace.read(&recorded.path)? else {
                    continue;
                };
                if self.force || (!entry.modified && verify_checksum(&local, &recorded.checksum)) {
                    workspace.remove(&recorded.path)?;
                    debug!("Removed {}", recorded.path);
                } else {
                    kept.push(recorded.path.as_str());
                }
            }

            println!("{} Removed {}", "✓".green(), name.bold());
            for path in kept {
                println!("    {} {} (edited locally, use --force to delete)", "kept".yellow(), path);
            }
        }

        if !self.dry_run {
            ctx.store.save(&ledger)?;
        }
        Ok(())
    }

    /// Warn when installed items that stay depend on the ones being removed.
    ///
    /// Needs the registry index; when it cannot be fetched the check is skipped.
    async fn warn_about_dependents(&self, ctx: &CommandContext, ledger: &Ledger, names: &[String]) {
        let Ok(service) = ctx.fetch_service(ledger) else {
            return;
        };
        let registry = match service.fetch_index(&ledger.git_ref).await {
            Ok(registry) => registry,
            Err(e) => {
                debug!("Skipping dependent check: {}", e);
                return;
            }
        };

        let graph = DependencyGraph::from_entries(registry.entries());
        let removing: HashSet<&str> = names.iter().map(String::as_str).collect();

        for name in names {
            let mut dependents: Vec<String> = graph
                .get_transitive_dependents(name)
                .into_iter()
                .filter(|dependent| ledger.is_installed(dependent) && !removing.contains(dependent.as_str()))
                .collect();
            if dependents.is_empty() {
                continue;
            }
            dependents.sort();
            println!(
                "{} {} is still used by {}",
                "warning:".yellow().bold(),
                name,
                dependents.join(", ")
            );
        }
    }
}
