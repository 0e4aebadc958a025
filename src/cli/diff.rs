//! Show how installed files differ from upstream, without changing anything.
//!
//! ```bash
//! kitpm diff                 # every installed item against the pinned ref
//! kitpm diff button --ref v2
//! ```

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::common::{CommandContext, canonical_names, fetch_plan, fetch_registry, print_diff};
use crate::core::KitpmError;
use crate::installer::InstallSettings;
use crate::registry::RegistryEntry;
use crate::update::{UpdateEngine, UpdateOptions};
use crate::workspace::FsWorkspace;

/// Diff installed items against upstream.
#[derive(Args, Debug, Clone, Default)]
pub struct DiffCommand {
    /// Items to compare (default: every installed item)
    #[arg(value_name = "ITEM")]
    pub items: Vec<String>,

    /// Ref to compare against (default: the project's ref)
    #[arg(long = "ref", value_name = "REF")]
    pub git_ref: Option<String>,

    /// Context lines around each change
    #[arg(short = 'U', long)]
    pub context: Option<usize>,
}

impl DiffCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let ledger = ctx.require_ledger()?;
        let names: Vec<String> = if self.items.is_empty() {
            ledger.installed.iter().map(|entry| entry.name.clone()).collect()
        } else {
            canonical_names(&self.items)?
        };

        let target = self.git_ref.clone().unwrap_or_else(|| ledger.git_ref.clone());
        let service = ctx.fetch_service(&ledger)?;
        let registry = fetch_registry(&service, &target).await?;

        let entries = names
            .iter()
            .map(|name| {
                registry.get(name).cloned().ok_or_else(|| KitpmError::ItemNotFound {
                    name: name.clone(),
                })
            })
            .collect::<Result<Vec<RegistryEntry>, _>>()?;

        let fetched = fetch_plan(&service, &entries, &target, ctx.config.fetch_concurrency).await;

        let context_lines = self.context.unwrap_or(ctx.config.diff_context_lines);
        let workspace = FsWorkspace::new(&ctx.project_dir).with_dry_run(true);
        let engine = UpdateEngine::new(
            &workspace,
            InstallSettings::from_ledger(&ledger).with_ref(&target),
            UpdateOptions::default(),
        );

        let mut differing = 0usize;
        for entry in &entries {
            let item = match fetched.get(&entry.name) {
                Some(Ok(item)) => item,
                Some(Err(e)) => return Err(e.clone().into()),
                None => continue,
            };

            for preview in engine.preview(item, &ledger)? {
                if preview.diff.identical {
                    continue;
                }
                differing += 1;

                let mut notes = Vec::new();
                if !preview.local_exists {
                    notes.push("missing locally".yellow().to_string());
                }
                if preview.locally_modified {
                    notes.push("locally modified".yellow().to_string());
                }
                println!(
                    "{} {}{}",
                    entry.name.bold(),
                    preview.path,
                    if notes.is_empty() { String::new() } else { format!(" ({})", notes.join(", ")) }
                );
                print_diff(&preview.diff.render_unified(
                    &format!("local/{}", preview.path),
                    &format!("upstream/{}", preview.path),
                    context_lines,
                ));
            }
        }

        if differing == 0 {
            println!("{} No differences from {}", "✓".green(), target);
        }
        Ok(())
    }
}
