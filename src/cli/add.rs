//! Install registry items and their dependencies.
//!
//! ```bash
//! kitpm add button
//! kitpm add patterns/login-form faces/landing
//! kitpm add modal --dry-run
//! ```
//!
//! Items are resolved against the registry index at the project's ref. Any
//! unknown item, missing dependency or cycle aborts before anything is
//! fetched. Items already in the ledger are left alone; `kitpm update` is the
//! way to change them. If any remaining item fails to fetch, nothing is
//! written.

use anyhow::{Result, anyhow};
use clap::Args;
use colored::Colorize;
use tracing::info;

use super::common::{CommandContext, canonical_names, ensure_resolvable, fetch_plan, fetch_registry};
use crate::installer::{InstallSettings, Installer};
use crate::registry::RegistryEntry;
use crate::resolver::DependencyResolver;
use crate::utils::ProjectLock;
use crate::workspace::FsWorkspace;

/// Add items to the project.
#[derive(Args, Debug, Clone)]
pub struct AddCommand {
    /// Items to add, e.g. `button`, `shared/utils`, `patterns/card-grid`
    #[arg(required = true, value_name = "ITEM")]
    pub items: Vec<String>,

    /// Show what would be installed without writing anything
    #[arg(long)]
    pub dry_run: bool,
}

impl AddCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let names = canonical_names(&self.items)?;
        let _lock = ProjectLock::acquire_with_timeout(&ctx.project_dir, "project", ctx.config.lock_timeout())
            .await?;

        let mut ledger = ctx.load_ledger()?.unwrap_or_default();
        let service = ctx.fetch_service(&ledger)?;
        let registry = fetch_registry(&service, &ledger.git_ref).await?;

        let resolution = DependencyResolver::new(&registry).resolve_names(&names)?;
        ensure_resolvable(&resolution, &registry)?;

        let plan: Vec<RegistryEntry> = resolution
            .resolved
            .iter()
            .filter(|entry| !ledger.is_installed(&entry.name))
            .cloned()
            .collect();

        for name in &names {
            if ledger.is_installed(name) {
                println!("{} {} is already installed (use 'kitpm update {}')", "•".dimmed(), name, name);
            }
        }
        if plan.is_empty() {
            println!("Nothing to install");
            return Ok(());
        }

        info!(
            "Installing {} item(s) at {}: {}",
            plan.len(),
            ledger.git_ref,
            plan.iter().map(|e| e.name.as_str()).collect::<Vec<_>>().join(", ")
        );
        let fetched = fetch_plan(&service, &plan, &ledger.git_ref, ctx.config.fetch_concurrency).await;

        let workspace = FsWorkspace::new(&ctx.project_dir).with_dry_run(self.dry_run);
        let installer = Installer::new(&workspace, InstallSettings::from_ledger(&ledger));
        let summary = installer.install_all(&plan, &fetched, &mut ledger)?;

        let verb = if self.dry_run { "Would install" } else { "Installed" };
        for item in &summary.installed {
            println!("{} {} {}", "✓".green(), verb, item.name.bold());
            for path in &item.written_paths {
                println!("    {}", path.dimmed());
            }
        }
        for (name, error) in &summary.failed {
            println!("{} {}: {}", "✗".red(), name.bold(), error);
        }

        if !self.dry_run && !summary.installed.is_empty() {
            ctx.store.save(&ledger)?;
        }

        if summary.is_success() {
            Ok(())
        } else {
            Err(anyhow!("{} item(s) could not be installed", summary.failed.len()))
        }
    }
}
