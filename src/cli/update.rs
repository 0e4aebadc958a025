//! Re-apply upstream content to installed items.
//!
//! ```bash
//! kitpm update                  # every installed item, at the pinned ref
//! kitpm update button --ref v2  # one item and its dependencies, at v2
//! kitpm update --force          # overwrite local edits without asking
//! kitpm update --format json    # machine-readable report
//! ```
//!
//! Files edited since install are conflicts. On a terminal each conflict is
//! asked about; without one the local file is kept. The project ref only moves
//! when the whole run succeeds.

use anyhow::{Result, anyhow};
use clap::Args;
use colored::Colorize;
use tracing::debug;

use super::common::{
    CommandContext, OutputFormat, canonical_names, ensure_resolvable, fetch_plan, fetch_registry,
    terminal_decision,
};
use crate::core::KitpmError;
use crate::installer::InstallSettings;
use crate::resolver::{DependencyResolver, installation_order};
use crate::update::{
    ComponentUpdateStatus, ConflictPrompt, Decision, FileStatus, SkipReason, UpdateEngine, UpdateOptions, UpdateReport,
};
use crate::utils::ProjectLock;
use crate::workspace::FsWorkspace;

/// Update installed items.
#[derive(Args, Debug, Clone, Default)]
pub struct UpdateCommand {
    /// Items to update (default: every installed item)
    #[arg(value_name = "ITEM")]
    pub items: Vec<String>,

    /// Target ref (default: the project's ref)
    #[arg(long = "ref", value_name = "REF")]
    pub git_ref: Option<String>,

    /// Overwrite locally modified files without asking
    #[arg(short, long)]
    pub force: bool,

    /// Report what would change without writing anything
    #[arg(long)]
    pub dry_run: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

impl UpdateCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let _lock = ProjectLock::acquire_with_timeout(&ctx.project_dir, "project", ctx.config.lock_timeout())
            .await?;
        let mut ledger = ctx.require_ledger()?;

        let names: Vec<String> = if self.items.is_empty() {
            ledger.installed.iter().map(|entry| entry.name.clone()).collect()
        } else {
            canonical_names(&self.items)?
        };
        if let Some(name) = names.iter().find(|name| !ledger.is_installed(name)) {
            return Err(KitpmError::NotInstalled {
                name: name.clone(),
            }
            .into());
        }
        if names.is_empty() {
            println!("Nothing installed");
            return Ok(());
        }

        let target = self.git_ref.clone().unwrap_or_else(|| ledger.git_ref.clone());
        let service = ctx.fetch_service(&ledger)?;
        let registry = fetch_registry(&service, &target).await?;

        let resolution = DependencyResolver::new(&registry).resolve_names(&names)?;
        ensure_resolvable(&resolution, &registry)?;
        debug!("Update order at {}: {}", target, installation_order(&resolution).join(", "));
        let plan = resolution.resolved;

        let fetched = fetch_plan(&service, &plan, &target, ctx.config.fetch_concurrency).await;

        let workspace = FsWorkspace::new(&ctx.project_dir).with_dry_run(self.dry_run);
        let engine = UpdateEngine::new(
            &workspace,
            InstallSettings::from_ledger(&ledger).with_ref(&target),
            UpdateOptions {
                force: self.force,
                context_lines: ctx.config.diff_context_lines,
                ..UpdateOptions::default()
            },
        );

        let interactive = self.format == OutputFormat::Text;
        let mut decide = |prompt: &ConflictPrompt<'_>| {
            if interactive { terminal_decision(prompt) } else { Decision::Keep }
        };
        // Conflict prompts block on stdin
        let report = tokio::task::block_in_place(|| engine.run(&plan, &fetched, &mut ledger, &mut decide));

        if !self.dry_run {
            ctx.store.save(&ledger)?;
        }

        match self.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "target_ref": report.target_ref,
                    "dry_run": self.dry_run,
                    "components": report.components,
                    "totals": report.totals(),
                    "exit_code": report.exit_code(),
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Text => print_report(&report, self.dry_run),
        }

        if report.has_errors() {
            return Err(anyhow!("update finished with {} error(s)", report.totals().errors));
        }
        Ok(())
    }
}

fn print_report(report: &UpdateReport, dry_run: bool) {
    for component in &report.components {
        print_component(component);
    }

    let totals = report.totals();
    println!();
    println!(
        "{}{} updated, {} created, {} unchanged or kept, {} conflict(s), {} error(s)",
        if dry_run { "[dry-run] " } else { "" },
        totals.updated,
        totals.created,
        totals.skipped,
        totals.conflicts,
        totals.errors
    );
}

fn print_component(component: &ComponentUpdateStatus) {
    let versions = match &component.current_version {
        Some(current) if *current != component.target_version => {
            format!("{current} → {}", component.target_version)
        }
        Some(current) => current.clone(),
        None => format!("new at {}", component.target_version),
    };
    println!("{} ({})", component.component_name.bold(), versions.dimmed());

    if let Some(error) = &component.error {
        println!("  {} {}", "✗".red(), error);
        return;
    }

    for file in &component.files {
        let label = match (file.status, file.skip_reason) {
            (FileStatus::Updated, _) => "updated".green(),
            (FileStatus::Created, _) => "created".green(),
            (FileStatus::Skipped, Some(SkipReason::KeptLocal)) => "kept local".yellow(),
            (FileStatus::Skipped, _) => "unchanged".dimmed(),
            (FileStatus::Conflict, _) => "conflict".yellow(),
            (FileStatus::Error, _) => "error".red(),
        };
        let summary = file.diff_summary.map(|s| format!(" (+{} -{})", s.added, s.removed)).unwrap_or_default();
        println!("  {label:>10} {}{}", file.path, summary.dimmed());
        if let Some(error) = &file.error {
            println!("             {}", error.red());
        }
    }

    if component.skipped {
        println!("  {}", "skipped by request".yellow());
    }
}
