//! Bring `kitpm.toml` up to the current schema.
//!
//! Every command migrates the ledger on load; this command does it on its own
//! and shows what changed.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::common::CommandContext;
use crate::core::{ErrorContext, KitpmError};
use crate::utils::ProjectLock;

/// Migrate the project ledger.
#[derive(Args, Debug, Clone, Default)]
pub struct MigrateCommand {}

impl MigrateCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let _lock = ProjectLock::acquire_with_timeout(&ctx.project_dir, "project", ctx.config.lock_timeout())
            .await?;

        let Some(outcome) = ctx.store.load_migrated()? else {
            return Err(ErrorContext::new(KitpmError::LedgerNotFound {
                path: ctx.store.path().display().to_string(),
            })
            .with_suggestion("Run 'kitpm init' to create one")
            .into());
        };

        if !outcome.migrated {
            println!("{} Ledger is already at schema version {}", "✓".green(), outcome.ledger.schema_version);
            return Ok(());
        }

        println!("{} Migrated {}", "✓".green(), ctx.store.path().display());
        for change in &outcome.changes {
            println!("  {} {}", "•".cyan(), change);
        }
        Ok(())
    }
}
