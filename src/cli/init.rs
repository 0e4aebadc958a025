//! Create a `kitpm.toml` ledger for a project.
//!
//! ```bash
//! kitpm init
//! kitpm init --ref v1.4.0 --import-style relative
//! kitpm init --source ../my-registry
//! ```

use anyhow::{Result, anyhow};
use clap::Args;
use colored::Colorize;

use super::common::{CommandContext, display_path};
use crate::ledger::{ImportStyle, Ledger};

/// Initialize a project.
#[derive(Args, Debug, Clone, Default)]
pub struct InitCommand {
    /// Upstream ref to pin
    #[arg(long = "ref", value_name = "REF")]
    pub git_ref: Option<String>,

    /// URL template with {ref} and {path}, or a local registry directory
    #[arg(long)]
    pub source: Option<String>,

    /// How registry imports are rewritten
    #[arg(long, value_name = "STYLE")]
    pub import_style: Option<ImportStyle>,

    /// Prefix used by alias-style imports
    #[arg(long)]
    pub import_prefix: Option<String>,

    /// Replace an existing ledger, dropping its installed entries
    #[arg(short, long)]
    pub force: bool,
}

impl InitCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        if ctx.store.exists() && !self.force {
            return Err(anyhow!(
                "{} already exists (use --force to overwrite)",
                display_path(ctx.store.path(), &ctx.project_dir)
            ));
        }

        let mut ledger = Ledger::default();
        if let Some(git_ref) = self.git_ref {
            ledger.git_ref = git_ref;
        }
        if let Some(source) = self.source {
            ledger.source = source;
        }
        if let Some(style) = self.import_style {
            ledger.import_style = style;
        }
        if let Some(prefix) = self.import_prefix {
            ledger.import_prefix = prefix;
        }

        ctx.store.save(&ledger)?;
        println!(
            "{} Created {} (ref {})",
            "✓".green(),
            display_path(ctx.store.path(), &ctx.project_dir),
            ledger.git_ref
        );
        Ok(())
    }
}
