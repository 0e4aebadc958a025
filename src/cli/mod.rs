//! Command-line interface for kitpm.
//!
//! Each command lives in its own module with its clap arguments and an
//! `execute` method taking the shared [`CommandContext`](common::CommandContext).
//!
//! # Commands
//!
//! - `init` - create `kitpm.toml`
//! - `add` - install items and their dependencies
//! - `update` - re-apply upstream content, asking about local edits
//! - `diff` - show upstream-vs-local differences without writing
//! - `remove` - uninstall items
//! - `list` - show installed items
//! - `tree` - show dependency trees
//! - `migrate` - upgrade `kitpm.toml` to the current schema
//!
//! # Global Options
//!
//! - `--verbose` / `--quiet` - log level (overridden by `RUST_LOG`)
//! - `--no-progress` - hide progress bars
//! - `--config <PATH>` - global config file (also `KITPM_CONFIG`)
//! - `--project-dir <DIR>` - project root (default: current directory)
//!
//! # Example
//!
//! ```bash
//! kitpm init --ref v1.4.0
//! kitpm add patterns/login-form
//! kitpm update --ref v1.5.0
//! ```

pub mod add;
pub mod common;
pub mod diff;
pub mod init;
pub mod list;
pub mod migrate;
pub mod remove;
pub mod tree;
pub mod update;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::utils::progress::disable_progress;
use common::CommandContext;

/// Kit Package Manager: install UI kit components from a version-pinned registry.
#[derive(Parser, Debug)]
#[command(
    name = "kitpm",
    version,
    about = "Kit Package Manager - install UI kit components from a version-pinned registry",
    long_about = "kitpm copies components from a registry into your project, rewrites their \
                  imports for your layout, and keeps track of what it installed so later \
                  updates never silently overwrite your edits."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Show debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only show errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable progress bars and spinners
    #[arg(long, global = true)]
    no_progress: bool,

    /// Path to the global config file
    #[arg(long, global = true, env = "KITPM_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Project root directory
    #[arg(long, global = true, value_name = "DIR")]
    project_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a kitpm.toml ledger in the project
    Init(init::InitCommand),

    /// Install items and their dependencies
    Add(add::AddCommand),

    /// Update installed items from upstream
    Update(update::UpdateCommand),

    /// Show differences between installed files and upstream
    Diff(diff::DiffCommand),

    /// Uninstall items
    Remove(remove::RemoveCommand),

    /// List installed items
    List(list::ListCommand),

    /// Show the dependency tree of items
    Tree(tree::TreeCommand),

    /// Migrate kitpm.toml to the current schema
    Migrate(migrate::MigrateCommand),
}

impl Cli {
    /// Log filter for this invocation: `RUST_LOG` wins, then the flags.
    #[must_use]
    pub fn log_filter(&self) -> EnvFilter {
        if std::env::var_os("RUST_LOG").is_some() {
            return EnvFilter::from_default_env();
        }
        let level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        };
        EnvFilter::new(level)
    }

    /// Initialize logging to stderr.
    pub fn init_logging(&self) {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(self.log_filter())
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }

    /// Run the selected command.
    pub async fn execute(self) -> Result<()> {
        if self.no_progress || self.quiet {
            disable_progress();
        }

        let ctx = CommandContext::new(self.project_dir, self.config).await?;

        match self.command {
            Commands::Init(cmd) => cmd.execute(&ctx).await,
            Commands::Add(cmd) => cmd.execute(&ctx).await,
            Commands::Update(cmd) => cmd.execute(&ctx).await,
            Commands::Diff(cmd) => cmd.execute(&ctx).await,
            Commands::Remove(cmd) => cmd.execute(&ctx).await,
            Commands::List(cmd) => cmd.execute(&ctx).await,
            Commands::Tree(cmd) => cmd.execute(&ctx).await,
            Commands::Migrate(cmd) => cmd.execute(&ctx).await,
        }
    }
}
