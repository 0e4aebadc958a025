//! Shared plumbing for CLI commands: project context, upstream access,
//! resolution checks and the interactive conflict prompt.

use anyhow::{Context, Result};
use clap::ValueEnum;
use colored::Colorize;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::config::GlobalConfig;
use crate::core::{ErrorContext, KitpmError};
use crate::fetch::{FetchResults, FetchService, Source};
use crate::ledger::{Ledger, LedgerStore};
use crate::registry::{RegistryEntry, StaticRegistry};
use crate::resolver::ResolutionResult;
use crate::update::{ConflictPrompt, Decision};
use crate::utils::progress::{ProgressBar, spinner_with_message};

/// Output format for commands with machine-readable output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Everything a command needs to know about where it runs.
#[derive(Debug)]
pub struct CommandContext {
    pub project_dir: PathBuf,
    pub store: LedgerStore,
    pub config: GlobalConfig,
}

impl CommandContext {
    pub async fn new(project_dir: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<Self> {
        let project_dir = match project_dir {
            Some(dir) => dir,
            None => std::env::current_dir().context("Failed to determine current directory")?,
        };
        let config = GlobalConfig::load_with_optional(config_path).await?;

        Ok(Self {
            store: LedgerStore::new(&project_dir),
            project_dir,
            config,
        })
    }

    /// Load the ledger, migrating it first and reporting what changed.
    pub fn load_ledger(&self) -> Result<Option<Ledger>> {
        let Some(outcome) = self.store.load_migrated()? else {
            return Ok(None);
        };
        if outcome.migrated {
            println!("{} {}", "Migrated".cyan(), self.store.path().display());
            for change in &outcome.changes {
                println!("  {} {}", "•".cyan(), change);
            }
        }
        Ok(Some(outcome.ledger))
    }

    /// Like [`load_ledger`](Self::load_ledger), failing when the project has no ledger.
    pub fn require_ledger(&self) -> Result<Ledger> {
        self.load_ledger()?.ok_or_else(|| {
            ErrorContext::new(KitpmError::LedgerNotFound {
                path: self.store.path().display().to_string(),
            })
            .with_suggestion("Run 'kitpm init' or 'kitpm add <item>' first")
            .into()
        })
    }

    /// Fetch service for the ledger's upstream source.
    pub fn fetch_service(&self, ledger: &Ledger) -> Result<FetchService<Source>> {
        let source = Source::from_setting(&ledger.source, &self.project_dir)
            .with_context(|| format!("Invalid source '{}'", ledger.source))?;
        Ok(FetchService::new(source).with_retries(self.config.fetch_retries))
    }
}

/// Fetch the registry index with a spinner.
pub async fn fetch_registry(service: &FetchService<Source>, git_ref: &str) -> Result<StaticRegistry> {
    let spinner = spinner_with_message(format!("Fetching registry index at {git_ref}"));
    let registry = service.fetch_index(git_ref).await;
    spinner.finish_and_clear();
    Ok(registry?)
}

/// Fetch every entry of `plan` with a progress bar.
pub async fn fetch_plan(
    service: &FetchService<Source>,
    plan: &[RegistryEntry],
    git_ref: &str,
    concurrency: usize,
) -> FetchResults {
    let progress = ProgressBar::new(plan.len() as u64);
    progress.set_prefix("Fetching");
    let results = service.fetch_all(plan, git_ref, concurrency, Some(&progress)).await;
    progress.finish_and_clear();
    results
}

/// Turn cycles and missing items of a resolution into a user-facing error.
///
/// Unknown top-level items come with "did you mean" suggestions.
pub fn ensure_resolvable(result: &ResolutionResult, registry: &StaticRegistry) -> Result<()> {
    if result.is_complete() {
        return Ok(());
    }

    if let Some(missing) = result.missing.iter().find(|m| m.requested_by.is_none()) {
        let mut context = ErrorContext::new(KitpmError::ItemNotFound {
            name: missing.name.clone(),
        });
        let suggestions = registry.suggest(&missing.name);
        if !suggestions.is_empty() {
            context = context.with_suggestion(format!("Did you mean: {}?", suggestions.join(", ")));
        }
        return Err(context.into());
    }

    if let Some(missing) = result.missing.first() {
        return Err(KitpmError::MissingDependency {
            requested_by: missing.requested_by.clone().unwrap_or_default(),
            name: missing.name.clone(),
        }
        .into());
    }

    if let Some(chain) = result.cycle_chains().into_iter().next() {
        return Err(KitpmError::CircularDependency {
            chain,
        }
        .into());
    }

    Ok(())
}

/// Decision function backed by the terminal.
///
/// Without a terminal on stdin nobody can answer, so every conflict keeps the
/// local file.
pub fn terminal_decision(prompt: &ConflictPrompt<'_>) -> Decision {
    if !io::stdin().is_terminal() {
        warn!("{}: conflict in {} kept (no terminal to ask)", prompt.component, prompt.path);
        return Decision::Keep;
    }

    if let Some(diff) = prompt.rendered_diff {
        print_diff(diff);
    }

    println!(
        "{} {} in {} has local changes ({})",
        "conflict:".yellow().bold(),
        prompt.path,
        prompt.component,
        prompt.diff.summary()
    );

    loop {
        print!("  [k]eep local, [o]verwrite, [s]kip component, show [d]iff? ");
        if io::stdout().flush().is_err() {
            return Decision::Keep;
        }

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(0) | Err(_) => return Decision::Keep,
            Ok(_) => {}
        }

        if let Some(decision) = parse_decision(&answer) {
            return decision;
        }
        println!("  {}", "Please answer k, o, s or d".dimmed());
    }
}

fn parse_decision(answer: &str) -> Option<Decision> {
    match answer.trim().to_lowercase().as_str() {
        "k" | "keep" => Some(Decision::Keep),
        "o" | "overwrite" => Some(Decision::Overwrite),
        "s" | "skip" => Some(Decision::SkipComponent),
        "d" | "diff" => Some(Decision::ShowDiff),
        _ => None,
    }
}

/// Print a unified diff with colors.
pub fn print_diff(diff: &str) {
    for line in diff.lines() {
        if line.starts_with("+++") || line.starts_with("---") {
            println!("{}", line.bold());
        } else if line.starts_with("@@") {
            println!("{}", line.cyan());
        } else if line.starts_with('+') {
            println!("{}", line.green());
        } else if line.starts_with('-') {
            println!("{}", line.red());
        } else {
            println!("{line}");
        }
    }
}

/// Canonical names for a command's item arguments.
pub fn canonical_names(raw: &[String]) -> Result<Vec<String>> {
    Ok(crate::core::parse_items(raw)?.items.iter().map(|item| item.canonical_name()).collect())
}

/// `path` relative to `base` for display, falling back to the full path.
pub fn display_path(path: &Path, base: &Path) -> String {
    path.strip_prefix(base).unwrap_or(path).display().to_string()
}
