//! List installed items from the ledger.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use super::common::{CommandContext, OutputFormat};

/// List installed items.
#[derive(Args, Debug, Clone, Default)]
pub struct ListCommand {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Only items flagged as locally modified
    #[arg(long)]
    pub modified: bool,
}

#[derive(Debug, Serialize)]
struct ListedItem<'a> {
    name: &'a str,
    version: &'a str,
    installed_at: String,
    modified: bool,
    files: Vec<&'a str>,
}

impl ListCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let ledger = ctx.require_ledger()?;

        let items: Vec<ListedItem<'_>> = ledger
            .installed
            .iter()
            .filter(|entry| !self.modified || entry.modified)
            .map(|entry| ListedItem {
                name: &entry.name,
                version: &entry.version,
                installed_at: entry.installed_at.to_rfc3339(),
                modified: entry.modified,
                files: entry.checksums.iter().map(|c| c.path.as_str()).collect(),
            })
            .collect();

        if self.format == OutputFormat::Json {
            let output = serde_json::json!({
                "ref": ledger.git_ref,
                "installed": items,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        if items.is_empty() {
            println!("No items installed");
            return Ok(());
        }

        println!("{} (ref {})", "Installed items".bold(), ledger.git_ref);
        for item in &items {
            let modified = if item.modified { " modified".yellow().to_string() } else { String::new() };
            println!(
                "  {} {} {}{}",
                item.name.bold(),
                item.version.dimmed(),
                format!("{} file(s)", item.files.len()).dimmed(),
                modified
            );
        }
        Ok(())
    }
}
