//! Re-applying upstream content over an installed project.
//!
//! Every file of every component goes through the same state machine:
//!
//! ```text
//! local file absent                        -> created
//! local bytes == upstream bytes            -> skipped (identical)
//! differs, local matches ledger checksum   -> updated
//! differs, local edited or flagged         -> conflict
//!     force                                -> updated
//!     decision: keep                       -> skipped (kept local)
//!     decision: overwrite                  -> updated
//!     decision: skip component             -> rest of the component untouched
//!     decision: show diff                  -> asked again with the diff rendered
//! any read or write failure                -> error
//! ```
//!
//! "Edited" is decided on bytes alone: a local file whose checksum differs
//! from the one recorded at install time is edited, even if the change is a
//! single space. The entry's `modified` flag forces the same outcome.
//!
//! Conflict decisions come from a caller-supplied function, so the engine runs
//! the same way behind a terminal prompt, a batch policy, or a test. All file
//! access goes through a [`Workspace`].
//!
//! A component's ledger entry is rewritten only when every processed file
//! succeeded and the component was not skipped. The project's `ref` moves to
//! the target ref only when the whole run finished without errors.

pub mod diff;

use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::constants::{DEFAULT_DIFF_CONTEXT_LINES, MAX_DIFF_REPROMPTS};
use crate::fetch::{FetchResults, FetchedItem};
use crate::installer::{InstallSettings, PreparedFile, prepare_item};
use crate::ledger::checksum::compute_checksum;
use crate::ledger::{FileChecksum, Ledger, LedgerEntry};
use crate::registry::RegistryEntry;
use crate::workspace::Workspace;

pub use diff::{DiffStats, FileDiff};

/// Answer to a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Leave the local file as it is
    Keep,
    /// Replace the local file with upstream content
    Overwrite,
    /// Stop processing this component; nothing more of it is written
    SkipComponent,
    /// Ask again, this time with the unified diff
    ShowDiff,
}

/// What the decision function is asked about.
#[derive(Debug)]
pub struct ConflictPrompt<'a> {
    pub component: &'a str,
    /// Project-relative path of the conflicting file
    pub path: &'a str,
    /// Local content against upstream content
    pub diff: &'a FileDiff,
    /// Unified diff text, present once [`Decision::ShowDiff`] was answered
    pub rendered_diff: Option<&'a str>,
}

/// Final state of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Updated,
    Created,
    Skipped,
    /// Conflict left unresolved because the component was skipped
    Conflict,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    Identical,
    KeptLocal,
}

/// Outcome for one file of an update run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileUpdateStatus {
    pub path: String,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<SkipReason>,
    /// Local content differed from what kitpm last installed
    pub has_local_modifications: bool,
    /// A decision about local edits was needed, even if it ended in an
    /// overwrite or kept the local file
    pub conflicted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_summary: Option<DiffStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileUpdateStatus {
    fn new(path: &str, status: FileStatus) -> Self {
        Self {
            path: path.to_string(),
            status,
            skip_reason: None,
            has_local_modifications: false,
            conflicted: false,
            diff_summary: None,
            error: None,
        }
    }
}

/// Outcome for one component of an update run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentUpdateStatus {
    pub component_name: String,
    /// Installed version before the run, `None` when not installed
    pub current_version: Option<String>,
    pub target_version: String,
    pub files: Vec<FileUpdateStatus>,
    pub has_conflicts: bool,
    /// The user chose to skip this component
    pub skipped: bool,
    /// Component-level failure: fetch error or failed dependency
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComponentUpdateStatus {
    fn new(name: &str, current_version: Option<String>, target_version: &str) -> Self {
        Self {
            component_name: name.to_string(),
            current_version,
            target_version: target_version.to_string(),
            files: Vec::new(),
            has_conflicts: false,
            skipped: false,
            error: None,
        }
    }

    /// Whether the component or any of its files failed.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.error.is_some() || self.files.iter().any(|f| f.status == FileStatus::Error)
    }
}

/// Counts across a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpdateTotals {
    pub updated: usize,
    pub created: usize,
    pub skipped: usize,
    pub conflicts: usize,
    pub errors: usize,
    pub skipped_components: usize,
}

/// Per-component outcomes of an update run, in processing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateReport {
    pub target_ref: String,
    pub components: Vec<ComponentUpdateStatus>,
}

impl UpdateReport {
    #[must_use]
    pub fn totals(&self) -> UpdateTotals {
        let mut totals = UpdateTotals::default();
        for component in &self.components {
            if component.error.is_some() {
                totals.errors += 1;
            }
            if component.skipped {
                totals.skipped_components += 1;
            }
            for file in &component.files {
                match file.status {
                    FileStatus::Updated => totals.updated += 1,
                    FileStatus::Created => totals.created += 1,
                    FileStatus::Skipped => totals.skipped += 1,
                    FileStatus::Error => totals.errors += 1,
                    FileStatus::Conflict => totals.conflicts += 1,
                }
            }
        }
        totals
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.components.iter().any(ComponentUpdateStatus::has_errors)
    }

    /// Process exit status for this report: 1 when anything failed.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(self.has_errors())
    }
}

/// Upstream-vs-local comparison of one file, without side effects.
#[derive(Debug, Clone)]
pub struct FilePreview {
    pub path: String,
    pub local_exists: bool,
    pub locally_modified: bool,
    pub diff: FileDiff,
}

#[derive(Debug, Clone)]
pub struct UpdateOptions {
    /// Overwrite conflicting files without asking
    pub force: bool,
    /// Context lines in rendered diffs
    pub context_lines: usize,
    /// Consecutive show-diff answers tolerated before a file is kept
    pub max_reprompts: usize,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            force: false,
            context_lines: DEFAULT_DIFF_CONTEXT_LINES,
            max_reprompts: MAX_DIFF_REPROMPTS,
        }
    }
}

/// Whether local content counts as edited since install.
///
/// With no entry, or no recorded checksum for the path, any local file counts
/// as edited.
#[must_use]
pub fn is_locally_modified(local: &[u8], path: &str, entry: Option<&LedgerEntry>) -> bool {
    match entry {
        Some(entry) => {
            entry.modified || entry.checksum_for(path) != Some(compute_checksum(local).as_str())
        }
        None => true,
    }
}

struct FileOutcome {
    status: FileUpdateStatus,
    /// Checksum to record for the file if the component commits
    checksum: Option<String>,
    kept_local: bool,
    skip_component: bool,
}

impl FileOutcome {
    fn done(status: FileUpdateStatus, checksum: Option<String>) -> Self {
        Self {
            status,
            checksum,
            kept_local: false,
            skip_component: false,
        }
    }
}

/// Drives the per-file state machine over components.
pub struct UpdateEngine<'a, W: Workspace + ?Sized> {
    workspace: &'a W,
    settings: InstallSettings,
    options: UpdateOptions,
}

impl<'a, W: Workspace + ?Sized> UpdateEngine<'a, W> {
    /// `settings.git_ref` is the target ref of the run.
    pub fn new(workspace: &'a W, settings: InstallSettings, options: UpdateOptions) -> Self {
        Self {
            workspace,
            settings,
            options,
        }
    }

    /// Update every component of `plan`, which must be in installation order.
    ///
    /// A component whose fetch failed, or which depends on a component that
    /// ended with errors, is reported as an error and left untouched; the
    /// others proceed.
    pub fn run<D>(
        &self,
        plan: &[RegistryEntry],
        fetched: &FetchResults,
        ledger: &mut Ledger,
        decide: &mut D,
    ) -> UpdateReport
    where
        D: FnMut(&ConflictPrompt<'_>) -> Decision,
    {
        let target = self.settings.git_ref.as_str();
        let mut report = UpdateReport {
            target_ref: target.to_string(),
            components: Vec::with_capacity(plan.len()),
        };
        let mut failed: HashSet<&str> = HashSet::new();

        for entry in plan {
            let current_version = ledger.get_entry(&entry.name).map(|e| e.version.clone());
            let failed_dependency = entry.dependencies.iter().find(|dep| failed.contains(dep.as_str()));

            let status = if let Some(dependency) = failed_dependency {
                let mut status = ComponentUpdateStatus::new(&entry.name, current_version, target);
                status.error = Some(format!("dependency '{dependency}' failed"));
                status
            } else {
                match fetched.get(&entry.name) {
                    Some(Ok(item)) => self.update_component(item, ledger, decide),
                    Some(Err(e)) => {
                        let mut status = ComponentUpdateStatus::new(&entry.name, current_version, target);
                        status.error = Some(e.to_string());
                        status
                    }
                    None => {
                        let mut status = ComponentUpdateStatus::new(&entry.name, current_version, target);
                        status.error = Some("item was not fetched".to_string());
                        status
                    }
                }
            };

            if status.has_errors() {
                warn!("Update of '{}' failed", entry.name);
                failed.insert(entry.name.as_str());
            }
            report.components.push(status);
        }

        if !report.has_errors() && ledger.git_ref != target {
            info!("Project ref moved from {} to {}", ledger.git_ref, target);
            ledger.git_ref = target.to_string();
        }

        report
    }

    /// Run the state machine over one component's files.
    pub fn update_component<D>(
        &self,
        item: &FetchedItem,
        ledger: &mut Ledger,
        decide: &mut D,
    ) -> ComponentUpdateStatus
    where
        D: FnMut(&ConflictPrompt<'_>) -> Decision,
    {
        let current = ledger.get_entry(&item.name).cloned();
        let mut status = ComponentUpdateStatus::new(
            &item.name,
            current.as_ref().map(|e| e.version.clone()),
            &self.settings.git_ref,
        );
        let mut checksums = Vec::new();
        let mut kept_local = false;

        for file in prepare_item(item, &self.settings) {
            let outcome = self.process_file(&item.name, &file, current.as_ref(), decide);
            debug!("{}: {} -> {:?}", item.name, file.target_path, outcome.status.status);

            status.has_conflicts |= outcome.status.status == FileStatus::Conflict;
            kept_local |= outcome.kept_local;
            if let Some(checksum) = outcome.checksum {
                checksums.push(FileChecksum::new(file.target_path.clone(), checksum));
            }
            status.files.push(outcome.status);

            if outcome.skip_component {
                info!("Skipping the rest of '{}'", item.name);
                status.skipped = true;
                break;
            }
        }

        if status.skipped || status.has_errors() {
            return status;
        }

        let mut entry = LedgerEntry::new(&item.name, &self.settings.git_ref, checksums);
        entry.modified = kept_local;
        ledger.upsert_entry(entry);
        info!("Updated '{}' to {}", item.name, self.settings.git_ref);

        status
    }

    /// Compare upstream content with the project without writing anything.
    pub fn preview(&self, item: &FetchedItem, ledger: &Ledger) -> anyhow::Result<Vec<FilePreview>> {
        let entry = ledger.get_entry(&item.name);

        prepare_item(item, &self.settings)
            .into_iter()
            .map(|file| {
                let local = self.workspace.read(&file.target_path)?;
                let locally_modified = local
                    .as_deref()
                    .is_some_and(|local| is_locally_modified(local, &file.target_path, entry));
                let diff = FileDiff::between(local.as_deref().unwrap_or_default(), &file.content);
                Ok(FilePreview {
                    path: file.target_path,
                    local_exists: local.is_some(),
                    locally_modified,
                    diff,
                })
            })
            .collect()
    }

    fn process_file<D>(
        &self,
        component: &str,
        file: &PreparedFile,
        entry: Option<&LedgerEntry>,
        decide: &mut D,
    ) -> FileOutcome
    where
        D: FnMut(&ConflictPrompt<'_>) -> Decision,
    {
        let local = match self.workspace.read(&file.target_path) {
            Ok(local) => local,
            Err(e) => return Self::error(file, &format!("{e:#}")),
        };

        let Some(local) = local else {
            return self.write(file, FileUpdateStatus::new(&file.target_path, FileStatus::Created));
        };

        if local == file.content {
            let mut status = FileUpdateStatus::new(&file.target_path, FileStatus::Skipped);
            status.skip_reason = Some(SkipReason::Identical);
            return FileOutcome::done(status, Some(file.checksum.clone()));
        }

        let diff = FileDiff::between(&local, &file.content);
        let mut status = FileUpdateStatus::new(&file.target_path, FileStatus::Updated);
        status.diff_summary = Some(diff.stats);

        if !is_locally_modified(&local, &file.target_path, entry) {
            return self.write(file, status);
        }

        status.has_local_modifications = true;
        status.conflicted = true;

        if self.options.force {
            debug!("Overwriting locally modified {} (forced)", file.target_path);
            return self.write(file, status);
        }

        match self.ask(component, &file.target_path, &diff, decide) {
            Decision::Overwrite => self.write(file, status),
            Decision::Keep | Decision::ShowDiff => {
                status.status = FileStatus::Skipped;
                status.skip_reason = Some(SkipReason::KeptLocal);
                let previous = entry.and_then(|e| e.checksum_for(&file.target_path)).map(str::to_string);
                FileOutcome {
                    status,
                    checksum: previous,
                    kept_local: true,
                    skip_component: false,
                }
            }
            Decision::SkipComponent => {
                status.status = FileStatus::Conflict;
                FileOutcome {
                    status,
                    checksum: None,
                    kept_local: false,
                    skip_component: true,
                }
            }
        }
    }

    /// Ask until the answer is not show-diff, or the re-prompt cap is hit.
    fn ask<D>(&self, component: &str, path: &str, diff: &FileDiff, decide: &mut D) -> Decision
    where
        D: FnMut(&ConflictPrompt<'_>) -> Decision,
    {
        let mut rendered: Option<String> = None;
        let mut reprompts = 0usize;

        loop {
            let prompt = ConflictPrompt {
                component,
                path,
                diff,
                rendered_diff: rendered.as_deref(),
            };
            let decision = decide(&prompt);
            debug!("{}: decision for {} is {:?}", component, path, decision);

            if decision != Decision::ShowDiff {
                return decision;
            }

            reprompts += 1;
            if reprompts > self.options.max_reprompts {
                warn!("No decision for {} after {} diff requests, keeping local file", path, reprompts - 1);
                return Decision::Keep;
            }
            if rendered.is_none() {
                rendered = Some(diff.render_unified(
                    &format!("local/{path}"),
                    &format!("upstream/{path}"),
                    self.options.context_lines,
                ));
            }
        }
    }

    fn write(&self, file: &PreparedFile, status: FileUpdateStatus) -> FileOutcome {
        match self.workspace.write(&file.target_path, &file.content) {
            Ok(()) => FileOutcome::done(status, Some(file.checksum.clone())),
            Err(e) => Self::error(file, &format!("{e:#}")),
        }
    }

    fn error(file: &PreparedFile, message: &str) -> FileOutcome {
        warn!("{}: {}", file.target_path, message);
        let mut status = FileUpdateStatus::new(&file.target_path, FileStatus::Error);
        status.error = Some(message.to_string());
        FileOutcome::done(status, None)
    }
}
