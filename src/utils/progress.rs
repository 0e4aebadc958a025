//! Progress indicators.
//!
//! A thin wrapper over `indicatif` with kitpm's styling. Every bar is hidden
//! when progress is disabled, either with `--no-progress` (which calls
//! [`disable_progress`]) or by exporting `KITPM_NO_PROGRESS`, so scripts and
//! CI get clean output.
//!
//! ```rust
//! use kitpm_cli::utils::progress::ProgressBar;
//!
//! let progress = ProgressBar::new(3);
//! progress.set_message("Fetching components");
//! progress.inc(3);
//! progress.finish_and_clear();
//! ```

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Environment variable that disables all progress output when set.
pub const NO_PROGRESS_ENV: &str = "KITPM_NO_PROGRESS";

static PROGRESS_DISABLED: AtomicBool = AtomicBool::new(false);

/// Hide every progress bar created from now on.
pub fn disable_progress() {
    PROGRESS_DISABLED.store(true, Ordering::Relaxed);
}

fn is_progress_disabled() -> bool {
    PROGRESS_DISABLED.load(Ordering::Relaxed) || std::env::var_os(NO_PROGRESS_ENV).is_some()
}

/// A progress bar or spinner with consistent styling.
#[derive(Clone)]
pub struct ProgressBar {
    inner: IndicatifBar,
}

impl ProgressBar {
    /// Creates a bar tracking `len` units of work.
    pub fn new(len: u64) -> Self {
        let bar = if is_progress_disabled() {
            IndicatifBar::hidden()
        } else {
            let bar = IndicatifBar::new(len);
            if let Some(style) = bar_style() {
                bar.set_style(style);
            }
            bar
        };
        Self {
            inner: bar,
        }
    }

    /// Creates a spinner for work of unknown size.
    pub fn new_spinner() -> Self {
        let bar = if is_progress_disabled() {
            IndicatifBar::hidden()
        } else {
            let bar = IndicatifBar::new_spinner();
            if let Some(style) = spinner_style() {
                bar.set_style(style);
            }
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        };
        Self {
            inner: bar,
        }
    }

    pub fn set_message(&self, msg: impl Into<String>) {
        self.inner.set_message(msg.into());
    }

    pub fn set_prefix(&self, prefix: impl Into<String>) {
        self.inner.set_prefix(prefix.into());
    }

    pub fn inc(&self, delta: u64) {
        self.inner.inc(delta);
    }

    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }
}

/// Spinner with a message, the common case for short indeterminate steps.
pub fn spinner_with_message(msg: impl Into<String>) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_message(msg);
    spinner
}

fn bar_style() -> Option<IndicatifStyle> {
    IndicatifStyle::default_bar()
        .template("[{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .ok()
        .map(|style| style.progress_chars("━╸━"))
}

fn spinner_style() -> Option<IndicatifStyle> {
    IndicatifStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .ok()
        .map(|style| style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]))
}
