//! Global constants used throughout the kitpm codebase.
//!
//! Timeouts, retry parameters, file names and defaults that are shared by
//! more than one module live here so magic numbers stay discoverable.

use std::time::Duration;

/// File name of the project ledger, relative to the project root.
pub const LEDGER_FILE_NAME: &str = "kitpm.toml";

/// Directory (relative to the project root) holding kitpm's private state.
pub const STATE_DIR_NAME: &str = ".kitpm";

/// Path of the registry index inside the upstream source, fetched at the pinned ref.
pub const REGISTRY_INDEX_PATH: &str = "registry/index.toml";

/// Current ledger schema version.
///
/// Version 1 ledgers had no `import_style`, `source` or `import_prefix` fields.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// Upstream ref used when a ledger does not pin one.
pub const DEFAULT_REF: &str = "main";

/// Default upstream source template.
pub const DEFAULT_SOURCE: &str = "https://raw.githubusercontent.com/kitpm/registry/{ref}/{path}";

/// Default import prefix for alias-style import rewriting.
pub const DEFAULT_IMPORT_PREFIX: &str = "@/";

/// Marker that registry files use to reference other registry items.
pub const REGISTRY_IMPORT_MARKER: &str = "@registry/";

/// Default number of concurrent fetches.
pub const DEFAULT_FETCH_CONCURRENCY: usize = 8;

/// Default number of retries for a failed fetch.
pub const DEFAULT_FETCH_RETRIES: usize = 3;

/// Default number of context lines in rendered diffs.
pub const DEFAULT_DIFF_CONTEXT_LINES: usize = 3;

/// Consecutive show-diff answers tolerated for one file before it is kept.
pub const MAX_DIFF_REPROMPTS: usize = 16;

/// Starting delay for exponential backoff (10ms).
pub const STARTING_BACKOFF_DELAY_MS: u64 = 10;

/// Maximum backoff delay for exponential backoff (500ms).
pub const MAX_BACKOFF_DELAY_MS: u64 = 500;

/// Upper bound on the delay between fetch retries (200ms).
pub const FETCH_RETRY_DELAY_MS: u64 = 200;

/// Timeout for a single HTTP fetch (30 seconds).
pub const HTTP_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for acquiring the project lock (30 seconds).
pub fn default_lock_timeout() -> Duration {
    Duration::from_secs(30)
}
