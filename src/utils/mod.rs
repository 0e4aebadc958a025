//! Shared utilities
//!
//! - [`fs`] - Atomic writes and directory helpers
//! - [`progress`] - Progress bars and spinners that respect `--no-progress`
//! - [`project_lock`] - Cross-process exclusive lock on a project

pub mod fs;
pub mod progress;
pub mod project_lock;

pub use fs::{atomic_write, ensure_dir, read_optional};
pub use progress::ProgressBar;
pub use project_lock::ProjectLock;
