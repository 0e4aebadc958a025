//! kitpm - Kit Package Manager
//!
//! Installs UI kit components from a static, version-pinned registry into a
//! project, and keeps enough state to re-apply upstream changes later without
//! clobbering local edits.
//!
//! # Architecture Overview
//!
//! - `kitpm.toml` is the project ledger: the pinned upstream ref, where
//!   upstream lives, how paths and imports map into the project, and one entry
//!   per installed component with per-file checksums
//! - `registry/index.toml` upstream lists every item with its files and
//!   declared dependencies
//! - Components are copied, not linked: once installed, files belong to the
//!   project and may be edited
//!
//! The pipeline for `kitpm add`:
//!
//! ```text
//! item names -> core::parse_items -> resolver -> fetch (concurrent)
//!            -> installer (alias paths, import rewriting, checksums) -> ledger
//! ```
//!
//! `kitpm update` runs the same front half, then hands each component to the
//! [`update`] engine, which compares local files against both upstream content
//! and the recorded checksums before deciding what to write.
//!
//! # Modules
//!
//! ## Core
//! - [`core`] - error types and the item-name parser
//! - [`registry`] - registry entries, the lookup trait and the TOML index
//! - [`resolver`] - dependency resolution, cycle and missing detection, ordering
//!
//! ## Project State
//! - [`ledger`] - the `kitpm.toml` ledger, its migration and atomic persistence
//! - [`workspace`] - the file access seam shared by installer and update engine
//!
//! ## Operations
//! - [`fetch`] - upstream sources and the concurrent, retrying fetch service
//! - [`installer`] - writing components into the project
//! - [`update`] - the per-file update state machine and line diffs
//!
//! ## Supporting Modules
//! - [`cli`] - command-line interface
//! - [`config`] - user-wide settings (`~/.kitpm/config.toml`)
//! - [`constants`] - shared defaults
//! - [`utils`] - atomic writes, progress bars, project locking
//!
//! # Ledger Format (kitpm.toml)
//!
//! ```toml
//! schema_version = 2
//! ref = "v1.4.0"
//! import_style = "alias"
//! source = "https://raw.githubusercontent.com/kitpm/registry/{ref}/{path}"
//! import_prefix = "@/"
//!
//! [aliases]
//! primitives = "components/ui"
//! shared = "lib"
//! patterns = "components/patterns"
//! faces = "faces"
//!
//! [[installed]]
//! name = "button"
//! version = "v1.4.0"
//! installed_at = "2026-03-02T10:15:00Z"
//! modified = false
//!
//! [[installed.checksums]]
//! path = "components/ui/button.tsx"
//! checksum = "sha256:..."
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod fetch;
pub mod installer;
pub mod ledger;
pub mod registry;
pub mod resolver;
pub mod update;
pub mod utils;
pub mod workspace;
