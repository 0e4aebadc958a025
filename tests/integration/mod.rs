//! Integration test suite for kitpm
//!
//! End-to-end tests that drive the `kitpm` binary against a local registry
//! laid out in a temporary directory.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **add**: dependency-first installation, alias paths and import rewriting,
//!   resolution failures
//! - **update**: the per-file update flow, local edits, `--force`, JSON reports
//! - **commands**: `list`, `remove`, `tree`, `diff` and `migrate`

#[path = "../common/mod.rs"]
mod common;

mod add;
mod commands;
mod update;
