//! Configuration outside the project ledger.
//!
//! Project settings (ref, source, aliases, import style) live in the ledger
//! and are handled by [`crate::ledger`]. This module covers the user-wide
//! [`GlobalConfig`].

pub mod global;

pub use global::{CONFIG_PATH_ENV, GlobalConfig};
