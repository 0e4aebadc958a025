//! Core types and functionality for kitpm
//!
//! This module holds the types every other module builds on:
//!
//! - [`error`] - [`KitpmError`], [`ErrorContext`] and [`user_friendly_error`]
//! - [`item`] - [`Namespace`], [`ItemReference`] and the item-name parser
//!
//! # Examples
//!
//! ```rust
//! use kitpm_cli::core::{parse_items, Namespace};
//!
//! let parsed = parse_items(&["button", "faces/landing"]).unwrap();
//! assert_eq!(parsed.items.len(), 2);
//! assert_eq!(parsed.by_namespace[&Namespace::Face][0].name, "landing");
//! ```

pub mod error;
pub mod item;

pub use error::{ErrorContext, KitpmError, user_friendly_error};
pub use item::{ItemReference, Namespace, ParsedItems, parse_item, parse_items};
