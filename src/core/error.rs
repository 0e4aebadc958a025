//! Error handling for kitpm
//!
//! This module provides the strongly-typed error enum used across the crate and
//! the user-facing rendering of errors for the CLI. The error system follows two
//! principles:
//! 1. **Strongly-typed errors** for precise handling in code
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! - [`KitpmError`] - Enumerated error types for every failure mode
//! - [`ErrorContext`] - Wrapper adding details and a suggestion for display
//! - [`user_friendly_error`] - Converts any [`anyhow::Error`] into an [`ErrorContext`]
//!
//! # Error Categories
//!
//! - **Input**: [`KitpmError::InvalidItemName`], [`KitpmError::ItemNotFound`]
//! - **Resolution**: [`KitpmError::CircularDependency`], [`KitpmError::MissingDependency`],
//!   [`KitpmError::ResolverInternal`]
//! - **Transport**: [`KitpmError::Fetch`]
//! - **Project state**: [`KitpmError::LedgerCorruption`], [`KitpmError::LedgerNotFound`],
//!   [`KitpmError::FileWrite`]
//!
//! Missing and circular dependencies are normally reported as data inside a
//! [`ResolutionResult`](crate::resolver::ResolutionResult); the variants exist so
//! a caller that decides to abort can say why.
//!
//! # Examples
//!
//! ```rust,no_run
//! use kitpm_cli::core::{KitpmError, ErrorContext};
//!
//! let context = ErrorContext::new(KitpmError::LedgerNotFound {
//!     path: "kitpm.toml".to_string(),
//! })
//! .with_suggestion("Run 'kitpm init' to create one");
//!
//! context.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for kitpm operations.
///
/// Each variant carries enough context (item names, refs, paths) for the CLI to
/// explain the failure without consulting logs.
#[derive(Error, Debug)]
pub enum KitpmError {
    /// An item name could not be parsed (empty input).
    #[error("Invalid item name: '{raw}'")]
    InvalidItemName {
        /// The raw string that was rejected
        raw: String,
    },

    /// A requested item does not exist in the registry.
    #[error("Item '{name}' not found in the registry")]
    ItemNotFound {
        /// Canonical registry name that was looked up
        name: String,
    },

    /// A requested item is not present in the project ledger.
    #[error("Item '{name}' is not installed")]
    NotInstalled {
        /// Canonical registry name
        name: String,
    },

    /// Dependency cycle detected while resolving.
    ///
    /// Example: `button` depends on `modal`, which depends on `button`.
    #[error("Circular dependency detected: {chain}")]
    CircularDependency {
        /// Rendered cycle path, e.g. `button → modal → button`
        chain: String,
    },

    /// A declared dependency is absent from the registry.
    #[error("Dependency '{name}' required by '{requested_by}' is missing from the registry")]
    MissingDependency {
        /// Item that declared the dependency
        requested_by: String,
        /// Name of the missing dependency
        name: String,
    },

    /// The registry lookup failed in a way the resolver cannot treat as data.
    #[error("Registry lookup failed for '{name}': {reason}")]
    ResolverInternal {
        /// Item being looked up when the failure happened
        name: String,
        /// Underlying failure
        reason: String,
    },

    /// The registry index could not be parsed or failed validation.
    #[error("Invalid registry index: {reason}")]
    RegistryIndexInvalid {
        /// Why the index was rejected
        reason: String,
    },

    /// Fetching an item's files from the upstream source failed.
    #[error("Failed to fetch '{item}' at ref '{git_ref}': {reason}")]
    Fetch {
        /// Item whose files were being fetched
        item: String,
        /// Upstream ref
        git_ref: String,
        /// Transport-level cause
        reason: String,
    },

    /// Writing an installed file failed.
    #[error("Failed to write '{path}': {reason}")]
    FileWrite {
        /// Project-relative path of the file
        path: String,
        /// Underlying I/O failure
        reason: String,
    },

    /// The ledger exists but cannot be read or parsed.
    ///
    /// This is always fatal: kitpm never silently resets user state.
    #[error("Ledger file {file} is corrupted: {reason}")]
    LedgerCorruption {
        /// Path to the ledger file
        file: String,
        /// Parse or read failure
        reason: String,
    },

    /// No ledger exists where one is required.
    #[error("No kitpm ledger found at {path}")]
    LedgerNotFound {
        /// Path that was checked
        path: String,
    },

    /// The ledger was written by a newer kitpm.
    #[error("Ledger schema version {found} is newer than supported version {supported}")]
    LedgerVersionTooNew {
        /// Schema version found in the file
        found: u32,
        /// Newest schema version this build understands
        supported: u32,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerError(#[from] toml::ser::Error),

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

impl Clone for KitpmError {
    fn clone(&self) -> Self {
        match self {
            Self::InvalidItemName {
                raw,
            } => Self::InvalidItemName {
                raw: raw.clone(),
            },
            Self::ItemNotFound {
                name,
            } => Self::ItemNotFound {
                name: name.clone(),
            },
            Self::NotInstalled {
                name,
            } => Self::NotInstalled {
                name: name.clone(),
            },
            Self::CircularDependency {
                chain,
            } => Self::CircularDependency {
                chain: chain.clone(),
            },
            Self::MissingDependency {
                requested_by,
                name,
            } => Self::MissingDependency {
                requested_by: requested_by.clone(),
                name: name.clone(),
            },
            Self::ResolverInternal {
                name,
                reason,
            } => Self::ResolverInternal {
                name: name.clone(),
                reason: reason.clone(),
            },
            Self::RegistryIndexInvalid {
                reason,
            } => Self::RegistryIndexInvalid {
                reason: reason.clone(),
            },
            Self::Fetch {
                item,
                git_ref,
                reason,
            } => Self::Fetch {
                item: item.clone(),
                git_ref: git_ref.clone(),
                reason: reason.clone(),
            },
            Self::FileWrite {
                path,
                reason,
            } => Self::FileWrite {
                path: path.clone(),
                reason: reason.clone(),
            },
            Self::LedgerCorruption {
                file,
                reason,
            } => Self::LedgerCorruption {
                file: file.clone(),
                reason: reason.clone(),
            },
            Self::LedgerNotFound {
                path,
            } => Self::LedgerNotFound {
                path: path.clone(),
            },
            Self::LedgerVersionTooNew {
                found,
                supported,
            } => Self::LedgerVersionTooNew {
                found: *found,
                supported: *supported,
            },
            Self::ConfigError {
                message,
            } => Self::ConfigError {
                message: message.clone(),
            },
            // For errors that don't implement Clone, convert to Other
            Self::IoError(e) => Self::Other {
                message: format!("IO error: {e}"),
            },
            Self::TomlError(e) => Self::Other {
                message: format!("TOML parsing error: {e}"),
            },
            Self::TomlSerError(e) => Self::Other {
                message: format!("TOML serialization error: {e}"),
            },
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

/// Error context wrapper that provides user-friendly error information.
///
/// When displayed, errors show the main message in red, optional details in
/// yellow and an optional suggestion in green.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying kitpm error
    pub error: KitpmError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: KitpmError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error context to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`] with actionable suggestions.
///
/// Recognizes [`KitpmError`] (also when it is wrapped by an existing
/// [`ErrorContext`]), [`std::io::Error`] and TOML parse errors; anything else is
/// rendered with its full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(ctx) = error.downcast_ref::<ErrorContext>() {
        let mut rebuilt = ErrorContext::new(ctx.error.clone());
        rebuilt.details = ctx.details.clone();
        rebuilt.suggestion = ctx.suggestion.clone();
        return rebuilt;
    }

    if let Some(kitpm_error) = error.downcast_ref::<KitpmError>() {
        return create_error_context(kitpm_error.clone());
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(KitpmError::Other {
                    message: format!("Permission denied: {io_error}"),
                })
                .with_suggestion("Check file ownership and permissions in the project directory")
                .with_details("kitpm needs to read and write files under the project root");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(KitpmError::Other {
                    message: format!("File not found: {io_error}"),
                })
                .with_suggestion("Check that the file or directory exists and the path is correct");
            }
            _ => {}
        }
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(KitpmError::LedgerCorruption {
            file: "kitpm.toml".to_string(),
            reason: toml_error.to_string(),
        })
        .with_suggestion("Fix the TOML syntax in kitpm.toml or restore it from version control");
    }

    // Generic error - include the full error chain for better diagnostics
    let mut message = error.to_string();
    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(KitpmError::Other {
        message,
    })
}

/// Map each [`KitpmError`] variant to an [`ErrorContext`] with tailored suggestions.
fn create_error_context(error: KitpmError) -> ErrorContext {
    match &error {
        KitpmError::InvalidItemName { .. } => ErrorContext::new(error)
            .with_suggestion("Item names look like 'button', 'shared/utils', 'patterns/card-grid' or 'faces/landing'"),

        KitpmError::ItemNotFound { name } => {
            let suggestion = format!("Check the spelling of '{name}' or pin a ref that contains it with --ref");
            ErrorContext::new(error).with_suggestion(suggestion)
        }

        KitpmError::NotInstalled { .. } => ErrorContext::new(error)
            .with_suggestion("Run 'kitpm list' to see installed items, or 'kitpm add' to install it"),

        KitpmError::CircularDependency { chain } => {
            let details = format!(
                "Circular dependency chain detected: {chain}. Items in a cycle cannot be installed in a valid order"
            );
            ErrorContext::new(error)
                .with_suggestion("Report the cycle to the registry maintainers or pin an older ref")
                .with_details(details)
        }

        KitpmError::MissingDependency { .. } => ErrorContext::new(error)
            .with_suggestion("The registry at this ref is incomplete; try another ref with --ref")
            .with_details("Every dependency declared by a registry item must itself be in the registry"),

        KitpmError::Fetch { git_ref, .. } => {
            let suggestion = format!(
                "Check your network connection and that ref '{git_ref}' exists upstream"
            );
            ErrorContext::new(error)
                .with_suggestion(suggestion)
                .with_details("No files were written for a fresh install that failed to fetch")
        }

        KitpmError::FileWrite { .. } => ErrorContext::new(error)
            .with_suggestion("Check disk space and permissions, then re-run the command")
            .with_details("Files already written remain on disk; the ledger only records completed items"),

        KitpmError::LedgerCorruption { file, .. } => {
            let suggestion =
                format!("Fix {file} by hand or restore it from version control; kitpm will not reset it");
            ErrorContext::new(error).with_suggestion(suggestion)
        }

        KitpmError::LedgerNotFound { .. } => ErrorContext::new(error)
            .with_suggestion("Run 'kitpm init' in the project root to create kitpm.toml"),

        KitpmError::LedgerVersionTooNew { .. } => ErrorContext::new(error)
            .with_suggestion("Update kitpm to the latest version to use this ledger"),

        KitpmError::RegistryIndexInvalid { .. } => ErrorContext::new(error)
            .with_suggestion("The upstream registry index is malformed at this ref; try another ref"),

        _ => ErrorContext::new(error),
    }
}
