//! Dependency resolution for registry items.
//!
//! The resolver turns a list of requested [`ItemReference`]s into a
//! [`ResolutionResult`]: the dependency-closed set of registry entries to
//! install, plus the cycles and missing dependencies found on the way.
//!
//! # Algorithm
//!
//! An iterative depth-first traversal over an explicit stack:
//!
//! 1. Names already resolved are skipped, so every item appears once.
//! 2. A dependency that is on the current path closes a cycle. The path from its
//!    first occurrence back to itself is recorded in `circular`, the branch is
//!    not descended, and every item on the cycle is withheld from `resolved`.
//! 3. A dependency the registry does not know is recorded in `missing` and not
//!    descended. The item that declared it still resolves.
//! 4. Otherwise the entry is pushed, its dependencies are visited in declared
//!    order, and the entry is appended to `resolved` when it is popped.
//!
//! Because entries are appended in post-order, `resolved` is already a
//! topological order: every dependency comes before the items that declare it.
//! Items that depend on a withheld cycle member are withheld too, which keeps
//! `resolved` dependency-closed.
//!
//! Top-level items are visited in the order the caller supplied them, so the
//! result is stable across runs for identical input.
//!
//! # Failure Semantics
//!
//! Missing and circular dependencies are data, never errors. The only error is
//! [`KitpmError::ResolverInternal`], raised when the registry lookup itself fails.
//!
//! # Example
//!
//! ```rust
//! use kitpm_cli::core::parse_items;
//! use kitpm_cli::registry::{RegistryEntry, StaticRegistry};
//! use kitpm_cli::resolver::{DependencyResolver, installation_order};
//!
//! let registry = StaticRegistry::new(vec![
//!     RegistryEntry::new("button", &[]),
//!     RegistryEntry::new("modal", &["button"]),
//! ])
//! .unwrap();
//!
//! let items = parse_items(&["modal"]).unwrap().items;
//! let result = DependencyResolver::new(&registry).resolve(&items).unwrap();
//! assert_eq!(installation_order(&result), vec!["button", "modal"]);
//! ```

pub mod dependency_graph;

use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::core::{ItemReference, KitpmError};
use crate::registry::{RegistryEntry, RegistryLookup};

pub use dependency_graph::DependencyGraph;

/// A dependency the registry could not provide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MissingDependency {
    /// Item that declared the dependency, `None` for a top-level request
    pub requested_by: Option<String>,
    /// Canonical name that was not found
    pub name: String,
}

/// Outcome of a resolve call.
#[derive(Debug, Clone, Default)]
pub struct ResolutionResult {
    /// Dependency-closed entries in installation order, unique by name
    pub resolved: Vec<RegistryEntry>,
    /// Detected cycles, each as a path that starts and ends with the same name
    pub circular: Vec<Vec<String>>,
    /// Dependencies absent from the registry
    pub missing: Vec<MissingDependency>,
}

impl ResolutionResult {
    /// Whether the resolution found neither cycles nor missing dependencies.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.circular.is_empty() && self.missing.is_empty()
    }

    /// Render each cycle as `a → b → a`.
    #[must_use]
    pub fn cycle_chains(&self) -> Vec<String> {
        self.circular.iter().map(|cycle| cycle.join(" → ")).collect()
    }
}

/// Installation order for a resolution: dependencies before dependents.
///
/// `resolved` is built in DFS post-order, which is already topological; this
/// names that invariant rather than re-sorting.
#[must_use]
pub fn installation_order(result: &ResolutionResult) -> Vec<String> {
    result.resolved.iter().map(|entry| entry.name.clone()).collect()
}

/// Resolves requested items against a registry.
pub struct DependencyResolver<'a, R: RegistryLookup + ?Sized> {
    registry: &'a R,
}

/// One item on the traversal stack.
struct Frame {
    entry: RegistryEntry,
    next_dependency: usize,
    /// Set when this item, or something it depends on, sits on a cycle.
    blocked: bool,
}

#[derive(Default)]
struct ResolveState {
    stack: Vec<Frame>,
    visiting: HashSet<String>,
    resolved_names: HashSet<String>,
    blocked: HashSet<String>,
    absent: HashSet<String>,
    missing_seen: HashSet<MissingDependency>,
    result: ResolutionResult,
}

impl<'a, R: RegistryLookup + ?Sized> DependencyResolver<'a, R> {
    /// Create a resolver over a registry.
    pub const fn new(registry: &'a R) -> Self {
        Self {
            registry,
        }
    }

    /// Resolve typed item references.
    pub fn resolve(&self, items: &[ItemReference]) -> Result<ResolutionResult, KitpmError> {
        let names: Vec<String> = items.iter().map(ItemReference::canonical_name).collect();
        self.resolve_names(&names)
    }

    /// Resolve canonical registry names, in the given order.
    pub fn resolve_names<S: AsRef<str>>(&self, names: &[S]) -> Result<ResolutionResult, KitpmError> {
        let mut state = ResolveState::default();

        for name in names {
            self.visit_root(name.as_ref(), &mut state)?;
        }

        let result = state.result;
        info!(
            resolved = result.resolved.len(),
            circular = result.circular.len(),
            missing = result.missing.len(),
            "Dependency resolution finished"
        );
        Ok(result)
    }

    fn visit_root(&self, name: &str, state: &mut ResolveState) -> Result<(), KitpmError> {
        if state.resolved_names.contains(name) || state.blocked.contains(name) {
            return Ok(());
        }

        match self.lookup(name, state)? {
            Some(entry) => push_frame(entry, state),
            None => {
                record_missing(None, name, state);
                return Ok(());
            }
        }

        while let Some(top) = state.stack.last_mut() {
            if top.next_dependency < top.entry.dependencies.len() {
                let dependency = top.entry.dependencies[top.next_dependency].clone();
                top.next_dependency += 1;
                self.visit_dependency(&dependency, state)?;
            } else {
                finish_frame(state);
            }
        }

        Ok(())
    }

    fn visit_dependency(&self, dependency: &str, state: &mut ResolveState) -> Result<(), KitpmError> {
        if state.resolved_names.contains(dependency) {
            return Ok(());
        }

        if state.blocked.contains(dependency) {
            if let Some(parent) = state.stack.last_mut() {
                parent.blocked = true;
            }
            return Ok(());
        }

        if state.visiting.contains(dependency) {
            let start = state
                .stack
                .iter()
                .position(|frame| frame.entry.name == dependency)
                .unwrap_or(0);
            let mut cycle: Vec<String> =
                state.stack[start..].iter().map(|frame| frame.entry.name.clone()).collect();
            cycle.push(dependency.to_string());
            warn!("Circular dependency detected: {}", cycle.join(" → "));

            for frame in &mut state.stack[start..] {
                frame.blocked = true;
            }
            state.result.circular.push(cycle);
            return Ok(());
        }

        match self.lookup(dependency, state)? {
            Some(entry) => push_frame(entry, state),
            None => {
                let parent = state.stack.last().map(|frame| frame.entry.name.clone());
                record_missing(parent, dependency, state);
            }
        }

        Ok(())
    }

    fn lookup(&self, name: &str, state: &mut ResolveState) -> Result<Option<RegistryEntry>, KitpmError> {
        if state.absent.contains(name) {
            return Ok(None);
        }

        let found = self.registry.lookup(name).map_err(|e| KitpmError::ResolverInternal {
            name: name.to_string(),
            reason: format!("{e:#}"),
        })?;

        match found {
            Some(entry) if entry.name != name => Err(KitpmError::ResolverInternal {
                name: name.to_string(),
                reason: format!("registry returned entry '{}'", entry.name),
            }),
            Some(entry) => Ok(Some(entry)),
            None => {
                state.absent.insert(name.to_string());
                Ok(None)
            }
        }
    }
}

fn push_frame(entry: RegistryEntry, state: &mut ResolveState) {
    state.visiting.insert(entry.name.clone());
    state.stack.push(Frame {
        entry,
        next_dependency: 0,
        blocked: false,
    });
}

fn finish_frame(state: &mut ResolveState) {
    let Some(frame) = state.stack.pop() else {
        return;
    };
    state.visiting.remove(&frame.entry.name);

    if frame.blocked {
        debug!("Withholding '{}': it depends on a cycle", frame.entry.name);
        state.blocked.insert(frame.entry.name);
        if let Some(parent) = state.stack.last_mut() {
            parent.blocked = true;
        }
    } else {
        debug!("Resolved '{}'", frame.entry.name);
        state.resolved_names.insert(frame.entry.name.clone());
        state.result.resolved.push(frame.entry);
    }
}

fn record_missing(requested_by: Option<String>, name: &str, state: &mut ResolveState) {
    let missing = MissingDependency {
        requested_by,
        name: name.to_string(),
    };
    if state.missing_seen.insert(missing.clone()) {
        match &missing.requested_by {
            Some(parent) => warn!("'{}' depends on '{}', which is not in the registry", parent, name),
            None => warn!("'{}' is not in the registry", name),
        }
        state.result.missing.push(missing);
    }
}
