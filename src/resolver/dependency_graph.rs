//! Dependency graph over registry items.
//!
//! The resolver produces installation order on its own; this graph is the
//! whole-catalog view used by `kitpm tree` for rendering and by `kitpm remove`
//! to find installed items that still depend on the one being removed.

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet, VecDeque};

use crate::registry::RegistryEntry;

/// Directed graph of item names; an edge `a -> b` means `a` depends on `b`.
pub struct DependencyGraph {
    graph: DiGraph<String, ()>,
    node_map: HashMap<String, NodeIndex>,
    /// Names that appear only as dependencies, never as entries.
    dangling: HashSet<String>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph.
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_map: HashMap::new(),
            dangling: HashSet::new(),
        }
    }

    /// Build a graph from registry entries, in entry order.
    ///
    /// Dependencies that name no entry still become nodes and are reported as
    /// missing by [`to_tree_string`](Self::to_tree_string).
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a RegistryEntry>) -> Self {
        let mut graph = Self::new();
        let mut known = HashSet::new();

        for entry in entries {
            known.insert(entry.name.clone());
            graph.ensure_node(&entry.name);
            for dependency in &entry.dependencies {
                graph.add_dependency(&entry.name, dependency);
            }
        }

        graph.dangling =
            graph.node_map.keys().filter(|name| !known.contains(*name)).cloned().collect();
        graph
    }

    fn ensure_node(&mut self, name: &str) -> NodeIndex {
        if let Some(&index) = self.node_map.get(name) {
            index
        } else {
            let index = self.graph.add_node(name.to_string());
            self.node_map.insert(name.to_string(), index);
            index
        }
    }

    /// Record that `from` depends on `to`.
    pub fn add_dependency(&mut self, from: &str, to: &str) {
        let from_idx = self.ensure_node(from);
        let to_idx = self.ensure_node(to);

        if !self.graph.contains_edge(from_idx, to_idx) {
            self.graph.add_edge(from_idx, to_idx, ());
        }
    }

    /// Everything `name` depends on, directly or indirectly.
    pub fn get_transitive_deps(&self, name: &str) -> HashSet<String> {
        self.walk(name, Direction::Outgoing)
    }

    /// Everything that depends on `name`, directly or indirectly.
    pub fn get_transitive_dependents(&self, name: &str) -> HashSet<String> {
        self.walk(name, Direction::Incoming)
    }

    fn walk(&self, name: &str, direction: Direction) -> HashSet<String> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::new();

        if let Some(&start) = self.node_map.get(name) {
            queue.push_back(start);
            while let Some(current) = queue.pop_front() {
                for neighbor in self.graph.neighbors_directed(current, direction) {
                    if seen.insert(self.graph[neighbor].clone()) {
                        queue.push_back(neighbor);
                    }
                }
            }
        }

        seen
    }

    /// Direct dependencies of `name`, in declared order.
    pub fn get_direct_deps(&self, name: &str) -> Vec<String> {
        let Some(&idx) = self.node_map.get(name) else {
            return Vec::new();
        };
        // petgraph yields neighbors most-recent-edge first
        let mut deps: Vec<String> =
            self.graph.neighbors(idx).map(|n| self.graph[n].clone()).collect();
        deps.reverse();
        deps
    }

    /// Whether `name` is a node of this graph.
    pub fn contains(&self, name: &str) -> bool {
        self.node_map.contains_key(name)
    }

    /// Render the dependency tree below `root`.
    ///
    /// ```text
    /// └── modal
    ///     ├── button
    ///     └── shared/utils (missing)
    /// ```
    pub fn to_tree_string(&self, root: &str) -> String {
        let mut result = String::new();
        let mut path = Vec::new();
        self.build_tree_string(root, &mut result, "", true, &mut path);
        result
    }

    fn build_tree_string(
        &self,
        name: &str,
        result: &mut String,
        prefix: &str,
        is_last: bool,
        path: &mut Vec<String>,
    ) {
        let connector = if is_last {
            "└── "
        } else {
            "├── "
        };
        let marker = if self.dangling.contains(name) {
            " (missing)"
        } else {
            ""
        };
        result.push_str(&format!("{prefix}{connector}{name}{marker}\n"));

        let child_prefix = if is_last {
            format!("{prefix}    ")
        } else {
            format!("{prefix}│   ")
        };

        if path.iter().any(|ancestor| ancestor == name) {
            result.push_str(&format!("{child_prefix}└── (circular reference)\n"));
            return;
        }

        path.push(name.to_string());
        let deps = self.get_direct_deps(name);
        for (i, dep) in deps.iter().enumerate() {
            self.build_tree_string(dep, result, &child_prefix, i == deps.len() - 1, path);
        }
        path.pop();
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}
