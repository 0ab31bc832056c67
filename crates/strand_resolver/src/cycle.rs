//! Library dependency graph and cycle identification.
//!
//! The graph holds every not-yet-resolved library reachable from a target
//! through import and export edges. A library cycle is the set of libraries
//! that can reach the target back through those edges; it is the smallest
//! set that can be resolved soundly on its own.

use std::collections::HashMap;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, Reversed};
use strand_source::Source;

/// Directed "depends on" graph between libraries.
#[derive(Default)]
pub struct DependencyGraph {
    graph: DiGraph<Source, ()>,
    nodes: HashMap<Source, NodeIndex>,
}

impl DependencyGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a library node, returning its index.
    pub fn add_library(&mut self, library: &Source) -> NodeIndex {
        if let Some(&index) = self.nodes.get(library) {
            return index;
        }
        let index = self.graph.add_node(library.clone());
        self.nodes.insert(library.clone(), index);
        index
    }

    /// Records that `from` depends on `to`.
    pub fn add_dependency(&mut self, from: &Source, to: &Source) {
        let a = self.add_library(from);
        let b = self.add_library(to);
        if !self.graph.contains_edge(a, b) {
            self.graph.add_edge(a, b, ());
        }
    }

    /// Returns `true` if the library is in the graph.
    pub fn contains(&self, library: &Source) -> bool {
        self.nodes.contains_key(library)
    }

    /// Number of libraries.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns `true` if the graph has no libraries.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Every library that reaches `target` backwards, `target` included,
    /// sorted by URI. When the graph was built by walking forward from
    /// `target` this is exactly the cycle containing it.
    pub fn cycle_of(&self, target: &Source) -> Vec<Source> {
        let Some(&start) = self.nodes.get(target) else {
            return Vec::new();
        };
        let reversed = Reversed(&self.graph);
        let mut dfs = Dfs::new(reversed, start);
        let mut members = Vec::new();
        while let Some(node) = dfs.next(reversed) {
            members.push(self.graph[node].clone());
        }
        members.sort();
        members
    }

    /// Strongly connected components, dependencies before dependents.
    pub fn components(&self) -> Vec<Vec<Source>> {
        tarjan_scc(&self.graph)
            .into_iter()
            .map(|component| {
                let mut libs: Vec<Source> =
                    component.into_iter().map(|n| self.graph[n].clone()).collect();
                libs.sort();
                libs
            })
            .collect()
    }
}
