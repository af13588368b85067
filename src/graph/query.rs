//! Declarative pattern and path queries over the property graph
//!
//! Patterns are `(source kind)-[edge kind]->(target kind)` triples with
//! optional property equality filters, matched by a full scan. Path and
//! component queries delegate to petgraph.

use log::trace;
use petgraph::algo::astar;
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;

use super::types::{EdgeKind, GraphEdge, GraphNode, NodeKind, PropertyValue};
use super::PropertyGraph;

/// A `(source)-[edge]->(target)` match template. Unset parts match
/// anything; property filters require exact equality.
#[derive(Debug, Clone, Default)]
pub struct Pattern {
    pub source_kind: Option<NodeKind>,
    pub edge_kind: Option<EdgeKind>,
    pub target_kind: Option<NodeKind>,
    pub source_properties: Vec<(String, PropertyValue)>,
    pub edge_properties: Vec<(String, PropertyValue)>,
    pub target_properties: Vec<(String, PropertyValue)>,
}

impl Pattern {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(mut self, kind: NodeKind) -> Self {
        self.source_kind = Some(kind);
        self
    }

    pub fn edge(mut self, kind: EdgeKind) -> Self {
        self.edge_kind = Some(kind);
        self
    }

    pub fn target(mut self, kind: NodeKind) -> Self {
        self.target_kind = Some(kind);
        self
    }

    pub fn source_property(mut self, key: impl Into<String>, value: PropertyValue) -> Self {
        self.source_properties.push((key.into(), value));
        self
    }

    pub fn edge_property(mut self, key: impl Into<String>, value: PropertyValue) -> Self {
        self.edge_properties.push((key.into(), value));
        self
    }

    pub fn target_property(mut self, key: impl Into<String>, value: PropertyValue) -> Self {
        self.target_properties.push((key.into(), value));
        self
    }

    fn node_matches(
        node: &GraphNode,
        kind: &Option<NodeKind>,
        props: &[(String, PropertyValue)],
    ) -> bool {
        if let Some(k) = kind {
            if &node.kind != k {
                return false;
            }
        }
        props
            .iter()
            .all(|(key, value)| node.properties.get(key) == Some(value))
    }

    fn edge_matches(&self, edge: &GraphEdge) -> bool {
        if let Some(k) = &self.edge_kind {
            if &edge.kind != k {
                return false;
            }
        }
        self.edge_properties
            .iter()
            .all(|(key, value)| edge.properties.get(key) == Some(value))
    }
}

/// One edge instance satisfying a pattern
#[derive(Debug)]
pub struct PatternMatch<'a> {
    pub source: &'a GraphNode,
    pub edge: &'a GraphEdge,
    pub target: &'a GraphNode,
}

/// A shortest path between two nodes
#[derive(Debug, Clone, PartialEq)]
pub struct PathResult {
    /// Node ids from start to goal inclusive
    pub nodes: Vec<String>,
    /// Sum of edge weights (unweighted edges count 1.0)
    pub cost: f64,
}

impl PropertyGraph {
    /// Find every edge instance matching `pattern`. Results follow edge
    /// insertion order; a parallel edge that matches yields its own entry.
    pub fn query_pattern(&self, pattern: &Pattern) -> Vec<PatternMatch<'_>> {
        let mut matches = Vec::new();
        for edge_ref in self.graph.edge_references() {
            let edge = edge_ref.weight();
            if !pattern.edge_matches(edge) {
                continue;
            }
            let source = &self.graph[edge_ref.source()];
            let target = &self.graph[edge_ref.target()];
            if !Pattern::node_matches(source, &pattern.source_kind, &pattern.source_properties) {
                continue;
            }
            if !Pattern::node_matches(target, &pattern.target_kind, &pattern.target_properties) {
                continue;
            }
            matches.push(PatternMatch {
                source,
                edge,
                target,
            });
        }
        trace!("pattern matched {} edge(s)", matches.len());
        matches
    }

    /// Weighted shortest path from `a` to `b`, following edge direction.
    /// Edge cost is the edge's weight, defaulting to 1.0 (plain BFS
    /// distance when no edge carries a weight). `None` when either id is
    /// unknown or no path exists.
    pub fn shortest_path(&self, a: &str, b: &str) -> Option<PathResult> {
        let start = self.index_of(a)?;
        let goal = self.index_of(b)?;
        let (cost, path) = astar(
            &self.graph,
            start,
            |n| n == goal,
            |e| e.weight().weight.unwrap_or(1.0),
            |_| 0.0,
        )?;
        Some(PathResult {
            nodes: path
                .into_iter()
                .map(|i| self.graph[i].id.clone())
                .collect(),
            cost,
        })
    }

    /// Weakly connected components. Each component's ids are sorted, and
    /// components are ordered by their smallest id, so repeated calls on
    /// the same graph return the same partition.
    pub fn connected_components(&self) -> Vec<Vec<String>> {
        // Node indices are contiguous (nodes are never removed)
        let mut sets = UnionFind::<usize>::new(self.graph.node_count());
        for edge_ref in self.graph.edge_references() {
            sets.union(edge_ref.source().index(), edge_ref.target().index());
        }

        let mut by_root: std::collections::HashMap<usize, Vec<String>> =
            std::collections::HashMap::new();
        for index in self.graph.node_indices() {
            by_root
                .entry(sets.find(index.index()))
                .or_default()
                .push(self.graph[index].id.clone());
        }

        let mut components: Vec<Vec<String>> = by_root.into_values().collect();
        for component in &mut components {
            component.sort_unstable();
        }
        components.sort_by(|a, b| a[0].cmp(&b[0]));
        components
    }
}
