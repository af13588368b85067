//! Typed directed property multigraph of entities and relationships
//!
//! The graph arrives pre-populated from an upstream extractor; this module
//! owns its storage and integrity. Construction-time mutators reject
//! structural defects (duplicate ids, dangling endpoints) immediately, all
//! reads are pure, and the only post-construction mutations are the
//! explicit enrichment calls (`set_placement`, `set_size`, `set_property`).

pub mod query;
pub mod types;

pub use query::{Pattern, PatternMatch, PathResult};
pub use types::{EdgeKind, FlatGraph, GraphEdge, GraphNode, NodeKind, Placement, PropertyValue};

use std::collections::HashMap;

use log::trace;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::error::StructuralError;
use crate::geometry::Point;

/// Typed directed multigraph with String node ids
#[derive(Debug, Clone, Default)]
pub struct PropertyGraph {
    pub(crate) graph: DiGraph<GraphNode, GraphEdge>,
    pub(crate) ids: HashMap<String, NodeIndex>,
}

impl PropertyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from its flat representation, re-validating structure.
    pub fn from_flat(flat: FlatGraph) -> Result<Self, StructuralError> {
        let mut graph = Self::new();
        for node in flat.nodes {
            graph.add_node(node)?;
        }
        for edge in flat.edges {
            graph.add_edge(edge)?;
        }
        Ok(graph)
    }

    /// Flatten to a node/edge-list for persistence or handoff.
    pub fn to_flat(&self) -> FlatGraph {
        FlatGraph {
            nodes: self.graph.node_weights().cloned().collect(),
            edges: self.graph.edge_weights().cloned().collect(),
        }
    }

    // ── Mutators ──────────────────────────────────────────────────────

    /// Add a node. Fails with `DuplicateId` when the id is taken.
    pub fn add_node(&mut self, node: GraphNode) -> Result<(), StructuralError> {
        if self.ids.contains_key(&node.id) {
            return Err(StructuralError::duplicate(&node.id));
        }
        trace!("add node '{}' ({:?})", node.id, node.kind);
        let id = node.id.clone();
        let index = self.graph.add_node(node);
        self.ids.insert(id, index);
        Ok(())
    }

    /// Add an edge. Fails with `UnknownNode` when an endpoint is missing.
    /// Parallel edges between the same pair are allowed.
    pub fn add_edge(&mut self, edge: GraphEdge) -> Result<(), StructuralError> {
        let source = self.index_of(&edge.source).ok_or_else(|| {
            StructuralError::unknown_node(&edge.source, edge.kind.name())
        })?;
        let target = self.index_of(&edge.target).ok_or_else(|| {
            StructuralError::unknown_node(&edge.target, edge.kind.name())
        })?;
        trace!(
            "add edge {} -[{}]-> {}",
            edge.source,
            edge.kind.name(),
            edge.target
        );
        self.graph.add_edge(source, target, edge);
        Ok(())
    }

    /// Enrichment: replace a node's placement (e.g. an upstream domain
    /// interpreter pinning positions after construction).
    pub fn set_placement(&mut self, id: &str, placement: Placement) -> Result<(), StructuralError> {
        let index = self
            .index_of(id)
            .ok_or_else(|| StructuralError::unknown_node(id, "placement"))?;
        self.graph[index].placement = placement;
        Ok(())
    }

    /// Enrichment: declare or update a node's size.
    pub fn set_size(&mut self, id: &str, width: f64, height: f64) -> Result<(), StructuralError> {
        let index = self
            .index_of(id)
            .ok_or_else(|| StructuralError::unknown_node(id, "size"))?;
        self.graph[index].size = Some((width, height));
        Ok(())
    }

    /// Enrichment: set a node property.
    pub fn set_property(
        &mut self,
        id: &str,
        key: impl Into<String>,
        value: PropertyValue,
    ) -> Result<(), StructuralError> {
        let index = self
            .index_of(id)
            .ok_or_else(|| StructuralError::unknown_node(id, "property"))?;
        self.graph[index].properties.insert(key.into(), value);
        Ok(())
    }

    // ── Reads ─────────────────────────────────────────────────────────

    pub(crate) fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.ids.get(id).copied()
    }

    /// Look up a node by id
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.index_of(id).map(|i| &self.graph[i])
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.ids.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// All node ids, sorted
    pub fn node_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.ids.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// All nodes, optionally filtered by kind, sorted by id
    pub fn get_nodes(&self, kind: Option<&NodeKind>) -> Vec<&GraphNode> {
        let mut nodes: Vec<&GraphNode> = self
            .graph
            .node_weights()
            .filter(|n| kind.map_or(true, |k| &n.kind == k))
            .collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        nodes
    }

    /// All edges, optionally filtered by endpoint and kind
    pub fn get_edges(
        &self,
        source: Option<&str>,
        target: Option<&str>,
        kind: Option<&EdgeKind>,
    ) -> Vec<&GraphEdge> {
        self.graph
            .edge_weights()
            .filter(|e| source.map_or(true, |s| e.source == s))
            .filter(|e| target.map_or(true, |t| e.target == t))
            .filter(|e| kind.map_or(true, |k| &e.kind == k))
            .collect()
    }

    /// All edges in insertion order
    pub fn edges(&self) -> impl Iterator<Item = &GraphEdge> {
        self.graph.edge_weights()
    }

    /// Edges that carry layout meaning
    pub fn spatial_edges(&self) -> Vec<&GraphEdge> {
        self.graph.edge_weights().filter(|e| e.is_spatial()).collect()
    }

    pub fn spatial_edge_count(&self) -> usize {
        self.graph.edge_weights().filter(|e| e.is_spatial()).count()
    }

    /// Nodes adjacent to `id` in either direction, deduplicated and
    /// sorted by id. Empty for an unknown id.
    pub fn neighbors(&self, id: &str) -> Vec<&GraphNode> {
        let Some(index) = self.index_of(id) else {
            return Vec::new();
        };
        let mut out: Vec<&GraphNode> = self
            .graph
            .neighbors_undirected(index)
            .map(|i| &self.graph[i])
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out.dedup_by(|a, b| a.id == b.id);
        out
    }

    /// Upstream-locked position of a node, when set
    pub fn locked_position(&self, id: &str) -> Option<Point> {
        self.node(id).and_then(|n| n.placement.locked_position())
    }

    /// True when every node that is not a label/annotation arrives with a
    /// locked position; the planner then solves only for the rest.
    pub fn fully_locked_except_annotations(&self) -> bool {
        let mut saw_locked = false;
        for node in self.graph.node_weights() {
            if node.kind.is_annotation() {
                continue;
            }
            if !node.placement.is_locked() {
                return false;
            }
            saw_locked = true;
        }
        saw_locked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PropertyGraph {
        let mut g = PropertyGraph::new();
        g.add_node(GraphNode::new("block", NodeKind::Object)).unwrap();
        g.add_node(GraphNode::new("ramp", NodeKind::Object)).unwrap();
        g.add_node(GraphNode::new("gravity", NodeKind::Force)).unwrap();
        g.add_edge(GraphEdge::new(EdgeKind::LocatedAt, "block", "ramp"))
            .unwrap();
        g.add_edge(GraphEdge::new(EdgeKind::ActsOn, "gravity", "block"))
            .unwrap();
        g
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut g = sample();
        let err = g
            .add_node(GraphNode::new("block", NodeKind::Concept))
            .unwrap_err();
        assert_eq!(err, StructuralError::duplicate("block"));
        // The graph is unchanged
        assert_eq!(g.node_count(), 3);
    }

    #[test]
    fn test_dangling_edge_rejected() {
        let mut g = sample();
        let err = g
            .add_edge(GraphEdge::new(EdgeKind::ConnectedTo, "block", "ghost"))
            .unwrap_err();
        assert!(matches!(err, StructuralError::UnknownNode { .. }));
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn test_parallel_edges_allowed() {
        let mut g = sample();
        g.add_edge(GraphEdge::new(EdgeKind::LocatedAt, "block", "ramp"))
            .unwrap();
        assert_eq!(g.get_edges(Some("block"), Some("ramp"), None).len(), 2);
    }

    #[test]
    fn test_get_nodes_by_kind() {
        let g = sample();
        let forces = g.get_nodes(Some(&NodeKind::Force));
        assert_eq!(forces.len(), 1);
        assert_eq!(forces[0].id, "gravity");
        assert_eq!(g.get_nodes(None).len(), 3);
    }

    #[test]
    fn test_get_edges_filters() {
        let g = sample();
        assert_eq!(g.get_edges(Some("gravity"), None, None).len(), 1);
        assert_eq!(g.get_edges(None, Some("ramp"), None).len(), 1);
        assert_eq!(
            g.get_edges(None, None, Some(&EdgeKind::ActsOn))[0].source,
            "gravity"
        );
        assert!(g.get_edges(Some("ramp"), Some("gravity"), None).is_empty());
    }

    #[test]
    fn test_neighbors_undirected_sorted() {
        let g = sample();
        let around_block: Vec<&str> = g.neighbors("block").iter().map(|n| n.id.as_str()).collect();
        assert_eq!(around_block, vec!["gravity", "ramp"]);
        assert!(g.neighbors("ghost").is_empty());
    }

    #[test]
    fn test_spatial_edge_count() {
        let g = sample();
        // located-at is spatial, acts-on is not
        assert_eq!(g.spatial_edge_count(), 1);
    }

    #[test]
    fn test_flat_round_trip() {
        let g = sample();
        let flat = g.to_flat();
        let restored = PropertyGraph::from_flat(flat.clone()).unwrap();
        assert_eq!(restored.to_flat(), flat);
    }

    #[test]
    fn test_from_flat_rejects_dangling_edge() {
        let mut flat = sample().to_flat();
        flat.edges
            .push(GraphEdge::new(EdgeKind::Contains, "ghost", "block"));
        assert!(PropertyGraph::from_flat(flat).is_err());
    }

    #[test]
    fn test_enrichment_calls() {
        let mut g = sample();
        g.set_placement("block", Placement::Locked(Point::new(5.0, 6.0)))
            .unwrap();
        g.set_size("block", 40.0, 20.0).unwrap();
        let node = g.node("block").unwrap();
        assert_eq!(node.placement.locked_position().unwrap().x, 5.0);
        assert_eq!(node.size, Some((40.0, 20.0)));
        assert!(g.set_size("ghost", 1.0, 1.0).is_err());
    }

    #[test]
    fn test_fully_locked_except_annotations() {
        let mut g = PropertyGraph::new();
        g.add_node(GraphNode::new("a", NodeKind::Object).locked_at(0.0, 0.0))
            .unwrap();
        g.add_node(GraphNode::new("b", NodeKind::Object).locked_at(10.0, 0.0))
            .unwrap();
        g.add_node(GraphNode::new("note", NodeKind::Label)).unwrap();
        assert!(g.fully_locked_except_annotations());

        g.set_placement("b", Placement::Free).unwrap();
        assert!(!g.fully_locked_except_annotations());

        // A graph with nothing but labels is not "fully locked"
        let mut labels_only = PropertyGraph::new();
        labels_only
            .add_node(GraphNode::new("note", NodeKind::Label))
            .unwrap();
        assert!(!labels_only.fully_locked_except_annotations());
    }
}
