//! Decomposition into independent subproblems
//!
//! Large graphs are split along their natural seams so the solver cost
//! stays bounded: region membership gives the partition when regions are
//! present (the `Contains` edges already tie a region and its members
//! into one group), and connected components give it otherwise. Each
//! subproblem takes exactly the constraints whose participants all lie
//! inside it; cross-partition separation is handled by the outer
//! arrangement step when the solved groups are composed.

use std::collections::HashSet;

use log::debug;

use crate::graph::PropertyGraph;

use super::types::{LayoutConstraint, Subproblem};

/// Partition `graph` into independently solvable subproblems. Returns an
/// empty vector when the graph is one connected block (nothing to split).
pub fn decompose(graph: &PropertyGraph, constraints: &[LayoutConstraint]) -> Vec<Subproblem> {
    let components = graph.connected_components();
    if components.len() <= 1 {
        return Vec::new();
    }

    let subproblems: Vec<Subproblem> = components
        .into_iter()
        .map(|nodes| {
            let members: HashSet<&str> = nodes.iter().map(String::as_str).collect();
            let local: Vec<LayoutConstraint> = constraints
                .iter()
                .filter(|c| c.nodes.iter().all(|id| members.contains(id.as_str())))
                .cloned()
                .collect();
            Subproblem {
                nodes,
                constraints: local,
            }
        })
        .collect();

    debug!(
        "decomposed into {} subproblem(s): {:?}",
        subproblems.len(),
        subproblems
            .iter()
            .map(|s| s.nodes.len())
            .collect::<Vec<_>>()
    );
    subproblems
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeKind, GraphEdge, GraphNode, NodeKind};

    fn two_clusters() -> PropertyGraph {
        let mut g = PropertyGraph::new();
        for id in ["a1", "a2", "b1", "b2"] {
            g.add_node(GraphNode::new(id, NodeKind::Object)).unwrap();
        }
        g.add_edge(GraphEdge::new(EdgeKind::ConnectedTo, "a1", "a2"))
            .unwrap();
        g.add_edge(GraphEdge::new(EdgeKind::ConnectedTo, "b1", "b2"))
            .unwrap();
        g
    }

    #[test]
    fn test_splits_into_components() {
        let g = two_clusters();
        let subproblems = decompose(&g, &[]);
        assert_eq!(subproblems.len(), 2);
        assert_eq!(subproblems[0].nodes, vec!["a1", "a2"]);
        assert_eq!(subproblems[1].nodes, vec!["b1", "b2"]);
    }

    #[test]
    fn test_constraints_partitioned_by_membership() {
        let g = two_clusters();
        let constraints = vec![
            LayoutConstraint::no_overlap("a1", "a2", 10.0),
            LayoutConstraint::no_overlap("b1", "b2", 10.0),
            // Crosses the partition; belongs to neither subproblem
            LayoutConstraint::no_overlap("a1", "b1", 10.0),
            LayoutConstraint::bounds("a1"),
        ];
        let subproblems = decompose(&g, &constraints);
        assert_eq!(subproblems[0].constraints.len(), 2); // a1/a2 overlap + a1 bounds
        assert_eq!(subproblems[1].constraints.len(), 1);
    }

    #[test]
    fn test_single_component_not_decomposed() {
        let mut g = two_clusters();
        g.add_edge(GraphEdge::new(EdgeKind::RelatedTo, "a2", "b1"))
            .unwrap();
        assert!(decompose(&g, &[]).is_empty());
    }

    #[test]
    fn test_region_membership_stays_together() {
        let mut g = PropertyGraph::new();
        g.add_node(GraphNode::new("zone", NodeKind::Region)).unwrap();
        for id in ["x", "y", "lone"] {
            g.add_node(GraphNode::new(id, NodeKind::Object)).unwrap();
        }
        g.add_edge(GraphEdge::new(EdgeKind::Contains, "zone", "x"))
            .unwrap();
        g.add_edge(GraphEdge::new(EdgeKind::Contains, "zone", "y"))
            .unwrap();
        let subproblems = decompose(&g, &[]);
        assert_eq!(subproblems.len(), 2);
        // The region and its members form one partition
        assert_eq!(subproblems[1].nodes, vec!["x", "y", "zone"]);
        assert_eq!(subproblems[0].nodes, vec!["lone"]);
    }

    #[test]
    fn test_deterministic() {
        let g = two_clusters();
        assert_eq!(decompose(&g, &[]), decompose(&g, &[]));
    }
}
