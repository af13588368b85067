//! Complexity scoring
//!
//! A deterministic weighted function of graph shape: how many entities,
//! how densely related, how much of the relational structure carries
//! layout meaning, and how heavy the domain mix is (regions and forces
//! bring containment and direction semantics that cost solver effort).

use log::debug;

use crate::graph::{NodeKind, PropertyGraph};

/// Node count at which the node term saturates
const NODE_SATURATION: f64 = 25.0;
/// Edge count at which the edge term saturates
const EDGE_SATURATION: f64 = 40.0;
/// Spatial edge count at which the spatial term saturates
const SPATIAL_SATURATION: f64 = 10.0;

const NODE_WEIGHT: f64 = 0.35;
const EDGE_WEIGHT: f64 = 0.25;
const SPATIAL_WEIGHT: f64 = 0.30;
const DOMAIN_WEIGHT: f64 = 0.10;

/// Score how much solving effort `graph` deserves, in [0, 1].
///
/// Pure and stable: repeated calls on an unmodified graph return the
/// same value.
pub fn assess_complexity(graph: &PropertyGraph) -> f64 {
    if graph.is_empty() {
        return 0.0;
    }

    let node_term = (graph.node_count() as f64 / NODE_SATURATION).min(1.0);
    let edge_term = (graph.edge_count() as f64 / EDGE_SATURATION).min(1.0);
    let spatial_term = (graph.spatial_edge_count() as f64 / SPATIAL_SATURATION).min(1.0);

    // Domain multiplier: fraction of nodes whose kind implies extra
    // geometric obligations (containment regions, directed forces).
    let heavy = graph.get_nodes(Some(&NodeKind::Region)).len()
        + graph.get_nodes(Some(&NodeKind::Force)).len();
    let domain_term = (heavy as f64 / graph.node_count() as f64).min(1.0);

    let score = (NODE_WEIGHT * node_term
        + EDGE_WEIGHT * edge_term
        + SPATIAL_WEIGHT * spatial_term
        + DOMAIN_WEIGHT * domain_term)
        .clamp(0.0, 1.0);
    debug!(
        "complexity {:.3} (nodes {:.2}, edges {:.2}, spatial {:.2}, domain {:.2})",
        score, node_term, edge_term, spatial_term, domain_term
    );
    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeKind, GraphEdge, GraphNode, NodeKind};

    fn graph_with(nodes: usize, spatial_edges: usize) -> PropertyGraph {
        let mut g = PropertyGraph::new();
        for i in 0..nodes {
            g.add_node(GraphNode::new(format!("n{}", i), NodeKind::Object))
                .unwrap();
        }
        for i in 0..spatial_edges {
            g.add_edge(GraphEdge::new(
                EdgeKind::ConnectedTo,
                format!("n{}", i % nodes),
                format!("n{}", (i + 1) % nodes),
            ))
            .unwrap();
        }
        g
    }

    #[test]
    fn test_empty_graph_scores_zero() {
        assert_eq!(assess_complexity(&PropertyGraph::new()), 0.0);
    }

    #[test]
    fn test_score_in_unit_range() {
        for (n, e) in [(1, 0), (5, 3), (50, 80), (200, 100)] {
            let score = assess_complexity(&graph_with(n, e));
            assert!((0.0..=1.0).contains(&score), "score {} out of range", score);
        }
    }

    #[test]
    fn test_deterministic() {
        let g = graph_with(12, 6);
        let first = assess_complexity(&g);
        for _ in 0..10 {
            assert_eq!(assess_complexity(&g), first);
        }
    }

    #[test]
    fn test_more_structure_scores_higher() {
        let sparse = assess_complexity(&graph_with(3, 0));
        let dense = assess_complexity(&graph_with(20, 8));
        assert!(dense > sparse);
    }

    #[test]
    fn test_ten_plain_nodes_stay_below_heuristic_cutoff() {
        // A bag of unrelated objects is simple regardless of count
        let score = assess_complexity(&graph_with(10, 0));
        assert!(score < 0.15, "score {} should be below 0.15", score);
    }

    #[test]
    fn test_domain_mix_raises_score() {
        // Same node and edge counts; only the kind mix differs
        let plain = graph_with(6, 0);
        let mut heavy = graph_with(4, 0);
        heavy
            .add_node(GraphNode::new("field", NodeKind::Region))
            .unwrap();
        heavy
            .add_node(GraphNode::new("push", NodeKind::Force))
            .unwrap();
        assert!(assess_complexity(&heavy) > assess_complexity(&plain));
    }
}
