//! Strategy selection
//!
//! Explicit relational structure dominates the scalar complexity score: a
//! graph carrying layout-relevant edges never degrades to pure packing,
//! no matter how low its complexity lands. The scalar score only decides
//! between packing and constraint solving for graphs with no spatial
//! edges at all.

use log::debug;

use crate::config::PlannerConfig;
use crate::graph::PropertyGraph;

use super::types::Strategy;

/// Choose the solving strategy for `graph`.
pub fn select_strategy(graph: &PropertyGraph, complexity: f64, config: &PlannerConfig) -> Strategy {
    let nodes = graph.node_count();
    let spatial = graph.spatial_edge_count();

    let strategy = if graph.fully_locked_except_annotations() {
        // Upstream pinned everything that matters; only annotations are
        // left to place.
        Strategy::Symbolic
    } else if (spatial >= 1 && nodes >= 3) || spatial >= 3 {
        if nodes >= config.hybrid_node_limit {
            Strategy::Hybrid
        } else {
            Strategy::ConstraintBased
        }
    } else if complexity < config.heuristic_complexity_cutoff {
        Strategy::Heuristic
    } else if nodes >= config.hybrid_node_limit {
        Strategy::Hybrid
    } else {
        Strategy::ConstraintBased
    };

    debug!(
        "strategy {:?} (nodes {}, spatial edges {}, complexity {:.3})",
        strategy, nodes, spatial, complexity
    );
    strategy
}
