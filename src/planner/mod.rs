//! Diagram planning: complexity scoring, strategy selection, constraint
//! formulation, and decomposition
//!
//! The planner consumes the property graph and emits a [`DiagramPlan`]
//! for the solver. Planning never fails: an empty graph yields a trivial
//! heuristic plan with no constraints.

pub mod complexity;
pub mod constraints;
pub mod decompose;
pub mod strategy;
pub mod types;

pub use complexity::assess_complexity;
pub use constraints::formulate_constraints;
pub use decompose::decompose;
pub use strategy::select_strategy;
pub use types::{
    Axis, ConstraintKind, DiagramPlan, LayoutConstraint, NodeDimensions, Priority, Strategy,
    Subproblem,
};

use log::debug;

use crate::config::{EngineConfig, PlannerConfig};
use crate::graph::{NodeKind, PropertyGraph};

/// Build a plan for `graph`. Decomposes only when the graph is large
/// enough to make split solving worthwhile; [`plan_decomposed`] forces a
/// split regardless of size (used when replanning after an
/// unsatisfiable solve).
pub fn plan(graph: &PropertyGraph, config: &EngineConfig) -> DiagramPlan {
    plan_inner(graph, config, false)
}

/// Replan with decomposition forced on. Falls back to the undecomposed
/// plan when the graph has a single connected component.
pub fn plan_decomposed(graph: &PropertyGraph, config: &EngineConfig) -> DiagramPlan {
    plan_inner(graph, config, true)
}

fn plan_inner(graph: &PropertyGraph, config: &EngineConfig, force_decompose: bool) -> DiagramPlan {
    if graph.is_empty() {
        return DiagramPlan::trivial();
    }

    let complexity = assess_complexity(graph);
    let strategy = select_strategy(graph, complexity, &config.planner);
    let constraints = formulate_constraints(graph, strategy, config);

    let want_split =
        force_decompose || graph.node_count() > config.planner.decompose_node_limit;
    let subproblems = if want_split {
        decompose(graph, &constraints)
    } else {
        Vec::new()
    };

    debug!(
        "plan: strategy {:?}, {} constraint(s), {} subproblem(s)",
        strategy,
        constraints.len(),
        subproblems.len()
    );
    DiagramPlan {
        complexity,
        strategy,
        constraints,
        subproblems,
    }
}

/// Resolve every node's (width, height): the declared size when present,
/// otherwise the configured default. Regions default larger so they can
/// hold the members their `contains` edges promise.
pub fn node_dimensions(graph: &PropertyGraph, config: &PlannerConfig) -> NodeDimensions {
    let (dw, dh) = config.default_node_size;
    graph
        .get_nodes(None)
        .iter()
        .map(|n| {
            let size = n.size.unwrap_or(match n.kind {
                NodeKind::Region => (dw * 3.0, dh * 3.0),
                _ => (dw, dh),
            });
            (n.id.clone(), size)
        })
        .collect()
}
