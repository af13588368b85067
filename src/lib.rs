//! Diagram Planner - a spatial layout planning core for entity-relation
//! diagrams
//!
//! Takes a typed property graph of entities and relationships (produced
//! by an upstream extractor) and computes a validated, non-overlapping 2D
//! layout for a downstream renderer: complexity scoring and strategy
//! selection, constraint formulation, Cassowary-based constraint solving
//! with priority-ordered guarantees under a wall-clock budget, and an
//! iterative validate/repair loop.
//!
//! # Example
//!
//! ```rust
//! use diagram_planner::{
//!     layout, EdgeKind, EngineConfig, GraphEdge, GraphNode, NodeKind, PropertyGraph,
//! };
//!
//! let mut graph = PropertyGraph::new();
//! graph.add_node(GraphNode::new("cart", NodeKind::Object))?;
//! graph.add_node(GraphNode::new("ramp", NodeKind::Object))?;
//! graph.add_node(GraphNode::new("ground", NodeKind::Object))?;
//! graph.add_edge(GraphEdge::new(EdgeKind::ConnectedTo, "cart", "ramp"))?;
//!
//! let outcome = layout(&graph, &EngineConfig::default())?;
//! assert_eq!(outcome.solution.positions.len(), 3);
//! assert!(outcome.quality.score > 0.0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod planner;
pub mod solver;
pub mod validate;

pub use config::{
    CanvasBounds, EngineConfig, PlannerConfig, ScoreWeights, SolverConfig, ValidationConfig,
};
pub use error::{ConfigError, StructuralError};
pub use geometry::{BoundingBox, PackAlgorithm, Point};
pub use graph::{
    EdgeKind, FlatGraph, GraphEdge, GraphNode, NodeKind, Pattern, Placement, PropertyGraph,
    PropertyValue,
};
pub use planner::{
    DiagramPlan, LayoutConstraint, NodeDimensions, Priority, Strategy, Subproblem,
};
pub use solver::{LayoutSolution, SolveDiagnostic};
pub use validate::{
    Issue, IssueCategory, QualityScore, Refinement, Rule, Severity, Validator,
};

use log::{debug, info};

/// Everything one pipeline run produces
#[derive(Debug, Clone)]
pub struct LayoutOutcome {
    /// The plan the final solution was solved under
    pub plan: DiagramPlan,
    /// Final positions. `satisfiable` is false when the required set
    /// could not be honored; the diagnostic says why.
    pub solution: LayoutSolution,
    pub quality: QualityScore,
    /// Refinement iterations spent
    pub iterations_used: u32,
}

/// Run the full pipeline with default validation rules:
/// plan → solve → (bounded replan on unsatisfiable) → refine.
///
/// Structural defects in the graph or plan fail fast; unsatisfiable
/// constraint sets, timeouts, and below-target quality are reported
/// inside the outcome, never as errors.
pub fn layout(
    graph: &PropertyGraph,
    config: &EngineConfig,
) -> Result<LayoutOutcome, StructuralError> {
    layout_with(graph, config, &Validator::new(config))
}

/// Like [`layout`], with a caller-built [`Validator`] carrying custom
/// style and domain-physics rules.
pub fn layout_with(
    graph: &PropertyGraph,
    config: &EngineConfig,
    validator: &Validator,
) -> Result<LayoutOutcome, StructuralError> {
    let dims = planner::node_dimensions(graph, &config.planner);
    let mut active_plan = planner::plan(graph, config);
    let mut solution = solver::solve(graph, &active_plan, &dims, config.canvas, &config.solver)?;

    // Unsatisfiable required set: replan once with decomposition before
    // giving up. Bounded so a hopeless graph cannot loop.
    if !solution.satisfiable
        && matches!(
            solution.diagnostic,
            Some(SolveDiagnostic::UnsatisfiableRequired { .. })
        )
        && !active_plan.is_decomposed()
    {
        let retry_plan = planner::plan_decomposed(graph, config);
        if retry_plan.is_decomposed() {
            debug!("replanning with decomposition after unsatisfiable solve");
            let retry =
                solver::solve(graph, &retry_plan, &dims, config.canvas, &config.solver)?;
            if retry.satisfiable {
                active_plan = retry_plan;
                solution = retry;
            }
        }
    }

    // Still not satisfiable (timeout or hard conflict): fall back to
    // heuristic placement so the renderer gets positions for every
    // node, keeping the verdict and diagnostic.
    if !solution.satisfiable {
        solution = heuristic_fallback(graph, &active_plan, &dims, config, solution)?;
    }

    let refined = validator.refine(graph, &active_plan, solution, &dims);
    info!(
        "layout: strategy {:?}, score {:.1}, {} iteration(s), satisfiable {}",
        active_plan.strategy,
        refined.quality.score,
        refined.iterations_used,
        refined.solution.satisfiable
    );
    Ok(LayoutOutcome {
        plan: active_plan,
        solution: refined.solution,
        quality: refined.quality,
        iterations_used: refined.iterations_used,
    })
}

/// Place everything by packing, keeping the failed solve's verdict and
/// diagnostic. The stripped plan keeps only bounds and no-overlap, which
/// packing satisfies by construction when the input fits.
fn heuristic_fallback(
    graph: &PropertyGraph,
    plan: &DiagramPlan,
    dims: &NodeDimensions,
    config: &EngineConfig,
    failed: LayoutSolution,
) -> Result<LayoutSolution, StructuralError> {
    let stripped = DiagramPlan {
        complexity: plan.complexity,
        strategy: Strategy::Heuristic,
        constraints: plan
            .constraints
            .iter()
            .filter(|c| {
                matches!(
                    c.kind,
                    planner::ConstraintKind::Bounds | planner::ConstraintKind::NoOverlap { .. }
                )
            })
            .cloned()
            .collect(),
        subproblems: Vec::new(),
    };
    let fallback = solver::solve(graph, &stripped, dims, config.canvas, &config.solver)?;
    debug!(
        "heuristic fallback placed {} node(s)",
        fallback.positions.len()
    );
    Ok(LayoutSolution {
        satisfiable: false,
        positions: fallback.positions,
        elapsed: failed.elapsed + fallback.elapsed,
        diagnostic: failed.diagnostic,
        packing_efficiency: fallback.packing_efficiency,
    })
}
