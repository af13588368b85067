//! Constraint solving
//!
//! `solve` turns a plan into concrete positions with priority-ordered
//! guarantees: Required constraints provably hold in any solution
//! reported satisfiable (they are re-verified geometrically after
//! extraction), lower priorities are added best-effort in priority
//! order, and the whole call is bounded by a wall-clock deadline against
//! a monotonic clock. Plans with no relational constraints skip the
//! constraint machinery entirely and fall back to rectangle packing.

mod heuristic;
mod session;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{CanvasBounds, SolverConfig};
use crate::error::StructuralError;
use crate::geometry::{bounding_box, pack_rectangles, BoundingBox, Point};
use crate::graph::PropertyGraph;
use crate::planner::{
    DiagramPlan, LayoutConstraint, NodeDimensions, Priority, Strategy, Subproblem,
};

use heuristic::{place_annotations, place_by_packing, seed_rects};
use session::{AddFailure, ConstraintSession};

/// Why a solve did not produce a satisfiable layout
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "reason")]
pub enum SolveDiagnostic {
    /// A Required constraint cannot hold together with the rest of the
    /// required set
    #[error("required {constraint} constraint over [{}] is unsatisfiable: {detail}", nodes.join(", "))]
    UnsatisfiableRequired {
        constraint: String,
        nodes: Vec<String>,
        detail: String,
    },

    /// The wall-clock budget ran out before the required set was placed
    #[error("solve exceeded its {budget_ms}ms budget")]
    Timeout { budget_ms: u64 },

    /// Solver-internal fault (not an input problem)
    #[error("internal solver fault: {detail}")]
    Internal { detail: String },
}

/// Solver output: positions plus the satisfiability verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutSolution {
    /// True when every Required constraint holds in `positions`
    pub satisfiable: bool,
    /// Node id → top-left corner. Locked nodes keep their pinned
    /// positions; sizes travel separately.
    pub positions: HashMap<String, Point>,
    /// Wall-clock time the solve took
    pub elapsed: Duration,
    /// Set when `satisfiable` is false
    pub diagnostic: Option<SolveDiagnostic>,
    /// Packing density, reported when placement was heuristic
    pub packing_efficiency: Option<f64>,
}

impl LayoutSolution {
    /// Rectangle of one node under this solution
    pub fn rect_of(&self, id: &str, dims: &NodeDimensions) -> Option<BoundingBox> {
        let p = self.positions.get(id)?;
        let (w, h) = dims.get(id).copied().unwrap_or((0.0, 0.0));
        Some(BoundingBox::new(p.x, p.y, w, h))
    }
}

/// Solve `plan` for concrete positions.
///
/// Fails fast with a `StructuralError` when a constraint references a
/// node the graph does not have; everything else, unsatisfiable
/// required sets and timeouts included, is reported inside the returned solution.
pub fn solve(
    graph: &PropertyGraph,
    plan: &DiagramPlan,
    dims: &NodeDimensions,
    canvas: CanvasBounds,
    options: &SolverConfig,
) -> Result<LayoutSolution, StructuralError> {
    let start = Instant::now();
    let deadline = start + options.timeout();

    // Every participant must exist at solve time
    for constraint in &plan.constraints {
        for id in &constraint.nodes {
            if !graph.contains_node(id) {
                return Err(StructuralError::unknown_constraint_node(
                    id,
                    constraint.kind.name(),
                ));
            }
        }
    }

    // Locked nodes keep their upstream positions in every outcome
    let mut positions: HashMap<String, Point> = graph
        .get_nodes(None)
        .into_iter()
        .filter_map(|n| Some((n.id.clone(), n.placement.locked_position()?)))
        .collect();
    let free: Vec<&str> = graph
        .get_nodes(None)
        .into_iter()
        .filter(|n| !n.placement.is_locked())
        .map(|n| n.id.as_str())
        .collect();

    let mut packing_efficiency = None;
    let mut outcome: Result<(), SolveDiagnostic> = Ok(());

    if !plan.has_relational_constraints() && plan.strategy != Strategy::Symbolic {
        // No relational structure: geometric packing is the whole answer
        let placed = place_by_packing(
            &free,
            dims,
            &canvas,
            options.pack_algorithm,
            spacing_of(plan),
        );
        packing_efficiency = Some(placed.efficiency);
        positions.extend(placed.positions);
    } else {
        let free_seed_positions = match plan.strategy {
            Strategy::Symbolic => place_annotations(
                graph,
                &free,
                &positions,
                dims,
                &canvas,
                spacing_of(plan),
            ),
            _ => {
                place_by_packing(&free, dims, &canvas, options.pack_algorithm, spacing_of(plan))
                    .positions
            }
        };

        if plan.is_decomposed() {
            outcome = solve_decomposed(
                graph,
                plan,
                dims,
                canvas,
                &free_seed_positions,
                &mut positions,
                deadline,
                options,
            );
        } else {
            let all_nodes: Vec<String> =
                graph.node_ids().iter().map(|s| s.to_string()).collect();
            outcome = solve_partition(
                graph,
                &all_nodes,
                &plan.constraints,
                dims,
                canvas,
                &free_seed_positions,
                deadline,
                options.timeout_ms,
            )
            .map(|solved| {
                positions.extend(solved);
            });
        }
    }

    // Soundness: a solution is only satisfiable when the whole required
    // set demonstrably holds in the extracted positions.
    let mut diagnostic = outcome.err();
    if diagnostic.is_none() {
        diagnostic = verify_required(plan, &positions, dims, &canvas, options.verify_epsilon);
    }

    let satisfiable = diagnostic.is_none();
    if let Some(d) = &diagnostic {
        warn!("solve not satisfiable: {}", d);
    }
    Ok(LayoutSolution {
        satisfiable,
        positions,
        elapsed: start.elapsed(),
        diagnostic,
        packing_efficiency,
    })
}

/// The clearance the plan's no-overlap constraints ask for; falls back
/// to a small default when the plan has none.
fn spacing_of(plan: &DiagramPlan) -> f64 {
    plan.constraints
        .iter()
        .find_map(|c| match c.kind {
            crate::planner::ConstraintKind::NoOverlap { margin } => Some(margin),
            _ => None,
        })
        .unwrap_or(10.0)
}

/// Check every Required constraint against concrete positions.
fn verify_required(
    plan: &DiagramPlan,
    positions: &HashMap<String, Point>,
    dims: &NodeDimensions,
    canvas: &CanvasBounds,
    eps: f64,
) -> Option<SolveDiagnostic> {
    for constraint in plan.required_constraints() {
        if let Some(detail) = constraint.violation(positions, dims, canvas, eps) {
            return Some(SolveDiagnostic::UnsatisfiableRequired {
                constraint: constraint.kind.name().to_string(),
                nodes: constraint.nodes.clone(),
                detail,
            });
        }
    }
    None
}

/// Solve one partition of the graph with its local constraints.
#[allow(clippy::too_many_arguments)]
fn solve_partition(
    graph: &PropertyGraph,
    nodes: &[String],
    constraints: &[LayoutConstraint],
    dims: &NodeDimensions,
    canvas: CanvasBounds,
    free_seed_positions: &HashMap<String, Point>,
    deadline: Instant,
    budget_ms: u64,
) -> Result<HashMap<String, Point>, SolveDiagnostic> {
    let usable = canvas.usable_area();
    let seeds = seed_rects(nodes, free_seed_positions, graph, dims);
    let locked: HashMap<String, Point> = nodes
        .iter()
        .filter_map(|id| Some((id.clone(), graph.locked_position(id)?)))
        .collect();

    let mut session =
        ConstraintSession::new(&seeds, dims, &locked).map_err(internal_diag)?;

    // Required first, then high, medium, low. Within a priority the
    // planner's emission order is kept.
    let mut ordered: Vec<&LayoutConstraint> = constraints.iter().collect();
    ordered.sort_by_key(|c| c.priority);

    for constraint in ordered {
        if Instant::now() >= deadline {
            return Err(SolveDiagnostic::Timeout { budget_ms });
        }
        match session.apply(constraint, usable) {
            Ok(()) => {}
            Err(AddFailure::Unsatisfiable { detail }) => {
                if constraint.priority == Priority::Required {
                    return Err(SolveDiagnostic::UnsatisfiableRequired {
                        constraint: constraint.kind.name().to_string(),
                        nodes: constraint.nodes.clone(),
                        detail,
                    });
                }
                debug!("discarded {} ({})", constraint.describe(), detail);
            }
            Err(other) => return Err(internal_diag(other)),
        }
    }

    Ok(session.extract())
}

fn internal_diag(failure: AddFailure) -> SolveDiagnostic {
    match failure {
        AddFailure::Unsatisfiable { detail } | AddFailure::Internal(detail) => {
            SolveDiagnostic::Internal { detail }
        }
    }
}

/// Solve each subproblem independently, then compose the solved groups:
/// groups containing locked nodes stay where upstream put them, the rest
/// are packed into the canvas and translated into place. Subproblems are
/// processed in their deterministic plan order, so the merge is
/// reproducible.
#[allow(clippy::too_many_arguments)]
fn solve_decomposed(
    graph: &PropertyGraph,
    plan: &DiagramPlan,
    dims: &NodeDimensions,
    canvas: CanvasBounds,
    free_seed_positions: &HashMap<String, Point>,
    positions: &mut HashMap<String, Point>,
    deadline: Instant,
    options: &SolverConfig,
) -> Result<(), SolveDiagnostic> {
    let mut solved_groups: Vec<(&Subproblem, HashMap<String, Point>)> = Vec::new();
    for subproblem in &plan.subproblems {
        if Instant::now() >= deadline {
            return Err(SolveDiagnostic::Timeout {
                budget_ms: options.timeout_ms,
            });
        }
        let solved = solve_partition(
            graph,
            &subproblem.nodes,
            &subproblem.constraints,
            dims,
            canvas,
            free_seed_positions,
            deadline,
            options.timeout_ms,
        )?;
        solved_groups.push((subproblem, solved));
    }

    // Outer arrangement: pinned groups stay, free groups are packed
    let spacing = spacing_of(plan);
    let mut free_groups: Vec<usize> = Vec::new();
    for (i, (subproblem, solved)) in solved_groups.iter().enumerate() {
        let pinned = subproblem
            .nodes
            .iter()
            .any(|id| graph.locked_position(id).is_some());
        if pinned {
            positions.extend(solved.clone());
        } else {
            free_groups.push(i);
        }
    }

    let group_boxes: Vec<BoundingBox> = free_groups
        .iter()
        .map(|&i| {
            let (subproblem, solved) = &solved_groups[i];
            group_bbox(subproblem, solved, dims)
        })
        .collect();
    let rects: Vec<(f64, f64)> = group_boxes.iter().map(|b| (b.width, b.height)).collect();
    let packed = pack_rectangles(
        &rects,
        canvas.bounding_box(),
        options.pack_algorithm,
        spacing.max(canvas.margin),
    );

    for (slot, &i) in free_groups.iter().enumerate() {
        let (_, solved) = &solved_groups[i];
        let cell = packed.placements[slot];
        let dx = cell.x - group_boxes[slot].x;
        let dy = cell.y - group_boxes[slot].y;
        for (id, p) in solved {
            positions.insert(id.clone(), Point::new(p.x + dx, p.y + dy));
        }
    }
    Ok(())
}

fn group_bbox(
    subproblem: &Subproblem,
    solved: &HashMap<String, Point>,
    dims: &NodeDimensions,
) -> BoundingBox {
    let rects: Vec<BoundingBox> = subproblem
        .nodes
        .iter()
        .filter_map(|id| {
            let p = solved.get(id)?;
            let (w, h) = dims.get(id).copied().unwrap_or((0.0, 0.0));
            Some(BoundingBox::new(p.x, p.y, w, h))
        })
        .collect();
    bounding_box(&rects)
}
