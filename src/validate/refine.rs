//! The refinement loop
//!
//! SCORE → (score ≥ threshold ? DONE : APPLY_FIX) → SCORE → … until the
//! target is reached or the iteration budget runs out. The best-scoring
//! solution seen is what comes back, not necessarily the last one, and a
//! fix that fails to clear the noise threshold is reverted so the loop
//! cannot oscillate between equally bad layouts. Never panics, and never
//! trades a Required constraint for a better score: every candidate is
//! re-validated, and Required violations zero out the layout component.

use log::debug;

use crate::graph::PropertyGraph;
use crate::planner::{DiagramPlan, NodeDimensions};
use crate::solver::LayoutSolution;

use super::{QualityScore, Validator};

/// Result of a refinement session
#[derive(Debug, Clone)]
pub struct Refinement {
    pub solution: LayoutSolution,
    pub quality: QualityScore,
    /// Fix-and-rescore rounds actually spent (0 when the input already
    /// met the target)
    pub iterations_used: u32,
}

impl Validator {
    /// Iteratively repair `solution` until it reaches the target score
    /// or the iteration budget is exhausted.
    pub fn refine(
        &self,
        graph: &PropertyGraph,
        plan: &DiagramPlan,
        solution: LayoutSolution,
        dims: &NodeDimensions,
    ) -> Refinement {
        let target = self.config().target_score;
        let noise = self.config().noise_threshold;
        let max_iterations = self.config().max_iterations;

        let mut current_quality = self.validate(graph, plan, &solution, dims);
        let mut current = solution;
        if current_quality.score >= target {
            return Refinement {
                solution: current,
                quality: current_quality,
                iterations_used: 0,
            };
        }

        let mut best = (current.clone(), current_quality.clone());
        let mut iterations_used = 0;

        for iteration in 1..=max_iterations {
            let fixable: Vec<_> = current_quality
                .issues
                .iter()
                .filter(|i| i.category.is_fixable())
                .cloned()
                .collect();
            if fixable.is_empty() {
                debug!("refine: nothing fixable after {} iteration(s)", iterations_used);
                break;
            }

            let (candidate, fixes) = self.auto_fix(graph, plan, &current, dims, &fixable);
            if fixes.is_empty() {
                break;
            }
            let mut candidate_quality = self.validate(graph, plan, &candidate, dims);
            candidate_quality.applied_fixes = current_quality.applied_fixes.clone();
            candidate_quality.applied_fixes.extend(fixes);
            iterations_used = iteration;
            debug!(
                "refine iteration {}: {:.1} -> {:.1}",
                iteration, current_quality.score, candidate_quality.score
            );

            if candidate_quality.score > best.1.score + noise {
                best = (candidate.clone(), candidate_quality.clone());
                current = candidate;
                current_quality = candidate_quality;
                if current_quality.score >= target {
                    break;
                }
            } else {
                // Below the noise threshold: revert and stop rather than
                // wander between equally bad layouts
                break;
            }
        }

        Refinement {
            solution: best.0,
            quality: best.1,
            iterations_used,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::geometry::Point;
    use crate::graph::{GraphNode, NodeKind};
    use crate::planner::{LayoutConstraint, Strategy};
    use crate::validate::IssueCategory;
    use std::collections::HashMap;
    use std::time::Duration;

    fn setup(positions: &[(&str, f64, f64)]) -> (PropertyGraph, NodeDimensions, LayoutSolution) {
        let mut g = PropertyGraph::new();
        let mut dims = NodeDimensions::new();
        let mut map = HashMap::new();
        for &(id, x, y) in positions {
            g.add_node(GraphNode::new(id, NodeKind::Object)).unwrap();
            dims.insert(id.to_string(), (100.0, 50.0));
            map.insert(id.to_string(), Point::new(x, y));
        }
        let solution = LayoutSolution {
            satisfiable: true,
            positions: map,
            elapsed: Duration::ZERO,
            diagnostic: None,
            packing_efficiency: None,
        };
        (g, dims, solution)
    }

    fn plan_with(constraints: Vec<LayoutConstraint>) -> DiagramPlan {
        DiagramPlan {
            complexity: 0.1,
            strategy: Strategy::ConstraintBased,
            constraints,
            subproblems: Vec::new(),
        }
    }

    #[test]
    fn test_good_solution_returns_immediately() {
        let (g, dims, solution) = setup(&[("a", 200.0, 275.0), ("b", 500.0, 275.0)]);
        let validator = Validator::new(&EngineConfig::default());
        let refined = validator.refine(&g, &plan_with(vec![]), solution.clone(), &dims);
        assert_eq!(refined.iterations_used, 0);
        assert_eq!(refined.solution.positions, solution.positions);
        assert!(refined.quality.score >= 90.0);
    }

    #[test]
    fn test_overlapping_pair_repaired_within_budget() {
        // One overlapping pair near the canvas center
        let (g, dims, solution) = setup(&[("a", 300.0, 275.0), ("b", 340.0, 280.0)]);
        let validator = Validator::new(&EngineConfig::default());
        let plan = plan_with(vec![
            LayoutConstraint::no_overlap("a", "b", 10.0),
        ]);
        let refined = validator.refine(&g, &plan, solution, &dims);

        let config = EngineConfig::default();
        assert!(refined.iterations_used <= config.validation.max_iterations);
        if refined.quality.score >= config.validation.target_score {
            let ra = refined.solution.rect_of("a", &dims).unwrap();
            let rb = refined.solution.rect_of("b", &dims).unwrap();
            assert!(!ra.intersects(&rb));
        } else {
            assert_eq!(refined.iterations_used, config.validation.max_iterations);
        }
        assert!(!refined.quality.applied_fixes.is_empty());
    }

    #[test]
    fn test_exhaustion_returns_best_seen() {
        // Many mutually overlapping nodes stacked on one spot; three
        // iterations will not fully untangle them
        let (g, dims, solution) = setup(&[
            ("a", 350.0, 275.0),
            ("b", 360.0, 280.0),
            ("c", 370.0, 285.0),
            ("d", 355.0, 278.0),
            ("e", 365.0, 282.0),
        ]);
        let validator = Validator::new(&EngineConfig::default());
        let plan = plan_with(vec![]);
        let initial = validator.validate(&g, &plan, &solution, &dims);
        let refined = validator.refine(&g, &plan, solution, &dims);
        // Score never decreases relative to the starting point
        assert!(refined.quality.score >= initial.score);
    }

    #[test]
    fn test_unfixable_issue_degrades_gracefully() {
        let (g, dims, solution) = setup(&[("a", 200.0, 275.0), ("b", 500.0, 275.0)]);
        // A required distance violation is not a fixable category; the
        // loop must stop without panicking and keep the input solution
        let plan = plan_with(vec![LayoutConstraint::distance(
            "a",
            "b",
            10.0,
            20.0,
            crate::planner::Priority::Required,
        )]);
        let validator = Validator::new(&EngineConfig::default());
        let refined = validator.refine(&g, &plan, solution.clone(), &dims);
        assert_eq!(refined.solution.positions, solution.positions);
        assert!(refined
            .quality
            .issues
            .iter()
            .any(|i| i.category == IssueCategory::Constraint));
    }
}
