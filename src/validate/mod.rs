//! Solution scoring and iterative repair
//!
//! Runs after constraint solving to grade a layout and, when it falls
//! short, repair it. Four independent checks contribute to the overall
//! 0–100 score under fixed weights: layout mechanics (overlap, spacing,
//! centering, near-alignment), connectivity (no edge left with an
//! unpositioned endpoint), and caller-supplied style and domain-physics
//! rule sets.

pub mod fixes;
pub mod refine;

pub use refine::Refinement;

use std::collections::HashSet;
use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::{CanvasBounds, EngineConfig, ValidationConfig};
use crate::geometry::{bounding_box, BoundingBox, SpatialIndex};
use crate::graph::PropertyGraph;
use crate::planner::{ConstraintKind, DiagramPlan, NodeDimensions};
use crate::solver::LayoutSolution;

/// How bad an issue is. The severity sets the score penalty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    /// Score deduction within one check's 0–100 sub-score
    pub fn penalty(&self) -> f64 {
        match self {
            Severity::Info => 1.0,
            Severity::Warning => 5.0,
            Severity::Error => 15.0,
            Severity::Critical => 40.0,
        }
    }
}

/// What part of the layout an issue concerns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueCategory {
    Overlap,
    Spacing,
    Centering,
    Alignment,
    Bounds,
    Connectivity,
    Constraint,
    Style,
    Physics,
}

impl IssueCategory {
    /// True for issue classes the refiner knows how to repair
    pub fn is_fixable(&self) -> bool {
        matches!(
            self,
            IssueCategory::Overlap | IssueCategory::Bounds | IssueCategory::Centering
        )
    }
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IssueCategory::Overlap => "overlap",
            IssueCategory::Spacing => "spacing",
            IssueCategory::Centering => "centering",
            IssueCategory::Alignment => "alignment",
            IssueCategory::Bounds => "bounds",
            IssueCategory::Connectivity => "connectivity",
            IssueCategory::Constraint => "constraint",
            IssueCategory::Style => "style",
            IssueCategory::Physics => "physics",
        };
        write!(f, "{}", name)
    }
}

/// One defect found in a solution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub severity: Severity,
    pub category: IssueCategory,
    pub message: String,
    /// Node ids involved, when the issue is about specific nodes
    #[serde(default)]
    pub nodes: Vec<String>,
}

impl Issue {
    pub fn new(
        severity: Severity,
        category: IssueCategory,
        message: impl Into<String>,
        nodes: Vec<String>,
    ) -> Self {
        Self {
            severity,
            category,
            message: message.into(),
            nodes,
        }
    }
}

/// Weighted assessment of a solution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    /// Overall score in [0, 100]
    pub score: f64,
    pub issues: Vec<Issue>,
    /// Descriptions of fixes applied on the way to this solution
    #[serde(default)]
    pub applied_fixes: Vec<String>,
}

/// A caller-supplied scoring rule (style conventions, domain physics).
/// Rules only read; they never mutate the solution. `Send + Sync` so one
/// validator can serve pipeline instances on worker threads.
pub trait Rule: Send + Sync {
    fn name(&self) -> &str;
    fn check(
        &self,
        graph: &PropertyGraph,
        solution: &LayoutSolution,
        dims: &NodeDimensions,
    ) -> Vec<Issue>;
}

/// Scores solutions and drives the repair loop
pub struct Validator {
    config: ValidationConfig,
    canvas: CanvasBounds,
    style_rules: Vec<Box<dyn Rule>>,
    physics_rules: Vec<Box<dyn Rule>>,
}

impl Validator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            config: config.validation.clone(),
            canvas: config.canvas,
            style_rules: Vec::new(),
            physics_rules: Vec::new(),
        }
    }

    pub fn with_style_rule(mut self, rule: Box<dyn Rule>) -> Self {
        self.style_rules.push(rule);
        self
    }

    pub fn with_physics_rule(mut self, rule: Box<dyn Rule>) -> Self {
        self.physics_rules.push(rule);
        self
    }

    pub(crate) fn config(&self) -> &ValidationConfig {
        &self.config
    }

    pub(crate) fn canvas(&self) -> &CanvasBounds {
        &self.canvas
    }

    /// Score `solution` against all four checks.
    pub fn validate(
        &self,
        graph: &PropertyGraph,
        plan: &DiagramPlan,
        solution: &LayoutSolution,
        dims: &NodeDimensions,
    ) -> QualityScore {
        let mut issues = Vec::new();
        let layout = self.check_layout(graph, plan, solution, dims, &mut issues);
        let connectivity = self.check_connectivity(graph, solution, &mut issues);
        let style = self.run_rules(&self.style_rules, IssueCategory::Style, graph, solution, dims, &mut issues);
        let physics = self.run_rules(
            &self.physics_rules,
            IssueCategory::Physics,
            graph,
            solution,
            dims,
            &mut issues,
        );

        let w = &self.config.weights;
        let score = (w.layout * layout
            + w.connectivity * connectivity
            + w.style * style
            + w.physics * physics)
            / w.total();
        debug!(
            "validate: score {:.1} (layout {:.0}, connectivity {:.0}, style {:.0}, physics {:.0}, {} issue(s))",
            score,
            layout,
            connectivity,
            style,
            physics,
            issues.len()
        );
        QualityScore {
            score,
            issues,
            applied_fixes: Vec::new(),
        }
    }

    /// Overlap, spacing, centering, near-alignment, bounds, and required
    /// constraint violations.
    fn check_layout(
        &self,
        graph: &PropertyGraph,
        plan: &DiagramPlan,
        solution: &LayoutSolution,
        dims: &NodeDimensions,
        issues: &mut Vec<Issue>,
    ) -> f64 {
        let mut deduction = 0.0;
        let mut critical = false;
        let usable = self.canvas.usable_area();

        // Required violations always surface
        for constraint in plan.required_constraints() {
            if let Some(detail) =
                constraint.violation(&solution.positions, dims, &self.canvas, 1e-6)
            {
                critical = true;
                issues.push(Issue::new(
                    Severity::Critical,
                    IssueCategory::Constraint,
                    detail,
                    constraint.nodes.clone(),
                ));
            }
        }

        // Pairs related by containment overlap by design
        let contained: HashSet<(String, String)> = plan
            .constraints
            .iter()
            .filter(|c| matches!(c.kind, ConstraintKind::Containment { .. }))
            .map(|c| (c.nodes[0].clone(), c.nodes[1].clone()))
            .collect();

        let mut ids: Vec<&String> = solution.positions.keys().collect();
        ids.sort();
        let rects: Vec<BoundingBox> = ids
            .iter()
            .filter_map(|id| solution.rect_of(id, dims))
            .collect();

        for (i, j) in self.overlap_candidates(&rects) {
            let (a, b) = (ids[i].as_str(), ids[j].as_str());
            if contained.contains(&(a.to_string(), b.to_string()))
                || contained.contains(&(b.to_string(), a.to_string()))
            {
                continue;
            }
            if rects[i].intersects(&rects[j]) {
                let overlap_w =
                    rects[i].right().min(rects[j].right()) - rects[i].x.max(rects[j].x);
                let overlap_h =
                    rects[i].bottom().min(rects[j].bottom()) - rects[i].y.max(rects[j].y);
                deduction += Severity::Error.penalty();
                issues.push(Issue::new(
                    Severity::Error,
                    IssueCategory::Overlap,
                    format!(
                        "'{}' and '{}' overlap by {:.0}x{:.0}px",
                        a, b, overlap_w, overlap_h
                    ),
                    vec![a.to_string(), b.to_string()],
                ));
            } else if clearance(&rects[i], &rects[j]) < self.config.min_spacing {
                deduction += Severity::Warning.penalty();
                issues.push(Issue::new(
                    Severity::Warning,
                    IssueCategory::Spacing,
                    format!(
                        "'{}' and '{}' sit closer than {}px",
                        a, b, self.config.min_spacing
                    ),
                    vec![a.to_string(), b.to_string()],
                ));
            }
        }

        // Bounds
        for (i, id) in ids.iter().enumerate() {
            if !usable.contains_box(&rects[i]) {
                deduction += Severity::Error.penalty();
                issues.push(Issue::new(
                    Severity::Error,
                    IssueCategory::Bounds,
                    format!("'{}' extends outside the canvas margin", id),
                    vec![id.to_string()],
                ));
            }
        }

        // Centering of the whole layout
        if !rects.is_empty() {
            let bbox = bounding_box(&rects);
            let offset_x = (bbox.center().x - usable.center().x).abs();
            let offset_y = (bbox.center().y - usable.center().y).abs();
            if offset_x > 0.15 * self.canvas.width || offset_y > 0.15 * self.canvas.height {
                deduction += Severity::Warning.penalty();
                issues.push(Issue::new(
                    Severity::Warning,
                    IssueCategory::Centering,
                    format!(
                        "layout center drifts ({:.0}, {:.0})px from the canvas center",
                        offset_x, offset_y
                    ),
                    Vec::new(),
                ));
            }
        }

        // Near-alignment along spatial edges: a connection that is a few
        // pixels off straight reads as sloppy.
        for edge in graph.spatial_edges() {
            let (Some(ra), Some(rb)) = (
                solution.rect_of(&edge.source, dims),
                solution.rect_of(&edge.target, dims),
            ) else {
                continue;
            };
            let dx = (ra.center().x - rb.center().x).abs();
            let dy = (ra.center().y - rb.center().y).abs();
            if dx < 0.5 || dy < 0.5 {
                continue;
            }
            let near = 15.0;
            if (dy < near && dx > dy * 4.0) || (dx < near && dy > dx * 4.0) {
                deduction += Severity::Info.penalty();
                issues.push(Issue::new(
                    Severity::Info,
                    IssueCategory::Alignment,
                    format!(
                        "'{}' and '{}' are nearly aligned (off by {:.0}px)",
                        edge.source,
                        edge.target,
                        dy.min(dx)
                    ),
                    vec![edge.source.clone(), edge.target.clone()],
                ));
            }
        }

        if critical {
            0.0
        } else {
            (100.0 - deduction).max(0.0)
        }
    }

    /// Candidate overlapping pairs, through the spatial index once the
    /// layout is large enough that a pair scan would hurt.
    fn overlap_candidates(&self, rects: &[BoundingBox]) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        if rects.len() > self.config.index_threshold {
            let index = SpatialIndex::build(rects);
            for (i, rect) in rects.iter().enumerate() {
                // Inflate the query so spacing violations are seen too
                let query = BoundingBox::new(
                    rect.x - self.config.min_spacing,
                    rect.y - self.config.min_spacing,
                    rect.width + 2.0 * self.config.min_spacing,
                    rect.height + 2.0 * self.config.min_spacing,
                );
                for j in index.overlapping(&query) {
                    if j > i {
                        pairs.push((i, j));
                    }
                }
            }
        } else {
            for i in 0..rects.len() {
                for j in (i + 1)..rects.len() {
                    pairs.push((i, j));
                }
            }
        }
        pairs
    }

    /// Every edge must have both endpoints positioned.
    fn check_connectivity(
        &self,
        graph: &PropertyGraph,
        solution: &LayoutSolution,
        issues: &mut Vec<Issue>,
    ) -> f64 {
        let mut deduction: f64 = 0.0;
        for edge in graph.edges() {
            for endpoint in [&edge.source, &edge.target] {
                if !solution.positions.contains_key(endpoint) {
                    deduction += 25.0;
                    issues.push(Issue::new(
                        Severity::Error,
                        IssueCategory::Connectivity,
                        format!(
                            "edge {} -> {} has unpositioned endpoint '{}'",
                            edge.source, edge.target, endpoint
                        ),
                        vec![endpoint.clone()],
                    ));
                }
            }
        }
        (100.0 - deduction).max(0.0)
    }

    fn run_rules(
        &self,
        rules: &[Box<dyn Rule>],
        category: IssueCategory,
        graph: &PropertyGraph,
        solution: &LayoutSolution,
        dims: &NodeDimensions,
        issues: &mut Vec<Issue>,
    ) -> f64 {
        let mut deduction = 0.0;
        for rule in rules {
            for mut issue in rule.check(graph, solution, dims) {
                issue.category = category;
                deduction += issue.severity.penalty();
                issues.push(issue);
            }
        }
        (100.0 - deduction).max(0.0)
    }
}

/// Minimum gap between two disjoint rectangles along either axis (zero
/// when they touch or intersect)
fn clearance(a: &BoundingBox, b: &BoundingBox) -> f64 {
    let gap_x = (b.x - a.right()).max(a.x - b.right()).max(0.0);
    let gap_y = (b.y - a.bottom()).max(a.y - b.bottom()).max(0.0);
    if gap_x > 0.0 && gap_y > 0.0 {
        (gap_x * gap_x + gap_y * gap_y).sqrt()
    } else {
        gap_x.max(gap_y)
    }
}
