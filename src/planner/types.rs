//! Plan, constraint, and strategy types
//!
//! A `DiagramPlan` is created once per planning pass and replaced, never
//! mutated; constraints are immutable values the solver only reads.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::CanvasBounds;
use crate::geometry::{BoundingBox, Point};

/// Node id → (width, height), resolved from declared sizes and defaults
pub type NodeDimensions = HashMap<String, (f64, f64)>;

/// Constraint priority. `Required` constraints are hard; the rest are
/// satisfied best-effort in descending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    Required,
    High,
    Medium,
    Low,
}

/// A coordinate axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Axis {
    X,
    Y,
}

/// The geometric requirement a constraint expresses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "type")]
pub enum ConstraintKind {
    /// Each participant's rectangle lies within the canvas minus margin
    Bounds,
    /// The two participants' rectangles keep at least `margin` clearance
    NoOverlap { margin: f64 },
    /// Center distance between the two participants lies in [min, max];
    /// along `axis` when set, planar otherwise
    Distance {
        min: f64,
        max: f64,
        axis: Option<Axis>,
    },
    /// All participants share a center coordinate on `axis` within
    /// `tolerance`
    Alignment { axis: Axis, tolerance: f64 },
    /// The two participants mirror about the line `axis = position`
    /// (e.g. `Axis::X, 400.0` mirrors about the vertical line x = 400)
    Symmetry { axis: Axis, position: f64 },
    /// The second participant's rectangle lies inside the first's, inset
    /// by `padding`
    Containment { padding: f64 },
}

impl ConstraintKind {
    /// Stable lowercase name, used in diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            ConstraintKind::Bounds => "bounds",
            ConstraintKind::NoOverlap { .. } => "no-overlap",
            ConstraintKind::Distance { .. } => "distance",
            ConstraintKind::Alignment { .. } => "alignment",
            ConstraintKind::Symmetry { .. } => "symmetry",
            ConstraintKind::Containment { .. } => "containment",
        }
    }
}

/// A typed, prioritized geometric requirement over one or more nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConstraint {
    pub kind: ConstraintKind,
    /// Participant node ids; order matters for asymmetric kinds
    /// (Containment is container-first)
    pub nodes: Vec<String>,
    pub priority: Priority,
}

impl LayoutConstraint {
    pub fn new(kind: ConstraintKind, nodes: Vec<String>, priority: Priority) -> Self {
        Self {
            kind,
            nodes,
            priority,
        }
    }

    pub fn bounds(node: impl Into<String>) -> Self {
        Self::new(ConstraintKind::Bounds, vec![node.into()], Priority::Required)
    }

    pub fn no_overlap(a: impl Into<String>, b: impl Into<String>, margin: f64) -> Self {
        Self::new(
            ConstraintKind::NoOverlap { margin },
            vec![a.into(), b.into()],
            Priority::Required,
        )
    }

    pub fn distance(
        a: impl Into<String>,
        b: impl Into<String>,
        min: f64,
        max: f64,
        priority: Priority,
    ) -> Self {
        Self::new(
            ConstraintKind::Distance {
                min,
                max,
                axis: None,
            },
            vec![a.into(), b.into()],
            priority,
        )
    }

    pub fn alignment(nodes: Vec<String>, axis: Axis, tolerance: f64, priority: Priority) -> Self {
        Self::new(ConstraintKind::Alignment { axis, tolerance }, nodes, priority)
    }

    pub fn symmetry(
        a: impl Into<String>,
        b: impl Into<String>,
        axis: Axis,
        position: f64,
        priority: Priority,
    ) -> Self {
        Self::new(
            ConstraintKind::Symmetry { axis, position },
            vec![a.into(), b.into()],
            priority,
        )
    }

    pub fn containment(
        container: impl Into<String>,
        contained: impl Into<String>,
        padding: f64,
    ) -> Self {
        Self::new(
            ConstraintKind::Containment { padding },
            vec![container.into(), contained.into()],
            Priority::Required,
        )
    }

    /// Short human-readable description for diagnostics
    pub fn describe(&self) -> String {
        format!("{}({})", self.kind.name(), self.nodes.join(", "))
    }

    fn rect(
        id: &str,
        positions: &HashMap<String, Point>,
        dims: &NodeDimensions,
    ) -> Option<BoundingBox> {
        let pos = positions.get(id)?;
        let (w, h) = dims.get(id).copied().unwrap_or((0.0, 0.0));
        Some(BoundingBox::new(pos.x, pos.y, w, h))
    }

    /// Check this constraint against concrete positions. Returns a
    /// description of the violation, or `None` when it holds within
    /// `eps`. Unpositioned participants count as violations.
    pub fn violation(
        &self,
        positions: &HashMap<String, Point>,
        dims: &NodeDimensions,
        canvas: &CanvasBounds,
        eps: f64,
    ) -> Option<String> {
        let rects: Option<Vec<BoundingBox>> = self
            .nodes
            .iter()
            .map(|id| Self::rect(id, positions, dims))
            .collect();
        let rects = match rects {
            Some(r) => r,
            None => {
                return Some(format!("{}: participant not positioned", self.describe()));
            }
        };

        match &self.kind {
            ConstraintKind::Bounds => {
                let usable = canvas.usable_area();
                for (rect, id) in rects.iter().zip(&self.nodes) {
                    if rect.x < usable.x - eps
                        || rect.y < usable.y - eps
                        || rect.right() > usable.right() + eps
                        || rect.bottom() > usable.bottom() + eps
                    {
                        return Some(format!("'{}' extends outside the canvas margin", id));
                    }
                }
                None
            }
            ConstraintKind::NoOverlap { margin } => {
                let (a, b) = (&rects[0], &rects[1]);
                let clear = margin - eps;
                let separated = a.right() + clear <= b.x
                    || b.right() + clear <= a.x
                    || a.bottom() + clear <= b.y
                    || b.bottom() + clear <= a.y;
                if separated {
                    None
                } else {
                    Some(format!(
                        "'{}' and '{}' overlap or sit closer than {}px",
                        self.nodes[0], self.nodes[1], margin
                    ))
                }
            }
            ConstraintKind::Distance { min, max, axis } => {
                let (ca, cb) = (rects[0].center(), rects[1].center());
                let d = match axis {
                    Some(Axis::X) => (ca.x - cb.x).abs(),
                    Some(Axis::Y) => (ca.y - cb.y).abs(),
                    None => ca.distance_to(cb),
                };
                if d < min - eps || d > max + eps {
                    Some(format!(
                        "center distance between '{}' and '{}' is {:.1}, outside [{}, {}]",
                        self.nodes[0], self.nodes[1], d, min, max
                    ))
                } else {
                    None
                }
            }
            ConstraintKind::Alignment { axis, tolerance } => {
                let coords: Vec<f64> = rects
                    .iter()
                    .map(|r| match axis {
                        Axis::X => r.center().x,
                        Axis::Y => r.center().y,
                    })
                    .collect();
                let lo = coords.iter().cloned().fold(f64::INFINITY, f64::min);
                let hi = coords.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                if hi - lo > tolerance + eps {
                    Some(format!(
                        "nodes [{}] drift {:.1}px across the {:?} alignment",
                        self.nodes.join(", "),
                        hi - lo,
                        axis
                    ))
                } else {
                    None
                }
            }
            ConstraintKind::Symmetry { axis, position } => {
                let (ca, cb) = (rects[0].center(), rects[1].center());
                let (mirror_sum, cross_gap) = match axis {
                    // Mirror about the vertical line x = position
                    Axis::X => (ca.x + cb.x - 2.0 * position, (ca.y - cb.y).abs()),
                    // Mirror about the horizontal line y = position
                    Axis::Y => (ca.y + cb.y - 2.0 * position, (ca.x - cb.x).abs()),
                };
                if mirror_sum.abs() > eps.max(0.5) || cross_gap > eps.max(0.5) {
                    Some(format!(
                        "'{}' and '{}' are not mirrored about {:?} = {}",
                        self.nodes[0], self.nodes[1], axis, position
                    ))
                } else {
                    None
                }
            }
            ConstraintKind::Containment { padding } => {
                let outer = rects[0].inset(*padding);
                let inner = &rects[1];
                if inner.x < outer.x - eps
                    || inner.y < outer.y - eps
                    || inner.right() > outer.right() + eps
                    || inner.bottom() > outer.bottom() + eps
                {
                    Some(format!(
                        "'{}' is not contained in '{}' (padding {})",
                        self.nodes[1], self.nodes[0], padding
                    ))
                } else {
                    None
                }
            }
        }
    }
}

/// The solving approach chosen for a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Pure geometric packing; no relational structure to honor
    Heuristic,
    /// Constraint solving over the full node set
    ConstraintBased,
    /// Everything meaningful is locked upstream; only annotations are
    /// placed
    Symbolic,
    /// Packing seeds a constraint solve (large graphs)
    Hybrid,
}

/// An independently solvable partition of the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subproblem {
    /// Node ids in this partition, sorted
    pub nodes: Vec<String>,
    /// Constraints whose participants all lie in this partition
    pub constraints: Vec<LayoutConstraint>,
}

/// Planner output: strategy, constraint set, optional decomposition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramPlan {
    /// Problem complexity in [0, 1]
    pub complexity: f64,
    pub strategy: Strategy,
    pub constraints: Vec<LayoutConstraint>,
    /// Non-empty when the problem is decomposed
    pub subproblems: Vec<Subproblem>,
}

impl DiagramPlan {
    /// A plan with nothing to do (empty graph)
    pub fn trivial() -> Self {
        Self {
            complexity: 0.0,
            strategy: Strategy::Heuristic,
            constraints: Vec::new(),
            subproblems: Vec::new(),
        }
    }

    pub fn is_decomposed(&self) -> bool {
        !self.subproblems.is_empty()
    }

    /// Constraints with Required priority
    pub fn required_constraints(&self) -> impl Iterator<Item = &LayoutConstraint> {
        self.constraints
            .iter()
            .filter(|c| c.priority == Priority::Required)
    }

    /// True when the plan carries any constraint beyond bounds/no-overlap
    pub fn has_relational_constraints(&self) -> bool {
        self.constraints.iter().any(|c| {
            !matches!(
                c.kind,
                ConstraintKind::Bounds | ConstraintKind::NoOverlap { .. }
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_rects(ax: f64, ay: f64, bx: f64, by: f64) -> (HashMap<String, Point>, NodeDimensions) {
        let mut positions = HashMap::new();
        positions.insert("a".to_string(), Point::new(ax, ay));
        positions.insert("b".to_string(), Point::new(bx, by));
        let mut dims = NodeDimensions::new();
        dims.insert("a".to_string(), (100.0, 50.0));
        dims.insert("b".to_string(), (100.0, 50.0));
        (positions, dims)
    }

    #[test]
    fn test_priority_ordering() {
        let mut priorities = vec![Priority::Low, Priority::Required, Priority::Medium, Priority::High];
        priorities.sort();
        assert_eq!(
            priorities,
            vec![Priority::Required, Priority::High, Priority::Medium, Priority::Low]
        );
    }

    #[test]
    fn test_no_overlap_violation() {
        let canvas = CanvasBounds::default();
        let constraint = LayoutConstraint::no_overlap("a", "b", 0.0);

        let (positions, dims) = two_rects(0.0, 0.0, 50.0, 0.0);
        assert!(constraint
            .violation(&positions, &dims, &canvas, 1e-6)
            .is_some());

        let (positions, dims) = two_rects(0.0, 0.0, 150.0, 0.0);
        assert!(constraint
            .violation(&positions, &dims, &canvas, 1e-6)
            .is_none());
    }

    #[test]
    fn test_distance_violation() {
        let canvas = CanvasBounds::default();
        let constraint = LayoutConstraint::distance("a", "b", 150.0, 200.0, Priority::Required);

        // Centers 180 apart on x
        let (positions, dims) = two_rects(0.0, 0.0, 180.0, 0.0);
        assert!(constraint
            .violation(&positions, &dims, &canvas, 1e-6)
            .is_none());

        // Centers 300 apart
        let (positions, dims) = two_rects(0.0, 0.0, 300.0, 0.0);
        assert!(constraint
            .violation(&positions, &dims, &canvas, 1e-6)
            .is_some());
    }

    #[test]
    fn test_bounds_violation() {
        let canvas = CanvasBounds::new(800.0, 600.0).with_margin(20.0);
        let constraint = LayoutConstraint::bounds("a");
        let mut dims = NodeDimensions::new();
        dims.insert("a".to_string(), (100.0, 50.0));

        let mut positions = HashMap::new();
        positions.insert("a".to_string(), Point::new(30.0, 30.0));
        assert!(constraint
            .violation(&positions, &dims, &canvas, 1e-6)
            .is_none());

        positions.insert("a".to_string(), Point::new(750.0, 30.0));
        assert!(constraint
            .violation(&positions, &dims, &canvas, 1e-6)
            .is_some());
    }

    #[test]
    fn test_alignment_violation() {
        let canvas = CanvasBounds::default();
        let constraint = LayoutConstraint::alignment(
            vec!["a".to_string(), "b".to_string()],
            Axis::Y,
            1.0,
            Priority::High,
        );

        let (positions, dims) = two_rects(0.0, 0.0, 200.0, 0.5);
        assert!(constraint
            .violation(&positions, &dims, &canvas, 1e-6)
            .is_none());

        let (positions, dims) = two_rects(0.0, 0.0, 200.0, 40.0);
        assert!(constraint
            .violation(&positions, &dims, &canvas, 1e-6)
            .is_some());
    }

    #[test]
    fn test_symmetry_violation() {
        let canvas = CanvasBounds::default();
        let constraint = LayoutConstraint::symmetry("a", "b", Axis::X, 400.0, Priority::Medium);

        // Centers at x=150 and x=650 mirror about 400; same y
        let (positions, dims) = two_rects(100.0, 100.0, 600.0, 100.0);
        assert!(constraint
            .violation(&positions, &dims, &canvas, 1e-6)
            .is_none());

        let (positions, dims) = two_rects(100.0, 100.0, 500.0, 100.0);
        assert!(constraint
            .violation(&positions, &dims, &canvas, 1e-6)
            .is_some());
    }

    #[test]
    fn test_containment_violation() {
        let canvas = CanvasBounds::default();
        let constraint = LayoutConstraint::containment("outer", "inner", 10.0);
        let mut dims = NodeDimensions::new();
        dims.insert("outer".to_string(), (300.0, 200.0));
        dims.insert("inner".to_string(), (50.0, 50.0));

        let mut positions = HashMap::new();
        positions.insert("outer".to_string(), Point::new(0.0, 0.0));
        positions.insert("inner".to_string(), Point::new(100.0, 75.0));
        assert!(constraint
            .violation(&positions, &dims, &canvas, 1e-6)
            .is_none());

        positions.insert("inner".to_string(), Point::new(280.0, 75.0));
        assert!(constraint
            .violation(&positions, &dims, &canvas, 1e-6)
            .is_some());
    }

    #[test]
    fn test_unpositioned_participant_is_violation() {
        let canvas = CanvasBounds::default();
        let constraint = LayoutConstraint::no_overlap("a", "missing", 0.0);
        let (positions, dims) = two_rects(0.0, 0.0, 150.0, 0.0);
        let v = constraint.violation(&positions, &dims, &canvas, 1e-6);
        assert!(v.unwrap().contains("not positioned"));
    }
}
