//! Automatic repairs
//!
//! Each fix operates on a copy of the solver's output, never in place.
//! Per fixable class: overlapping pairs are nudged apart along the axis
//! of least overlap, off-canvas nodes are clamped (or the whole layout
//! rescaled when it cannot fit), and a drifting layout is translated
//! back to center. Locked nodes are never moved.

use std::collections::HashMap;

use log::debug;

use crate::geometry::{bounding_box, BoundingBox, Point};
use crate::graph::PropertyGraph;
use crate::planner::{ConstraintKind, DiagramPlan, NodeDimensions};
use crate::solver::LayoutSolution;

use super::{Issue, IssueCategory, Validator};

impl Validator {
    /// Apply every applicable fix for `issues` to a copy of `solution`.
    /// Returns the repaired copy and a description of each change made;
    /// an empty description list means nothing was repairable.
    pub fn auto_fix(
        &self,
        graph: &PropertyGraph,
        plan: &DiagramPlan,
        solution: &LayoutSolution,
        dims: &NodeDimensions,
        issues: &[Issue],
    ) -> (LayoutSolution, Vec<String>) {
        let mut positions = solution.positions.clone();
        let mut fixes = Vec::new();
        let usable = self.canvas().usable_area();
        let movable =
            |id: &str| -> bool { graph.node(id).map_or(true, |n| !n.placement.is_locked()) };

        // 1. Overlaps: nudge one node along the axis of least overlap
        for issue in issues {
            if issue.category != IssueCategory::Overlap || issue.nodes.len() != 2 {
                continue;
            }
            let (a, b) = (issue.nodes[0].as_str(), issue.nodes[1].as_str());
            let (Some(ra), Some(rb)) = (rect(a, &positions, dims), rect(b, &positions, dims))
            else {
                continue;
            };
            if !ra.intersects(&rb) {
                // An earlier nudge already cleared this pair
                continue;
            }
            let target = if movable(b) {
                b
            } else if movable(a) {
                a
            } else {
                continue;
            };
            let (moved, other) = if target == b { (rb, ra) } else { (ra, rb) };
            let v = moved.separation_vector(&other);
            // Clear the overlap plus the clearance the plan asks for
            let margin = pair_margin(plan, a, b).unwrap_or(self.config().min_spacing);
            let nudge = Point::new(
                v.x + v.x.signum() * if v.x != 0.0 { margin } else { 0.0 },
                v.y + v.y.signum() * if v.y != 0.0 { margin } else { 0.0 },
            );
            let p = positions[target];
            positions.insert(target.to_string(), Point::new(p.x + nudge.x, p.y + nudge.y));
            fixes.push(format!(
                "nudged '{}' by ({:.0}, {:.0}) to clear '{}'",
                target,
                nudge.x,
                nudge.y,
                if target == b { a } else { b }
            ));
        }

        // 2. Off-canvas: rescale when the layout cannot fit, clamp
        //    individual strays otherwise
        let has_bounds_issue = issues
            .iter()
            .any(|i| i.category == IssueCategory::Bounds);
        if has_bounds_issue {
            let all_movable = positions.keys().all(|id| movable(id));
            let bbox = layout_bbox(&positions, dims);
            if all_movable && (bbox.width > usable.width || bbox.height > usable.height) {
                let scale = (usable.width / bbox.width)
                    .min(usable.height / bbox.height)
                    .min(1.0);
                for (id, p) in positions.iter_mut() {
                    let (w, h) = dims.get(id).copied().unwrap_or((0.0, 0.0));
                    // Scale center offsets from the layout origin; sizes
                    // stay fixed, only spacing shrinks
                    let cx = (p.x + w / 2.0 - bbox.x) * scale + usable.x;
                    let cy = (p.y + h / 2.0 - bbox.y) * scale + usable.y;
                    *p = Point::new(cx - w / 2.0, cy - h / 2.0);
                }
                fixes.push(format!("rescaled layout by {:.2} to fit the canvas", scale));
            }
            for issue in issues {
                if issue.category != IssueCategory::Bounds {
                    continue;
                }
                for id in &issue.nodes {
                    if !movable(id) {
                        continue;
                    }
                    let Some(r) = rect(id, &positions, dims) else {
                        continue;
                    };
                    let x = r.x.clamp(usable.x, (usable.right() - r.width).max(usable.x));
                    let y = r
                        .y
                        .clamp(usable.y, (usable.bottom() - r.height).max(usable.y));
                    if x != r.x || y != r.y {
                        positions.insert(id.clone(), Point::new(x, y));
                        fixes.push(format!("clamped '{}' into the canvas", id));
                    }
                }
            }
        }

        // 3. Centering: translate the whole layout. Skipped as soon as
        //    any node is pinned, since partial translation would tear
        //    the layout apart.
        let wants_centering = issues
            .iter()
            .any(|i| i.category == IssueCategory::Centering);
        if wants_centering && positions.keys().all(|id| movable(id)) {
            let bbox = layout_bbox(&positions, dims);
            let dx = usable.center().x - bbox.center().x;
            let dy = usable.center().y - bbox.center().y;
            for p in positions.values_mut() {
                *p = Point::new(p.x + dx, p.y + dy);
            }
            fixes.push(format!("translated layout by ({:.0}, {:.0})", dx, dy));
        }

        debug!("auto_fix applied {} change(s)", fixes.len());
        let fixed = LayoutSolution {
            positions,
            ..solution.clone()
        };
        (fixed, fixes)
    }
}

fn rect(
    id: &str,
    positions: &HashMap<String, Point>,
    dims: &NodeDimensions,
) -> Option<BoundingBox> {
    let p = positions.get(id)?;
    let (w, h) = dims.get(id).copied().unwrap_or((0.0, 0.0));
    Some(BoundingBox::new(p.x, p.y, w, h))
}

fn layout_bbox(positions: &HashMap<String, Point>, dims: &NodeDimensions) -> BoundingBox {
    let rects: Vec<BoundingBox> = positions
        .keys()
        .filter_map(|id| rect(id, positions, dims))
        .collect();
    bounding_box(&rects)
}

/// The clearance the plan requires between a specific pair
fn pair_margin(plan: &DiagramPlan, a: &str, b: &str) -> Option<f64> {
    plan.constraints.iter().find_map(|c| match c.kind {
        ConstraintKind::NoOverlap { margin }
            if c.nodes.iter().any(|n| n == a) && c.nodes.iter().any(|n| n == b) =>
        {
            Some(margin)
        }
        _ => None,
    })
}
