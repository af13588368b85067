//! Heuristic placement
//!
//! Packing-based placement for plans with no relational constraints, seed
//! generation for the constraint session, and annotation placement for
//! graphs that arrive fully pinned from upstream.

use std::collections::HashMap;

use log::debug;

use crate::config::CanvasBounds;
use crate::geometry::{pack_rectangles, BoundingBox, PackAlgorithm, Point};
use crate::graph::PropertyGraph;
use crate::planner::NodeDimensions;

/// Positions from a packing run, with the packing density achieved
pub(crate) struct HeuristicPlacement {
    pub positions: HashMap<String, Point>,
    pub efficiency: f64,
}

/// Pack `free` nodes into the canvas. The gap is the larger of the node
/// spacing and the canvas margin, so bounds and clearance both hold when
/// the input fits.
pub(crate) fn place_by_packing(
    free: &[&str],
    dims: &NodeDimensions,
    canvas: &CanvasBounds,
    algorithm: PackAlgorithm,
    spacing: f64,
) -> HeuristicPlacement {
    let rects: Vec<(f64, f64)> = free
        .iter()
        .map(|id| dims.get(*id).copied().unwrap_or((0.0, 0.0)))
        .collect();
    let packing = pack_rectangles(
        &rects,
        canvas.bounding_box(),
        algorithm,
        spacing.max(canvas.margin),
    );
    let efficiency = packing.efficiency();
    debug!(
        "packed {} node(s) with {:?}, efficiency {:.3}",
        free.len(),
        algorithm,
        efficiency
    );

    let positions = free
        .iter()
        .zip(&packing.placements)
        .map(|(id, rect)| (id.to_string(), Point::new(rect.x, rect.y)))
        .collect();
    HeuristicPlacement {
        positions,
        efficiency,
    }
}

/// Place annotation nodes next to the nodes they annotate. Each label
/// lands below its first positioned neighbor, stacking when several
/// labels share one, and is clamped into the usable area. Labels with no
/// positioned neighbor are packed into the canvas as a fallback.
pub(crate) fn place_annotations(
    graph: &PropertyGraph,
    free: &[&str],
    anchored: &HashMap<String, Point>,
    dims: &NodeDimensions,
    canvas: &CanvasBounds,
    spacing: f64,
) -> HashMap<String, Point> {
    let usable = canvas.usable_area();
    let mut positions = HashMap::new();
    let mut stacked: HashMap<String, usize> = HashMap::new();
    let mut orphans: Vec<&str> = Vec::new();

    for &id in free {
        let (w, h) = dims.get(id).copied().unwrap_or((0.0, 0.0));
        let target = graph
            .neighbors(id)
            .into_iter()
            .find(|n| anchored.contains_key(&n.id));
        let Some(target) = target else {
            orphans.push(id);
            continue;
        };

        let anchor = anchored[&target.id];
        let (tw, th) = dims.get(&target.id).copied().unwrap_or((0.0, 0.0));
        let stack = stacked.entry(target.id.clone()).or_insert(0);
        let x = anchor.x + tw / 2.0 - w / 2.0;
        let y = anchor.y + th + spacing + *stack as f64 * (h + spacing);
        *stack += 1;

        // Clamp into the usable area
        let x = x.clamp(usable.x, (usable.right() - w).max(usable.x));
        let y = y.clamp(usable.y, (usable.bottom() - h).max(usable.y));
        positions.insert(id.to_string(), Point::new(x, y));
    }

    if !orphans.is_empty() {
        let packed = place_by_packing(
            &orphans,
            dims,
            canvas,
            PackAlgorithm::LargestFirst,
            spacing,
        );
        positions.extend(packed.positions);
    }
    positions
}

/// Seed rectangles for a constraint session: locked nodes at their pinned
/// positions, free nodes from `free_positions`.
pub(crate) fn seed_rects(
    nodes: &[String],
    free_positions: &HashMap<String, Point>,
    graph: &PropertyGraph,
    dims: &NodeDimensions,
) -> HashMap<String, BoundingBox> {
    nodes
        .iter()
        .filter_map(|id| {
            let (w, h) = dims.get(id).copied().unwrap_or((0.0, 0.0));
            let pos = graph
                .locked_position(id)
                .or_else(|| free_positions.get(id).copied())?;
            Some((id.clone(), BoundingBox::new(pos.x, pos.y, w, h)))
        })
        .collect()
}
