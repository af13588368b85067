//! Rectangle bin-packing heuristics
//!
//! Used for heuristic placement when a plan carries no relational
//! constraints, for seeding the constraint solver, and for arranging
//! independently solved subproblems. Three heuristics trade speed against
//! density:
//!
//! - [`PackAlgorithm::LargestFirst`]: sort by area, fill rows. Fastest,
//!   lowest density.
//! - [`PackAlgorithm::BestFit`]: shelf packing, each rectangle goes to the
//!   shelf with the least wasted height. Balanced.
//! - [`PackAlgorithm::Skyline`]: bottom-left skyline. Best density for
//!   irregular size mixes.
//!
//! Every rectangle is always placed: input that cannot fit the canvas
//! continues past the bottom edge instead of being dropped, and the
//! violation surfaces later through bounds validation.

use serde::{Deserialize, Serialize};

use super::primitives::BoundingBox;

/// Selectable packing heuristic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackAlgorithm {
    LargestFirst,
    BestFit,
    Skyline,
}

/// Result of a packing run. Placements are indexed like the input slice.
#[derive(Debug, Clone)]
pub struct Packing {
    pub placements: Vec<BoundingBox>,
    pub canvas: BoundingBox,
}

impl Packing {
    /// Fraction of the canvas covered by placements that landed fully
    /// inside it. 0.0 for empty input.
    pub fn efficiency(&self) -> f64 {
        let canvas_area = self.canvas.area();
        if canvas_area <= 0.0 {
            return 0.0;
        }
        let placed: f64 = self
            .placements
            .iter()
            .filter(|p| self.canvas.contains_box(p))
            .map(|p| p.area())
            .sum();
        placed / canvas_area
    }

    /// True when no two placements intersect
    pub fn is_overlap_free(&self) -> bool {
        for i in 0..self.placements.len() {
            for j in (i + 1)..self.placements.len() {
                if self.placements[i].intersects(&self.placements[j]) {
                    return false;
                }
            }
        }
        true
    }
}

/// Pack `rects` (width, height pairs) into `canvas` with `margin` spacing
/// between rectangles and from the canvas edges.
pub fn pack_rectangles(
    rects: &[(f64, f64)],
    canvas: BoundingBox,
    algorithm: PackAlgorithm,
    margin: f64,
) -> Packing {
    if rects.is_empty() {
        return Packing {
            placements: Vec::new(),
            canvas,
        };
    }
    let usable = canvas.inset(margin);
    let placements = match algorithm {
        PackAlgorithm::LargestFirst => pack_rows(rects, usable, margin, SortKey::Area),
        PackAlgorithm::BestFit => pack_shelves(rects, usable, margin),
        PackAlgorithm::Skyline => pack_skyline(rects, usable, margin),
    };
    Packing { placements, canvas }
}

enum SortKey {
    Area,
}

/// Indices of `rects` in packing order (largest first), keeping the
/// original index so placements can be written back in input order.
fn sorted_indices(rects: &[(f64, f64)], key: SortKey) -> Vec<usize> {
    let mut order: Vec<usize> = (0..rects.len()).collect();
    match key {
        SortKey::Area => {
            order.sort_by(|&a, &b| {
                let area_a = rects[a].0 * rects[a].1;
                let area_b = rects[b].0 * rects[b].1;
                area_b
                    .partial_cmp(&area_a)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.cmp(&b))
            });
        }
    }
    order
}

/// Row-filling placement: left to right, wrap when the row is full.
fn pack_rows(rects: &[(f64, f64)], usable: BoundingBox, gap: f64, key: SortKey) -> Vec<BoundingBox> {
    let mut placements = vec![BoundingBox::zero(); rects.len()];
    let mut cursor_x = usable.x;
    let mut cursor_y = usable.y;
    let mut row_height: f64 = 0.0;

    for i in sorted_indices(rects, key) {
        let (w, h) = rects[i];
        if cursor_x > usable.x && cursor_x + w > usable.right() {
            cursor_x = usable.x;
            cursor_y += row_height + gap;
            row_height = 0.0;
        }
        placements[i] = BoundingBox::new(cursor_x, cursor_y, w, h);
        cursor_x += w + gap;
        row_height = row_height.max(h);
    }
    placements
}

struct Shelf {
    y: f64,
    height: f64,
    cursor_x: f64,
}

/// Shelf packing with best-height-fit shelf selection.
fn pack_shelves(rects: &[(f64, f64)], usable: BoundingBox, gap: f64) -> Vec<BoundingBox> {
    let mut placements = vec![BoundingBox::zero(); rects.len()];
    let mut shelves: Vec<Shelf> = Vec::new();
    let mut next_shelf_y = usable.y;

    for i in sorted_indices(rects, SortKey::Area) {
        let (w, h) = rects[i];

        // Best fit: the open shelf with the least leftover height that
        // still has room for the width.
        let mut best: Option<(usize, f64)> = None;
        for (s, shelf) in shelves.iter().enumerate() {
            if shelf.height >= h && shelf.cursor_x + w <= usable.right() {
                let waste = shelf.height - h;
                if best.map_or(true, |(_, bw)| waste < bw) {
                    best = Some((s, waste));
                }
            }
        }

        let shelf_idx = match best {
            Some((s, _)) => s,
            None => {
                shelves.push(Shelf {
                    y: next_shelf_y,
                    height: h,
                    cursor_x: usable.x,
                });
                next_shelf_y += h + gap;
                shelves.len() - 1
            }
        };

        let shelf = &mut shelves[shelf_idx];
        placements[i] = BoundingBox::new(shelf.cursor_x, shelf.y, w, h);
        shelf.cursor_x += w + gap;
    }
    placements
}

/// Bottom-left skyline packing. The skyline is a list of (x, y, width)
/// segments; each rectangle lands at the position with the lowest top
/// edge (ties broken leftward) and the skyline is raised over its span.
fn pack_skyline(rects: &[(f64, f64)], usable: BoundingBox, gap: f64) -> Vec<BoundingBox> {
    let mut placements = vec![BoundingBox::zero(); rects.len()];
    // (x, y, width)
    let mut skyline: Vec<(f64, f64, f64)> = vec![(usable.x, usable.y, usable.width.max(1.0))];

    for i in sorted_indices(rects, SortKey::Area) {
        let (w, h) = rects[i];
        let padded_w = w + gap;

        let mut best: Option<(usize, f64, f64)> = None; // (segment, x, y)
        for (s, &(sx, _, _)) in skyline.iter().enumerate() {
            if let Some(y) = skyline_fit(&skyline, s, padded_w, usable.right()) {
                if best.map_or(true, |(_, bx, by)| y < by || (y == by && sx < bx)) {
                    best = Some((s, sx, y));
                }
            }
        }

        let (x, y) = match best {
            Some((_, x, y)) => (x, y),
            None => {
                // Wider than the usable span: start a fresh line below
                // everything placed so far.
                let max_y = skyline.iter().map(|&(_, y, _)| y).fold(usable.y, f64::max);
                (usable.x, max_y)
            }
        };

        placements[i] = BoundingBox::new(x, y, w, h);
        raise_skyline(&mut skyline, x, y + h + gap, padded_w);
    }
    placements
}

/// Height at which a rectangle of width `w` starting at segment `start`
/// would rest, or `None` when it would overrun `right_limit`.
fn skyline_fit(skyline: &[(f64, f64, f64)], start: usize, w: f64, right_limit: f64) -> Option<f64> {
    let x = skyline[start].0;
    if x + w > right_limit + 1e-9 {
        return None;
    }
    let mut y = skyline[start].1;
    let mut remaining = w;
    for &(_, sy, sw) in &skyline[start..] {
        y = y.max(sy);
        if remaining <= sw + 1e-9 {
            return Some(y);
        }
        remaining -= sw;
    }
    // Ran off the last segment; the skyline covers the usable span, so
    // this only happens on float slop.
    Some(y)
}

/// Replace the skyline over `[x, x + w)` with height `top`.
fn raise_skyline(skyline: &mut Vec<(f64, f64, f64)>, x: f64, top: f64, w: f64) {
    let mut updated: Vec<(f64, f64, f64)> = Vec::with_capacity(skyline.len() + 2);
    let end = x + w;
    let mut inserted = false;
    for &(sx, sy, sw) in skyline.iter() {
        let s_end = sx + sw;
        if s_end <= x + 1e-9 || sx >= end - 1e-9 {
            updated.push((sx, sy, sw));
            continue;
        }
        // Left remainder
        if sx < x {
            updated.push((sx, sy, x - sx));
        }
        if !inserted {
            updated.push((x, top, w));
            inserted = true;
        }
        // Right remainder
        if s_end > end {
            updated.push((end, sy, s_end - end));
        }
    }
    if !inserted {
        updated.push((x, top, w));
    }
    updated.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    // Merge adjacent segments at equal height
    let mut merged: Vec<(f64, f64, f64)> = Vec::with_capacity(updated.len());
    for seg in updated {
        if let Some(last) = merged.last_mut() {
            if (last.1 - seg.1).abs() < 1e-9 && (last.0 + last.2 - seg.0).abs() < 1e-6 {
                last.2 += seg.2;
                continue;
            }
        }
        merged.push(seg);
    }
    *skyline = merged;
}
