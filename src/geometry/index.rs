//! Grid-based spatial index for overlap and nearest queries
//!
//! Buckets shape bounding boxes into uniform grid cells so overlap and
//! nearest lookups touch only nearby shapes instead of scanning every
//! pair. Intended for layouts beyond a few dozen shapes; below that a
//! linear scan is cheaper than building the index.

use std::collections::HashMap;

use super::primitives::{BoundingBox, Point};

/// Spatial index over a fixed set of shapes. Queries return indices into
/// the slice the index was built from.
#[derive(Debug)]
pub struct SpatialIndex {
    shapes: Vec<BoundingBox>,
    cell_size: f64,
    cells: HashMap<(i64, i64), Vec<usize>>,
}

impl SpatialIndex {
    /// Build an index over `shapes`. The cell size is derived from the mean
    /// shape extent so a typical shape spans a handful of cells.
    pub fn build(shapes: &[BoundingBox]) -> Self {
        let cell_size = Self::pick_cell_size(shapes);
        let mut cells: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
        for (i, shape) in shapes.iter().enumerate() {
            for key in Self::covered_cells(shape, cell_size) {
                cells.entry(key).or_default().push(i);
            }
        }
        Self {
            shapes: shapes.to_vec(),
            cell_size,
            cells,
        }
    }

    /// Number of indexed shapes
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// True when the index holds no shapes
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    fn pick_cell_size(shapes: &[BoundingBox]) -> f64 {
        if shapes.is_empty() {
            return 1.0;
        }
        let total: f64 = shapes.iter().map(|s| s.width.max(s.height)).sum();
        let mean = total / shapes.len() as f64;
        // Guard degenerate zero-sized inputs
        if mean > 1e-9 {
            mean * 2.0
        } else {
            1.0
        }
    }

    fn cell_of(point: Point, cell_size: f64) -> (i64, i64) {
        (
            (point.x / cell_size).floor() as i64,
            (point.y / cell_size).floor() as i64,
        )
    }

    fn covered_cells(shape: &BoundingBox, cell_size: f64) -> Vec<(i64, i64)> {
        let (cx0, cy0) = Self::cell_of(Point::new(shape.x, shape.y), cell_size);
        let (cx1, cy1) = Self::cell_of(Point::new(shape.right(), shape.bottom()), cell_size);
        let mut keys = Vec::new();
        for cx in cx0..=cx1 {
            for cy in cy0..=cy1 {
                keys.push((cx, cy));
            }
        }
        keys
    }

    /// Indices of shapes whose bounding box intersects `query`, sorted and
    /// deduplicated.
    pub fn overlapping(&self, query: &BoundingBox) -> Vec<usize> {
        let mut hits = Vec::new();
        for key in Self::covered_cells(query, self.cell_size) {
            if let Some(bucket) = self.cells.get(&key) {
                for &i in bucket {
                    if self.shapes[i].intersects(query) {
                        hits.push(i);
                    }
                }
            }
        }
        hits.sort_unstable();
        hits.dedup();
        hits
    }

    /// Index of the shape whose center is closest to `point`, or `None` for
    /// an empty index. Searches outward ring by ring, then checks one extra
    /// ring so a closer shape in a diagonal cell is not missed.
    pub fn nearest(&self, point: Point) -> Option<usize> {
        if self.shapes.is_empty() {
            return None;
        }
        let origin = Self::cell_of(point, self.cell_size);
        // Far enough to reach every occupied cell from the query point
        let max_ring = self.reach_from(origin) + 1;

        let mut best: Option<(usize, f64)> = None;
        let mut found_ring: Option<i64> = None;
        for ring in 0..=max_ring {
            if let Some(fr) = found_ring {
                // One ring past the first hit is enough to settle ties
                if ring > fr + 1 {
                    break;
                }
            }
            for key in Self::ring_cells(origin, ring) {
                if let Some(bucket) = self.cells.get(&key) {
                    for &i in bucket {
                        let d = self.shapes[i].center().distance_to(point);
                        if best.map_or(true, |(_, bd)| d < bd) {
                            best = Some((i, d));
                        }
                    }
                    if found_ring.is_none() {
                        found_ring = Some(ring);
                    }
                }
            }
        }
        best.map(|(i, _)| i)
    }

    /// Chebyshev distance from `origin` to the farthest occupied cell
    fn reach_from(&self, origin: (i64, i64)) -> i64 {
        self.cells
            .keys()
            .map(|&(x, y)| (x - origin.0).abs().max((y - origin.1).abs()))
            .max()
            .unwrap_or(0)
    }

    fn ring_cells(origin: (i64, i64), ring: i64) -> Vec<(i64, i64)> {
        let (ox, oy) = origin;
        if ring == 0 {
            return vec![origin];
        }
        let mut keys = Vec::new();
        for dx in -ring..=ring {
            keys.push((ox + dx, oy - ring));
            keys.push((ox + dx, oy + ring));
        }
        for dy in (-ring + 1)..ring {
            keys.push((ox - ring, oy + dy));
            keys.push((ox + ring, oy + dy));
        }
        keys
    }
}
