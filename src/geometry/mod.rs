//! Generic 2D geometry: primitives, spatial indexing, and rectangle packing
//!
//! This module has no knowledge of graphs, plans, or constraints; the
//! planner, solver, and validator all build on it.

pub mod index;
pub mod packing;
pub mod primitives;

pub use index::SpatialIndex;
pub use packing::{pack_rectangles, PackAlgorithm, Packing};
pub use primitives::{
    bounding_box, polygon_contains, polygons_intersect, segments_intersect, BoundingBox, Point,
};
