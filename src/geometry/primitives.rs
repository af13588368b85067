//! 2D primitives shared by the planner, solver, and validator

use serde::{Deserialize, Serialize};

/// A 2D point in the coordinate system
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// A bounding box representing the spatial extent of an element
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a zero-sized bounding box at the origin
    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }

    /// Right edge x-coordinate
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge y-coordinate
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Center point of the bounding box
    pub fn center(&self) -> Point {
        Point {
            x: self.x + self.width / 2.0,
            y: self.y + self.height / 2.0,
        }
    }

    /// Area of the bounding box
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Check if this bounding box contains a point
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x <= self.right()
            && point.y >= self.y
            && point.y <= self.bottom()
    }

    /// Check if this bounding box fully contains another
    pub fn contains_box(&self, other: &BoundingBox) -> bool {
        other.x >= self.x
            && other.right() <= self.right()
            && other.y >= self.y
            && other.bottom() <= self.bottom()
    }

    /// Check if this bounding box intersects another
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    /// Area of the intersection with another box, 0.0 when disjoint
    pub fn intersection_area(&self, other: &BoundingBox) -> f64 {
        let w = self.right().min(other.right()) - self.x.max(other.x);
        let h = self.bottom().min(other.bottom()) - self.y.max(other.y);
        if w > 0.0 && h > 0.0 {
            w * h
        } else {
            0.0
        }
    }

    /// Minimum translation that separates this box from `other`, as an
    /// axis-aligned vector. Zero when the boxes do not intersect. The
    /// translation moves along the axis of least overlap, away from
    /// `other`'s center.
    pub fn separation_vector(&self, other: &BoundingBox) -> Point {
        if !self.intersects(other) {
            return Point::new(0.0, 0.0);
        }
        let overlap_w = self.right().min(other.right()) - self.x.max(other.x);
        let overlap_h = self.bottom().min(other.bottom()) - self.y.max(other.y);
        if overlap_w <= overlap_h {
            let sign = if self.center().x < other.center().x {
                -1.0
            } else {
                1.0
            };
            Point::new(sign * overlap_w, 0.0)
        } else {
            let sign = if self.center().y < other.center().y {
                -1.0
            } else {
                1.0
            };
            Point::new(0.0, sign * overlap_h)
        }
    }

    /// Compute the union of two bounding boxes (smallest box containing both)
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        BoundingBox::new(x, y, right - x, bottom - y)
    }

    /// Expand this bounding box to include a point
    pub fn expand_to_include(&self, point: Point) -> BoundingBox {
        let x = self.x.min(point.x);
        let y = self.y.min(point.y);
        let right = self.right().max(point.x);
        let bottom = self.bottom().max(point.y);
        BoundingBox::new(x, y, right - x, bottom - y)
    }

    /// Shrink the box by `margin` on every side. Collapses to a point at the
    /// center when the margin exceeds the half-extent.
    pub fn inset(&self, margin: f64) -> BoundingBox {
        let w = (self.width - 2.0 * margin).max(0.0);
        let h = (self.height - 2.0 * margin).max(0.0);
        let x = if w > 0.0 {
            self.x + margin
        } else {
            self.x + self.width / 2.0
        };
        let y = if h > 0.0 {
            self.y + margin
        } else {
            self.y + self.height / 2.0
        };
        BoundingBox::new(x, y, w, h)
    }

    /// Corner points in clockwise order starting at the top-left
    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.x, self.y),
            Point::new(self.right(), self.y),
            Point::new(self.right(), self.bottom()),
            Point::new(self.x, self.bottom()),
        ]
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::zero()
    }
}

/// Compute the smallest box containing all of `boxes`, or a zero box for
/// empty input.
pub fn bounding_box(boxes: &[BoundingBox]) -> BoundingBox {
    let mut iter = boxes.iter();
    let first = match iter.next() {
        Some(b) => *b,
        None => return BoundingBox::zero(),
    };
    iter.fold(first, |acc, b| acc.union(b))
}

/// Check if two line segments intersect using parametric intersection.
pub fn segments_intersect(a1: Point, a2: Point, b1: Point, b2: Point) -> bool {
    let d1x = a2.x - a1.x;
    let d1y = a2.y - a1.y;
    let d2x = b2.x - b1.x;
    let d2y = b2.y - b1.y;

    let denom = d1x * d2y - d1y * d2x;

    if denom.abs() < 1e-10 {
        // Parallel or coincident segments are treated as non-intersecting
        return false;
    }

    let dx = b1.x - a1.x;
    let dy = b1.y - a1.y;

    let t = (dx * d2y - dy * d2x) / denom;
    let u = (dx * d1y - dy * d1x) / denom;

    (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u)
}

/// Check if a point lies inside a simple polygon (ray casting).
pub fn polygon_contains(polygon: &[Point], point: Point) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let pi = polygon[i];
        let pj = polygon[j];
        if (pi.y > point.y) != (pj.y > point.y)
            && point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Check if two simple polygons intersect: any edge pair crosses, or one
/// polygon contains a vertex of the other.
pub fn polygons_intersect(a: &[Point], b: &[Point]) -> bool {
    if a.len() < 3 || b.len() < 3 {
        return false;
    }
    for i in 0..a.len() {
        let a1 = a[i];
        let a2 = a[(i + 1) % a.len()];
        for k in 0..b.len() {
            let b1 = b[k];
            let b2 = b[(k + 1) % b.len()];
            if segments_intersect(a1, a2, b1, b2) {
                return true;
            }
        }
    }
    polygon_contains(a, b[0]) || polygon_contains(b, a[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    #[test]
    fn test_point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!(approx_eq!(f64, a.distance_to(b), 5.0, ulps = 2));
    }

    #[test]
    fn test_bounding_box_edges() {
        let bb = BoundingBox::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!(bb.right(), 110.0);
        assert_eq!(bb.bottom(), 70.0);
    }

    #[test]
    fn test_bounding_box_center() {
        let bb = BoundingBox::new(0.0, 0.0, 100.0, 50.0);
        let center = bb.center();
        assert_eq!(center.x, 50.0);
        assert_eq!(center.y, 25.0);
    }

    #[test]
    fn test_bounding_box_contains() {
        let bb = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        assert!(bb.contains(Point::new(50.0, 50.0)));
        assert!(bb.contains(Point::new(0.0, 0.0)));
        assert!(bb.contains(Point::new(100.0, 100.0)));
        assert!(!bb.contains(Point::new(-1.0, 50.0)));
        assert!(!bb.contains(Point::new(101.0, 50.0)));
    }

    #[test]
    fn test_bounding_box_intersects() {
        let a = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        let b = BoundingBox::new(50.0, 50.0, 100.0, 100.0);
        let c = BoundingBox::new(200.0, 200.0, 50.0, 50.0);

        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
        assert!(!c.intersects(&a));
    }

    #[test]
    fn test_touching_boxes_do_not_intersect() {
        let a = BoundingBox::new(0.0, 0.0, 50.0, 50.0);
        let b = BoundingBox::new(50.0, 0.0, 50.0, 50.0);
        assert!(!a.intersects(&b));
    }

    #[test]
    fn test_intersection_area() {
        let a = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        let b = BoundingBox::new(50.0, 50.0, 100.0, 100.0);
        assert_eq!(a.intersection_area(&b), 2500.0);

        let c = BoundingBox::new(200.0, 0.0, 10.0, 10.0);
        assert_eq!(a.intersection_area(&c), 0.0);
    }

    #[test]
    fn test_separation_vector_prefers_least_overlap_axis() {
        // b overlaps a by 10 horizontally and 40 vertically; separation
        // should be horizontal.
        let a = BoundingBox::new(0.0, 0.0, 50.0, 50.0);
        let b = BoundingBox::new(40.0, 10.0, 50.0, 50.0);
        let v = b.separation_vector(&a);
        assert_eq!(v.y, 0.0);
        assert_eq!(v.x, 10.0);

        // Moving b by v separates the pair.
        let moved = BoundingBox::new(b.x + v.x, b.y + v.y, b.width, b.height);
        assert!(!moved.intersects(&a));
    }

    #[test]
    fn test_separation_vector_zero_when_disjoint() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(100.0, 100.0, 10.0, 10.0);
        let v = a.separation_vector(&b);
        assert_eq!(v.x, 0.0);
        assert_eq!(v.y, 0.0);
    }

    #[test]
    fn test_bounding_box_union() {
        let a = BoundingBox::new(0.0, 0.0, 50.0, 50.0);
        let b = BoundingBox::new(100.0, 100.0, 50.0, 50.0);
        let union = a.union(&b);

        assert_eq!(union.x, 0.0);
        assert_eq!(union.y, 0.0);
        assert_eq!(union.width, 150.0);
        assert_eq!(union.height, 150.0);
    }

    #[test]
    fn test_inset() {
        let bb = BoundingBox::new(0.0, 0.0, 100.0, 50.0);
        let inner = bb.inset(10.0);
        assert_eq!(inner.x, 10.0);
        assert_eq!(inner.y, 10.0);
        assert_eq!(inner.width, 80.0);
        assert_eq!(inner.height, 30.0);

        // Over-large margin collapses to the center
        let collapsed = bb.inset(60.0);
        assert_eq!(collapsed.width, 0.0);
        assert_eq!(collapsed.height, 0.0);
    }

    #[test]
    fn test_bounding_box_of_many() {
        let boxes = [
            BoundingBox::new(10.0, 10.0, 20.0, 20.0),
            BoundingBox::new(0.0, 50.0, 10.0, 10.0),
            BoundingBox::new(40.0, 0.0, 5.0, 5.0),
        ];
        let bb = bounding_box(&boxes);
        assert_eq!(bb.x, 0.0);
        assert_eq!(bb.y, 0.0);
        assert_eq!(bb.right(), 45.0);
        assert_eq!(bb.bottom(), 60.0);
    }

    #[test]
    fn test_bounding_box_empty_input() {
        assert_eq!(bounding_box(&[]), BoundingBox::zero());
    }

    #[test]
    fn test_segments_intersect() {
        let a1 = Point::new(0.0, 0.0);
        let a2 = Point::new(10.0, 10.0);
        let b1 = Point::new(0.0, 10.0);
        let b2 = Point::new(10.0, 0.0);
        assert!(segments_intersect(a1, a2, b1, b2));
    }

    #[test]
    fn test_segments_disjoint() {
        let a1 = Point::new(0.0, 0.0);
        let a2 = Point::new(1.0, 1.0);
        let b1 = Point::new(5.0, 5.0);
        let b2 = Point::new(6.0, 5.0);
        assert!(!segments_intersect(a1, a2, b1, b2));
    }

    #[test]
    fn test_polygon_contains() {
        let square = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        assert!(polygon_contains(&square, Point::new(5.0, 5.0)));
        assert!(!polygon_contains(&square, Point::new(15.0, 5.0)));
    }

    #[test]
    fn test_polygons_intersect_edge_crossing() {
        let a = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        let b = [
            Point::new(5.0, 5.0),
            Point::new(15.0, 5.0),
            Point::new(15.0, 15.0),
            Point::new(5.0, 15.0),
        ];
        assert!(polygons_intersect(&a, &b));
    }

    #[test]
    fn test_polygons_intersect_containment() {
        let outer = [
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(100.0, 100.0),
            Point::new(0.0, 100.0),
        ];
        let inner = [
            Point::new(40.0, 40.0),
            Point::new(60.0, 40.0),
            Point::new(60.0, 60.0),
            Point::new(40.0, 60.0),
        ];
        assert!(polygons_intersect(&outer, &inner));
    }

    #[test]
    fn test_polygons_disjoint() {
        let a = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(5.0, 10.0),
        ];
        let b = [
            Point::new(50.0, 50.0),
            Point::new(60.0, 50.0),
            Point::new(55.0, 60.0),
        ];
        assert!(!polygons_intersect(&a, &b));
    }
}
