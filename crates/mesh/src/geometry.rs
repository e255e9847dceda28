//! Triangle geometry helpers.
//!
//! Pure functions over positions; none of them look at mesh connectivity.

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Unit normal of triangle (a, b, c) using counter-clockwise winding.
///
/// Returns zero for degenerate triangles.
pub fn triangle_normal(a: DVec3, b: DVec3, c: DVec3) -> DVec3 {
    (b - a).cross(c - a).normalize_or_zero()
}

/// Area of triangle (a, b, c).
pub fn triangle_area(a: DVec3, b: DVec3, c: DVec3) -> f64 {
    0.5 * (b - a).cross(c - a).length()
}

/// Centroid of triangle (a, b, c).
pub fn triangle_centroid(a: DVec3, b: DVec3, c: DVec3) -> DVec3 {
    (a + b + c) / 3.0
}

/// Angle in degrees between two directions; 90 when either is zero.
pub fn angle_between_deg(u: DVec3, v: DVec3) -> f64 {
    let d = u.normalize_or_zero().dot(v.normalize_or_zero());
    d.clamp(-1.0, 1.0).acos().to_degrees()
}

/// Interior angles in degrees at a, b and c.
pub fn interior_angles_deg(a: DVec3, b: DVec3, c: DVec3) -> [f64; 3] {
    [
        angle_between_deg(b - a, c - a),
        angle_between_deg(c - b, a - b),
        angle_between_deg(a - c, b - c),
    ]
}

/// Closest point to `p` on triangle (a, b, c).
///
/// Classifies `p` against the Voronoi regions of the triangle's vertices,
/// edges and face, then projects onto the matching feature.
pub fn closest_point_on_triangle(p: DVec3, a: DVec3, b: DVec3, c: DVec3) -> DVec3 {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;

    // Vertex region A
    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    // Vertex region B
    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    // Edge region AB
    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + ab * v;
    }

    // Vertex region C
    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    // Edge region AC
    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + ac * w;
    }

    // Edge region BC
    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    // Face region
    let denom = va + vb + vc;
    if denom.abs() <= f64::EPSILON {
        // Collinear corners with p beside them; fall back to the nearest corner
        return [a, b, c]
            .into_iter()
            .min_by(|x, y| x.distance_squared(p).total_cmp(&y.distance_squared(p)))
            .unwrap_or(a);
    }
    let inv = 1.0 / denom;
    let v = vb * inv;
    let w = vc * inv;
    a + ab * v + ac * w
}

/// Local frame of a triangle: centroid and unit normal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub origin: DVec3,
    pub normal: DVec3,
}

impl Frame {
    pub fn from_triangle(a: DVec3, b: DVec3, c: DVec3) -> Self {
        Self {
            origin: triangle_centroid(a, b, c),
            normal: triangle_normal(a, b, c),
        }
    }
}

/// Undirected line segment in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub a: DVec3,
    pub b: DVec3,
}

impl Segment {
    pub fn new(a: DVec3, b: DVec3) -> Self {
        Self { a, b }
    }

    pub fn length(&self) -> f64 {
        self.a.distance(self.b)
    }

    pub fn reversed(&self) -> Self {
        Self { a: self.b, b: self.a }
    }
}

/// Ordered point list. A closed polyline repeats its first point at the end.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    pub points: Vec<DVec3>,
}

impl Polyline {
    pub fn new(points: Vec<DVec3>) -> Self {
        Self { points }
    }

    pub fn is_closed(&self) -> bool {
        self.points.len() > 2 && self.points.first() == self.points.last()
    }

    /// Consecutive point pairs as segments
    pub fn segments(&self) -> impl Iterator<Item = Segment> + '_ {
        self.points.windows(2).map(|w| Segment::new(w[0], w[1]))
    }
}
