//! Spatial indexing for nearest-surface queries.
//!
//! [`TriangleBvh`] is a bounding volume hierarchy over triangles. It copies
//! the triangle corners when built, so a BVH of a mesh stays valid (and keeps
//! answering for the old shape) while the mesh itself is being edited.
//!
//! ## Determinism
//!
//! Nearest queries return the same triangle regardless of traversal order:
//! a candidate replaces the current best only when it is strictly closer, or
//! equally close with a lower triangle id.

use glam::DVec3;

use crate::geometry::closest_point_on_triangle;
use crate::triangle_mesh::{TriangleId, TriangleMesh};

/// Maximum triangles per leaf before splitting
const MAX_LEAF_TRIANGLES: usize = 4;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    pub fn empty() -> Self {
        Self {
            min: DVec3::splat(f64::MAX),
            max: DVec3::splat(f64::MIN),
        }
    }

    pub fn include_point(&mut self, point: DVec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }

    pub fn contains_point(&self, point: DVec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Squared distance from `point` to the box, zero inside
    pub fn distance_squared(&self, point: DVec3) -> f64 {
        point.clamp(self.min, self.max).distance_squared(point)
    }

    /// Index of the longest axis (0 = x, 1 = y, 2 = z)
    fn longest_axis(&self) -> usize {
        let size = self.size();
        if size.x >= size.y && size.x >= size.z {
            0
        } else if size.y >= size.z {
            1
        } else {
            2
        }
    }
}

/// Nearest-surface queries against a fixed set of triangles.
pub trait SpatialIndex {
    /// The triangle closest to `point`, or `None` when the index is empty
    fn find_nearest_triangle(&self, point: DVec3) -> Option<TriangleId>;

    /// Closest point to `point` on triangle `id`
    fn closest_point_on(&self, id: TriangleId, point: DVec3) -> Option<DVec3>;

    /// Closest point on the whole surface together with its triangle
    fn closest_point(&self, point: DVec3) -> Option<(TriangleId, DVec3)> {
        let id = self.find_nearest_triangle(point)?;
        Some((id, self.closest_point_on(id, point)?))
    }
}

#[derive(Debug, Clone, Copy)]
struct BvhTriangle {
    id: TriangleId,
    corners: [DVec3; 3],
    centroid: DVec3,
}

#[derive(Debug, Clone, Copy)]
enum BvhNode {
    Leaf { bounds: Aabb, start: usize, end: usize },
    Internal { bounds: Aabb, left: usize, right: usize },
}

impl BvhNode {
    fn bounds(&self) -> &Aabb {
        match self {
            BvhNode::Leaf { bounds, .. } | BvhNode::Internal { bounds, .. } => bounds,
        }
    }
}

/// Median-split bounding volume hierarchy over a snapshot of mesh triangles.
#[derive(Debug, Clone, Default)]
pub struct TriangleBvh {
    triangles: Vec<BvhTriangle>,
    nodes: Vec<BvhNode>,
    /// Triangle id -> position in `triangles`
    slots: Vec<Option<usize>>,
}

impl TriangleBvh {
    pub fn build(mesh: &TriangleMesh) -> Self {
        let mut triangles: Vec<BvhTriangle> = mesh
            .triangle_ids()
            .filter_map(|id| {
                let corners = mesh.triangle_positions(id)?;
                let centroid = (corners[0] + corners[1] + corners[2]) / 3.0;
                Some(BvhTriangle {
                    id,
                    corners,
                    centroid,
                })
            })
            .collect();

        let mut nodes = Vec::new();
        if !triangles.is_empty() {
            let len = triangles.len();
            build_node(&mut triangles, 0, len, &mut nodes);
        }

        let mut slots = vec![None; mesh.max_triangle_id()];
        for (slot, tri) in triangles.iter().enumerate() {
            slots[tri.id.index()] = Some(slot);
        }

        Self {
            triangles,
            nodes,
            slots,
        }
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Bounds of all indexed triangles
    pub fn bounds(&self) -> Option<Aabb> {
        self.nodes.first().map(|n| *n.bounds())
    }

    fn nearest(&self, point: DVec3) -> Option<(TriangleId, DVec3)> {
        if self.nodes.is_empty() {
            return None;
        }

        let mut best: Option<(TriangleId, DVec3, f64)> = None;
        let mut stack = vec![0usize];

        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            let bound = node.bounds().distance_squared(point);
            if let Some((_, _, best_d2)) = best {
                // Equal distance may still hold a lower id
                if bound > best_d2 {
                    continue;
                }
            }

            match *node {
                BvhNode::Leaf { start, end, .. } => {
                    for tri in &self.triangles[start..end] {
                        let [a, b, c] = tri.corners;
                        let candidate = closest_point_on_triangle(point, a, b, c);
                        let d2 = candidate.distance_squared(point);
                        let better = match best {
                            None => true,
                            Some((best_id, _, best_d2)) => {
                                d2 < best_d2 || (d2 == best_d2 && tri.id < best_id)
                            }
                        };
                        if better {
                            best = Some((tri.id, candidate, d2));
                        }
                    }
                }
                BvhNode::Internal { left, right, .. } => {
                    let dl = self.nodes[left].bounds().distance_squared(point);
                    let dr = self.nodes[right].bounds().distance_squared(point);
                    // Push the farther child first so the nearer one is visited first
                    if dl <= dr {
                        stack.push(right);
                        stack.push(left);
                    } else {
                        stack.push(left);
                        stack.push(right);
                    }
                }
            }
        }

        best.map(|(id, p, _)| (id, p))
    }
}

fn build_node(
    triangles: &mut [BvhTriangle],
    start: usize,
    end: usize,
    nodes: &mut Vec<BvhNode>,
) -> usize {
    let mut bounds = Aabb::empty();
    let mut centroid_bounds = Aabb::empty();
    for tri in &triangles[start..end] {
        for corner in tri.corners {
            bounds.include_point(corner);
        }
        centroid_bounds.include_point(tri.centroid);
    }

    let index = nodes.len();
    if end - start <= MAX_LEAF_TRIANGLES {
        nodes.push(BvhNode::Leaf { bounds, start, end });
        return index;
    }

    let axis = centroid_bounds.longest_axis();
    // Sort for determinism: ties on the split axis fall back to triangle id
    triangles[start..end].sort_by(|a, b| {
        a.centroid[axis]
            .total_cmp(&b.centroid[axis])
            .then(a.id.cmp(&b.id))
    });
    let mid = start + (end - start) / 2;

    // Reserve the slot, children are appended after it
    nodes.push(BvhNode::Leaf { bounds, start, end });
    let left = build_node(triangles, start, mid, nodes);
    let right = build_node(triangles, mid, end, nodes);
    nodes[index] = BvhNode::Internal {
        bounds,
        left,
        right,
    };
    index
}

impl SpatialIndex for TriangleBvh {
    fn find_nearest_triangle(&self, point: DVec3) -> Option<TriangleId> {
        self.nearest(point).map(|(id, _)| id)
    }

    fn closest_point_on(&self, id: TriangleId, point: DVec3) -> Option<DVec3> {
        let slot = (*self.slots.get(id.index())?)?;
        let [a, b, c] = self.triangles[slot].corners;
        Some(closest_point_on_triangle(point, a, b, c))
    }

    fn closest_point(&self, point: DVec3) -> Option<(TriangleId, DVec3)> {
        self.nearest(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{grid, icosphere};

    fn brute_force(mesh: &TriangleMesh, point: DVec3) -> (TriangleId, f64) {
        mesh.triangle_ids()
            .map(|t| {
                let [a, b, c] = mesh.triangle_positions(t).unwrap();
                (t, closest_point_on_triangle(point, a, b, c).distance_squared(point))
            })
            .min_by(|x, y| x.1.total_cmp(&y.1).then(x.0.cmp(&y.0)))
            .unwrap()
    }

    #[test]
    fn test_aabb_distance() {
        let aabb = Aabb::new(DVec3::ZERO, DVec3::ONE);
        assert_eq!(aabb.distance_squared(DVec3::splat(0.5)), 0.0);
        assert!((aabb.distance_squared(DVec3::new(3.0, 0.5, 0.5)) - 4.0).abs() < 1e-12);
        assert!(aabb.contains_point(DVec3::new(1.0, 0.0, 0.5)));
        assert!(!aabb.contains_point(DVec3::new(1.1, 0.0, 0.5)));
    }

    #[test]
    fn test_empty_bvh() {
        let bvh = TriangleBvh::build(&TriangleMesh::new());
        assert!(bvh.is_empty());
        assert_eq!(bvh.find_nearest_triangle(DVec3::ZERO), None);
        assert_eq!(bvh.closest_point(DVec3::ZERO), None);
    }

    #[test]
    fn test_nearest_matches_brute_force() {
        let mesh = icosphere(1.0, 2);
        let bvh = TriangleBvh::build(&mesh);
        assert_eq!(bvh.len(), 320);

        let probes = [
            DVec3::new(2.0, 0.3, -0.1),
            DVec3::new(-0.2, 0.1, 0.05),
            DVec3::new(0.4, -1.7, 0.9),
            DVec3::new(0.0, 0.0, 1.3),
        ];
        for probe in probes {
            let (expected, expected_d2) = brute_force(&mesh, probe);
            let (found, point) = bvh.closest_point(probe).unwrap();
            assert!((point.distance_squared(probe) - expected_d2).abs() < 1e-12);
            assert_eq!(found, expected);
        }
    }

    #[test]
    fn test_ties_prefer_lower_id() {
        // Above a shared grid vertex every incident triangle is equally close
        let mesh = grid(2, 2, 1.0);
        let bvh = TriangleBvh::build(&mesh);
        let probe = DVec3::new(1.0, 1.0, 1.0);
        let (expected, _) = brute_force(&mesh, probe);
        assert_eq!(bvh.find_nearest_triangle(probe), Some(expected));
    }

    #[test]
    fn test_snapshot_survives_mesh_edits() {
        let mut mesh = grid(1, 1, 1.0);
        let bvh = TriangleBvh::build(&mesh);
        for v in mesh.vertex_ids().collect::<Vec<_>>() {
            let p = mesh.position(v).unwrap();
            mesh.set_position(v, p + DVec3::Z * 10.0);
        }
        let (_, point) = bvh.closest_point(DVec3::new(0.5, 0.5, 1.0)).unwrap();
        assert!(point.z.abs() < 1e-12);
    }
}
