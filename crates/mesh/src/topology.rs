//! Derived adjacency for a [`TriangleMesh`].
//!
//! The topology is a snapshot: it is built from the mesh in one pass and does
//! not track later edits. Rebuild it after changing connectivity.
//!
//! ## Neighbor slots
//!
//! Neighbor slot `i` of a triangle is the triangle across edge
//! `(v[i], v[i+1])`:
//! ```text
//!            v2
//!           /  \
//!   slot 2 /    \ slot 1
//!         /      \
//!       v0--------v1
//!          slot 0
//! ```
//! A slot is empty on boundary edges and on non-manifold edges shared by
//! more than two triangles.

use std::collections::HashMap;

use crate::geometry;
use crate::triangle_mesh::{EdgeKey, TriangleId, TriangleMesh, VertexId};

/// Edge, neighbor, and vertex-fan adjacency of a mesh
#[derive(Debug, Clone, Default)]
pub struct MeshTopology {
    edge_triangles: HashMap<EdgeKey, Vec<TriangleId>>,
    neighbors: Vec<[Option<TriangleId>; 3]>,
    vertex_triangles: Vec<Vec<TriangleId>>,
}

impl MeshTopology {
    pub fn build(mesh: &TriangleMesh) -> Self {
        let mut edge_triangles: HashMap<EdgeKey, Vec<TriangleId>> = HashMap::new();
        let mut vertex_triangles = vec![Vec::new(); mesh.max_vertex_id()];

        // Triangle ids ascend, so every per-edge and per-vertex list is sorted
        for t in mesh.triangle_ids() {
            let Some(tri) = mesh.triangle(t) else {
                continue;
            };
            for i in 0..3 {
                let edge = EdgeKey::new(tri[i], tri[(i + 1) % 3]);
                edge_triangles.entry(edge).or_default().push(t);
                if let Some(fan) = vertex_triangles.get_mut(tri[i].index()) {
                    fan.push(t);
                }
            }
        }

        let mut neighbors = vec![[None; 3]; mesh.max_triangle_id()];
        for t in mesh.triangle_ids() {
            let Some(tri) = mesh.triangle(t) else {
                continue;
            };
            for i in 0..3 {
                let edge = EdgeKey::new(tri[i], tri[(i + 1) % 3]);
                let Some(shared) = edge_triangles.get(&edge) else {
                    continue;
                };
                if shared.len() == 2 {
                    neighbors[t.index()][i] = shared.iter().copied().find(|&o| o != t);
                }
            }
        }

        Self {
            edge_triangles,
            neighbors,
            vertex_triangles,
        }
    }

    /// All edges, sorted
    pub fn edges(&self) -> Vec<EdgeKey> {
        let mut edges: Vec<EdgeKey> = self.edge_triangles.keys().copied().collect();
        edges.sort_unstable();
        edges
    }

    pub fn edge_count(&self) -> usize {
        self.edge_triangles.len()
    }

    /// Triangles incident to `edge`, in ascending id order
    pub fn edge_triangles(&self, edge: EdgeKey) -> &[TriangleId] {
        self.edge_triangles
            .get(&edge)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_boundary_edge(&self, edge: EdgeKey) -> bool {
        self.edge_triangles(edge).len() == 1
    }

    /// True when any edge around `v` is a boundary edge
    pub fn is_boundary_vertex(&self, mesh: &TriangleMesh, v: VertexId) -> bool {
        self.vertex_triangles(v).iter().any(|&t| {
            mesh.triangle(t).is_some_and(|tri| {
                tri.iter()
                    .filter(|&&o| o != v)
                    .any(|&o| self.is_boundary_edge(EdgeKey::new(v, o)))
            })
        })
    }

    pub fn neighbors(&self, t: TriangleId) -> [Option<TriangleId>; 3] {
        self.neighbors.get(t.index()).copied().unwrap_or([None; 3])
    }

    pub fn neighbor_count(&self, t: TriangleId) -> usize {
        self.neighbors(t).iter().flatten().count()
    }

    /// Triangles using `v`, in ascending id order
    pub fn vertex_triangles(&self, v: VertexId) -> &[TriangleId] {
        self.vertex_triangles
            .get(v.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Opening angle of an edge in degrees: the angle between the normals of
    /// its two triangles.
    ///
    /// `None` when the edge does not have exactly two triangles. Callers treat
    /// that as sharper than any threshold.
    pub fn opening_angle_deg(&self, mesh: &TriangleMesh, edge: EdgeKey) -> Option<f64> {
        let [t0, t1] = self.edge_triangles(edge) else {
            return None;
        };
        let n0 = mesh.triangle_normal(*t0)?;
        let n1 = mesh.triangle_normal(*t1)?;
        Some(geometry::angle_between_deg(n0, n1))
    }
}
