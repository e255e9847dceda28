//! Indexed triangle mesh with stable identifiers.
//!
//! Vertices and triangles live in slot vectors. Removing an element leaves a
//! hole instead of renumbering, so ids handed out during remeshing stay valid
//! until [`TriangleMesh::compact`] produces a dense copy.
//!
//! ## Winding
//!
//! Triangles are counter-clockwise when viewed from the side their normal
//! points to:
//! ```text
//!        v2
//!       /  \
//!      /    \
//!    v0------v1      normal = (v1 - v0) x (v2 - v0)
//! ```

use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::MeshError;
use crate::geometry;

/// Type-safe vertex identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VertexId(pub u32);

impl VertexId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Type-safe triangle identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TriangleId(pub u32);

impl TriangleId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Undirected edge, stored with the smaller vertex id first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeKey(VertexId, VertexId);

impl EdgeKey {
    pub fn new(a: VertexId, b: VertexId) -> Self {
        if a <= b { Self(a, b) } else { Self(b, a) }
    }

    pub fn a(self) -> VertexId {
        self.0
    }

    pub fn b(self) -> VertexId {
        self.1
    }

    pub fn vertices(self) -> [VertexId; 2] {
        [self.0, self.1]
    }

    pub fn contains(self, v: VertexId) -> bool {
        self.0 == v || self.1 == v
    }

    /// The endpoint that is not `v`
    pub fn other(self, v: VertexId) -> Option<VertexId> {
        if self.0 == v {
            Some(self.1)
        } else if self.1 == v {
            Some(self.0)
        } else {
            None
        }
    }
}

/// A mesh vertex
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub position: DVec3,
    pub normal: Option<DVec3>,
}

/// Indexed triangle mesh
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriangleMesh {
    vertices: Vec<Option<Vertex>>,
    triangles: Vec<Option<[VertexId; 3]>>,
    live_vertices: usize,
    live_triangles: usize,
}

impl TriangleMesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a mesh from flat buffers.
    ///
    /// Every index must reference an existing vertex and no triangle may
    /// repeat a vertex. `normals`, when given, must match `positions` in length.
    pub fn from_indexed(
        positions: &[DVec3],
        normals: Option<&[DVec3]>,
        indices: &[u32],
    ) -> Result<Self, MeshError> {
        if indices.len() % 3 != 0 {
            return Err(MeshError::RaggedIndices(indices.len()));
        }
        if let Some(normals) = normals {
            if normals.len() != positions.len() {
                return Err(MeshError::NormalCountMismatch {
                    normals: normals.len(),
                    vertices: positions.len(),
                });
            }
        }

        let mut mesh = Self::new();
        for (i, &position) in positions.iter().enumerate() {
            let normal = normals.map(|n| n[i]);
            mesh.append_vertex_with_normal(position, normal);
        }

        for (t, tri) in indices.chunks_exact(3).enumerate() {
            for &vertex in tri {
                if vertex as usize >= positions.len() {
                    return Err(MeshError::VertexOutOfRange {
                        triangle: t,
                        vertex,
                        vertex_count: positions.len(),
                    });
                }
            }
            if tri[0] == tri[1] || tri[1] == tri[2] || tri[0] == tri[2] {
                return Err(MeshError::DegenerateTriangle(t));
            }
            mesh.append_triangle([VertexId(tri[0]), VertexId(tri[1]), VertexId(tri[2])]);
        }

        Ok(mesh)
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    pub fn append_vertex(&mut self, position: DVec3) -> VertexId {
        self.append_vertex_with_normal(position, None)
    }

    pub fn append_vertex_with_normal(&mut self, position: DVec3, normal: Option<DVec3>) -> VertexId {
        let id = VertexId(self.vertices.len() as u32);
        self.vertices.push(Some(Vertex { position, normal }));
        self.live_vertices += 1;
        id
    }

    /// Append a triangle. The caller guarantees the three vertices are live
    /// and distinct.
    pub fn append_triangle(&mut self, vertices: [VertexId; 3]) -> TriangleId {
        debug_assert!(vertices.iter().all(|&v| self.is_vertex_live(v)));
        let id = TriangleId(self.triangles.len() as u32);
        self.triangles.push(Some(vertices));
        self.live_triangles += 1;
        id
    }

    /// Replace the corners of a live triangle
    pub fn set_triangle(&mut self, id: TriangleId, vertices: [VertexId; 3]) -> bool {
        match self.triangles.get_mut(id.index()) {
            Some(Some(tri)) => {
                *tri = vertices;
                true
            }
            _ => false,
        }
    }

    pub fn remove_triangle(&mut self, id: TriangleId) -> Option<[VertexId; 3]> {
        let removed = self.triangles.get_mut(id.index())?.take();
        if removed.is_some() {
            self.live_triangles -= 1;
        }
        removed
    }

    /// Remove a vertex. Triangles still referencing it are left in place.
    pub fn remove_vertex(&mut self, id: VertexId) -> Option<Vertex> {
        let removed = self.vertices.get_mut(id.index())?.take();
        if removed.is_some() {
            self.live_vertices -= 1;
        }
        removed
    }

    pub fn set_position(&mut self, id: VertexId, position: DVec3) -> bool {
        match self.vertices.get_mut(id.index()) {
            Some(Some(vertex)) => {
                vertex.position = position;
                true
            }
            _ => false,
        }
    }

    pub fn set_normal(&mut self, id: VertexId, normal: Option<DVec3>) -> bool {
        match self.vertices.get_mut(id.index()) {
            Some(Some(vertex)) => {
                vertex.normal = normal;
                true
            }
            _ => false,
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(id.index())?.as_ref()
    }

    pub fn position(&self, id: VertexId) -> Option<DVec3> {
        self.vertex(id).map(|v| v.position)
    }

    pub fn triangle(&self, id: TriangleId) -> Option<[VertexId; 3]> {
        *self.triangles.get(id.index())?
    }

    pub fn is_vertex_live(&self, id: VertexId) -> bool {
        self.vertex(id).is_some()
    }

    pub fn is_triangle_live(&self, id: TriangleId) -> bool {
        self.triangle(id).is_some()
    }

    /// Live vertex ids in ascending order
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.vertices
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_some())
            .map(|(i, _)| VertexId(i as u32))
    }

    /// Live triangle ids in ascending order
    pub fn triangle_ids(&self) -> impl Iterator<Item = TriangleId> + '_ {
        self.triangles
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_some())
            .map(|(i, _)| TriangleId(i as u32))
    }

    pub fn vertex_count(&self) -> usize {
        self.live_vertices
    }

    pub fn triangle_count(&self) -> usize {
        self.live_triangles
    }

    /// One past the largest vertex id ever handed out
    pub fn max_vertex_id(&self) -> usize {
        self.vertices.len()
    }

    /// One past the largest triangle id ever handed out
    pub fn max_triangle_id(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live_triangles == 0
    }

    pub fn triangle_positions(&self, id: TriangleId) -> Option<[DVec3; 3]> {
        let [a, b, c] = self.triangle(id)?;
        Some([self.position(a)?, self.position(b)?, self.position(c)?])
    }

    pub fn triangle_normal(&self, id: TriangleId) -> Option<DVec3> {
        let [a, b, c] = self.triangle_positions(id)?;
        Some(geometry::triangle_normal(a, b, c))
    }

    pub fn triangle_area(&self, id: TriangleId) -> Option<f64> {
        let [a, b, c] = self.triangle_positions(id)?;
        Some(geometry::triangle_area(a, b, c))
    }

    pub fn triangle_centroid(&self, id: TriangleId) -> Option<DVec3> {
        let [a, b, c] = self.triangle_positions(id)?;
        Some(geometry::triangle_centroid(a, b, c))
    }

    /// Mean triangle area, 0 for an empty mesh
    pub fn mean_triangle_area(&self) -> f64 {
        if self.live_triangles == 0 {
            return 0.0;
        }
        let total: f64 = self
            .triangle_ids()
            .filter_map(|t| self.triangle_area(t))
            .sum();
        total / self.live_triangles as f64
    }

    /// All edges of live triangles, sorted and deduplicated
    pub fn edges(&self) -> Vec<EdgeKey> {
        let mut edges: Vec<EdgeKey> = self
            .triangles
            .iter()
            .flatten()
            .flat_map(|t| {
                [
                    EdgeKey::new(t[0], t[1]),
                    EdgeKey::new(t[1], t[2]),
                    EdgeKey::new(t[2], t[0]),
                ]
            })
            .collect();
        edges.sort_unstable();
        edges.dedup();
        edges
    }

    pub fn edge_length(&self, edge: EdgeKey) -> Option<f64> {
        Some(self.position(edge.a())?.distance(self.position(edge.b())?))
    }

    // ========================================================================
    // Whole-mesh operations
    // ========================================================================

    /// Dense copy holding only live triangles and the vertices they use.
    ///
    /// Relative order of vertices and triangles is preserved.
    pub fn compact(&self) -> TriangleMesh {
        let tris: Vec<TriangleId> = self.triangle_ids().collect();
        self.submesh(&tris)
    }

    /// Dense copy of the given triangles (in ascending id order) and the
    /// vertices they reference. Dead or repeated ids are ignored.
    pub fn submesh(&self, triangles: &[TriangleId]) -> TriangleMesh {
        let mut selected: Vec<TriangleId> = triangles
            .iter()
            .copied()
            .filter(|&t| self.is_triangle_live(t))
            .collect();
        selected.sort_unstable();
        selected.dedup();

        // Sort for determinism: new vertex ids follow old id order
        let mut used: Vec<VertexId> = selected
            .iter()
            .filter_map(|&t| self.triangle(t))
            .flatten()
            .filter(|&v| self.is_vertex_live(v))
            .collect();
        used.sort_unstable();
        used.dedup();

        let mut out = TriangleMesh::new();
        let mut remap: HashMap<VertexId, VertexId> = HashMap::with_capacity(used.len());
        for v in used {
            if let Some(vertex) = self.vertex(v) {
                remap.insert(v, out.append_vertex_with_normal(vertex.position, vertex.normal));
            }
        }
        for t in selected {
            let Some([a, b, c]) = self.triangle(t) else {
                continue;
            };
            if let (Some(&a), Some(&b), Some(&c)) = (remap.get(&a), remap.get(&b), remap.get(&c)) {
                out.append_triangle([a, b, c]);
            }
        }
        out
    }

    /// Append the live elements of `other`, returning the new id of each of
    /// its vertices (indexed by old id).
    pub fn append(&mut self, other: &TriangleMesh) -> Vec<Option<VertexId>> {
        let mut remap = vec![None; other.max_vertex_id()];
        for v in other.vertex_ids() {
            if let Some(vertex) = other.vertex(v) {
                remap[v.index()] =
                    Some(self.append_vertex_with_normal(vertex.position, vertex.normal));
            }
        }
        for t in other.triangle_ids() {
            let Some(tri) = other.triangle(t) else {
                continue;
            };
            let mapped = tri.map(|v| remap.get(v.index()).copied().flatten());
            if let [Some(a), Some(b), Some(c)] = mapped {
                self.append_triangle([a, b, c]);
            }
        }
        remap
    }

    /// Recompute per-vertex normals as area-weighted face normal averages.
    ///
    /// Vertices not used by any triangle get a zero normal.
    pub fn compute_vertex_normals(&mut self) {
        let mut sums = vec![DVec3::ZERO; self.vertices.len()];
        for t in self.triangle_ids() {
            let (Some(tri), Some([a, b, c])) = (self.triangle(t), self.triangle_positions(t)) else {
                continue;
            };
            // Unnormalized cross product weights by twice the area
            let weighted = (b - a).cross(c - a);
            for v in tri {
                sums[v.index()] += weighted;
            }
        }
        for (slot, sum) in self.vertices.iter_mut().zip(sums) {
            if let Some(vertex) = slot {
                vertex.normal = Some(sum.normalize_or_zero());
            }
        }
    }
}
