//! Incrementally maintained vertex-to-triangle adjacency.
//!
//! The remesher edits connectivity one edge at a time, so rebuilding a full
//! [`mesh::MeshTopology`] after every edit would dominate a pass. Each
//! primitive instead detaches and attaches the triangles it rewrites.

use mesh::{TriangleId, TriangleMesh, VertexId};

/// Triangles incident to each vertex
#[derive(Debug, Clone, Default)]
pub struct VertexFans {
    fans: Vec<Vec<TriangleId>>,
    triangle_capacity: usize,
}

impl VertexFans {
    pub fn build(mesh: &TriangleMesh) -> Self {
        let mut fans = Self {
            fans: vec![Vec::new(); mesh.max_vertex_id()],
            triangle_capacity: 0,
        };
        for t in mesh.triangle_ids() {
            if let Some(tri) = mesh.triangle(t) {
                fans.attach(t, tri);
            }
        }
        fans.triangle_capacity = mesh.max_triangle_id();
        fans
    }

    /// False once the mesh has grown behind the cache's back
    pub fn is_current(&self, mesh: &TriangleMesh) -> bool {
        self.fans.len() == mesh.max_vertex_id() && self.triangle_capacity == mesh.max_triangle_id()
    }

    pub fn triangles(&self, v: VertexId) -> &[TriangleId] {
        self.fans.get(v.index()).map(Vec::as_slice).unwrap_or(&[])
    }

    fn fan_mut(&mut self, v: VertexId) -> &mut Vec<TriangleId> {
        if v.index() >= self.fans.len() {
            self.fans.resize(v.index() + 1, Vec::new());
        }
        &mut self.fans[v.index()]
    }

    /// Register a vertex appended to the mesh
    pub fn add_vertex(&mut self, v: VertexId) {
        self.fan_mut(v);
    }

    pub fn attach(&mut self, t: TriangleId, tri: [VertexId; 3]) {
        for v in tri {
            self.fan_mut(v).push(t);
        }
        self.triangle_capacity = self.triangle_capacity.max(t.index() + 1);
    }

    pub fn detach(&mut self, t: TriangleId, tri: [VertexId; 3]) {
        for v in tri {
            self.detach_from(v, t);
        }
    }

    pub fn attach_to(&mut self, v: VertexId, t: TriangleId) {
        self.fan_mut(v).push(t);
    }

    pub fn detach_from(&mut self, v: VertexId, t: TriangleId) {
        if let Some(fan) = self.fans.get_mut(v.index()) {
            fan.retain(|&o| o != t);
        }
    }

    pub fn clear_vertex(&mut self, v: VertexId) {
        if let Some(fan) = self.fans.get_mut(v.index()) {
            fan.clear();
        }
    }

    /// Triangles containing both `a` and `b`, ascending
    pub fn edge_triangles(&self, mesh: &TriangleMesh, a: VertexId, b: VertexId) -> Vec<TriangleId> {
        let mut shared: Vec<TriangleId> = self
            .triangles(a)
            .iter()
            .copied()
            .filter(|&t| mesh.triangle(t).is_some_and(|tri| tri.contains(&b)))
            .collect();
        shared.sort_unstable();
        shared
    }

    /// One-ring of `v`, ascending
    pub fn neighbors(&self, mesh: &TriangleMesh, v: VertexId) -> Vec<VertexId> {
        let mut ring: Vec<VertexId> = self
            .triangles(v)
            .iter()
            .filter_map(|&t| mesh.triangle(t))
            .flatten()
            .filter(|&o| o != v)
            .collect();
        ring.sort_unstable();
        ring.dedup();
        ring
    }

    pub fn valence(&self, mesh: &TriangleMesh, v: VertexId) -> usize {
        self.neighbors(mesh, v).len()
    }

    pub fn is_boundary_edge(&self, mesh: &TriangleMesh, a: VertexId, b: VertexId) -> bool {
        self.edge_triangles(mesh, a, b).len() == 1
    }

    pub fn is_boundary_vertex(&self, mesh: &TriangleMesh, v: VertexId) -> bool {
        self.neighbors(mesh, v)
            .into_iter()
            .any(|o| self.is_boundary_edge(mesh, v, o))
    }
}

/// Rotate `tri` so that its first two corners are the edge {a, b}.
///
/// The returned order keeps the triangle's winding, so the first corner is
/// whichever of `a` and `b` comes first going counter-clockwise.
pub fn orient(tri: [VertexId; 3], a: VertexId, b: VertexId) -> Option<[VertexId; 3]> {
    (0..3).find_map(|i| {
        let p = tri[i];
        let q = tri[(i + 1) % 3];
        let is_edge = (p == a && q == b) || (p == b && q == a);
        is_edge.then(|| [p, q, tri[(i + 2) % 3]])
    })
}
