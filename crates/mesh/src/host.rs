//! Conversion between host meshes and [`TriangleMesh`].
//!
//! Host meshes may mix triangles and quads. Quads are split along their
//! shorter diagonal on import:
//! ```text
//!   D-------C        D-------C        D-------C
//!   |       |        | \     |        |     / |
//!   |       |   ->   |   \   |   or   |   /   |
//!   |       |        |     \ |        | /     |
//!   A-------B        A-------B        A-------B
//!                    |AC| > |BD|      otherwise
//! ```
//!
//! Both directions degrade instead of failing: problems are reported through
//! `tracing` and the offending data is dropped.

use glam::DVec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::triangle_mesh::{TriangleId, TriangleMesh, VertexId};

/// A host face, indexing into [`HostMesh::positions`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostFace {
    Triangle([u32; 3]),
    Quad([u32; 4]),
}

/// Mesh as exchanged with the host application
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostMesh {
    pub positions: Vec<DVec3>,
    /// Per-vertex normals; may be empty, in which case they are computed
    pub normals: Vec<DVec3>,
    pub faces: Vec<HostFace>,
}

impl HostMesh {
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }
}

/// Convert a host mesh into a triangle mesh.
///
/// Missing normals are computed from the triangles. More normals than
/// vertices is treated as corrupt input and yields an empty mesh.
pub fn import_host_mesh(host: &HostMesh) -> TriangleMesh {
    let vertex_count = host.positions.len();
    let has_normals = host.normals.len() == vertex_count;
    if host.normals.len() > vertex_count {
        warn!(
            "import: {} normals for {} vertices, returning empty mesh",
            host.normals.len(),
            vertex_count
        );
        return TriangleMesh::new();
    }

    let mut mesh = TriangleMesh::new();
    for (i, &position) in host.positions.iter().enumerate() {
        let normal = has_normals.then(|| host.normals[i]);
        mesh.append_vertex_with_normal(position, normal);
    }

    let valid = |i: u32| (i as usize) < vertex_count;
    let usable = |tri: &[u32; 3]| {
        tri.iter().all(|&i| valid(i)) && tri[0] != tri[1] && tri[1] != tri[2] && tri[0] != tri[2]
    };

    let mut triangles: Vec<[u32; 3]> = Vec::with_capacity(host.faces.len() * 2);
    let mut skipped = 0usize;
    for face in &host.faces {
        match *face {
            HostFace::Triangle(tri) => triangles.push(tri),
            HostFace::Quad([a, b, c, d]) => {
                if ![a, b, c, d].iter().all(|&i| valid(i)) {
                    skipped += 2;
                    continue;
                }
                let p = |i: u32| host.positions[i as usize];
                if p(a).distance(p(c)) > p(b).distance(p(d)) {
                    triangles.push([a, b, d]);
                    triangles.push([b, c, d]);
                } else {
                    triangles.push([a, b, c]);
                    triangles.push([a, c, d]);
                }
            }
        }
    }

    for tri in triangles {
        if usable(&tri) {
            mesh.append_triangle(tri.map(VertexId));
        } else {
            skipped += 1;
        }
    }

    if skipped > 0 {
        warn!("import: skipped {} invalid or degenerate triangles", skipped);
    }
    if !has_normals {
        mesh.compute_vertex_normals();
    }

    debug!(
        "import: {} vertices, {} triangles",
        mesh.vertex_count(),
        mesh.triangle_count()
    );
    mesh
}

/// Convert a triangle mesh to a dense host mesh.
///
/// Removed and unreferenced vertices are dropped. Triangles that reference a
/// removed vertex are skipped with a diagnostic. Normals are recomputed from
/// the exported triangles.
pub fn export_host_mesh(mesh: &TriangleMesh) -> HostMesh {
    let mut keep: Vec<TriangleId> = Vec::with_capacity(mesh.triangle_count());
    for t in mesh.triangle_ids() {
        let Some(tri) = mesh.triangle(t) else {
            continue;
        };
        if tri.iter().all(|&v| mesh.is_vertex_live(v)) {
            keep.push(t);
        } else {
            warn!("export: triangle {} references a missing vertex {:?}", t.0, tri);
        }
    }

    let mut dense = mesh.submesh(&keep);
    dense.compute_vertex_normals();

    let mut host = HostMesh::default();
    for v in dense.vertex_ids() {
        if let Some(vertex) = dense.vertex(v) {
            host.positions.push(vertex.position);
            host.normals.push(vertex.normal.unwrap_or(DVec3::ZERO));
        }
    }
    for t in dense.triangle_ids() {
        if let Some(tri) = dense.triangle(t) {
            host.faces.push(HostFace::Triangle(tri.map(|v| v.0)));
        }
    }
    host
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::icosphere;

    fn square(a: DVec3, b: DVec3, c: DVec3, d: DVec3) -> HostMesh {
        HostMesh {
            positions: vec![a, b, c, d],
            normals: Vec::new(),
            faces: vec![HostFace::Quad([0, 1, 2, 3])],
        }
    }

    #[test]
    fn test_quad_split_uses_shorter_diagonal() {
        // AC is the long diagonal, so the split runs along BD
        let host = square(
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(3.0, 1.0, 0.0),
            DVec3::new(0.0, 1.0, 0.0),
        );
        let mesh = import_host_mesh(&host);
        let tris: Vec<_> = mesh.triangle_ids().filter_map(|t| mesh.triangle(t)).collect();
        assert_eq!(
            tris,
            vec![
                [VertexId(0), VertexId(1), VertexId(3)],
                [VertexId(1), VertexId(2), VertexId(3)]
            ]
        );

        // A square has equal diagonals and splits along AC
        let host = square(
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(1.0, 1.0, 0.0),
            DVec3::new(0.0, 1.0, 0.0),
        );
        let mesh = import_host_mesh(&host);
        let tris: Vec<_> = mesh.triangle_ids().filter_map(|t| mesh.triangle(t)).collect();
        assert_eq!(
            tris,
            vec![
                [VertexId(0), VertexId(1), VertexId(2)],
                [VertexId(0), VertexId(2), VertexId(3)]
            ]
        );
    }

    #[test]
    fn test_missing_normals_are_computed() {
        let host = square(DVec3::ZERO, DVec3::X, DVec3::ONE.with_z(0.0), DVec3::Y);
        let mesh = import_host_mesh(&host);
        for v in mesh.vertex_ids() {
            let n = mesh.vertex(v).and_then(|v| v.normal).unwrap();
            assert!((n - DVec3::Z).length() < 1e-12);
        }
    }

    #[test]
    fn test_normal_count_mismatch_yields_empty() {
        let mut host = square(DVec3::ZERO, DVec3::X, DVec3::ONE, DVec3::Y);
        host.normals = vec![DVec3::Z; 5];
        let mesh = import_host_mesh(&host);
        assert_eq!(mesh.vertex_count(), 0);
        assert_eq!(mesh.triangle_count(), 0);
    }

    #[test]
    fn test_export_skips_broken_triangles() {
        let mut mesh = icosphere(1.0, 0);
        mesh.remove_vertex(VertexId(0));
        let host = export_host_mesh(&mesh);

        // Vertex 0 is used by five triangles of the icosahedron
        assert_eq!(host.faces.len(), 15);
        assert_eq!(host.positions.len(), 11);
        assert_eq!(host.normals.len(), 11);
    }

    #[test]
    fn test_round_trip_preserves_counts() {
        let sphere = icosphere(1.5, 2);
        let host = export_host_mesh(&sphere);
        assert_eq!(host.positions.len(), 162);
        assert_eq!(host.face_count(), 320);

        let back = import_host_mesh(&host);
        assert_eq!(back.vertex_count(), 162);
        assert_eq!(back.triangle_count(), 320);
        for v in back.vertex_ids() {
            let original = sphere.position(v).unwrap();
            assert_eq!(back.position(v), Some(original));
        }
    }
}
