//! Edge split (refinement).
//!
//! Splitting inserts a vertex at the edge midpoint and divides each incident
//! triangle in two:
//! ```text
//!     Before:              After:
//!        C                    C
//!       / \                  /|\
//!      /   \                / | \
//!     /     \              /  |  \
//!    P-------Q    ->      P---M---Q
//!     \     /              \  |  /
//!      \   /                \ | /
//!       \ /                  \|/
//!        D                    D
//! ```
//! Triangle (P, Q, C) becomes (P, M, C) and (M, Q, C), which keeps its
//! winding. Boundary edges have a single incident triangle.

use mesh::{EdgeKey, TriangleId, TriangleMesh, VertexId};

use super::adjacency::{VertexFans, orient};
use crate::constraints::{MeshConstraints, VertexConstraint};

/// Result of splitting an edge.
#[derive(Debug, Clone)]
pub struct SplitResult {
    /// The inserted midpoint vertex
    pub new_vertex: VertexId,
    /// Triangles appended by the split (one per incident triangle)
    pub new_triangles: Vec<TriangleId>,
}

/// Check whether an edge can be split: it must have one or two triangles and
/// its constraint must allow splitting.
pub fn can_split_edge(
    mesh: &TriangleMesh,
    fans: &VertexFans,
    constraints: &MeshConstraints,
    edge: EdgeKey,
) -> bool {
    let count = fans.edge_triangles(mesh, edge.a(), edge.b()).len();
    (1..=2).contains(&count) && constraints.edge(edge).can_split()
}

/// Split an edge at its midpoint.
///
/// A constrained edge hands its constraint to both halves. When both of its
/// endpoints are fixed the new vertex is fixed too, keeping their set id if
/// they share one.
pub fn split_edge(
    mesh: &mut TriangleMesh,
    fans: &mut VertexFans,
    constraints: &mut MeshConstraints,
    edge: EdgeKey,
) -> Option<SplitResult> {
    if !can_split_edge(mesh, fans, constraints, edge) {
        return None;
    }

    let (a, b) = (edge.a(), edge.b());
    let oriented: Vec<(TriangleId, [VertexId; 3])> = fans
        .edge_triangles(mesh, a, b)
        .into_iter()
        .map(|t| Some((t, orient(mesh.triangle(t)?, a, b)?)))
        .collect::<Option<_>>()?;

    let va = *mesh.vertex(a)?;
    let vb = *mesh.vertex(b)?;
    let normal = match (va.normal, vb.normal) {
        (Some(na), Some(nb)) => Some((na + nb).normalize_or_zero()),
        _ => None,
    };
    let m = mesh.append_vertex_with_normal((va.position + vb.position) * 0.5, normal);
    fans.add_vertex(m);

    let mut new_triangles = Vec::with_capacity(oriented.len());
    for (t, [p, q, c]) in oriented {
        mesh.set_triangle(t, [p, m, c]);
        fans.detach_from(q, t);
        fans.attach_to(m, t);

        let added = mesh.append_triangle([m, q, c]);
        fans.attach(added, [m, q, c]);
        new_triangles.push(added);
    }

    if let Some(constraint) = constraints.remove_edge(edge) {
        constraints.set_edge(EdgeKey::new(a, m), constraint);
        constraints.set_edge(EdgeKey::new(m, b), constraint);

        let (ca, cb) = (constraints.vertex(a), constraints.vertex(b));
        if ca.fixed && cb.fixed {
            let set_id = if ca.shares_set_with(&cb) { ca.set_id } else { None };
            constraints.set_vertex(m, VertexConstraint::fixed(set_id));
        }
    }

    Some(SplitResult {
        new_vertex: m,
        new_triangles,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::EdgeConstraint;
    use mesh::primitives::grid;
    use mesh::{DVec3, MeshTopology};

    fn setup() -> (TriangleMesh, VertexFans, MeshConstraints) {
        let mesh = grid(1, 1, 1.0);
        let fans = VertexFans::build(&mesh);
        (mesh, fans, MeshConstraints::new())
    }

    #[test]
    fn test_split_interior_edge() {
        let (mut mesh, mut fans, mut constraints) = setup();
        let diagonal = EdgeKey::new(VertexId(0), VertexId(3));

        let result = split_edge(&mut mesh, &mut fans, &mut constraints, diagonal).unwrap();
        assert_eq!(result.new_triangles.len(), 2);
        assert_eq!(mesh.triangle_count(), 4);
        assert_eq!(mesh.position(result.new_vertex), Some(DVec3::new(0.5, 0.5, 0.0)));

        // Winding is preserved: every triangle still faces +Z
        for t in mesh.triangle_ids() {
            assert!(mesh.triangle_normal(t).unwrap().z > 0.99);
            assert!((mesh.triangle_area(t).unwrap() - 0.25).abs() < 1e-12);
        }

        // The incremental fans agree with a fresh build
        let rebuilt = VertexFans::build(&mesh);
        for v in mesh.vertex_ids() {
            assert_eq!(fans.neighbors(&mesh, v), rebuilt.neighbors(&mesh, v));
        }
        assert_eq!(fans.valence(&mesh, result.new_vertex), 4);
    }

    #[test]
    fn test_split_boundary_edge() {
        let (mut mesh, mut fans, mut constraints) = setup();
        let bottom = EdgeKey::new(VertexId(0), VertexId(1));

        let result = split_edge(&mut mesh, &mut fans, &mut constraints, bottom).unwrap();
        assert_eq!(result.new_triangles.len(), 1);
        assert_eq!(mesh.triangle_count(), 3);

        let topology = MeshTopology::build(&mesh);
        assert!(topology.is_boundary_edge(EdgeKey::new(VertexId(0), result.new_vertex)));
        assert!(topology.is_boundary_edge(EdgeKey::new(result.new_vertex, VertexId(1))));
    }

    #[test]
    fn test_split_refused_when_constrained() {
        let (mut mesh, mut fans, mut constraints) = setup();
        let bottom = EdgeKey::new(VertexId(0), VertexId(1));
        constraints.set_edge(bottom, EdgeConstraint::FULLY_CONSTRAINED);

        assert!(split_edge(&mut mesh, &mut fans, &mut constraints, bottom).is_none());
        assert_eq!(mesh.triangle_count(), 2);
    }

    #[test]
    fn test_split_propagates_constraints() {
        let (mut mesh, mut fans, mut constraints) = setup();
        let bottom = EdgeKey::new(VertexId(0), VertexId(1));
        constraints.set_edge(bottom, EdgeConstraint::NO_FLIP);
        constraints.set_vertex(VertexId(0), VertexConstraint::fixed(Some(2)));
        constraints.set_vertex(VertexId(1), VertexConstraint::fixed(Some(2)));

        let m = split_edge(&mut mesh, &mut fans, &mut constraints, bottom)
            .unwrap()
            .new_vertex;

        assert!(constraints.edge(bottom).is_unconstrained());
        assert_eq!(constraints.edge(EdgeKey::new(VertexId(0), m)), EdgeConstraint::NO_FLIP);
        assert_eq!(constraints.edge(EdgeKey::new(m, VertexId(1))), EdgeConstraint::NO_FLIP);
        assert_eq!(constraints.vertex(m), VertexConstraint::fixed(Some(2)));
    }

    #[test]
    fn test_split_mixed_sets_fixes_without_set() {
        let (mut mesh, mut fans, mut constraints) = setup();
        let bottom = EdgeKey::new(VertexId(0), VertexId(1));
        constraints.set_edge(bottom, EdgeConstraint::NO_FLIP);
        constraints.set_vertex(VertexId(0), VertexConstraint::fixed(Some(1)));
        constraints.set_vertex(VertexId(1), VertexConstraint::fixed(Some(2)));

        let m = split_edge(&mut mesh, &mut fans, &mut constraints, bottom)
            .unwrap()
            .new_vertex;
        assert_eq!(constraints.vertex(m), VertexConstraint::fixed(None));
    }
}
