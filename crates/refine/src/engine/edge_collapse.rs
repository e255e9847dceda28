//! Edge collapse (simplification).
//!
//! Collapsing an edge merges its endpoints into one vertex and removes the
//! two triangles that share it:
//! ```text
//!     Before:              After:
//!        C                    C
//!       /|\                  / \
//!      / | \                /   \
//!     /  |  \              /     \
//!    A---+---B    ->      K-------+
//!     \  |  /              \     /
//!      \ | /                \   /
//!       \|/                  \ /
//!        D                    D
//! ```
//!
//! ## Which vertex survives
//!
//! | A fixed | B fixed | Result                                      |
//! |---------|---------|---------------------------------------------|
//! | no      | no      | lower id kept, moved to the midpoint        |
//! | yes     | no      | A kept at its own position                  |
//! | no      | yes     | B kept at its own position                  |
//! | yes     | yes     | midpoint if they share a set, else rejected |
//!
//! Boundary vertices are treated like fixed ones for placement and are never
//! the vertex that disappears.
//!
//! ## Link condition
//!
//! The one-rings of A and B may only share C and D. Anything else would
//! pinch the surface into a non-manifold configuration.

use std::collections::HashSet;

use mesh::{DVec3, EdgeKey, TriangleId, TriangleMesh, VertexId, geometry};
use tracing::trace;

use super::adjacency::{VertexFans, orient};
use crate::constraints::MeshConstraints;

/// Reasons a collapse was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollapseRejection {
    /// The edge constraint forbids collapse
    Constrained,
    /// Both endpoints are fixed without a shared set
    BothFixed,
    /// A boundary vertex would be removed or moved
    BoundaryVertex,
    /// The edge does not have exactly two triangles
    NotInterior,
    /// The one-rings share more than the two opposite vertices
    LinkCondition,
    /// An opposite vertex would drop below valence 3
    LowValence,
    /// The merged vertex would create an edge longer than the limit
    TooLong,
    /// A surviving triangle would flip or degenerate
    NormalFlip,
    /// The edge or one of its vertices no longer exists
    Missing,
}

/// Result of collapsing an edge.
#[derive(Debug, Clone)]
pub struct CollapseResult {
    /// The vertex that remains after the collapse
    pub kept_vertex: VertexId,
    /// The vertex that was removed
    pub removed_vertex: VertexId,
    /// Triangles removed by the collapse
    pub removed_triangles: [TriangleId; 2],
    /// Final position of the kept vertex
    pub position: DVec3,
}

/// A validated collapse, ready to apply.
#[derive(Debug, Clone, Copy)]
pub struct CollapsePlan {
    pub kept: VertexId,
    pub removed: VertexId,
    pub position: DVec3,
    pub triangles: [TriangleId; 2],
}

/// Validate a collapse of `edge` without touching the mesh.
pub fn plan_collapse(
    mesh: &TriangleMesh,
    fans: &VertexFans,
    constraints: &MeshConstraints,
    edge: EdgeKey,
    max_edge_length: f64,
) -> Result<CollapsePlan, CollapseRejection> {
    if !constraints.edge(edge).can_collapse() {
        return Err(CollapseRejection::Constrained);
    }

    let (a, b) = (edge.a(), edge.b());
    let pa = mesh.position(a).ok_or(CollapseRejection::Missing)?;
    let pb = mesh.position(b).ok_or(CollapseRejection::Missing)?;

    let shared = fans.edge_triangles(mesh, a, b);
    let [t0, t1] = shared[..] else {
        return Err(CollapseRejection::NotInterior);
    };

    let (ca, cb) = (constraints.vertex(a), constraints.vertex(b));
    let (ba, bb) = (fans.is_boundary_vertex(mesh, a), fans.is_boundary_vertex(mesh, b));
    let midpoint = (pa + pb) * 0.5;

    let (kept, removed, position) = match (ca.fixed, cb.fixed) {
        (true, true) if !ca.shares_set_with(&cb) => return Err(CollapseRejection::BothFixed),
        (true, true) if ba || bb => return Err(CollapseRejection::BoundaryVertex),
        (true, true) => (a, b, midpoint),
        (true, false) if bb => return Err(CollapseRejection::BoundaryVertex),
        (true, false) => (a, b, pa),
        (false, true) if ba => return Err(CollapseRejection::BoundaryVertex),
        (false, true) => (b, a, pb),
        (false, false) => match (ba, bb) {
            (true, true) => return Err(CollapseRejection::BoundaryVertex),
            (true, false) => (a, b, pa),
            (false, true) => (b, a, pb),
            (false, false) => (a, b, midpoint),
        },
    };

    // Opposite vertices of the two triangles
    let apex = |t: TriangleId| {
        mesh.triangle(t)
            .and_then(|tri| orient(tri, a, b))
            .map(|[_, _, c]| c)
            .ok_or(CollapseRejection::Missing)
    };
    let (c, d) = (apex(t0)?, apex(t1)?);

    let ring_a: HashSet<VertexId> = fans.neighbors(mesh, a).into_iter().collect();
    let ring_b = fans.neighbors(mesh, b);
    let common = ring_b.iter().filter(|v| ring_a.contains(v)).count();
    if common != 2 || !ring_a.contains(&c) || !ring_a.contains(&d) {
        return Err(CollapseRejection::LinkCondition);
    }
    if fans.valence(mesh, c) <= 3 || fans.valence(mesh, d) <= 3 {
        return Err(CollapseRejection::LowValence);
    }

    // Edges of the merged vertex
    let too_long = ring_a
        .iter()
        .chain(ring_b.iter())
        .filter(|&&v| v != a && v != b)
        .filter_map(|&v| mesh.position(v))
        .any(|p| p.distance(position) > max_edge_length);
    if too_long {
        return Err(CollapseRejection::TooLong);
    }

    // Surviving triangles around either endpoint must keep their orientation
    for &t in fans.triangles(a).iter().chain(fans.triangles(b)) {
        if t == t0 || t == t1 {
            continue;
        }
        let Some(tri) = mesh.triangle(t) else {
            return Err(CollapseRejection::Missing);
        };
        let [p0, p1, p2] = mesh.triangle_positions(t).ok_or(CollapseRejection::Missing)?;
        let before = geometry::triangle_normal(p0, p1, p2);

        let mut moved = [p0, p1, p2];
        for (corner, &v) in tri.iter().enumerate() {
            if v == a || v == b {
                moved[corner] = position;
            }
        }
        let after = geometry::triangle_normal(moved[0], moved[1], moved[2]);
        if after == DVec3::ZERO || before.dot(after) < 0.0 {
            return Err(CollapseRejection::NormalFlip);
        }
    }

    Ok(CollapsePlan {
        kept,
        removed,
        position,
        triangles: [t0, t1],
    })
}

/// Apply a plan produced by [`plan_collapse`] on the same mesh state.
pub fn apply_collapse(
    mesh: &mut TriangleMesh,
    fans: &mut VertexFans,
    constraints: &mut MeshConstraints,
    plan: &CollapsePlan,
) -> CollapseResult {
    let CollapsePlan {
        kept,
        removed,
        position,
        triangles,
    } = *plan;

    for t in triangles {
        if let Some(tri) = mesh.remove_triangle(t) {
            fans.detach(t, tri);
        }
    }

    let rewired: Vec<TriangleId> = fans.triangles(removed).to_vec();
    for t in rewired {
        let Some(tri) = mesh.triangle(t) else {
            continue;
        };
        let renamed = tri.map(|v| if v == removed { kept } else { v });
        mesh.set_triangle(t, renamed);
        fans.attach_to(kept, t);
    }
    fans.clear_vertex(removed);

    mesh.set_position(kept, position);
    mesh.remove_vertex(removed);
    constraints.merge_vertices(kept, removed);

    trace!("collapsed {:?} into {:?}", removed, kept);

    CollapseResult {
        kept_vertex: kept,
        removed_vertex: removed,
        removed_triangles: triangles,
        position,
    }
}

/// Collapse `edge` if every check passes.
pub fn collapse_edge(
    mesh: &mut TriangleMesh,
    fans: &mut VertexFans,
    constraints: &mut MeshConstraints,
    edge: EdgeKey,
    max_edge_length: f64,
) -> Result<CollapseResult, CollapseRejection> {
    let plan = plan_collapse(mesh, fans, constraints, edge, max_edge_length)?;
    Ok(apply_collapse(mesh, fans, constraints, &plan))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::{EdgeConstraint, VertexConstraint};
    use mesh::MeshTopology;
    use mesh::primitives::{grid, icosphere};

    fn setup() -> (TriangleMesh, VertexFans, MeshConstraints) {
        // 4 x 4 vertices; 5, 6, 9 and 10 are interior
        let mesh = grid(3, 3, 1.0);
        let fans = VertexFans::build(&mesh);
        (mesh, fans, MeshConstraints::new())
    }

    fn interior_edge() -> EdgeKey {
        EdgeKey::new(VertexId(5), VertexId(6))
    }

    fn assert_manifold(mesh: &TriangleMesh) {
        let topology = MeshTopology::build(mesh);
        for edge in topology.edges() {
            assert!(topology.edge_triangles(edge).len() <= 2, "{edge:?} is non-manifold");
        }
    }

    #[test]
    fn test_collapse_free_edge_to_midpoint() {
        let (mut mesh, mut fans, mut constraints) = setup();

        let result =
            collapse_edge(&mut mesh, &mut fans, &mut constraints, interior_edge(), 10.0).unwrap();
        assert_eq!(result.kept_vertex, VertexId(5));
        assert_eq!(result.removed_vertex, VertexId(6));
        assert_eq!(mesh.position(VertexId(5)), Some(DVec3::new(1.5, 1.0, 0.0)));
        assert!(!mesh.is_vertex_live(VertexId(6)));
        assert_eq!(mesh.triangle_count(), 16);
        assert_eq!(mesh.vertex_count(), 15);

        for t in mesh.triangle_ids() {
            assert!(mesh.triangle_normal(t).unwrap().z > 0.0);
            assert!(!mesh.triangle(t).unwrap().contains(&VertexId(6)));
        }
        assert_manifold(&mesh);
    }

    #[test]
    fn test_collapse_keeps_fixed_vertex() {
        let (mut mesh, mut fans, mut constraints) = setup();
        constraints.set_vertex(VertexId(6), VertexConstraint::fixed(None));

        let result =
            collapse_edge(&mut mesh, &mut fans, &mut constraints, interior_edge(), 10.0).unwrap();
        assert_eq!(result.kept_vertex, VertexId(6));
        assert_eq!(mesh.position(VertexId(6)), Some(DVec3::new(2.0, 1.0, 0.0)));
        assert!(!mesh.is_vertex_live(VertexId(5)));
        assert!(constraints.is_fixed(VertexId(6)));
    }

    #[test]
    fn test_collapse_both_fixed() {
        let (mut mesh, mut fans, mut constraints) = setup();
        constraints.set_vertex(VertexId(5), VertexConstraint::fixed(Some(1)));
        constraints.set_vertex(VertexId(6), VertexConstraint::fixed(Some(2)));

        let refused = collapse_edge(&mut mesh, &mut fans, &mut constraints, interior_edge(), 10.0);
        assert_eq!(refused.unwrap_err(), CollapseRejection::BothFixed);
        assert_eq!(mesh.triangle_count(), 18);

        constraints.set_vertex(VertexId(6), VertexConstraint::fixed(Some(1)));
        let result =
            collapse_edge(&mut mesh, &mut fans, &mut constraints, interior_edge(), 10.0).unwrap();
        assert_eq!(result.position, DVec3::new(1.5, 1.0, 0.0));
    }

    #[test]
    fn test_collapse_rejections() {
        let (mut mesh, mut fans, mut constraints) = setup();

        let boundary = EdgeKey::new(VertexId(0), VertexId(1));
        assert_eq!(
            plan_collapse(&mesh, &fans, &constraints, boundary, 10.0).unwrap_err(),
            CollapseRejection::NotInterior
        );

        // Collapsing onto boundary vertex 1 would leave corner 0 with two neighbors
        let spoke = EdgeKey::new(VertexId(1), VertexId(5));
        assert_eq!(
            plan_collapse(&mesh, &fans, &constraints, spoke, 10.0).unwrap_err(),
            CollapseRejection::LowValence
        );

        // Interior edge between two boundary vertices
        let square = grid(1, 1, 1.0);
        let square_fans = VertexFans::build(&square);
        let diagonal = EdgeKey::new(VertexId(0), VertexId(3));
        assert_eq!(
            plan_collapse(&square, &square_fans, &constraints, diagonal, 10.0).unwrap_err(),
            CollapseRejection::BoundaryVertex
        );

        assert_eq!(
            plan_collapse(&mesh, &fans, &constraints, interior_edge(), 1.2).unwrap_err(),
            CollapseRejection::TooLong
        );

        constraints.set_edge(interior_edge(), EdgeConstraint::FULLY_CONSTRAINED);
        assert_eq!(
            collapse_edge(&mut mesh, &mut fans, &mut constraints, interior_edge(), 10.0)
                .unwrap_err(),
            CollapseRejection::Constrained
        );
    }

    #[test]
    fn test_collapse_on_closed_mesh() {
        let mut mesh = icosphere(1.0, 1);
        let mut fans = VertexFans::build(&mesh);
        let mut constraints = MeshConstraints::new();
        let edge = mesh.edges()[0];

        collapse_edge(&mut mesh, &mut fans, &mut constraints, edge, 10.0).unwrap();
        assert_eq!(mesh.triangle_count(), 78);
        assert_eq!(mesh.vertex_count(), 41);

        // Closed and manifold: every edge still has exactly two triangles
        let topology = MeshTopology::build(&mesh);
        for e in topology.edges() {
            assert_eq!(topology.edge_triangles(e).len(), 2);
        }

        let rebuilt = VertexFans::build(&mesh);
        for v in mesh.vertex_ids() {
            assert_eq!(fans.neighbors(&mesh, v), rebuilt.neighbors(&mesh, v));
        }
    }
}
