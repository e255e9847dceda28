//! Edge flip (valence balancing).
//!
//! Flipping replaces the diagonal of the quad formed by two triangles:
//! ```text
//!        C                    C
//!       / \                  /|\
//!      /   \                / | \
//!     P-----Q     ->       P  |  Q
//!      \   /                \ | /
//!       \ /                  \|/
//!        D                    D
//! ```
//! (P, Q, C) + (Q, P, D) become (P, D, C) + (D, Q, C).
//!
//! A flip is only taken when it strictly lowers the summed deviation of the
//! four vertices from their ideal valence.

use mesh::{DVec3, EdgeKey, TriangleMesh, VertexId, geometry};
use tracing::trace;

use super::adjacency::{VertexFans, orient};
use crate::constraints::MeshConstraints;

/// Ideal valence of an interior vertex
pub const INTERIOR_VALENCE: usize = 6;

/// Ideal valence of a boundary vertex
pub const BOUNDARY_VALENCE: usize = 4;

fn target_valence(fans: &VertexFans, mesh: &TriangleMesh, v: VertexId) -> usize {
    if fans.is_boundary_vertex(mesh, v) {
        BOUNDARY_VALENCE
    } else {
        INTERIOR_VALENCE
    }
}

fn deviation(valence: usize, target: usize) -> usize {
    valence.abs_diff(target)
}

/// Flip `edge` when it is allowed and improves valence. Returns the new edge.
pub fn flip_edge(
    mesh: &mut TriangleMesh,
    fans: &mut VertexFans,
    constraints: &mut MeshConstraints,
    edge: EdgeKey,
) -> Option<EdgeKey> {
    if !constraints.edge(edge).can_flip() {
        return None;
    }

    let (a, b) = (edge.a(), edge.b());
    let [t0, t1] = fans.edge_triangles(mesh, a, b)[..] else {
        return None;
    };
    let [p, q, c] = orient(mesh.triangle(t0)?, a, b)?;
    let [q1, p1, d] = orient(mesh.triangle(t1)?, a, b)?;
    // Inconsistent winding across the edge
    if p1 != p || q1 != q {
        return None;
    }
    if c == d || !fans.edge_triangles(mesh, c, d).is_empty() {
        return None;
    }

    let valence = [p, q, c, d].map(|v| fans.valence(mesh, v));
    if valence[0] <= 3 || valence[1] <= 3 {
        return None;
    }
    let targets = [p, q, c, d].map(|v| target_valence(fans, mesh, v));
    let after = [valence[0] - 1, valence[1] - 1, valence[2] + 1, valence[3] + 1];

    let before_dev: usize = (0..4).map(|i| deviation(valence[i], targets[i])).sum();
    let after_dev: usize = (0..4).map(|i| deviation(after[i], targets[i])).sum();
    if after_dev >= before_dev {
        return None;
    }

    // The new pair must face the same way as the old pair
    let [pp, pq, pc, pd] = [p, q, c, d].map(|v| mesh.position(v));
    let (pp, pq, pc, pd) = (pp?, pq?, pc?, pd?);
    let reference = geometry::triangle_normal(pp, pq, pc) + geometry::triangle_normal(pq, pp, pd);
    let n0 = geometry::triangle_normal(pp, pd, pc);
    let n1 = geometry::triangle_normal(pd, pq, pc);
    if n0 == DVec3::ZERO || n1 == DVec3::ZERO || n0.dot(reference) <= 0.0 || n1.dot(reference) <= 0.0 {
        return None;
    }

    mesh.set_triangle(t0, [p, d, c]);
    fans.detach_from(q, t0);
    fans.attach_to(d, t0);

    mesh.set_triangle(t1, [d, q, c]);
    fans.detach_from(p, t1);
    fans.attach_to(c, t1);

    constraints.remove_edge(edge);
    let flipped = EdgeKey::new(c, d);
    trace!("flipped {:?} to {:?}", edge, flipped);
    Some(flipped)
}
