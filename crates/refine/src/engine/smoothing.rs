//! Tangential relaxation and projection.
//!
//! Smoothing is buffered: every new position is computed from the positions
//! at the start of the sweep, then all are written at once. The result is
//! independent of vertex order.

use mesh::{DVec3, TriangleMesh, VertexId};

use super::adjacency::VertexFans;
use crate::constraints::MeshConstraints;
use crate::projection::{ProjectionBlend, ProjectionTarget};

/// Move each free interior vertex toward the centroid of its one-ring.
///
/// Fixed vertices and boundary vertices stay put. Returns the number of
/// vertices that moved.
pub fn smooth_vertices(
    mesh: &mut TriangleMesh,
    fans: &VertexFans,
    constraints: &MeshConstraints,
    speed: f64,
) -> usize {
    let updates: Vec<(VertexId, DVec3)> = mesh
        .vertex_ids()
        .filter(|&v| !constraints.is_fixed(v))
        .filter(|&v| !fans.is_boundary_vertex(mesh, v))
        .filter_map(|v| {
            let p = mesh.position(v)?;
            let ring = fans.neighbors(mesh, v);
            if ring.is_empty() {
                return None;
            }
            let sum: DVec3 = ring.iter().filter_map(|&n| mesh.position(n)).sum();
            let centroid = sum / ring.len() as f64;
            let moved = p + (centroid - p) * speed;
            (moved != p).then_some((v, moved))
        })
        .collect();

    for &(v, p) in &updates {
        mesh.set_position(v, p);
    }
    updates.len()
}

/// Pull every free vertex toward `target`.
///
/// With `blend` set, it overrides the target's own blend settings.
pub fn project_vertices(
    mesh: &mut TriangleMesh,
    constraints: &MeshConstraints,
    target: &dyn ProjectionTarget,
    blend: Option<ProjectionBlend>,
) -> usize {
    let free: Vec<VertexId> = mesh.vertex_ids().filter(|&v| !constraints.is_fixed(v)).collect();

    let mut moved = 0;
    for v in free {
        let Some(p) = mesh.position(v) else {
            continue;
        };
        let projected = match blend {
            Some(blend) => target.project_blended(p, Some(v.index()), blend),
            None => target.project(p, Some(v.index())),
        };
        if projected != p {
            mesh.set_position(v, projected);
            moved += 1;
        }
    }
    moved
}
