//! Procedural test meshes.

use glam::DVec3;
use std::collections::HashMap;
use std::f64::consts::TAU;

use crate::triangle_mesh::{TriangleMesh, VertexId};

/// Geodesic sphere built by repeated 1-to-4 subdivision of an icosahedron.
///
/// Level `n` has `10 * 4^n + 2` vertices and `20 * 4^n` triangles, all wound
/// outward. Vertex normals are the radial directions.
pub fn icosphere(radius: f64, subdivisions: u32) -> TriangleMesh {
    let t = (1.0 + 5f64.sqrt()) / 2.0;
    let mut positions: Vec<DVec3> = [
        (-1.0, t, 0.0),
        (1.0, t, 0.0),
        (-1.0, -t, 0.0),
        (1.0, -t, 0.0),
        (0.0, -1.0, t),
        (0.0, 1.0, t),
        (0.0, -1.0, -t),
        (0.0, 1.0, -t),
        (t, 0.0, -1.0),
        (t, 0.0, 1.0),
        (-t, 0.0, -1.0),
        (-t, 0.0, 1.0),
    ]
    .into_iter()
    .map(|(x, y, z)| DVec3::new(x, y, z).normalize())
    .collect();

    let mut faces: Vec<[u32; 3]> = vec![
        [0, 11, 5],
        [0, 5, 1],
        [0, 1, 7],
        [0, 7, 10],
        [0, 10, 11],
        [1, 5, 9],
        [5, 11, 4],
        [11, 10, 2],
        [10, 7, 6],
        [7, 1, 8],
        [3, 9, 4],
        [3, 4, 2],
        [3, 2, 6],
        [3, 6, 8],
        [3, 8, 9],
        [4, 9, 5],
        [2, 4, 11],
        [6, 2, 10],
        [8, 6, 7],
        [9, 8, 1],
    ];

    for _ in 0..subdivisions {
        let mut midpoints: HashMap<(u32, u32), u32> = HashMap::new();
        let mut midpoint = |a: u32, b: u32, positions: &mut Vec<DVec3>| -> u32 {
            let key = if a < b { (a, b) } else { (b, a) };
            *midpoints.entry(key).or_insert_with(|| {
                let p = ((positions[a as usize] + positions[b as usize]) * 0.5).normalize();
                positions.push(p);
                (positions.len() - 1) as u32
            })
        };

        let mut next = Vec::with_capacity(faces.len() * 4);
        for [a, b, c] in faces {
            let ab = midpoint(a, b, &mut positions);
            let bc = midpoint(b, c, &mut positions);
            let ca = midpoint(c, a, &mut positions);
            next.push([a, ab, ca]);
            next.push([b, bc, ab]);
            next.push([c, ca, bc]);
            next.push([ab, bc, ca]);
        }
        faces = next;
    }

    let mut mesh = TriangleMesh::new();
    for p in &positions {
        mesh.append_vertex_with_normal(*p * radius, Some(*p));
    }
    for [a, b, c] in faces {
        mesh.append_triangle([VertexId(a), VertexId(b), VertexId(c)]);
    }
    mesh
}

/// Flat open grid of `nx` by `ny` square cells in the XY plane, facing +Z.
///
/// Each cell is split along its (0,0)-(1,1) diagonal.
pub fn grid(nx: u32, ny: u32, cell_size: f64) -> TriangleMesh {
    let mut mesh = TriangleMesh::new();
    for j in 0..=ny {
        for i in 0..=nx {
            let p = DVec3::new(f64::from(i) * cell_size, f64::from(j) * cell_size, 0.0);
            mesh.append_vertex_with_normal(p, Some(DVec3::Z));
        }
    }

    let row = nx + 1;
    for j in 0..ny {
        for i in 0..nx {
            let v00 = VertexId(j * row + i);
            let v10 = VertexId(j * row + i + 1);
            let v01 = VertexId((j + 1) * row + i);
            let v11 = VertexId((j + 1) * row + i + 1);
            mesh.append_triangle([v00, v10, v11]);
            mesh.append_triangle([v00, v11, v01]);
        }
    }
    mesh
}

/// Closed cylinder along +Y from `y = 0` to `y = height`, with flat fan caps.
///
/// The side wall has `segments` columns and `rings` rows. The rim edges where
/// the wall meets a cap have a 90 degree opening angle.
pub fn capped_cylinder(radius: f64, height: f64, segments: u32, rings: u32) -> TriangleMesh {
    let segments = segments.max(3);
    let rings = rings.max(1);
    let mut mesh = TriangleMesh::new();

    let ring_vertex = |ring: u32, k: u32| VertexId(ring * segments + k % segments);
    for ring in 0..=rings {
        let y = height * f64::from(ring) / f64::from(rings);
        for k in 0..segments {
            let theta = TAU * f64::from(k) / f64::from(segments);
            mesh.append_vertex(DVec3::new(radius * theta.cos(), y, radius * theta.sin()));
        }
    }

    for ring in 0..rings {
        for k in 0..segments {
            let b0 = ring_vertex(ring, k);
            let b1 = ring_vertex(ring, k + 1);
            let t0 = ring_vertex(ring + 1, k);
            let t1 = ring_vertex(ring + 1, k + 1);
            mesh.append_triangle([b0, t1, b1]);
            mesh.append_triangle([b0, t0, t1]);
        }
    }

    let bottom = mesh.append_vertex(DVec3::ZERO);
    let top = mesh.append_vertex(DVec3::new(0.0, height, 0.0));
    for k in 0..segments {
        mesh.append_triangle([bottom, ring_vertex(0, k), ring_vertex(0, k + 1)]);
        mesh.append_triangle([top, ring_vertex(rings, k + 1), ring_vertex(rings, k)]);
    }

    mesh.compute_vertex_normals();
    mesh
}
