//! Dual-graph tracing.
//!
//! Builds a Voronoi-like dual of a triangle mesh from face adjacency. Each
//! triangle becomes a dual vertex at its centroid. Around every original
//! vertex the tracer walks from triangle to neighboring triangle; when the
//! walk returns to where it started, the ring is closed and becomes one dual
//! cell:
//!
//! ```text
//!        t1 ---- t2              t1 ---- t2
//!       /   \   /  \            /  \    /  \
//!     t0 --- v --- t3    ->   t0 -- c ---- t3      c = mean of ring centroids
//!       \   /   \  /            \  /    \  /
//!        t5 ---- t4              t5 ---- t4
//! ```
//!
//! A fan around an open (boundary) vertex never closes and produces nothing.

use std::collections::HashSet;

use mesh::{DVec3, MeshTopology, Polyline, Segment, TriangleId, TriangleMesh, VertexId, geometry};
use meshwright_config::DualSettings;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::network::NodeNetwork;

/// One closed ring around an original vertex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DualCell {
    pub source_vertex: VertexId,
    /// Synthesized center, also the fan apex in the dual mesh
    pub center: DVec3,
    /// Triangles around the vertex in walk order, starting at the seed
    pub ring: Vec<TriangleId>,
}

/// Everything the tracer produces.
#[derive(Debug, Clone, Default)]
pub struct DualMesh {
    /// Centroid vertices (in triangle order), then one center per cell
    pub mesh: TriangleMesh,
    /// Ring edges of every cell
    pub lines: Vec<Segment>,
    /// Each ring as a closed polyline
    pub polylines: Vec<Polyline>,
    pub cells: Vec<DualCell>,
}

/// Traces the dual of a triangle mesh.
#[derive(Debug, Clone, Default)]
pub struct DualGraphTracer {
    settings: DualSettings,
}

impl DualGraphTracer {
    pub fn new(settings: &DualSettings) -> Self {
        Self {
            settings: settings.clone(),
        }
    }

    pub fn trace(&self, mesh: &TriangleMesh) -> DualMesh {
        let topology = MeshTopology::build(mesh);
        let network = NodeNetwork::build(mesh, &topology);

        let mut dual = DualMesh::default();
        for node in network.nodes() {
            dual.mesh.append_vertex(node.frame.origin);
        }

        let mut processed: HashSet<VertexId> = HashSet::new();
        let mut open = 0usize;
        let mut short = 0usize;

        for seed in network.nodes() {
            for v in seed.vertices {
                if processed.contains(&v) {
                    continue;
                }
                let Some(ring) = walk_ring(&network, seed.id, v) else {
                    open += 1;
                    continue;
                };
                processed.insert(v);

                if ring.len() < self.settings.min_loop_triangles {
                    short += 1;
                    continue;
                }
                self.emit_cell(&network, &mut dual, v, seed.frame.normal, &ring);
            }
        }

        dual.mesh.compute_vertex_normals();

        debug!("dual trace: {} open fans, {} rings below minimum", open, short);
        info!(
            "dual mesh: {} cells, {} vertices, {} triangles",
            dual.cells.len(),
            dual.mesh.vertex_count(),
            dual.mesh.triangle_count()
        );

        if !self.settings.output_mesh {
            dual.mesh = TriangleMesh::new();
        }
        if !self.settings.output_lines {
            dual.lines.clear();
        }
        if !self.settings.output_polylines {
            dual.polylines.clear();
        }
        dual
    }

    fn emit_cell(
        &self,
        network: &NodeNetwork,
        dual: &mut DualMesh,
        source: VertexId,
        seed_normal: DVec3,
        ring: &[usize],
    ) {
        let origin = |id: usize| network.node(id).map_or(DVec3::ZERO, |n| n.frame.origin);
        let points: Vec<DVec3> = ring.iter().map(|&id| origin(id)).collect();
        let center = points.iter().copied().sum::<DVec3>() / points.len() as f64;
        let apex = dual.mesh.append_vertex(center);

        // Wind the fan to agree with the seed triangle
        let fan_normal = geometry::triangle_normal(center, points[0], points[1]);
        let reverse = fan_normal.dot(seed_normal) < 0.0;

        let count = ring.len();
        for j in 0..count {
            let a = VertexId(ring[j] as u32);
            let b = VertexId(ring[(j + 1) % count] as u32);
            let tri = if reverse { [apex, b, a] } else { [apex, a, b] };
            dual.mesh.append_triangle(tri);
            dual.lines.push(Segment::new(points[j], points[(j + 1) % count]));
        }

        let mut closed = points;
        closed.push(closed[0]);
        dual.polylines.push(Polyline::new(closed));

        dual.cells.push(DualCell {
            source_vertex: source,
            center,
            ring: ring
                .iter()
                .filter_map(|&id| network.node(id).map(|n| n.triangle))
                .collect(),
        });
    }
}

/// Walk the triangles around `v` starting at node `seed`.
///
/// Returns the ring in walk order when the walk closes on the seed, `None`
/// when it runs off a boundary or revisits a node other than the seed.
fn walk_ring(network: &NodeNetwork, seed: usize, v: VertexId) -> Option<Vec<usize>> {
    let mut ring = vec![seed];
    let mut visited: HashSet<usize> = HashSet::from([seed]);
    let mut previous: Option<usize> = None;
    let mut current = seed;

    loop {
        let next = network
            .node(current)?
            .linked()
            .filter(|&n| Some(n) != previous)
            .find(|&n| network.node(n).is_some_and(|node| node.uses_vertex(v)))?;

        if next == seed {
            return Some(ring);
        }
        if !visited.insert(next) {
            return None;
        }
        ring.push(next);
        previous = Some(current);
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh::primitives::{grid, icosphere};

    #[test]
    fn test_closed_mesh_one_loop_per_vertex() {
        let mesh = icosphere(1.0, 1);
        let dual = DualGraphTracer::default().trace(&mesh);

        assert_eq!(dual.cells.len(), 42);
        let mut sources: Vec<VertexId> = dual.cells.iter().map(|c| c.source_vertex).collect();
        sources.sort_unstable();
        sources.dedup();
        assert_eq!(sources.len(), 42);

        // Each ring of length L contributes L fan triangles and L lines
        let ring_total: usize = dual.cells.iter().map(|c| c.ring.len()).sum();
        assert_eq!(ring_total, 240);
        assert_eq!(dual.mesh.triangle_count(), ring_total);
        assert_eq!(dual.lines.len(), ring_total);
        assert_eq!(dual.mesh.vertex_count(), 80 + 42);

        let topology = MeshTopology::build(&mesh);
        for cell in &dual.cells {
            assert_eq!(cell.ring.len(), topology.vertex_triangles(cell.source_vertex).len());
        }
        for polyline in &dual.polylines {
            assert!(polyline.is_closed());
        }
    }

    #[test]
    fn test_fan_winding_matches_surface() {
        let mesh = icosphere(1.0, 1);
        let dual = DualGraphTracer::default().trace(&mesh);

        for t in dual.mesh.triangle_ids() {
            let normal = dual.mesh.triangle_normal(t).unwrap();
            let outward = dual.mesh.triangle_centroid(t).unwrap().normalize();
            assert!(normal.dot(outward) > 0.0, "dual triangle {t:?} faces inward");
        }
    }

    #[test]
    fn test_open_fans_are_skipped() {
        let mesh = grid(2, 2, 1.0);
        let dual = DualGraphTracer::default().trace(&mesh);

        // Only the center vertex has a closed fan
        assert_eq!(dual.cells.len(), 1);
        assert_eq!(dual.cells[0].source_vertex, VertexId(4));
        assert_eq!(dual.cells[0].ring.len(), 6);
        assert_eq!(dual.mesh.vertex_count(), 9);
        assert_eq!(dual.mesh.triangle_count(), 6);
        for t in dual.mesh.triangle_ids() {
            assert!(dual.mesh.triangle_normal(t).unwrap().z > 0.0);
        }
        assert!((dual.cells[0].center - DVec3::new(1.0, 1.0, 0.0)).length() < 1e-12);
    }

    #[test]
    fn test_output_toggles_and_minimum() {
        let mesh = icosphere(1.0, 1);
        let settings = DualSettings {
            output_lines: false,
            output_polylines: false,
            ..DualSettings::default()
        };
        let dual = DualGraphTracer::new(&settings).trace(&mesh);
        assert!(dual.lines.is_empty());
        assert!(dual.polylines.is_empty());
        assert_eq!(dual.cells.len(), 42);

        // No vertex of the sphere has valence 7
        let settings = DualSettings {
            min_loop_triangles: 7,
            ..DualSettings::default()
        };
        let dual = DualGraphTracer::new(&settings).trace(&mesh);
        assert!(dual.cells.is_empty());
        assert_eq!(dual.mesh.vertex_count(), 80);
        assert_eq!(dual.mesh.triangle_count(), 0);
    }

    #[test]
    fn test_empty_mesh() {
        let dual = DualGraphTracer::default().trace(&TriangleMesh::new());
        assert!(dual.cells.is_empty());
        assert!(dual.mesh.is_empty());
    }
}
