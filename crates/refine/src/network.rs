//! Triangle adjacency network.
//!
//! One [`MeshNode`] per live triangle, stored in an arena and linked to its
//! edge neighbors by arena index. The network is a snapshot: it is built
//! from scratch for each optimizer or tracer call and dropped afterwards.
//!
//! ## Locking
//!
//! A node with fewer than three neighbors sits on the mesh boundary. It is
//! locked together with every neighbor it does have:
//! ```text
//!   boundary
//!   ========
//!    \ L  /\ L  /
//!     \  /  \  /      L = locked (boundary node or its neighbor)
//!      \/ L  \/
//!      /\    /\
//! ```

use std::collections::{HashMap, HashSet};

use mesh::{Frame, MeshTopology, TriangleId, TriangleMesh, VertexId};
use tracing::debug;

/// Per-triangle record.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshNode {
    /// Arena index
    pub id: usize,
    pub triangle: TriangleId,
    /// Centroid and normal at build time
    pub frame: Frame,
    /// Arena index across each edge; slot i is across (v[i], v[i+1])
    pub neighbors: [Option<usize>; 3],
    pub vertices: [VertexId; 3],
    pub locked: bool,
}

impl MeshNode {
    pub fn neighbor_count(&self) -> usize {
        self.neighbors.iter().flatten().count()
    }

    /// Present neighbor links in slot order
    pub fn linked(&self) -> impl Iterator<Item = usize> + '_ {
        self.neighbors.iter().flatten().copied()
    }

    pub fn uses_vertex(&self, v: VertexId) -> bool {
        self.vertices.contains(&v)
    }
}

/// Arena of [`MeshNode`]s in ascending triangle order.
#[derive(Debug, Clone, Default)]
pub struct NodeNetwork {
    nodes: Vec<MeshNode>,
    by_triangle: HashMap<TriangleId, usize>,
}

impl NodeNetwork {
    pub fn build(mesh: &TriangleMesh, topology: &MeshTopology) -> Self {
        let mut nodes = Vec::with_capacity(mesh.triangle_count());
        let mut by_triangle = HashMap::with_capacity(mesh.triangle_count());

        for t in mesh.triangle_ids() {
            let (Some(vertices), Some([a, b, c])) = (mesh.triangle(t), mesh.triangle_positions(t)) else {
                continue;
            };
            by_triangle.insert(t, nodes.len());
            nodes.push(MeshNode {
                id: nodes.len(),
                triangle: t,
                frame: Frame::from_triangle(a, b, c),
                neighbors: [None; 3],
                vertices,
                locked: false,
            });
        }

        for node in &mut nodes {
            node.neighbors = topology
                .neighbors(node.triangle)
                .map(|n| n.and_then(|t| by_triangle.get(&t).copied()));
        }

        // Lock boundary nodes and their neighbors
        let mut to_lock = Vec::new();
        for node in nodes.iter().filter(|n| n.neighbor_count() < 3) {
            to_lock.push(node.id);
            to_lock.extend(node.linked());
        }
        for id in to_lock {
            nodes[id].locked = true;
        }

        let network = Self { nodes, by_triangle };
        debug!(
            "node network: {} nodes, {} locked",
            network.len(),
            network.locked_count()
        );
        network
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[MeshNode] {
        &self.nodes
    }

    pub fn node(&self, id: usize) -> Option<&MeshNode> {
        self.nodes.get(id)
    }

    pub fn node_for_triangle(&self, t: TriangleId) -> Option<&MeshNode> {
        self.by_triangle.get(&t).and_then(|&i| self.nodes.get(i))
    }

    pub fn locked_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.locked).count()
    }

    /// Vertices used by any locked node
    pub fn pinned_vertices(&self) -> HashSet<VertexId> {
        self.nodes
            .iter()
            .filter(|n| n.locked)
            .flat_map(|n| n.vertices)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh::primitives::{grid, icosphere};

    fn network(mesh: &TriangleMesh) -> NodeNetwork {
        NodeNetwork::build(mesh, &MeshTopology::build(mesh))
    }

    #[test]
    fn test_closed_mesh_has_no_locks() {
        let mesh = icosphere(1.0, 1);
        let net = network(&mesh);
        assert_eq!(net.len(), 80);
        assert_eq!(net.locked_count(), 0);
        assert!(net.nodes().iter().all(|n| n.neighbor_count() == 3));
        assert!(net.pinned_vertices().is_empty());
    }

    #[test]
    fn test_links_are_symmetric() {
        let mesh = icosphere(1.0, 1);
        let net = network(&mesh);
        for node in net.nodes() {
            for other in node.linked() {
                assert!(net.node(other).unwrap().neighbors.contains(&Some(node.id)));
                let shared = node
                    .vertices
                    .iter()
                    .filter(|&&v| net.node(other).unwrap().uses_vertex(v))
                    .count();
                assert_eq!(shared, 2);
            }
        }
    }

    #[test]
    fn test_boundary_locks_propagate_one_ring() {
        // 4 x 4 cells: only triangles two steps away from the rim stay free
        let mesh = grid(4, 4, 1.0);
        let net = network(&mesh);
        assert_eq!(net.len(), 32);

        for node in net.nodes() {
            if node.neighbor_count() < 3 {
                assert!(node.locked);
                for n in node.linked() {
                    assert!(net.node(n).unwrap().locked);
                }
            }
        }
        assert!(net.locked_count() < net.len());

        let t = TriangleId(10);
        assert_eq!(net.node_for_triangle(t).unwrap().triangle, t);
    }
}
