//! Edge length statistics for remesh reports.

use serde::{Deserialize, Serialize};

use crate::triangle_mesh::TriangleMesh;

/// Minimum, maximum and mean edge length over a mesh.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EdgeLengthStats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub count: usize,
}

impl EdgeLengthStats {
    /// Measure every edge of `mesh`. An edgeless mesh reports all zeros.
    pub fn measure(mesh: &TriangleMesh) -> Self {
        let lengths = edge_lengths(mesh);
        if lengths.is_empty() {
            return Self::default();
        }

        let mut stats = Self {
            min: f64::MAX,
            max: 0.0,
            avg: 0.0,
            count: lengths.len(),
        };
        for &len in &lengths {
            stats.min = stats.min.min(len);
            stats.max = stats.max.max(len);
            stats.avg += len;
        }
        stats.avg /= lengths.len() as f64;
        stats
    }
}

/// Lengths of all edges, in sorted edge order
pub fn edge_lengths(mesh: &TriangleMesh) -> Vec<f64> {
    mesh.edges()
        .into_iter()
        .filter_map(|e| mesh.edge_length(e))
        .collect()
}

/// Fraction of edges whose length lies in `[lo, hi]`; 1.0 for an edgeless mesh.
pub fn fraction_within(mesh: &TriangleMesh, lo: f64, hi: f64) -> f64 {
    let lengths = edge_lengths(mesh);
    if lengths.is_empty() {
        return 1.0;
    }
    let inside = lengths.iter().filter(|&&l| l >= lo && l <= hi).count();
    inside as f64 / lengths.len() as f64
}
