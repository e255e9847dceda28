//! Composite triangle quality cost.
//!
//! Three terms, each evaluated over the neighborhood tree of a node:
//! ```text
//!   area    (|A - T| / T)^3 * 3                    averaged toward the root
//!   angle   min(min|a - 90| / 10, sum|a - 60| / 30)^3  averaged toward the root
//!   normal  1 - dot(n, n_ref)                      summed, then * 6
//! ```
//! The tree is expanded level by level from the root along neighbor links
//! (a node reachable by several paths appears once per path), then folded
//! bottom-up. At every inner entry the averaged terms become
//! `(own + sum(children)) / (children + 1)`.

use mesh::{DVec3, TriangleMesh, geometry};

use crate::network::NodeNetwork;

/// Weight applied to the summed normal term
pub const NORMAL_WEIGHT: f64 = 6.0;

/// Deviation of a triangle's area from the target.
pub fn area_term(area: f64, target_area: f64) -> f64 {
    ((area - target_area).abs() / target_area).powi(3) * 3.0
}

/// Zero for equilateral and right triangles, growing as angles degrade.
pub fn angle_term(angles: [f64; 3]) -> f64 {
    let right = angles
        .iter()
        .map(|a| (a - 90.0).abs() / 10.0)
        .fold(f64::INFINITY, f64::min);
    let equilateral: f64 = angles.iter().map(|a| (a - 60.0).abs() / 30.0).sum();
    right.min(equilateral).powi(3)
}

pub fn normal_term(normal: DVec3, reference: DVec3) -> f64 {
    1.0 - normal.dot(reference)
}

/// Per-term cost of a neighborhood.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct QualityCost {
    pub area: f64,
    pub angle: f64,
    pub normal: f64,
}

impl QualityCost {
    pub fn total(&self) -> f64 {
        self.area + self.angle + self.normal
    }
}

#[derive(Debug, Clone, Copy)]
struct Expansion {
    node: usize,
    parent: Option<usize>,
}

/// Evaluates [`QualityCost`] around a node at a fixed depth.
#[derive(Debug, Clone, Copy)]
pub struct CostModel {
    target_area: f64,
    depth: usize,
}

impl CostModel {
    pub fn new(target_area: f64, depth: usize) -> Self {
        Self { target_area, depth }
    }

    pub fn target_area(&self) -> f64 {
        self.target_area
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Terms of a single node from current mesh positions
    fn own(&self, network: &NodeNetwork, mesh: &TriangleMesh, node: usize, reference: DVec3) -> QualityCost {
        let Some([a, b, c]) = network
            .node(node)
            .and_then(|n| mesh.triangle_positions(n.triangle))
        else {
            return QualityCost::default();
        };
        QualityCost {
            area: area_term(geometry::triangle_area(a, b, c), self.target_area),
            angle: angle_term(geometry::interior_angles_deg(a, b, c)),
            normal: normal_term(geometry::triangle_normal(a, b, c), reference),
        }
    }

    /// Cost of the neighborhood tree rooted at `root`, with the normal term
    /// measured against `reference`.
    pub fn evaluate(&self, network: &NodeNetwork, mesh: &TriangleMesh, root: usize, reference: DVec3) -> QualityCost {
        let mut levels: Vec<Vec<Expansion>> = vec![vec![Expansion { node: root, parent: None }]];
        for _ in 0..self.depth {
            let mut next = Vec::new();
            if let Some(level) = levels.last() {
                for (i, entry) in level.iter().enumerate() {
                    let Some(node) = network.node(entry.node) else {
                        continue;
                    };
                    next.extend(node.linked().map(|child| Expansion {
                        node: child,
                        parent: Some(i),
                    }));
                }
            }
            if next.is_empty() {
                break;
            }
            levels.push(next);
        }

        let mut below: Vec<QualityCost> = Vec::new();
        for k in (0..levels.len()).rev() {
            let level = &levels[k];
            let mut sums = vec![QualityCost::default(); level.len()];
            let mut counts = vec![0usize; level.len()];
            if let Some(children) = levels.get(k + 1) {
                for (entry, value) in children.iter().zip(&below) {
                    let Some(p) = entry.parent else {
                        continue;
                    };
                    sums[p].area += value.area;
                    sums[p].angle += value.angle;
                    sums[p].normal += value.normal;
                    counts[p] += 1;
                }
            }

            below = level
                .iter()
                .enumerate()
                .map(|(i, entry)| {
                    let own = self.own(network, mesh, entry.node, reference);
                    let n = counts[i] as f64 + 1.0;
                    QualityCost {
                        area: (own.area + sums[i].area) / n,
                        angle: (own.angle + sums[i].angle) / n,
                        normal: own.normal + sums[i].normal,
                    }
                })
                .collect();
        }

        let root = below.first().copied().unwrap_or_default();
        QualityCost {
            normal: root.normal * NORMAL_WEIGHT,
            ..root
        }
    }
}
