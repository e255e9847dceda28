//! Randomized per-triangle quality optimization.
//!
//! Every unlocked node gets `tries` trials. A trial jitters the node's three
//! vertices, snaps them back onto the surface as it was before the call, and
//! keeps the move only if the neighborhood cost did not rise:
//!
//! ```text
//!   for node in ascending triangle order (unlocked only):
//!       repeat tries:
//!           old  = positions of node vertices
//!           new  = snap(old + uniform[-amount, amount]^3)
//!           keep new if cost(new) <= cost(old), else restore old
//! ```
//!
//! Nodes are visited sequentially and see every move accepted before them,
//! so results depend on visiting order. Vertices shared with locked nodes
//! never move.

pub mod cost;

pub use cost::{CostModel, NORMAL_WEIGHT, QualityCost, angle_term, area_term, normal_term};

use std::collections::HashSet;

use mesh::{DVec3, MeshTopology, SpatialIndex, TriangleBvh, TriangleMesh, VertexId};
use meshwright_config::RandomizeSettings;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::network::{MeshNode, NodeNetwork};

/// Summary of an optimizer call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizeOutcome {
    /// True if any trial was accepted
    pub moved: bool,
    pub trials: usize,
    pub accepted: usize,
    pub locked_nodes: usize,
}

/// Result of a single trial.
#[derive(Debug, Clone, Copy)]
struct Trial {
    before: QualityCost,
    after: QualityCost,
    accepted: bool,
}

/// Stochastic local search over triangle vertex positions.
#[derive(Debug, Clone)]
pub struct QualityOptimizer {
    settings: RandomizeSettings,
}

impl QualityOptimizer {
    pub fn new(settings: &RandomizeSettings) -> Self {
        Self {
            settings: settings.clone(),
        }
    }

    pub fn settings(&self) -> &RandomizeSettings {
        &self.settings
    }

    /// Optimize with a generator seeded from the settings, or from entropy
    pub fn optimize(&self, mesh: &mut TriangleMesh) -> OptimizeOutcome {
        match self.settings.seed {
            Some(seed) => self.optimize_with_rng(mesh, &mut StdRng::seed_from_u64(seed)),
            None => self.optimize_with_rng(mesh, &mut rand::rng()),
        }
    }

    pub fn optimize_with_rng<R: Rng + ?Sized>(&self, mesh: &mut TriangleMesh, rng: &mut R) -> OptimizeOutcome {
        let mut outcome = OptimizeOutcome::default();
        if mesh.is_empty() {
            debug!("quality optimizer: empty mesh, nothing to do");
            return outcome;
        }

        let topology = MeshTopology::build(mesh);
        let network = NodeNetwork::build(mesh, &topology);
        outcome.locked_nodes = network.locked_count();
        if network.is_empty() {
            return outcome;
        }

        let target_area = mesh.mean_triangle_area();
        if !(target_area > 0.0 && target_area.is_finite()) {
            warn!("quality optimizer: degenerate target area {}", target_area);
            return outcome;
        }

        let surface = TriangleBvh::build(mesh);
        let pinned = network.pinned_vertices();
        let model = CostModel::new(target_area, self.settings.neighborhood_depth);

        for node in network.nodes().iter().filter(|n| !n.locked) {
            let movable = node.vertices.map(|v| !pinned.contains(&v));
            if !movable.contains(&true) {
                continue;
            }
            for _ in 0..self.settings.tries {
                outcome.trials += 1;
                let Some(trial) = self.trial(mesh, &network, &surface, &model, node, movable, rng) else {
                    break;
                };
                if trial.accepted {
                    outcome.accepted += 1;
                }
                trace!(
                    "node {}: cost {:.6} -> {:.6} {}",
                    node.id,
                    trial.before.total(),
                    trial.after.total(),
                    if trial.accepted { "kept" } else { "reverted" }
                );
            }
        }
        outcome.moved = outcome.accepted > 0;

        info!(
            "quality optimizer: {} nodes ({} locked), {} of {} trials accepted",
            network.len(),
            outcome.locked_nodes,
            outcome.accepted,
            outcome.trials
        );
        outcome
    }

    #[allow(clippy::too_many_arguments)]
    fn trial<R: Rng + ?Sized>(
        &self,
        mesh: &mut TriangleMesh,
        network: &NodeNetwork,
        surface: &TriangleBvh,
        model: &CostModel,
        node: &MeshNode,
        movable: [bool; 3],
        rng: &mut R,
    ) -> Option<Trial> {
        let amount = self.settings.amount;
        let [a, b, c] = node.vertices;
        let old = [mesh.position(a)?, mesh.position(b)?, mesh.position(c)?];
        let reference = mesh.triangle_normal(node.triangle)?;

        let mut proposed = old;
        for (p, free) in proposed.iter_mut().zip(movable) {
            let mut jitter = || (rng.random::<f64>() * 2.0 - 1.0) * amount;
            let offset = DVec3::new(jitter(), jitter(), jitter());
            if free {
                let moved = *p + offset;
                *p = surface.closest_point(moved).map_or(moved, |(_, snapped)| snapped);
            }
        }

        let before = model.evaluate(network, mesh, node.id, reference);
        write_positions(mesh, node.vertices, proposed);
        let after = model.evaluate(network, mesh, node.id, reference);

        let accepted = after.total() <= before.total();
        if !accepted {
            write_positions(mesh, node.vertices, old);
        }

        Some(Trial {
            before,
            after,
            accepted,
        })
    }
}

fn write_positions(mesh: &mut TriangleMesh, vertices: [VertexId; 3], positions: [DVec3; 3]) {
    for (v, p) in vertices.into_iter().zip(positions) {
        mesh.set_position(v, p);
    }
}

/// Vertices that [`QualityOptimizer`] will never move on `mesh`
pub fn pinned_vertices(mesh: &TriangleMesh) -> HashSet<VertexId> {
    NodeNetwork::build(mesh, &MeshTopology::build(mesh)).pinned_vertices()
}
