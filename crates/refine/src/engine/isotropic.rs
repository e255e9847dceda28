//! Isotropic remesher: drives edges toward a length band.

use mesh::{EdgeKey, TriangleMesh};
use tracing::{debug, trace};

use super::adjacency::VertexFans;
use super::edge_collapse::collapse_edge;
use super::edge_flip::flip_edge;
use super::edge_split::split_edge;
use super::smoothing::{project_vertices, smooth_vertices};
use super::{EngineOptions, PassStats, RemeshEngine};
use crate::constraints::MeshConstraints;
use crate::projection::{ProjectionBlend, ProjectionTarget};

/// Built-in [`RemeshEngine`].
///
/// Each pass visits a sorted snapshot of the edges. An edge that no longer
/// exists when its turn comes is skipped; edges created during the pass wait
/// for the next one.
#[derive(Default)]
pub struct IsotropicRemesher {
    options: EngineOptions,
    constraints: MeshConstraints,
    target: Option<Box<dyn ProjectionTarget>>,
    fans: VertexFans,
}

impl IsotropicRemesher {
    pub fn new(options: EngineOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn constraints(&self) -> &MeshConstraints {
        &self.constraints
    }

    pub fn has_projection_target(&self) -> bool {
        self.target.is_some()
    }

    fn edge_exists(&self, mesh: &TriangleMesh, edge: EdgeKey) -> bool {
        !self.fans.edge_triangles(mesh, edge.a(), edge.b()).is_empty()
    }

    /// Collapse if short, else flip if it balances valence, else split if long
    fn process_edge(&mut self, mesh: &mut TriangleMesh, edge: EdgeKey, stats: &mut PassStats) {
        let Some(length) = mesh.edge_length(edge) else {
            return;
        };
        let EngineOptions {
            enable_flips,
            enable_splits,
            enable_collapses,
            min_edge_length,
            max_edge_length,
            ..
        } = self.options;

        if enable_collapses && length < min_edge_length {
            match collapse_edge(mesh, &mut self.fans, &mut self.constraints, edge, max_edge_length) {
                Ok(_) => {
                    stats.collapses += 1;
                    return;
                }
                Err(reason) => trace!("collapse of {:?} refused: {:?}", edge, reason),
            }
        }

        if enable_flips && flip_edge(mesh, &mut self.fans, &mut self.constraints, edge).is_some() {
            stats.flips += 1;
            return;
        }

        if enable_splits
            && length > max_edge_length
            && split_edge(mesh, &mut self.fans, &mut self.constraints, edge).is_some()
        {
            stats.splits += 1;
        }
    }

    fn run_pass(&mut self, mesh: &mut TriangleMesh, blend: Option<ProjectionBlend>) -> PassStats {
        if !self.fans.is_current(mesh) {
            self.fans = VertexFans::build(mesh);
        }

        let mut stats = PassStats::default();
        for edge in mesh.edges() {
            if self.edge_exists(mesh, edge) {
                self.process_edge(mesh, edge, &mut stats);
            }
        }

        if self.options.enable_smoothing && self.options.smooth_speed > 0.0 {
            stats.smoothed =
                smooth_vertices(mesh, &self.fans, &self.constraints, self.options.smooth_speed);
        }

        if let Some(target) = self.target.as_deref() {
            stats.projected = project_vertices(mesh, &self.constraints, target, blend);
        }

        debug!(
            "remesh pass: {} splits, {} flips, {} collapses, {} smoothed, {} projected",
            stats.splits, stats.flips, stats.collapses, stats.smoothed, stats.projected
        );
        stats
    }
}

impl RemeshEngine for IsotropicRemesher {
    fn set_external_constraints(&mut self, constraints: MeshConstraints) {
        self.constraints = constraints;
    }

    fn set_projection_target(&mut self, target: Box<dyn ProjectionTarget>) {
        self.target = Some(target);
    }

    fn precompute(&mut self, mesh: &TriangleMesh) {
        self.fans = VertexFans::build(mesh);
    }

    fn options(&self) -> &EngineOptions {
        &self.options
    }

    fn options_mut(&mut self) -> &mut EngineOptions {
        &mut self.options
    }

    fn basic_remesh_pass(&mut self, mesh: &mut TriangleMesh) -> PassStats {
        self.run_pass(mesh, None)
    }

    fn full_projection_pass(
        &mut self,
        mesh: &mut TriangleMesh,
        amount: f64,
        max_distance: Option<f64>,
    ) -> PassStats {
        self.run_pass(mesh, Some(ProjectionBlend::new(amount, max_distance)))
    }
}
