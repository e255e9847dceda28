//! Remesh engine capability interface and the built-in isotropic engine.
//!
//! The orchestrator only talks to a [`RemeshEngine`]: it hands over the
//! constraint set and a projection target, then drives passes. Any engine
//! that honors the same contract can be swapped in.
//!
//! ## Pass anatomy
//!
//! ```text
//!   sorted edge sweep:  collapse (short) | flip (valence) | split (long)
//!            |
//!   buffered Laplacian smoothing  (free, interior vertices)
//!            |
//!   projection toward the target  (free vertices)
//! ```

mod adjacency;
mod edge_collapse;
mod edge_flip;
mod edge_split;
mod isotropic;
mod smoothing;

pub use adjacency::{VertexFans, orient};
pub use edge_collapse::{
    CollapsePlan, CollapseRejection, CollapseResult, apply_collapse, collapse_edge, plan_collapse,
};
pub use edge_flip::{BOUNDARY_VALENCE, INTERIOR_VALENCE, flip_edge};
pub use edge_split::{SplitResult, can_split_edge, split_edge};
pub use isotropic::IsotropicRemesher;
pub use smoothing::{project_vertices, smooth_vertices};

use meshwright_config::{
    DEFAULT_MAX_EDGE_LENGTH, DEFAULT_MIN_EDGE_LENGTH, DEFAULT_SMOOTH_SPEED, RemeshSettings,
};
use mesh::TriangleMesh;
use serde::{Deserialize, Serialize};

use crate::constraints::MeshConstraints;
use crate::projection::ProjectionTarget;

/// Switches and targets shared by every pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineOptions {
    pub enable_flips: bool,
    pub enable_splits: bool,
    pub enable_collapses: bool,
    pub enable_smoothing: bool,
    /// Edges shorter than this are collapsed
    pub min_edge_length: f64,
    /// Edges longer than this are split
    pub max_edge_length: f64,
    /// Laplacian step, 0 = no movement, 1 = jump to the one-ring centroid
    pub smooth_speed: f64,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            enable_flips: true,
            enable_splits: true,
            enable_collapses: true,
            enable_smoothing: true,
            min_edge_length: DEFAULT_MIN_EDGE_LENGTH,
            max_edge_length: DEFAULT_MAX_EDGE_LENGTH,
            smooth_speed: DEFAULT_SMOOTH_SPEED,
        }
    }
}

impl EngineOptions {
    /// Options carrying the band and speed of `settings`
    pub fn from_settings(settings: &RemeshSettings) -> Self {
        Self {
            min_edge_length: settings.min_edge_length,
            max_edge_length: settings.max_edge_length,
            smooth_speed: settings.smooth_speed,
            ..Self::default()
        }
    }
}

/// Counts from one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassStats {
    pub splits: usize,
    pub flips: usize,
    pub collapses: usize,
    pub smoothed: usize,
    pub projected: usize,
}

impl PassStats {
    /// Number of connectivity edits
    pub fn topology_edits(&self) -> usize {
        self.splits + self.flips + self.collapses
    }
}

/// The operations a remesh engine exposes to the orchestrator.
pub trait RemeshEngine {
    /// Replace the constraint set used by subsequent passes
    fn set_external_constraints(&mut self, constraints: MeshConstraints);

    /// Install the surface that smoothing projects toward
    fn set_projection_target(&mut self, target: Box<dyn ProjectionTarget>);

    /// Build per-mesh caches before the first pass
    fn precompute(&mut self, mesh: &TriangleMesh);

    fn options(&self) -> &EngineOptions;

    fn options_mut(&mut self) -> &mut EngineOptions;

    /// One pass, projecting with the target's own settings
    fn basic_remesh_pass(&mut self, mesh: &mut TriangleMesh) -> PassStats;

    /// One pass, projecting with an explicit blend `amount` and falloff
    fn full_projection_pass(
        &mut self,
        mesh: &mut TriangleMesh,
        amount: f64,
        max_distance: Option<f64>,
    ) -> PassStats;
}
