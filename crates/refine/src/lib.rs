//! Mesh refinement for Meshwright.
//!
//! This crate turns a rough triangle mesh into a cleaner one with:
//! - Constrained adaptive remeshing toward a target edge-length band
//! - Randomized per-triangle quality optimization
//! - Dual-graph tracing around every closed vertex fan
//!
//! # Architecture
//!
//! Remeshing is a one-shot pipeline driven by [`RemeshOrchestrator`]. It
//! classifies constraints from the input, chooses a projection target, and
//! runs passes of a [`RemeshEngine`]:
//!
//! ```text
//!   TriangleMesh ─► ConstraintClassifier ─► MeshConstraints ─┐
//!                                                            ▼
//!   reference? ─► PassCalibrator ─► BlendedProjectionTarget ─► RemeshEngine x N
//! ```
//!
//! [`QualityOptimizer`] and [`DualGraphTracer`] work on a [`NodeNetwork`]
//! snapshot of triangle adjacency built fresh for each call.
//!
//! ## Key Components
//!
//! - **Constraints**: Sharp-edge, segment, and set-border classification
//! - **Projection**: Blended closest-point snapping onto a reference surface
//! - **Calibration**: Per-pass blend so N passes compound to the total
//! - **Engine**: Split, flip, collapse, smoothing, and projection passes
//! - **Quality**: Cost model and stochastic local search
//! - **Dual**: Ring walking and fan emission

pub mod calibration;
pub mod constraints;
pub mod dual;
pub mod engine;
pub mod network;
pub mod orchestrator;
pub mod projection;
pub mod quality;

pub use calibration::{PassCalibration, PassCalibrator};
pub use constraints::{ConstraintClassifier, EdgeConstraint, MeshConstraints, VertexConstraint};
pub use dual::{DualCell, DualGraphTracer, DualMesh};
pub use engine::{EngineOptions, IsotropicRemesher, PassStats, RemeshEngine};
pub use network::{MeshNode, NodeNetwork};
pub use orchestrator::{RemeshOrchestrator, RemeshReport};
pub use projection::{BlendedProjectionTarget, ProjectionBlend, ProjectionTarget};
pub use quality::{CostModel, OptimizeOutcome, QualityCost, QualityOptimizer};
