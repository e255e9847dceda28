//! Remesh orchestration.
//!
//! Wires constraints and a projection target into a [`RemeshEngine`] and
//! drives the configured number of passes:
//!
//! ```text
//!   mesh ──► ConstraintClassifier ──► engine.set_external_constraints
//!     │
//!     ├─ reference given:  PassCalibrator ─► BlendedProjectionTarget(reference, p, distance)
//!     │                    N x full_projection_pass(p, distance)
//!     │
//!     └─ no reference:     BlendedProjectionTarget::frozen_copy(mesh)
//!                          N x basic_remesh_pass
//! ```
//!
//! The mesh is edited in place. Settings are not validated here; call
//! [`RemeshSettings::validate`] first when the input is untrusted.

use mesh::{EdgeKey, EdgeLengthStats, MeshTopology, Segment, TriangleId, TriangleMesh};
use meshwright_config::RemeshSettings;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::calibration::{PassCalibration, PassCalibrator};
use crate::constraints::{ConstraintClassifier, EdgeConstraint, MeshConstraints};
use crate::engine::{EngineOptions, IsotropicRemesher, PassStats, RemeshEngine};
use crate::projection::BlendedProjectionTarget;

/// Summary of one orchestrated remesh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemeshReport {
    /// Present when a reference mesh drove the projection
    pub calibration: Option<PassCalibration>,
    pub constrained_edges: usize,
    pub constrained_vertices: usize,
    pub passes: Vec<PassStats>,
    /// Edge lengths of the result
    pub edge_stats: EdgeLengthStats,
}

impl RemeshReport {
    /// Sum of all per-pass counts
    pub fn totals(&self) -> PassStats {
        self.passes.iter().fold(PassStats::default(), |acc, p| PassStats {
            splits: acc.splits + p.splits,
            flips: acc.flips + p.flips,
            collapses: acc.collapses + p.collapses,
            smoothed: acc.smoothed + p.smoothed,
            projected: acc.projected + p.projected,
        })
    }
}

/// Drives constrained remeshing of a mesh.
#[derive(Debug, Clone)]
pub struct RemeshOrchestrator {
    settings: RemeshSettings,
    reference: Option<TriangleMesh>,
    segments: Vec<Segment>,
}

impl RemeshOrchestrator {
    pub fn new(settings: &RemeshSettings) -> Self {
        Self {
            settings: settings.clone(),
            reference: None,
            segments: Vec::new(),
        }
    }

    /// Project toward `reference` instead of the mesh's own starting shape
    pub fn with_reference(mut self, reference: &TriangleMesh) -> Self {
        self.reference = Some(reference.clone());
        self
    }

    /// Edges matching these segments are never split, flipped or collapsed
    pub fn with_constrained_segments(mut self, segments: Vec<Segment>) -> Self {
        self.segments = segments;
        self
    }

    pub fn settings(&self) -> &RemeshSettings {
        &self.settings
    }

    /// Remesh with the built-in [`IsotropicRemesher`]
    pub fn run(&self, mesh: &mut TriangleMesh) -> RemeshReport {
        let mut engine = IsotropicRemesher::new(EngineOptions::from_settings(&self.settings));
        self.run_with_engine(mesh, &mut engine)
    }

    /// Remesh with any engine honoring the [`RemeshEngine`] contract
    pub fn run_with_engine(&self, mesh: &mut TriangleMesh, engine: &mut dyn RemeshEngine) -> RemeshReport {
        let constraints = self.classify(mesh);
        self.drive(mesh, engine, constraints)
    }

    fn classify(&self, mesh: &TriangleMesh) -> MeshConstraints {
        let topology = MeshTopology::build(mesh);
        ConstraintClassifier::from_settings(&self.settings, &self.segments).classify(mesh, &topology)
    }

    fn drive(
        &self,
        mesh: &mut TriangleMesh,
        engine: &mut dyn RemeshEngine,
        constraints: MeshConstraints,
    ) -> RemeshReport {
        let settings = &self.settings;
        let mut report = RemeshReport {
            constrained_edges: constraints.edge_count(),
            constrained_vertices: constraints.fixed_vertex_count(),
            ..RemeshReport::default()
        };

        engine.set_external_constraints(constraints);
        let options = engine.options_mut();
        options.enable_flips = true;
        options.enable_splits = true;
        options.enable_collapses = true;
        options.enable_smoothing = true;
        options.min_edge_length = settings.min_edge_length;
        options.max_edge_length = settings.max_edge_length;
        options.smooth_speed = settings.smooth_speed;

        let passes = settings.smooth_passes;
        match &self.reference {
            Some(reference) => {
                let calibration =
                    PassCalibrator::new().calibrate(settings.project_amount, passes);
                let amount = calibration.per_pass_amount;
                let distance = settings.project_distance;
                report.calibration = Some(calibration);

                engine.set_projection_target(Box::new(BlendedProjectionTarget::new(
                    reference, amount, distance,
                )));
                engine.precompute(mesh);
                for _ in 0..passes {
                    report.passes.push(engine.full_projection_pass(mesh, amount, distance));
                }
            }
            None => {
                engine.set_projection_target(Box::new(BlendedProjectionTarget::frozen_copy(mesh)));
                engine.precompute(mesh);
                for _ in 0..passes {
                    report.passes.push(engine.basic_remesh_pass(mesh));
                }
            }
        }

        mesh.compute_vertex_normals();
        report.edge_stats = EdgeLengthStats::measure(mesh);

        let totals = report.totals();
        info!(
            "remeshed in {} passes: {} vertices, {} triangles, {} splits, {} flips, {} collapses",
            passes,
            mesh.vertex_count(),
            mesh.triangle_count(),
            totals.splits,
            totals.flips,
            totals.collapses
        );
        info!(
            "edge lengths: mine {:.4}, maxe {:.4}, avge {:.4}",
            report.edge_stats.min, report.edge_stats.max, report.edge_stats.avg
        );
        report
    }

    /// Remesh only the `selection` triangles and return them followed by the
    /// untouched rest of `mesh`.
    ///
    /// The region border is fully constrained so the remeshed faces keep
    /// meeting the rest along the same edges. Border vertices are duplicated
    /// between the two parts, not welded.
    pub fn remesh_region(&self, mesh: &TriangleMesh, selection: &[TriangleId]) -> (TriangleMesh, RemeshReport) {
        let mut selected: Vec<TriangleId> = selection
            .iter()
            .copied()
            .filter(|&t| mesh.is_triangle_live(t))
            .collect();
        selected.sort_unstable();
        selected.dedup();

        let rest: Vec<TriangleId> = mesh
            .triangle_ids()
            .filter(|t| selected.binary_search(t).is_err())
            .collect();

        let mut region = mesh.submesh(&selected);
        let mut constraints = self.classify(&region);
        let topology = MeshTopology::build(&region);
        let border: Vec<EdgeKey> = topology
            .edges()
            .into_iter()
            .filter(|&e| topology.is_boundary_edge(e))
            .collect();
        for &edge in &border {
            constraints.set_edge(edge, EdgeConstraint::FULLY_CONSTRAINED);
        }
        debug!(
            "region of {} triangles, {} border edges, {} triangles untouched",
            selected.len(),
            border.len(),
            rest.len()
        );

        let mut engine = IsotropicRemesher::new(EngineOptions::from_settings(&self.settings));
        let report = self.drive(&mut region, &mut engine, constraints);

        let mut result = region.compact();
        result.append(&mesh.submesh(&rest));
        (result, report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh::metrics::fraction_within;
    use mesh::primitives::{grid, icosphere};
    use mesh::{DVec3, VertexId};

    #[test]
    fn test_icosphere_converges_to_band() {
        let mut mesh = icosphere(1.0, 2);
        assert_eq!(mesh.vertex_count(), 162);
        assert_eq!(mesh.triangle_count(), 320);

        let settings = RemeshSettings {
            constraint_angle_deg: 30.0,
            smooth_passes: 20,
            smooth_speed: 0.5,
            ..RemeshSettings::with_band(0.1, 0.2)
        };
        let report = RemeshOrchestrator::new(&settings).run(&mut mesh);

        assert!(report.calibration.is_none());
        assert_eq!(report.constrained_edges, 0);
        assert_eq!(report.passes.len(), 20);
        assert!(report.totals().splits > 0);

        let within = fraction_within(&mesh, 0.1, 0.2);
        assert!(within >= 0.95, "only {within} of edges in band: {:?}", report.edge_stats);

        // Still a closed manifold
        let topology = MeshTopology::build(&mesh);
        for edge in topology.edges() {
            assert_eq!(topology.edge_triangles(edge).len(), 2);
        }
    }

    #[test]
    fn test_reference_projection_is_calibrated() {
        let reference = icosphere(1.0, 3);
        let mut mesh = icosphere(1.2, 1);

        let settings = RemeshSettings {
            smooth_passes: 10,
            project_amount: 0.9,
            project_distance: None,
            ..RemeshSettings::with_band(0.2, 0.4)
        };
        let report = RemeshOrchestrator::new(&settings)
            .with_reference(&reference)
            .run(&mut mesh);

        let calibration = report.calibration.unwrap();
        let expected = PassCalibrator::new().calibrate(0.9, 10);
        assert_eq!(calibration, expected);
        assert!(report.passes.iter().all(|p| p.projected > 0));

        // Unbounded distance snaps onto the unit reference
        for v in mesh.vertex_ids() {
            let r = mesh.position(v).unwrap().length();
            assert!(r > 0.95 && r < 1.01, "radius {r}");
        }
    }

    #[test]
    fn test_segments_stay_intact() {
        let mut mesh = grid(2, 2, 1.0);
        let segment = Segment::new(DVec3::new(1.0, 0.0, 0.0), DVec3::ZERO);
        let settings = RemeshSettings {
            smooth_passes: 3,
            ..RemeshSettings::with_band(0.2, 0.5)
        };
        let report = RemeshOrchestrator::new(&settings)
            .with_constrained_segments(vec![segment])
            .run(&mut mesh);

        assert!(report.constrained_edges >= 1);
        assert!(mesh.edges().contains(&EdgeKey::new(VertexId(0), VertexId(1))));
    }

    #[test]
    fn test_interior_segment_is_not_refined() {
        // 4 x 4 cells; vertices 11 and 12 sit at (1, 2) and (2, 2), a flat
        // interior edge that the band would otherwise split
        let mut mesh = grid(4, 4, 1.0);
        let edge = EdgeKey::new(VertexId(11), VertexId(12));
        assert!(mesh.edges().contains(&edge));

        let segment = Segment::new(DVec3::new(2.0, 2.0, 0.0), DVec3::new(1.0, 2.0, 0.0));
        let settings = RemeshSettings {
            smooth_passes: 3,
            ..RemeshSettings::with_band(0.2, 0.5)
        };
        let mut engine = IsotropicRemesher::new(EngineOptions::from_settings(&settings));
        let report = RemeshOrchestrator::new(&settings)
            .with_constrained_segments(vec![segment])
            .run_with_engine(&mut mesh, &mut engine);
        assert!(report.totals().splits > 0);

        // A split would have left two fully constrained halves
        let pinned: Vec<EdgeKey> = engine
            .constraints()
            .constrained_edges()
            .into_iter()
            .filter(|(_, c)| c.is_fully_constrained())
            .map(|(k, _)| k)
            .collect();
        assert_eq!(pinned.len(), 1);
        assert!(mesh.edges().contains(&pinned[0]));
    }

    #[test]
    fn test_orchestrator_enables_engine_operations() {
        let mut mesh = icosphere(1.0, 1);
        let settings = RemeshSettings {
            smooth_passes: 2,
            ..RemeshSettings::with_band(0.05, 0.1)
        };
        let mut engine = IsotropicRemesher::new(EngineOptions {
            enable_flips: false,
            enable_splits: false,
            enable_collapses: false,
            enable_smoothing: false,
            ..EngineOptions::default()
        });

        let report = RemeshOrchestrator::new(&settings).run_with_engine(&mut mesh, &mut engine);
        assert!(report.totals().splits > 0);
        assert!(mesh.triangle_count() > 80);

        let options = engine.options();
        assert!(options.enable_flips && options.enable_splits);
        assert!(options.enable_collapses && options.enable_smoothing);
    }

    #[test]
    fn test_zero_passes_leaves_geometry() {
        let mut mesh = icosphere(1.0, 1);
        let before: Vec<DVec3> = mesh.vertex_ids().filter_map(|v| mesh.position(v)).collect();
        let settings = RemeshSettings {
            smooth_passes: 0,
            ..RemeshSettings::default()
        };
        let report = RemeshOrchestrator::new(&settings).run(&mut mesh);
        assert!(report.passes.is_empty());

        let after: Vec<DVec3> = mesh.vertex_ids().filter_map(|v| mesh.position(v)).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_region_remesh_keeps_unselected_faces() {
        // 4 x 4 cells; the bottom row of cells is triangles 0..8
        let mesh = grid(4, 4, 1.0);
        let selection: Vec<TriangleId> = (0..8).map(TriangleId).collect();
        let settings = RemeshSettings {
            smooth_passes: 3,
            ..RemeshSettings::with_band(0.2, 0.5)
        };

        let (result, report) = RemeshOrchestrator::new(&settings).remesh_region(&mesh, &selection);
        assert!(report.totals().splits > 0);
        assert!(result.triangle_count() > 32);

        // The 24 untouched triangles come last, unchanged
        let ids: Vec<TriangleId> = result.triangle_ids().collect();
        let tail = &ids[ids.len() - 24..];
        for (&t, original) in tail.iter().zip(8..32) {
            let got = result.triangle_positions(t).unwrap();
            let want = mesh.triangle_positions(TriangleId(original)).unwrap();
            assert_eq!(got, want);
        }

        // The shared border at y = 1 was not split: each of its five vertices
        // appears exactly once in the region and once in the rest
        let on_border = |p: DVec3| (p.y - 1.0).abs() < 1e-12;
        let count = result.vertex_ids().filter(|&v| on_border(result.position(v).unwrap())).count();
        assert_eq!(count, 10);
    }
}
