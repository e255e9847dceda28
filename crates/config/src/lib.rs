//! Shared settings for Meshwright
//!
//! This crate is the single source of truth for the parameters recognized by
//! the remeshing, randomized quality optimization, and dual-graph operations.
//! Every settings struct carries the command defaults through `Default`, can be
//! loaded from and saved to JSON, and exposes an opt-in `validate()` that
//! enforces the accepted parameter ranges.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default minimum edge length for remeshing
pub const DEFAULT_MIN_EDGE_LENGTH: f64 = 1.0;

/// Default maximum edge length for remeshing
pub const DEFAULT_MAX_EDGE_LENGTH: f64 = 2.0;

/// Default sharp-feature threshold in degrees
pub const DEFAULT_CONSTRAINT_ANGLE_DEG: f64 = 30.0;

/// Default smoothing step size
pub const DEFAULT_SMOOTH_SPEED: f64 = 0.5;

/// Default number of remesh passes
pub const DEFAULT_SMOOTH_PASSES: usize = 20;

/// Default total projection amount after all passes
pub const DEFAULT_PROJECT_AMOUNT: f64 = 0.9;

/// Default projection falloff radius
pub const DEFAULT_PROJECT_DISTANCE: f64 = 20.0;

/// Default perturbation magnitude for the quality optimizer
pub const DEFAULT_RANDOMIZE_AMOUNT: f64 = 0.01;

/// Default number of trials per triangle
pub const DEFAULT_RANDOMIZE_TRIES: u32 = 16;

/// Default neighborhood depth for quality cost evaluation
pub const DEFAULT_NEIGHBORHOOD_DEPTH: usize = 2;

/// Smallest loop that produces a dual cell
pub const MIN_DUAL_LOOP_TRIANGLES: usize = 3;

/// Errors produced while loading or validating settings
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{name} = {value} is outside the accepted range [{min}, {max}]")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("Edge length band is inverted: min {min} > max {max}")]
    InvertedBand { min: f64, max: f64 },
}

fn check_range(name: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    // NaN fails both comparisons, so test for containment instead
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            name,
            value,
            min,
            max,
        })
    }
}

// ============================================================================
// Vertex set partitioning
// ============================================================================

/// Coordinate axis used by [`SetPartition::AxisThreshold`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Axis {
    X,
    #[default]
    Y,
    Z,
}

impl Axis {
    fn component(self, position: [f64; 3]) -> f64 {
        match self {
            Axis::X => position[0],
            Axis::Y => position[1],
            Axis::Z => position[2],
        }
    }
}

/// Rule that assigns a set id to constrained vertices.
///
/// Two fixed vertices may only be merged by a collapse when they share a set
/// id, so the partition decides which sharp features are allowed to fuse.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum SetPartition {
    /// Constrained vertices carry no set, so no two of them may merge
    #[default]
    None,
    /// Set 1 above the threshold on the given axis, set 2 otherwise
    AxisThreshold { axis: Axis, threshold: f64 },
    /// Set 1 on the positive side of the plane, set 2 otherwise
    Plane { origin: [f64; 3], normal: [f64; 3] },
}

impl SetPartition {
    /// Set id for a constrained vertex at `position`, if the rule assigns one.
    pub fn set_id(&self, position: [f64; 3]) -> Option<i32> {
        match *self {
            SetPartition::None => None,
            SetPartition::AxisThreshold { axis, threshold } => {
                if axis.component(position) > threshold {
                    Some(1)
                } else {
                    Some(2)
                }
            }
            SetPartition::Plane { origin, normal } => {
                let side = (position[0] - origin[0]) * normal[0]
                    + (position[1] - origin[1]) * normal[1]
                    + (position[2] - origin[2]) * normal[2];
                if side > 0.0 { Some(1) } else { Some(2) }
            }
        }
    }
}

// ============================================================================
// Constrained segment matching
// ============================================================================

/// How mesh edges are matched against user-supplied constraint segments.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum SegmentMatch {
    /// Endpoints must be bit-identical.
    ///
    /// Near-coincident endpoints that drifted through a float round trip will
    /// not match.
    #[default]
    Exact,
    /// Endpoints are compared on a grid of the given cell size
    Quantized { resolution: f64 },
}

// ============================================================================
// Remeshing
// ============================================================================

/// Settings for constrained adaptive remeshing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemeshSettings {
    /// Edges shorter than this are collapsed
    pub min_edge_length: f64,
    /// Edges longer than this are split
    pub max_edge_length: f64,
    /// Opening angle (degrees) above which an edge is a sharp feature
    pub constraint_angle_deg: f64,
    /// Laplacian smoothing step size per pass
    pub smooth_speed: f64,
    /// Number of remesh passes
    pub smooth_passes: usize,
    /// Total projection toward the reference after all passes (0..1)
    pub project_amount: f64,
    /// Projection falloff radius; `None` projects at any distance
    pub project_distance: Option<f64>,
    /// Set-id rule for vertices pinned by the angle rule
    pub vertex_partition: SetPartition,
    /// Matching rule for explicit constraint segments
    pub segment_match: SegmentMatch,
}

impl Default for RemeshSettings {
    fn default() -> Self {
        Self {
            min_edge_length: DEFAULT_MIN_EDGE_LENGTH,
            max_edge_length: DEFAULT_MAX_EDGE_LENGTH,
            constraint_angle_deg: DEFAULT_CONSTRAINT_ANGLE_DEG,
            smooth_speed: DEFAULT_SMOOTH_SPEED,
            smooth_passes: DEFAULT_SMOOTH_PASSES,
            project_amount: DEFAULT_PROJECT_AMOUNT,
            project_distance: Some(DEFAULT_PROJECT_DISTANCE),
            vertex_partition: SetPartition::None,
            segment_match: SegmentMatch::Exact,
        }
    }
}

impl RemeshSettings {
    /// Create settings for the given edge length band, other fields default
    pub fn with_band(min_edge_length: f64, max_edge_length: f64) -> Self {
        Self {
            min_edge_length,
            max_edge_length,
            ..Self::default()
        }
    }

    /// Preset for remeshing a selected face region onto a reference.
    ///
    /// The wide angle leaves almost every interior edge free, so only the
    /// region border stays pinned.
    pub fn region_projection() -> Self {
        Self {
            min_edge_length: 0.5,
            max_edge_length: 2.0,
            constraint_angle_deg: 170.0,
            project_amount: 0.99,
            project_distance: Some(20.0),
            ..Self::default()
        }
    }

    /// Check every parameter against its accepted range
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("min_edge_length", self.min_edge_length, 0.001, 200.0)?;
        check_range("max_edge_length", self.max_edge_length, 0.001, 200.0)?;
        if self.min_edge_length > self.max_edge_length {
            return Err(ConfigError::InvertedBand {
                min: self.min_edge_length,
                max: self.max_edge_length,
            });
        }
        check_range("constraint_angle_deg", self.constraint_angle_deg, 0.001, 360.0)?;
        check_range("smooth_speed", self.smooth_speed, 0.01, 1.0)?;
        check_range("smooth_passes", self.smooth_passes as f64, 0.0, 10_000.0)?;
        check_range("project_amount", self.project_amount, 0.01, 1.0)?;
        if let Some(distance) = self.project_distance {
            check_range("project_distance", distance, 0.01, 100_000.0)?;
        }
        if let SegmentMatch::Quantized { resolution } = self.segment_match {
            check_range("segment_match.resolution", resolution, f64::MIN_POSITIVE, f64::MAX)?;
        }
        Ok(())
    }

    /// Parse settings from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize settings to pretty-printed JSON
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// ============================================================================
// Randomized quality optimization
// ============================================================================

/// Settings for the stochastic per-triangle quality optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomizeSettings {
    /// Maximum per-coordinate perturbation
    pub amount: f64,
    /// Trials per unlocked triangle
    pub tries: u32,
    /// RNG seed; `None` draws from OS entropy
    pub seed: Option<u64>,
    /// Neighbor rings included in the quality cost
    pub neighborhood_depth: usize,
}

impl Default for RandomizeSettings {
    fn default() -> Self {
        Self {
            amount: DEFAULT_RANDOMIZE_AMOUNT,
            tries: DEFAULT_RANDOMIZE_TRIES,
            seed: None,
            neighborhood_depth: DEFAULT_NEIGHBORHOOD_DEPTH,
        }
    }
}

impl RandomizeSettings {
    /// Settings with a fixed seed, for reproducible runs
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("amount", self.amount, 0.001, 300.0)?;
        check_range("tries", f64::from(self.tries), 1.0, 1000.0)?;
        check_range("neighborhood_depth", self.neighborhood_depth as f64, 0.0, 8.0)?;
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// ============================================================================
// Dual graph
// ============================================================================

/// Output toggles for the dual-graph tracer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DualSettings {
    /// Emit the fan-triangulated dual mesh
    pub output_mesh: bool,
    /// Emit each loop edge as a separate segment
    pub output_lines: bool,
    /// Emit each loop as a closed polyline
    pub output_polylines: bool,
    /// Loops with fewer triangles are discarded
    pub min_loop_triangles: usize,
}

impl Default for DualSettings {
    fn default() -> Self {
        Self {
            output_mesh: true,
            output_lines: true,
            output_polylines: true,
            min_loop_triangles: MIN_DUAL_LOOP_TRIANGLES,
        }
    }
}

impl DualSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range(
            "min_loop_triangles",
            self.min_loop_triangles as f64,
            MIN_DUAL_LOOP_TRIANGLES as f64,
            f64::MAX,
        )
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_remesh_settings() {
        let settings = RemeshSettings::default();
        assert_eq!(settings.min_edge_length, DEFAULT_MIN_EDGE_LENGTH);
        assert_eq!(settings.max_edge_length, DEFAULT_MAX_EDGE_LENGTH);
        assert_eq!(settings.smooth_passes, 20);
        assert_eq!(settings.project_distance, Some(20.0));
        assert_eq!(settings.segment_match, SegmentMatch::Exact);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_region_preset_is_valid() {
        let settings = RemeshSettings::region_projection();
        assert_eq!(settings.constraint_angle_deg, 170.0);
        assert_eq!(settings.project_amount, 0.99);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings = RemeshSettings::from_json(r#"{ "min_edge_length": 0.1, "max_edge_length": 0.2 }"#)
            .unwrap();
        assert_eq!(settings.min_edge_length, 0.1);
        assert_eq!(settings.max_edge_length, 0.2);
        assert_eq!(settings.constraint_angle_deg, DEFAULT_CONSTRAINT_ANGLE_DEG);
    }

    #[test]
    fn test_json_round_trip() {
        let mut settings = RemeshSettings::with_band(0.1, 0.2);
        settings.vertex_partition = SetPartition::AxisThreshold {
            axis: Axis::Y,
            threshold: 1.0,
        };
        settings.segment_match = SegmentMatch::Quantized { resolution: 1e-6 };
        settings.project_distance = None;

        let json = settings.to_json().unwrap();
        let parsed = RemeshSettings::from_json(&json).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn test_malformed_json() {
        let err = RandomizeSettings::from_json("{ amount: }").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_out_of_range() {
        let settings = RemeshSettings {
            smooth_speed: 2.0,
            ..RemeshSettings::default()
        };
        match settings.validate() {
            Err(ConfigError::OutOfRange { name, .. }) => assert_eq!(name, "smooth_speed"),
            other => panic!("expected out of range, got {other:?}"),
        }

        let randomize = RandomizeSettings {
            tries: 0,
            ..RandomizeSettings::default()
        };
        assert!(randomize.validate().is_err());

        let nan = RemeshSettings {
            project_amount: f64::NAN,
            ..RemeshSettings::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_inverted_band() {
        let settings = RemeshSettings::with_band(2.0, 1.0);
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvertedBand { .. })
        ));
    }

    #[test]
    fn test_set_partition() {
        let none = SetPartition::None;
        assert_eq!(none.set_id([0.0, 5.0, 0.0]), None);

        let by_height = SetPartition::AxisThreshold {
            axis: Axis::Y,
            threshold: 1.0,
        };
        assert_eq!(by_height.set_id([0.0, 1.5, 0.0]), Some(1));
        assert_eq!(by_height.set_id([0.0, 1.0, 0.0]), Some(2));
        assert_eq!(by_height.set_id([9.0, -3.0, 9.0]), Some(2));

        let plane = SetPartition::Plane {
            origin: [0.0, 0.0, 0.0],
            normal: [1.0, 0.0, 0.0],
        };
        assert_eq!(plane.set_id([0.5, 0.0, 0.0]), Some(1));
        assert_eq!(plane.set_id([-0.5, 0.0, 0.0]), Some(2));
    }

    #[test]
    fn test_dual_defaults() {
        let settings = DualSettings::default();
        assert!(settings.output_mesh && settings.output_lines && settings.output_polylines);
        assert!(settings.validate().is_ok());

        let too_small = DualSettings {
            min_loop_triangles: 2,
            ..DualSettings::default()
        };
        assert!(too_small.validate().is_err());
    }
}
