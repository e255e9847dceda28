//! Edge and vertex constraints for remeshing.
//!
//! Constraints are derived from two independent rules:
//!
//! - **Sharp features**: an edge whose opening angle exceeds the threshold
//!   (or that has no opening angle because it lies on the boundary) may not
//!   be flipped, and both of its endpoints are pinned in place.
//! - **Explicit segments**: an edge whose endpoints coincide with a
//!   user-supplied segment, in either order, is fully constrained.
//!
//! Later rules overwrite earlier ones on the same edge, so a segment match
//! always wins over the sharp-feature flag.

use meshwright_config::{RemeshSettings, SegmentMatch, SetPartition};
use mesh::{DVec3, EdgeKey, MeshTopology, Segment, TriangleMesh, VertexId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

/// Refinement operations forbidden on an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EdgeConstraint {
    pub no_flip: bool,
    pub no_split: bool,
    pub no_collapse: bool,
}

impl EdgeConstraint {
    pub const UNCONSTRAINED: Self = Self {
        no_flip: false,
        no_split: false,
        no_collapse: false,
    };

    pub const NO_FLIP: Self = Self {
        no_flip: true,
        no_split: false,
        no_collapse: false,
    };

    pub const FULLY_CONSTRAINED: Self = Self {
        no_flip: true,
        no_split: true,
        no_collapse: true,
    };

    pub fn can_flip(&self) -> bool {
        !self.no_flip
    }

    pub fn can_split(&self) -> bool {
        !self.no_split
    }

    pub fn can_collapse(&self) -> bool {
        !self.no_collapse
    }

    pub fn is_unconstrained(&self) -> bool {
        *self == Self::UNCONSTRAINED
    }

    pub fn is_fully_constrained(&self) -> bool {
        *self == Self::FULLY_CONSTRAINED
    }

    /// Forbid everything either constraint forbids
    pub fn union(self, other: Self) -> Self {
        Self {
            no_flip: self.no_flip || other.no_flip,
            no_split: self.no_split || other.no_split,
            no_collapse: self.no_collapse || other.no_collapse,
        }
    }
}

/// Position constraint on a vertex.
///
/// `set_id` groups fixed vertices: two fixed vertices may only be merged when
/// both carry the same non-negative set id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VertexConstraint {
    pub fixed: bool,
    pub set_id: Option<i32>,
}

impl VertexConstraint {
    pub const UNCONSTRAINED: Self = Self {
        fixed: false,
        set_id: None,
    };

    pub fn fixed(set_id: Option<i32>) -> Self {
        Self {
            fixed: true,
            set_id,
        }
    }

    /// Both constraints carry the same valid set id
    pub fn shares_set_with(&self, other: &VertexConstraint) -> bool {
        match (self.set_id, other.set_id) {
            (Some(a), Some(b)) => a >= 0 && a == b,
            _ => false,
        }
    }
}

/// Constraint store keyed by edge and vertex.
#[derive(Debug, Clone, Default)]
pub struct MeshConstraints {
    edges: HashMap<EdgeKey, EdgeConstraint>,
    vertices: HashMap<VertexId, VertexConstraint>,
}

impl MeshConstraints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or replace the constraint on `edge`. Unconstrained values clear it.
    pub fn set_edge(&mut self, edge: EdgeKey, constraint: EdgeConstraint) {
        if constraint.is_unconstrained() {
            self.edges.remove(&edge);
        } else {
            self.edges.insert(edge, constraint);
        }
    }

    pub fn edge(&self, edge: EdgeKey) -> EdgeConstraint {
        self.edges.get(&edge).copied().unwrap_or_default()
    }

    pub fn remove_edge(&mut self, edge: EdgeKey) -> Option<EdgeConstraint> {
        self.edges.remove(&edge)
    }

    /// Set or replace the constraint on `v`. Unconstrained values clear it.
    pub fn set_vertex(&mut self, v: VertexId, constraint: VertexConstraint) {
        if constraint == VertexConstraint::UNCONSTRAINED {
            self.vertices.remove(&v);
        } else {
            self.vertices.insert(v, constraint);
        }
    }

    pub fn vertex(&self, v: VertexId) -> VertexConstraint {
        self.vertices.get(&v).copied().unwrap_or_default()
    }

    pub fn is_fixed(&self, v: VertexId) -> bool {
        self.vertex(v).fixed
    }

    pub fn remove_vertex(&mut self, v: VertexId) -> Option<VertexConstraint> {
        self.vertices.remove(&v)
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn fully_constrained_edge_count(&self) -> usize {
        self.edges.values().filter(|c| c.is_fully_constrained()).count()
    }

    pub fn fixed_vertex_count(&self) -> usize {
        self.vertices.values().filter(|c| c.fixed).count()
    }

    /// Constrained edges in sorted order
    pub fn constrained_edges(&self) -> Vec<(EdgeKey, EdgeConstraint)> {
        let mut edges: Vec<_> = self.edges.iter().map(|(&k, &c)| (k, c)).collect();
        edges.sort_unstable_by_key(|(k, _)| *k);
        edges
    }

    /// Rename `removed` to `kept` after an edge collapse.
    ///
    /// Edges that become duplicates keep the union of both constraints. The
    /// collapsed edge itself disappears.
    pub fn merge_vertices(&mut self, kept: VertexId, removed: VertexId) {
        self.edges.remove(&EdgeKey::new(kept, removed));

        let mut moved: Vec<(EdgeKey, EdgeConstraint)> = self
            .edges
            .iter()
            .filter(|(k, _)| k.contains(removed))
            .map(|(&k, &c)| (k, c))
            .collect();
        // Sort for determinism
        moved.sort_unstable_by_key(|(k, _)| *k);

        for (old, constraint) in moved {
            self.edges.remove(&old);
            let Some(other) = old.other(removed) else {
                continue;
            };
            let renamed = EdgeKey::new(kept, other);
            let merged = self.edge(renamed).union(constraint);
            self.set_edge(renamed, merged);
        }

        self.vertices.remove(&removed);
    }
}

// ============================================================================
// Segment matching
// ============================================================================

type PointKey = [i64; 3];

fn point_key(p: DVec3, matching: SegmentMatch) -> PointKey {
    match matching {
        // Adding +0.0 folds -0.0 onto +0.0 so the two compare equal
        SegmentMatch::Exact => p.to_array().map(|c| (c + 0.0).to_bits() as i64),
        SegmentMatch::Quantized { resolution } => {
            p.to_array().map(|c| (c / resolution).round() as i64)
        }
    }
}

/// Directed endpoint keys of the reference segments
#[derive(Debug, Clone, Default)]
struct SegmentIndex {
    keys: HashSet<(PointKey, PointKey)>,
    matching: SegmentMatch,
}

impl SegmentIndex {
    fn new(segments: &[Segment], matching: SegmentMatch) -> Self {
        let keys = segments
            .iter()
            .map(|s| (point_key(s.a, matching), point_key(s.b, matching)))
            .collect();
        Self { keys, matching }
    }

    fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The edge a-b matches a segment stored as (a, b) or as (b, a)
    fn matches(&self, a: DVec3, b: DVec3) -> bool {
        let ka = point_key(a, self.matching);
        let kb = point_key(b, self.matching);
        self.keys.contains(&(ka, kb)) || self.keys.contains(&(kb, ka))
    }
}

// ============================================================================
// Classifier
// ============================================================================

/// Derives a [`MeshConstraints`] set from mesh geometry.
#[derive(Debug, Clone)]
pub struct ConstraintClassifier {
    angle_deg: f64,
    partition: SetPartition,
    segments: SegmentIndex,
}

impl ConstraintClassifier {
    pub fn new(angle_deg: f64) -> Self {
        Self {
            angle_deg,
            partition: SetPartition::None,
            segments: SegmentIndex::default(),
        }
    }

    pub fn from_settings(settings: &RemeshSettings, segments: &[Segment]) -> Self {
        Self::new(settings.constraint_angle_deg)
            .with_partition(settings.vertex_partition)
            .with_segments(segments, settings.segment_match)
    }

    pub fn with_partition(mut self, partition: SetPartition) -> Self {
        self.partition = partition;
        self
    }

    pub fn with_segments(mut self, segments: &[Segment], matching: SegmentMatch) -> Self {
        self.segments = SegmentIndex::new(segments, matching);
        self
    }

    /// Edges without an opening angle count as sharper than any threshold
    pub fn is_sharp(&self, mesh: &TriangleMesh, topology: &MeshTopology, edge: EdgeKey) -> bool {
        topology
            .opening_angle_deg(mesh, edge)
            .is_none_or(|angle| angle > self.angle_deg)
    }

    pub fn classify(&self, mesh: &TriangleMesh, topology: &MeshTopology) -> MeshConstraints {
        let mut constraints = MeshConstraints::new();
        let mut sharp = 0usize;
        let mut matched = 0usize;

        for edge in topology.edges() {
            let (Some(pa), Some(pb)) = (mesh.position(edge.a()), mesh.position(edge.b())) else {
                continue;
            };

            if self.is_sharp(mesh, topology, edge) {
                sharp += 1;
                constraints.set_edge(edge, EdgeConstraint::NO_FLIP);
                for (v, p) in [(edge.a(), pa), (edge.b(), pb)] {
                    let set_id = self.partition.set_id(p.to_array());
                    constraints.set_vertex(v, VertexConstraint::fixed(set_id));
                }
            }

            if !self.segments.is_empty() && self.segments.matches(pa, pb) {
                matched += 1;
                trace!("edge {:?} matches a constraint segment", edge);
                constraints.set_edge(edge, EdgeConstraint::FULLY_CONSTRAINED);
            }
        }

        debug!(
            "classified {} edges: {} sharp, {} segment matches, {} fixed vertices",
            topology.edge_count(),
            sharp,
            matched,
            constraints.fixed_vertex_count()
        );
        constraints
    }
}
