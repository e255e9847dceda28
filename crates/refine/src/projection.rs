//! Projection targets for remesh smoothing.
//!
//! A projection target pulls vertices toward a reference surface. The
//! blended variant fades its pull with distance:
//! ```text
//!   d = |p - c|, t = d / max_distance
//!
//!   d <  max_distance:  ((1 - amount) * p + amount * c) * (1 - t) + p * t
//!   otherwise:          c
//! ```
//! where `c` is the closest point on the reference. At `d = 0` this is a
//! plain blend toward `c`; as `d` approaches `max_distance` the result
//! approaches the unmoved point. Without a finite positive `max_distance`
//! the target snaps straight to `c`.

use mesh::{DVec3, SpatialIndex, TriangleBvh, TriangleMesh};
use serde::{Deserialize, Serialize};

/// Blend amount and falloff radius for a projection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionBlend {
    /// Fraction of full projection, nominally in `[0, 1]`
    pub amount: f64,
    /// Falloff radius; `None` means unbounded
    pub max_distance: Option<f64>,
}

impl ProjectionBlend {
    /// Full projection at any distance
    pub const FULL: Self = Self {
        amount: 1.0,
        max_distance: None,
    };

    pub fn new(amount: f64, max_distance: Option<f64>) -> Self {
        Self {
            amount,
            max_distance,
        }
    }

    /// Combine `point` with its closest reference point `closest`
    pub fn apply(&self, point: DVec3, closest: DVec3) -> DVec3 {
        let Some(max_distance) = self.max_distance.filter(|&d| d > 0.0 && d.is_finite()) else {
            return closest;
        };

        let d = point.distance(closest);
        if d >= max_distance {
            return closest;
        }

        let t = d / max_distance;
        let blended = point * (1.0 - self.amount) + closest * self.amount;
        blended * (1.0 - t) + point * t
    }
}

/// A surface that vertices can be projected onto.
pub trait ProjectionTarget {
    /// Closest point on the surface, `None` when the surface is empty
    fn closest_point(&self, point: DVec3) -> Option<DVec3>;

    /// Project with the target's own blend settings.
    ///
    /// `identifier` is the id of the vertex being projected, when known.
    fn project(&self, point: DVec3, identifier: Option<usize>) -> DVec3;

    /// Project with an explicit blend, ignoring the target's own settings
    fn project_blended(&self, point: DVec3, _identifier: Option<usize>, blend: ProjectionBlend) -> DVec3 {
        match self.closest_point(point) {
            Some(closest) => blend.apply(point, closest),
            None => point,
        }
    }
}

/// Projection onto a private copy of a reference mesh.
///
/// The copy is taken at construction, so the target can be a frozen snapshot
/// of the very mesh that is being remeshed.
#[derive(Debug, Clone)]
pub struct BlendedProjectionTarget {
    reference: TriangleMesh,
    spatial: TriangleBvh,
    blend: ProjectionBlend,
}

impl BlendedProjectionTarget {
    pub fn new(reference: &TriangleMesh, amount: f64, max_distance: Option<f64>) -> Self {
        let reference = reference.compact();
        let spatial = TriangleBvh::build(&reference);
        Self {
            reference,
            spatial,
            blend: ProjectionBlend::new(amount, max_distance),
        }
    }

    /// Full-strength, unbounded target over a snapshot of `mesh`
    pub fn frozen_copy(mesh: &TriangleMesh) -> Self {
        Self::new(mesh, 1.0, None)
    }

    pub fn blend(&self) -> ProjectionBlend {
        self.blend
    }

    pub fn set_blend(&mut self, blend: ProjectionBlend) {
        self.blend = blend;
    }

    pub fn reference(&self) -> &TriangleMesh {
        &self.reference
    }
}

impl ProjectionTarget for BlendedProjectionTarget {
    fn closest_point(&self, point: DVec3) -> Option<DVec3> {
        self.spatial.closest_point(point).map(|(_, p)| p)
    }

    fn project(&self, point: DVec3, identifier: Option<usize>) -> DVec3 {
        self.project_blended(point, identifier, self.blend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh::primitives::grid;

    const EPS: f64 = 1e-12;

    fn plane() -> TriangleMesh {
        // 4 x 4 units in z = 0
        grid(4, 4, 1.0)
    }

    #[test]
    fn test_blend_at_zero_distance() {
        let blend = ProjectionBlend::new(0.3, Some(10.0));
        let p = DVec3::new(1.0, 2.0, 0.0);
        assert!((blend.apply(p, p) - p).length() < EPS);
    }

    #[test]
    fn test_blend_formula() {
        let target = BlendedProjectionTarget::new(&plane(), 0.5, Some(4.0));
        let p = DVec3::new(2.0, 2.0, 1.0);
        let c = DVec3::new(2.0, 2.0, 0.0);

        // t = 0.25: (0.5 p + 0.5 c) * 0.75 + p * 0.25
        let expected = (p * 0.5 + c * 0.5) * 0.75 + p * 0.25;
        let projected = target.project(p, None);
        assert!((projected - expected).length() < EPS);

        // The result lies on the segment between p and c
        let along = (p - projected).length() + (projected - c).length();
        assert!((along - p.distance(c)).abs() < EPS);
    }

    #[test]
    fn test_blend_fades_near_max_distance() {
        let blend = ProjectionBlend::new(1.0, Some(1.0));
        let c = DVec3::ZERO;
        let near_edge = DVec3::new(0.0, 0.0, 0.999_999);
        let result = blend.apply(near_edge, c);
        assert!(result.distance(near_edge) < 1e-5);

        let close = DVec3::new(0.0, 0.0, 1e-9);
        assert!(blend.apply(close, c).length() < 1e-8);
    }

    #[test]
    fn test_beyond_max_distance_snaps() {
        let blend = ProjectionBlend::new(0.2, Some(1.0));
        let p = DVec3::new(0.0, 0.0, 5.0);
        assert_eq!(blend.apply(p, DVec3::ZERO), DVec3::ZERO);
    }

    #[test]
    fn test_unbounded_snaps_to_surface() {
        let target = BlendedProjectionTarget::frozen_copy(&plane());
        let p = DVec3::new(1.5, 2.5, -3.0);
        assert!((target.project(p, Some(7)) - DVec3::new(1.5, 2.5, 0.0)).length() < EPS);

        // Non-positive distances also mean unbounded
        let blend = ProjectionBlend::new(0.5, Some(0.0));
        assert_eq!(blend.apply(p, DVec3::ZERO), DVec3::ZERO);
    }

    #[test]
    fn test_private_copy_is_frozen() {
        let mut source = plane();
        let target = BlendedProjectionTarget::frozen_copy(&source);
        for v in source.vertex_ids().collect::<Vec<_>>() {
            let p = source.position(v).unwrap();
            source.set_position(v, p + DVec3::Z);
        }
        let projected = target.project(DVec3::new(1.0, 1.0, 0.7), None);
        assert!(projected.z.abs() < EPS);
    }

    #[test]
    fn test_empty_reference_leaves_point() {
        let target = BlendedProjectionTarget::frozen_copy(&TriangleMesh::new());
        let p = DVec3::new(3.0, 1.0, 4.0);
        assert_eq!(target.project(p, None), p);
    }
}
