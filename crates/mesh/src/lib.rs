//! Triangle mesh substrate for Meshwright
//!
//! This crate provides the shared data model used by the refinement crate:
//! - [`TriangleMesh`] - Indexed triangle mesh with stable vertex and triangle ids
//! - [`topology`] - Edge, neighbor-slot, and vertex-fan adjacency
//! - [`geometry`] - Normals, areas, angles, closest points, frames, segments
//! - [`spatial`] - Bounding volume hierarchy for nearest-surface queries
//! - [`host`] - Import/export with the host mesh format (triangles and quads)
//! - [`primitives`] - Procedural spheres, grids, and cylinders
//! - [`metrics`] - Edge length statistics

pub mod error;
pub mod geometry;
pub mod host;
pub mod metrics;
pub mod primitives;
pub mod spatial;
pub mod topology;
pub mod triangle_mesh;

pub use error::MeshError;
pub use geometry::{Frame, Polyline, Segment};
pub use host::{HostFace, HostMesh, export_host_mesh, import_host_mesh};
pub use metrics::EdgeLengthStats;
pub use spatial::{Aabb, SpatialIndex, TriangleBvh};
pub use topology::MeshTopology;
pub use triangle_mesh::{EdgeKey, TriangleId, TriangleMesh, Vertex, VertexId};

pub use glam::DVec3;
