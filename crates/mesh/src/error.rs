use thiserror::Error;

/// Errors raised when building a mesh from raw buffers
#[derive(Debug, Error, PartialEq)]
pub enum MeshError {
    #[error("Index buffer length {0} is not a multiple of 3")]
    RaggedIndices(usize),
    #[error("Triangle {triangle} references vertex {vertex}, but the mesh has {vertex_count} vertices")]
    VertexOutOfRange {
        triangle: usize,
        vertex: u32,
        vertex_count: usize,
    },
    #[error("Triangle {0} repeats a vertex")]
    DegenerateTriangle(usize),
    #[error("Normal count {normals} does not match vertex count {vertices}")]
    NormalCountMismatch { normals: usize, vertices: usize },
}
