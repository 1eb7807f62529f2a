//! Source geometry indexed by the PBVH.
//!
//! These types are owned by the caller. The tree never copies them: it stores indices into
//! their arrays and reads them back through the source passed to each operation.

pub use self::dyn_mesh::{DynFace, DynMesh, DynVert, FaceHandle, VertHandle};
pub use self::mesh::Mesh;
pub use self::offset_indices::{GroupedIndices, OffsetIndices};
pub use self::subdiv_grids::{GridCoord, SubdivGrids};

mod dyn_mesh;
mod mesh;
mod offset_indices;
mod subdiv_grids;

/// Indicated an inconsistency in the topology or attributes of a source mesh.
#[derive(thiserror::Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum TopologyError {
    /// Found a face with less than three corners.
    #[error("the face {0} has less than three corners.")]
    DegenerateFace(u32),
    /// Found a face with two or more identical vertices.
    #[error("the face {0} has at least two identical vertices.")]
    BadFace(u32),
    /// A face references a vertex that does not exist.
    #[error("the face {face} references the vertex {vertex} which is out of bounds.")]
    VertexOutOfBounds {
        /// The face referencing the vertex.
        face: u32,
        /// The invalid vertex index.
        vertex: u32,
    },
    /// An attribute array does not have one element per item of its domain.
    #[error("the attribute `{attribute}` has {found} elements but {expected} were expected.")]
    AttributeLength {
        /// The name of the attribute.
        attribute: &'static str,
        /// The required number of elements.
        expected: usize,
        /// The actual number of elements.
        found: usize,
    },
    /// Multires grids must be at least two vertices wide.
    #[error("the grid size {0} is invalid, grids must be at least 2 vertices wide.")]
    InvalidGridSize(usize),
}

pub(crate) fn check_attribute_len(
    attribute: &'static str,
    expected: usize,
    found: usize,
) -> Result<(), TopologyError> {
    if expected == found {
        Ok(())
    } else {
        Err(TopologyError::AttributeLength {
            attribute,
            expected,
            found,
        })
    }
}
