use slab::Slab;
use smallvec::SmallVec;

use crate::math::{Point, Real};
use crate::shape::TopologyError;

/// A stable handle to a vertex of a [`DynMesh`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct VertHandle(pub u32);

/// A stable handle to a triangle of a [`DynMesh`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct FaceHandle(pub u32);

impl VertHandle {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl FaceHandle {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A vertex of a [`DynMesh`].
#[derive(Clone, Debug)]
pub struct DynVert {
    /// The vertex position.
    pub position: Point<Real>,
    /// The sculpt mask of the vertex.
    pub mask: Real,
    /// Is this vertex hidden?
    pub hidden: bool,
    faces: SmallVec<[FaceHandle; 8]>,
}

impl DynVert {
    /// The triangles using this vertex.
    #[inline]
    pub fn faces(&self) -> &[FaceHandle] {
        &self.faces
    }
}

/// A triangle of a [`DynMesh`].
#[derive(Copy, Clone, Debug)]
pub struct DynFace {
    verts: [VertHandle; 3],
}

impl DynFace {
    /// The three vertices of this triangle.
    #[inline]
    pub fn verts(&self) -> [VertHandle; 3] {
        self.verts
    }
}

/// A triangle mesh supporting live topology edits, used for dynamic topology sculpting.
///
/// Vertices and triangles live in slabs so their handles stay valid while other elements are
/// added or removed. Each vertex tracks its incident triangles.
#[derive(Clone, Debug, Default)]
pub struct DynMesh {
    verts: Slab<DynVert>,
    faces: Slab<DynFace>,
    has_mask: bool,
}

impl DynMesh {
    /// Creates an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mesh from vertex positions and triangles.
    ///
    /// Vertex `i` gets the handle `VertHandle(i)` and triangle `j` gets `FaceHandle(j)`.
    pub fn from_triangles(
        positions: &[Point<Real>],
        triangles: &[[u32; 3]],
    ) -> Result<Self, TopologyError> {
        let mut result = Self::new();
        for pt in positions {
            let _ = result.add_vert(*pt);
        }
        for tri in triangles {
            let _ = result.add_face(tri.map(VertHandle))?;
        }
        Ok(result)
    }

    /// Adds a vertex.
    pub fn add_vert(&mut self, position: Point<Real>) -> VertHandle {
        VertHandle(self.verts.insert(DynVert {
            position,
            mask: 0.0,
            hidden: false,
            faces: SmallVec::new(),
        }) as u32)
    }

    /// Adds a triangle between three distinct live vertices.
    pub fn add_face(&mut self, verts: [VertHandle; 3]) -> Result<FaceHandle, TopologyError> {
        let face_id = self.faces.vacant_key() as u32;

        for (i, v) in verts.iter().enumerate() {
            if !self.verts.contains(v.index()) {
                return Err(TopologyError::VertexOutOfBounds {
                    face: face_id,
                    vertex: v.0,
                });
            }
            if verts[i + 1..].contains(v) {
                return Err(TopologyError::BadFace(face_id));
            }
        }

        let face = FaceHandle(self.faces.insert(DynFace { verts }) as u32);
        for v in verts {
            self.verts[v.index()].faces.push(face);
        }
        Ok(face)
    }

    /// Removes a triangle, returning its vertices.
    ///
    /// The vertices are kept, even if they are no longer used by any triangle.
    pub fn remove_face(&mut self, face: FaceHandle) -> Option<[VertHandle; 3]> {
        let removed = self.faces.try_remove(face.index())?;
        for v in removed.verts {
            let faces = &mut self.verts[v.index()].faces;
            faces.retain(|f| *f != face);
        }
        Some(removed.verts)
    }

    /// Removes a vertex that is not used by any triangle.
    pub fn remove_vert(&mut self, vert: VertHandle) -> Option<DynVert> {
        if self.verts.get(vert.index())?.faces.is_empty() {
            self.verts.try_remove(vert.index())
        } else {
            None
        }
    }

    /// The vertex with the given handle.
    #[inline]
    pub fn vert(&self, vert: VertHandle) -> Option<&DynVert> {
        self.verts.get(vert.index())
    }

    /// Mutable access to the vertex with the given handle.
    ///
    /// Moving a vertex invalidates the bounds of the PBVH leaves containing it.
    #[inline]
    pub fn vert_mut(&mut self, vert: VertHandle) -> Option<&mut DynVert> {
        self.verts.get_mut(vert.index())
    }

    /// The triangle with the given handle.
    #[inline]
    pub fn face(&self, face: FaceHandle) -> Option<&DynFace> {
        self.faces.get(face.index())
    }

    /// The position of a live vertex.
    ///
    /// # Panics
    /// If the handle does not refer to a live vertex.
    #[inline]
    pub fn position(&self, vert: VertHandle) -> Point<Real> {
        self.verts[vert.index()].position
    }

    /// The positions of the vertices of a live triangle.
    ///
    /// # Panics
    /// If the handle does not refer to a live triangle.
    #[inline]
    pub fn face_positions(&self, face: FaceHandle) -> [Point<Real>; 3] {
        self.faces[face.index()].verts.map(|v| self.position(v))
    }

    /// Sets the sculpt mask of a vertex.
    pub fn set_mask(&mut self, vert: VertHandle, mask: Real) {
        if let Some(v) = self.verts.get_mut(vert.index()) {
            v.mask = mask;
            self.has_mask = true;
        }
    }

    /// Was a mask value ever assigned to this mesh?
    #[inline]
    pub fn has_mask(&self) -> bool {
        self.has_mask
    }

    /// Iterates through the handles of all the live triangles, in handle order.
    pub fn faces(&self) -> impl Iterator<Item = FaceHandle> + '_ {
        self.faces.iter().map(|(key, _)| FaceHandle(key as u32))
    }

    /// Iterates through the handles of all the live vertices, in handle order.
    pub fn verts(&self) -> impl Iterator<Item = VertHandle> + '_ {
        self.verts.iter().map(|(key, _)| VertHandle(key as u32))
    }

    /// The number of live triangles.
    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// The number of live vertices.
    #[inline]
    pub fn vert_count(&self) -> usize {
        self.verts.len()
    }

    /// One past the largest triangle handle index ever in use.
    #[inline]
    pub fn face_capacity(&self) -> usize {
        self.faces.capacity().max(self.faces.vacant_key())
    }

    /// One past the largest vertex handle index ever in use.
    #[inline]
    pub fn vert_capacity(&self) -> usize {
        self.verts.capacity().max(self.verts.vacant_key())
    }
}
