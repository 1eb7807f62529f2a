use crate::math::{Point, Point2, Real};
use crate::paint::{AttrDomain, ColorLayer, ColorLayerError, VertexColorAccessor};
use crate::shape::{check_attribute_len, GroupedIndices, OffsetIndices, TopologyError};

/// A polygon mesh with its triangulation, as used for sculpting.
///
/// Faces are stored as an offsets array into a flat corner to vertex array. Each face is
/// triangulated as a fan, and each triangle records three corner indices plus its face.
/// Optional attributes follow the usual domains: material indices and hidden flags per face,
/// masks and hidden flags per vertex, UVs per corner. The color layer is either per vertex or
/// per corner.
#[derive(Clone, Debug)]
pub struct Mesh {
    positions: Vec<Point<Real>>,
    faces: OffsetIndices,
    corner_verts: Vec<u32>,
    corner_tris: Vec<[u32; 3]>,
    tri_faces: Vec<u32>,
    vert_to_face: GroupedIndices,
    material_indices: Option<Vec<u32>>,
    hide_vert: Option<Vec<bool>>,
    hide_face: Option<Vec<bool>>,
    mask: Option<Vec<Real>>,
    uv_map: Option<Vec<Point2<Real>>>,
    color_layer: Option<ColorLayer>,
}

impl Mesh {
    /// Creates a mesh from vertex positions and polygons given as vertex index lists.
    pub fn new<F>(positions: Vec<Point<Real>>, faces: &[F]) -> Result<Self, TopologyError>
    where
        F: AsRef<[u32]>,
    {
        let num_verts = positions.len() as u32;
        let mut corner_verts = Vec::new();

        for (face_id, face) in faces.iter().enumerate() {
            let face = face.as_ref();
            let face_id = face_id as u32;

            if face.len() < 3 {
                return Err(TopologyError::DegenerateFace(face_id));
            }

            for (i, vertex) in face.iter().enumerate() {
                if *vertex >= num_verts {
                    return Err(TopologyError::VertexOutOfBounds {
                        face: face_id,
                        vertex: *vertex,
                    });
                }
                if face[i + 1..].contains(vertex) {
                    return Err(TopologyError::BadFace(face_id));
                }
            }

            corner_verts.extend_from_slice(face);
        }

        let faces = OffsetIndices::from_sizes(faces.iter().map(|f| f.as_ref().len() as u32));
        let mut corner_tris = Vec::with_capacity(corner_verts.len());
        let mut tri_faces = Vec::with_capacity(corner_verts.len());
        let mut pairs = Vec::with_capacity(corner_verts.len());

        for face_id in 0..faces.len() {
            let corners = faces.range(face_id);
            let first = corners.start as u32;

            for corner in corners.start + 1..corners.end - 1 {
                corner_tris.push([first, corner as u32, corner as u32 + 1]);
                tri_faces.push(face_id as u32);
            }

            for corner in corners {
                pairs.push((corner_verts[corner], face_id as u32));
            }
        }

        let vert_to_face = GroupedIndices::from_pairs(positions.len(), &pairs);

        Ok(Self {
            positions,
            faces,
            corner_verts,
            corner_tris,
            tri_faces,
            vert_to_face,
            material_indices: None,
            hide_vert: None,
            hide_face: None,
            mask: None,
            uv_map: None,
            color_layer: None,
        })
    }

    /// Creates a mesh where every face is the given triangle.
    pub fn from_triangles(
        positions: Vec<Point<Real>>,
        triangles: &[[u32; 3]],
    ) -> Result<Self, TopologyError> {
        Self::new(positions, triangles)
    }

    /// The vertex positions of this mesh.
    #[inline]
    pub fn positions(&self) -> &[Point<Real>] {
        &self.positions
    }

    /// Mutable access to the vertex positions of this mesh.
    ///
    /// Moving vertices invalidates the bounds of the PBVH nodes containing them, which must be
    /// tagged with `Pbvh::tag_positions_changed`.
    #[inline]
    pub fn positions_mut(&mut self) -> &mut [Point<Real>] {
        &mut self.positions
    }

    /// The number of vertices.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// The face to corner offsets.
    #[inline]
    pub fn faces(&self) -> &OffsetIndices {
        &self.faces
    }

    /// The vertex of each face corner.
    #[inline]
    pub fn corner_verts(&self) -> &[u32] {
        &self.corner_verts
    }

    /// The triangulation of the mesh, as triplets of corner indices.
    #[inline]
    pub fn corner_tris(&self) -> &[[u32; 3]] {
        &self.corner_tris
    }

    /// The face each triangle belongs to.
    #[inline]
    pub fn tri_faces(&self) -> &[u32] {
        &self.tri_faces
    }

    /// The number of triangles of the triangulation.
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.corner_tris.len()
    }

    /// The three vertices of the `i`-th triangle.
    #[inline]
    pub fn tri_verts(&self, i: usize) -> [u32; 3] {
        let tri = self.corner_tris[i];
        [
            self.corner_verts[tri[0] as usize],
            self.corner_verts[tri[1] as usize],
            self.corner_verts[tri[2] as usize],
        ]
    }

    /// The three vertex positions of the `i`-th triangle.
    #[inline]
    pub fn tri_positions(&self, i: usize) -> [Point<Real>; 3] {
        self.tri_verts(i).map(|v| self.positions[v as usize])
    }

    /// The faces incident to each vertex.
    #[inline]
    pub fn vert_to_face(&self) -> &GroupedIndices {
        &self.vert_to_face
    }

    /// The material index of each face, if any.
    #[inline]
    pub fn material_indices(&self) -> Option<&[u32]> {
        self.material_indices.as_deref()
    }

    /// Sets the per-face material indices.
    pub fn set_material_indices(&mut self, indices: Vec<u32>) -> Result<(), TopologyError> {
        check_attribute_len("material_index", self.faces.len(), indices.len())?;
        self.material_indices = Some(indices);
        Ok(())
    }

    /// The per-vertex hidden flags, if any.
    #[inline]
    pub fn hide_vert(&self) -> Option<&[bool]> {
        self.hide_vert.as_deref()
    }

    /// Sets the per-vertex hidden flags.
    pub fn set_hide_vert(&mut self, hidden: Vec<bool>) -> Result<(), TopologyError> {
        check_attribute_len("hide_vert", self.positions.len(), hidden.len())?;
        self.hide_vert = Some(hidden);
        Ok(())
    }

    /// The per-face hidden flags, if any.
    #[inline]
    pub fn hide_face(&self) -> Option<&[bool]> {
        self.hide_face.as_deref()
    }

    /// Sets the per-face hidden flags.
    pub fn set_hide_face(&mut self, hidden: Vec<bool>) -> Result<(), TopologyError> {
        check_attribute_len("hide_face", self.faces.len(), hidden.len())?;
        self.hide_face = Some(hidden);
        Ok(())
    }

    /// The per-vertex sculpt mask, if any.
    #[inline]
    pub fn mask(&self) -> Option<&[Real]> {
        self.mask.as_deref()
    }

    /// Sets the per-vertex sculpt mask.
    pub fn set_mask(&mut self, mask: Vec<Real>) -> Result<(), TopologyError> {
        check_attribute_len("mask", self.positions.len(), mask.len())?;
        self.mask = Some(mask);
        Ok(())
    }

    /// The per-corner UV coordinates, if any.
    #[inline]
    pub fn uv_map(&self) -> Option<&[Point2<Real>]> {
        self.uv_map.as_deref()
    }

    /// Sets the per-corner UV coordinates.
    ///
    /// The pixel caches of the PBVH nodes must be tagged with `Pbvh::mark_rebuild_pixels`
    /// afterward.
    pub fn set_uv_map(&mut self, uvs: Vec<Point2<Real>>) -> Result<(), TopologyError> {
        check_attribute_len("uv_map", self.corner_verts.len(), uvs.len())?;
        self.uv_map = Some(uvs);
        Ok(())
    }

    /// The color layer, if any.
    #[inline]
    pub fn color_layer(&self) -> Option<&ColorLayer> {
        self.color_layer.as_ref()
    }

    /// Replaces the color layer.
    ///
    /// The layer must have one element per vertex or per corner, depending on its domain.
    pub fn set_color_layer(&mut self, layer: ColorLayer) -> Result<(), TopologyError> {
        let expected = match layer.domain() {
            AttrDomain::Point => self.positions.len(),
            AttrDomain::Corner => self.corner_verts.len(),
        };
        check_attribute_len("color", expected, layer.len())?;
        self.color_layer = Some(layer);
        Ok(())
    }

    /// Removes the color layer and returns it.
    pub fn take_color_layer(&mut self) -> Option<ColorLayer> {
        self.color_layer.take()
    }

    /// Creates an accessor for the per-vertex colors of this mesh.
    ///
    /// The layer's domain and encoding are resolved once here. The accessor borrows the mesh so
    /// the layer cannot be replaced while it is alive.
    pub fn color_accessor(&mut self) -> Result<VertexColorAccessor<'_>, ColorLayerError> {
        let Self {
            faces,
            corner_verts,
            vert_to_face,
            color_layer,
            ..
        } = self;
        let layer = color_layer.as_mut().ok_or(ColorLayerError::Missing)?;
        VertexColorAccessor::new(layer, faces, corner_verts, vert_to_face)
    }
}
