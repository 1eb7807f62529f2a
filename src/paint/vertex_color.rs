use crate::math::Color;
use crate::paint::color_layer::ColorElement;
use crate::paint::{AttrDomain, ColorData, ColorEncoding, ColorLayer, ColorLayerError};
use crate::shape::{GroupedIndices, OffsetIndices};
use crate::utils;

enum ColorStorage<'a> {
    ByteSrgb(&'a mut [[u8; 4]]),
    LinearFloat(&'a mut [[f32; 4]]),
}

#[derive(Copy, Clone)]
struct CornerTopology<'a> {
    faces: &'a OffsetIndices,
    corner_verts: &'a [u32],
    vert_to_face: &'a GroupedIndices,
}

impl CornerTopology<'_> {
    /// The corners of every face incident to `vert` that reference `vert`.
    fn vert_corners(&self, vert: u32) -> impl Iterator<Item = usize> + '_ {
        self.vert_to_face
            .group(vert as usize)
            .iter()
            .flat_map(move |face| self.faces.range(*face as usize))
            .filter(move |corner| self.corner_verts[*corner] == vert)
    }

    fn average<T: ColorElement>(&self, data: &[T], vert: u32) -> Color {
        let mut result = Color::zeros();
        let mut count = 0;

        for corner in self.vert_corners(vert) {
            result += data[corner].decode();
            count += 1;
        }

        if count > 0 {
            result /= count as f32;
        }

        result
    }
}

/// Per-vertex access to the color layer of a mesh.
///
/// Colors go in and out in linear space, whatever the encoding of the layer. On a point layer,
/// vertex `v` reads and writes element `v`. On a corner layer, reading a vertex averages every
/// corner of its incident faces that references it, and writing a vertex overwrites all those
/// corners.
///
/// The batch methods [`Self::swap`] and [`Self::store_colors`] operate on raw element indices
/// (vertices on a point layer, corners on a corner layer), while [`Self::store_colors_vertex`]
/// always takes vertex indices.
pub struct VertexColorAccessor<'a> {
    domain: AttrDomain,
    storage: ColorStorage<'a>,
    topology: CornerTopology<'a>,
}

impl<'a> VertexColorAccessor<'a> {
    /// Creates an accessor for `layer` on the mesh topology given by the other arguments.
    pub fn new(
        layer: &'a mut ColorLayer,
        faces: &'a OffsetIndices,
        corner_verts: &'a [u32],
        vert_to_face: &'a GroupedIndices,
    ) -> Result<Self, ColorLayerError> {
        let domain = layer.domain();
        let expected = match domain {
            AttrDomain::Point => vert_to_face.len(),
            AttrDomain::Corner => corner_verts.len(),
        };

        if layer.len() != expected {
            return Err(ColorLayerError::LengthMismatch {
                expected,
                found: layer.len(),
            });
        }

        let storage = match layer.data_mut() {
            ColorData::ByteSrgb(data) => ColorStorage::ByteSrgb(data),
            ColorData::LinearFloat(data) => ColorStorage::LinearFloat(data),
        };

        Ok(Self {
            domain,
            storage,
            topology: CornerTopology {
                faces,
                corner_verts,
                vert_to_face,
            },
        })
    }

    /// The domain of the underlying layer.
    #[inline]
    pub fn domain(&self) -> AttrDomain {
        self.domain
    }

    /// The encoding of the underlying layer.
    #[inline]
    pub fn encoding(&self) -> ColorEncoding {
        match self.storage {
            ColorStorage::ByteSrgb(_) => ColorEncoding::ByteSrgb,
            ColorStorage::LinearFloat(_) => ColorEncoding::LinearFloat,
        }
    }

    /// The color of a vertex.
    ///
    /// On a corner layer, a vertex without incident faces has a zero color.
    pub fn get(&self, vert: u32) -> Color {
        match &self.storage {
            ColorStorage::ByteSrgb(data) => self.get_impl(data, vert),
            ColorStorage::LinearFloat(data) => self.get_impl(data, vert),
        }
    }

    /// Sets the color of a vertex.
    ///
    /// On a corner layer, every corner of the vertex is set to `color`.
    pub fn set(&mut self, vert: u32, color: &Color) {
        let (domain, topology) = (self.domain, self.topology);
        match &mut self.storage {
            ColorStorage::ByteSrgb(data) => set_impl(data, domain, &topology, vert, color),
            ColorStorage::LinearFloat(data) => set_impl(data, domain, &topology, vert, color),
        }
    }

    /// Exchanges the stored elements at `indices` with `colors`.
    ///
    /// After this call, `colors[i]` holds the decoded previous value of element `indices[i]`, and
    /// that element stores the encoded previous value of `colors[i]`.
    pub fn swap(&mut self, indices: &[u32], colors: &mut [Color]) {
        assert_eq!(indices.len(), colors.len());
        match &mut self.storage {
            ColorStorage::ByteSrgb(data) => swap_impl(data, indices, colors),
            ColorStorage::LinearFloat(data) => swap_impl(data, indices, colors),
        }
    }

    /// Decodes the stored elements at `indices` into `colors`.
    pub fn store_colors(&self, indices: &[u32], colors: &mut [Color]) {
        assert_eq!(indices.len(), colors.len());
        match &self.storage {
            ColorStorage::ByteSrgb(data) => {
                utils::map_into(indices, colors, |i| data[*i as usize].decode())
            }
            ColorStorage::LinearFloat(data) => {
                utils::map_into(indices, colors, |i| data[*i as usize].decode())
            }
        }
    }

    /// Reads the colors of the vertices `verts` into `colors`.
    ///
    /// On a corner layer, each color is the average of the vertex corners, recomputed at each
    /// call.
    pub fn store_colors_vertex(&self, verts: &[u32], colors: &mut [Color]) {
        assert_eq!(verts.len(), colors.len());
        match self.domain {
            AttrDomain::Point => self.store_colors(verts, colors),
            AttrDomain::Corner => utils::map_into(verts, colors, |v| self.get(*v)),
        }
    }

    fn get_impl<T: ColorElement>(&self, data: &[T], vert: u32) -> Color {
        match self.domain {
            AttrDomain::Point => data[vert as usize].decode(),
            AttrDomain::Corner => self.topology.average(data, vert),
        }
    }
}

fn set_impl<T: ColorElement>(
    data: &mut [T],
    domain: AttrDomain,
    topology: &CornerTopology,
    vert: u32,
    color: &Color,
) {
    let encoded = T::encode(color);
    match domain {
        AttrDomain::Point => data[vert as usize] = encoded,
        AttrDomain::Corner => {
            for corner in topology.vert_corners(vert) {
                data[corner] = encoded;
            }
        }
    }
}

fn swap_impl<T: ColorElement>(data: &mut [T], indices: &[u32], colors: &mut [Color]) {
    for (index, color) in indices.iter().zip(colors.iter_mut()) {
        let stored = &mut data[*index as usize];
        let previous = stored.decode();
        *stored = T::encode(color);
        *color = previous;
    }
}
