use crate::math::{Color, Real};

/// The domain an attribute is stored on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum AttrDomain {
    /// One value per vertex.
    Point,
    /// One value per face corner.
    Corner,
}

/// The element encoding of a color layer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum ColorEncoding {
    /// Four bytes per color, with sRGB encoded RGB and linear alpha.
    ByteSrgb,
    /// Four linear floats per color.
    LinearFloat,
}

/// The storage of a color layer.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum ColorData {
    /// Byte colors in sRGB space.
    ByteSrgb(Vec<[u8; 4]>),
    /// Float colors in linear space.
    LinearFloat(Vec<[f32; 4]>),
}

/// A color attribute of a mesh.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct ColorLayer {
    domain: AttrDomain,
    data: ColorData,
}

/// Errors raised when accessing the color layer of a mesh.
#[derive(thiserror::Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum ColorLayerError {
    /// The mesh has no color layer.
    #[error("the mesh has no color layer.")]
    Missing,
    /// The color layer does not have one element per item of its domain.
    #[error("the color layer has {found} elements but its domain has {expected} items.")]
    LengthMismatch {
        /// The number of items of the layer domain.
        expected: usize,
        /// The number of elements of the layer.
        found: usize,
    },
}

impl ColorLayer {
    /// Creates a layer from existing data.
    pub fn new(domain: AttrDomain, data: ColorData) -> Self {
        Self { domain, data }
    }

    /// Creates a layer of `len` transparent black colors with the given encoding.
    pub fn zeroed(domain: AttrDomain, encoding: ColorEncoding, len: usize) -> Self {
        let data = match encoding {
            ColorEncoding::ByteSrgb => ColorData::ByteSrgb(vec![[0; 4]; len]),
            ColorEncoding::LinearFloat => ColorData::LinearFloat(vec![[0.0; 4]; len]),
        };
        Self { domain, data }
    }

    /// The domain of this layer.
    #[inline]
    pub fn domain(&self) -> AttrDomain {
        self.domain
    }

    /// The encoding of this layer.
    #[inline]
    pub fn encoding(&self) -> ColorEncoding {
        match &self.data {
            ColorData::ByteSrgb(_) => ColorEncoding::ByteSrgb,
            ColorData::LinearFloat(_) => ColorEncoding::LinearFloat,
        }
    }

    /// The number of stored elements.
    #[inline]
    pub fn len(&self) -> usize {
        match &self.data {
            ColorData::ByteSrgb(data) => data.len(),
            ColorData::LinearFloat(data) => data.len(),
        }
    }

    /// Does this layer store no element at all?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The raw storage of this layer.
    #[inline]
    pub fn data(&self) -> &ColorData {
        &self.data
    }

    /// Mutable access to the raw storage of this layer.
    #[inline]
    pub fn data_mut(&mut self) -> &mut ColorData {
        &mut self.data
    }
}

/// Converts an sRGB encoded channel to linear space.
#[inline]
pub fn srgb_to_linear(c: Real) -> Real {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Converts a linear channel to sRGB encoding.
#[inline]
pub fn linear_to_srgb(c: Real) -> Real {
    if c <= 0.0031308 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

#[inline]
fn unit_float_to_byte(c: Real) -> u8 {
    (c * 255.0 + 0.5).clamp(0.0, 255.0) as u8
}

/// A stored color element that can be decoded to, and encoded from, a linear color.
pub(crate) trait ColorElement: Copy + Send + Sync {
    fn decode(self) -> Color;
    fn encode(color: &Color) -> Self;
}

impl ColorElement for [f32; 4] {
    #[inline]
    fn decode(self) -> Color {
        Color::from(self)
    }

    #[inline]
    fn encode(color: &Color) -> Self {
        [color.x, color.y, color.z, color.w]
    }
}

impl ColorElement for [u8; 4] {
    #[inline]
    fn decode(self) -> Color {
        let [r, g, b, a] = self.map(|c| c as Real / 255.0);
        Color::new(srgb_to_linear(r), srgb_to_linear(g), srgb_to_linear(b), a)
    }

    #[inline]
    fn encode(color: &Color) -> Self {
        [
            unit_float_to_byte(linear_to_srgb(color.x)),
            unit_float_to_byte(linear_to_srgb(color.y)),
            unit_float_to_byte(linear_to_srgb(color.z)),
            unit_float_to_byte(color.w),
        ]
    }
}
