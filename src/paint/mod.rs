//! Paint support: vertex color access and the per-node image pixel cache.

pub use self::color_layer::{
    linear_to_srgb, srgb_to_linear, AttrDomain, ColorData, ColorEncoding, ColorLayer,
    ColorLayerError,
};
pub use self::image_tile::{udim_tile_offset, ImageTileSource, TileResolution, UDIM_FIRST_TILE};
pub use self::pixels::{
    NodePixels, PixelCacheState, PixelRect, PixelRow, TrianglePaintInput, UdimTilePixels,
};
pub use self::vertex_color::VertexColorAccessor;

pub(crate) use self::pixels::extract_node_pixels;

mod color_layer;
mod image_tile;
mod pixels;
mod vertex_color;
