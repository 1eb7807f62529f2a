use crate::math::{Real, Vector2};

/// The size in pixels of an acquired image tile.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct TileResolution {
    /// The number of pixel columns.
    pub width: u32,
    /// The number of pixel rows.
    pub height: u32,
}

impl TileResolution {
    /// Creates a new resolution.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Does this resolution cover no pixel at all?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// The number of the UDIM tile covering the unit UV square.
pub const UDIM_FIRST_TILE: u32 = 1001;

/// The UV-space offset of the lower-left corner of a UDIM tile.
///
/// Tiles are numbered ten per row starting at [`UDIM_FIRST_TILE`].
#[inline]
pub fn udim_tile_offset(tile_number: u32) -> Vector2<Real> {
    let local = tile_number.saturating_sub(UDIM_FIRST_TILE);
    Vector2::new((local % 10) as Real, (local / 10) as Real)
}

/// The image a PBVH paints into, seen as a set of UDIM tiles.
///
/// Implementations are shared by the worker threads of a pixel rebuild. Every successful
/// [`ImageTileSource::acquire`] is matched by exactly one [`ImageTileSource::release`].
pub trait ImageTileSource: Sync {
    /// The numbers of the tiles of the image, in processing order.
    fn tiles(&self) -> Vec<u32>;

    /// Acquires the buffer of a tile, returning its resolution, or `None` if it is unavailable.
    fn acquire(&self, tile_number: u32) -> Option<TileResolution>;

    /// Releases a tile buffer previously acquired.
    fn release(&self, tile_number: u32);
}

/// A tile buffer acquired from an [`ImageTileSource`], released on drop.
pub(crate) struct AcquiredTile<'a, S: ?Sized + ImageTileSource> {
    source: &'a S,
    tile_number: u32,
    resolution: TileResolution,
}

impl<'a, S: ?Sized + ImageTileSource> AcquiredTile<'a, S> {
    pub(crate) fn acquire(source: &'a S, tile_number: u32) -> Option<Self> {
        let resolution = source.acquire(tile_number)?;
        Some(Self {
            source,
            tile_number,
            resolution,
        })
    }

    #[inline]
    pub(crate) fn resolution(&self) -> TileResolution {
        self.resolution
    }
}

impl<S: ?Sized + ImageTileSource> Drop for AcquiredTile<'_, S> {
    fn drop(&mut self) {
        self.source.release(self.tile_number);
    }
}
