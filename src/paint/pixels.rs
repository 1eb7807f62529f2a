use na::Matrix2;

use crate::math::{Point2, Real, Vector2};
use crate::paint::image_tile::{udim_tile_offset, AcquiredTile, ImageTileSource, TileResolution};

/// A horizontal run of image pixels covered by one triangle.
///
/// The barycentric coordinates of the pixel `start_x + i` are obtained by adding `i` times the
/// horizontal delta of the triangle to `start_barycentric`.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct PixelRow {
    /// The column of the first pixel of the run.
    pub start_x: u32,
    /// The row of the run.
    pub y: u32,
    /// The number of pixels of the run, never zero.
    pub num_pixels: u32,
    /// The weights of the first two triangle corners at the center of the first pixel.
    ///
    /// The weight of the third corner is `1 - x - y`.
    pub start_barycentric: Vector2<Real>,
    /// The index of the triangle in [`NodePixels::triangles`].
    pub triangle: u32,
}

impl PixelRow {
    /// Iterates through the pixels of this run with their barycentric coordinates.
    pub fn pixels(
        &self,
        delta_barycentric: Vector2<Real>,
    ) -> impl Iterator<Item = (u32, Vector2<Real>)> {
        let start_x = self.start_x;
        let mut barycentric = self.start_barycentric;
        (0..self.num_pixels).map(move |i| {
            let result = (start_x + i, barycentric);
            barycentric += delta_barycentric;
            result
        })
    }
}

/// The per-triangle data a paint brush needs to walk the pixel rows of a node.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct TrianglePaintInput {
    /// The mesh vertices of the triangle corners.
    pub vert_indices: [u32; 3],
    /// The change of barycentric coordinates for one pixel step along `x`.
    pub delta_barycentric_x: Vector2<Real>,
    /// The change of barycentric coordinates for one pixel step along `y`.
    pub delta_barycentric_y: Vector2<Real>,
}

/// A rectangle of pixels, `min` inclusive and `max` exclusive.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct PixelRect {
    /// The lower pixel corner.
    pub min: [u32; 2],
    /// One past the upper pixel corner.
    pub max: [u32; 2],
}

impl PixelRect {
    /// The pixels covered by a row.
    pub fn from_row(row: &PixelRow) -> Self {
        Self {
            min: [row.start_x, row.y],
            max: [row.start_x + row.num_pixels, row.y + 1],
        }
    }

    /// The smallest rectangle containing both `self` and `other`.
    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        Self {
            min: [self.min[0].min(other.min[0]), self.min[1].min(other.min[1])],
            max: [self.max[0].max(other.max[0]), self.max[1].max(other.max[1])],
        }
    }
}

/// The pixel rows of one node inside one UDIM tile.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct UdimTilePixels {
    /// The UDIM number of the tile.
    pub tile_number: u32,
    /// The rows, grouped by triangle in triangle order, then by increasing `y`.
    pub rows: Vec<PixelRow>,
    dirty: bool,
    dirty_region: Option<PixelRect>,
}

impl UdimTilePixels {
    fn new(tile_number: u32, rows: Vec<PixelRow>) -> Self {
        Self {
            tile_number,
            rows,
            dirty: false,
            dirty_region: None,
        }
    }

    /// Does the image tile need to be redrawn after painting?
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The painted region waiting to be flushed.
    #[inline]
    pub fn dirty_region(&self) -> Option<PixelRect> {
        self.dirty_region
    }

    /// The smallest rectangle containing all the rows.
    pub fn rows_bounds(&self) -> Option<PixelRect> {
        self.rows
            .iter()
            .map(PixelRect::from_row)
            .reduce(|a, b| a.merged(&b))
    }

    /// Marks `region`, or every row when `None`, as painted.
    pub fn mark_dirty(&mut self, region: Option<PixelRect>) {
        let Some(region) = region.or_else(|| self.rows_bounds()) else {
            return;
        };
        self.dirty = true;
        self.dirty_region = Some(match self.dirty_region {
            Some(prev) => prev.merged(&region),
            None => region,
        });
    }

    pub(crate) fn take_dirty_region(&mut self) -> Option<PixelRect> {
        self.dirty = false;
        self.dirty_region.take()
    }

    fn copy_dirty_state(&mut self, previous: &Self) {
        self.dirty = previous.dirty;
        self.dirty_region = previous.dirty_region;
    }
}

/// The pixel cache of a leaf: the image pixels covered by each triangle of the leaf.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct NodePixels {
    tiles: Vec<UdimTilePixels>,
    triangles: Vec<TrianglePaintInput>,
}

impl NodePixels {
    /// The tiles touched by the node, in image tile order.
    #[inline]
    pub fn tiles(&self) -> &[UdimTilePixels] {
        &self.tiles
    }

    /// The triangles of the node, in node primitive order.
    #[inline]
    pub fn triangles(&self) -> &[TrianglePaintInput] {
        &self.triangles
    }

    /// The rows of the node inside the given tile.
    pub fn tile(&self, tile_number: u32) -> Option<&UdimTilePixels> {
        self.tiles.iter().find(|t| t.tile_number == tile_number)
    }

    /// Mutable access to the rows of the node inside the given tile.
    pub fn tile_mut(&mut self, tile_number: u32) -> Option<&mut UdimTilePixels> {
        self.tiles.iter_mut().find(|t| t.tile_number == tile_number)
    }

    pub(crate) fn tiles_mut(&mut self) -> &mut [UdimTilePixels] {
        &mut self.tiles
    }

    /// The total number of pixels covered by the node.
    pub fn num_pixels(&self) -> usize {
        self.tiles
            .iter()
            .flat_map(|t| t.rows.iter())
            .map(|r| r.num_pixels as usize)
            .sum()
    }

    /// Carries over the redraw state of the tiles of `previous` that still exist here.
    pub(crate) fn keep_dirty_state(&mut self, previous: &NodePixels) {
        for tile in &mut self.tiles {
            if let Some(prev) = previous.tile(tile.tile_number) {
                tile.copy_dirty_state(prev);
            }
        }
    }
}

/// The pixel cache state of a leaf.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PixelCacheState {
    /// No cache was ever built for this node, or it was freed.
    NoCache,
    /// The cache is missing or out of date and will be rebuilt on the next rebuild pass.
    Dirty,
    /// The cache matches the current geometry.
    Built,
}

/// Barycentric weights relative to a UV triangle, as an affine map of the UV plane.
struct BarycentricFrame {
    origin: Point2<Real>,
    inv: Matrix2<Real>,
}

impl BarycentricFrame {
    fn new(uvs: &[Point2<Real>; 3]) -> Option<Self> {
        let basis = Matrix2::from_columns(&[uvs[0] - uvs[2], uvs[1] - uvs[2]]);
        let inv = basis.try_inverse()?;
        Some(Self {
            origin: uvs[2],
            inv,
        })
    }

    #[inline]
    fn weights(&self, uv: &Point2<Real>) -> Vector2<Real> {
        self.inv * (uv - self.origin)
    }

    #[inline]
    fn delta(&self, step: Vector2<Real>) -> Vector2<Real> {
        self.inv * step
    }
}

#[inline]
fn barycentric_inside(w: &Vector2<Real>) -> bool {
    w.x >= 0.0 && w.y >= 0.0 && w.x + w.y <= 1.0
}

/// Appends the rows of pixels of a `resolution` tile whose centers lie in the triangle `uvs`.
///
/// The UVs are relative to the tile. Rows without any inside pixel are not emitted.
fn extract_triangle_rows(
    frame: &BarycentricFrame,
    uvs: &[Point2<Real>; 3],
    triangle: u32,
    resolution: TileResolution,
    rows: &mut Vec<PixelRow>,
) {
    let (width, height) = (resolution.width as Real, resolution.height as Real);
    let mut mins = uvs[0];
    let mut maxs = uvs[0];
    for uv in &uvs[1..] {
        mins = mins.inf(uv);
        maxs = maxs.sup(uv);
    }

    let mins = mins.map(|c| c.clamp(0.0, 1.0));
    let maxs = maxs.map(|c| c.clamp(0.0, 1.0));
    let x_end = ((maxs.x * width).ceil() as u32).min(resolution.width);
    let y_end = ((maxs.y * height).ceil() as u32).min(resolution.height);
    let x_range = (mins.x * width).floor() as u32..x_end;
    let y_range = (mins.y * height).floor() as u32..y_end;

    for y in y_range {
        let v = (y as Real + 0.5) / height;
        let mut run: Option<(u32, Vector2<Real>)> = None;
        let mut num_pixels = 0;

        for x in x_range.clone() {
            let uv = Point2::new((x as Real + 0.5) / width, v);
            let barycentric = frame.weights(&uv);

            if barycentric_inside(&barycentric) {
                if run.is_none() {
                    run = Some((x, barycentric));
                }
                num_pixels += 1;
            } else if run.is_some() {
                break;
            }
        }

        if let Some((start_x, start_barycentric)) = run {
            rows.push(PixelRow {
                start_x,
                y,
                num_pixels,
                start_barycentric,
                triangle,
            });
        }
    }
}

/// Builds the pixel cache of one node.
///
/// `tri_verts` and `tri_uvs` give the vertices and UVs of the node triangles in node order.
/// Tiles are processed in the order of `tile_numbers`, triangles in node order, so two
/// extractions of the same input are identical. A tile whose buffer can't be acquired is
/// skipped.
pub(crate) fn extract_node_pixels<S: ?Sized + ImageTileSource>(
    images: &S,
    tile_numbers: &[u32],
    tri_verts: &[[u32; 3]],
    tri_uvs: &[[Point2<Real>; 3]],
) -> NodePixels {
    assert_eq!(tri_verts.len(), tri_uvs.len());

    let mut triangles: Vec<_> = tri_verts
        .iter()
        .map(|verts| TrianglePaintInput {
            vert_indices: *verts,
            delta_barycentric_x: Vector2::zeros(),
            delta_barycentric_y: Vector2::zeros(),
        })
        .collect();
    let mut has_delta = vec![false; triangles.len()];
    let mut tiles = vec![];

    for tile_number in tile_numbers {
        let Some(tile) = AcquiredTile::acquire(images, *tile_number) else {
            log::debug!("Image tile {} is unavailable, skipping it.", tile_number);
            continue;
        };
        let resolution = tile.resolution();
        if resolution.is_empty() {
            continue;
        }

        let offset = udim_tile_offset(*tile_number);
        let mut rows = vec![];

        for (i, uvs) in tri_uvs.iter().enumerate() {
            let local_uvs = uvs.map(|uv| uv - offset);
            let Some(frame) = BarycentricFrame::new(&local_uvs) else {
                continue;
            };

            let num_rows = rows.len();
            extract_triangle_rows(&frame, &local_uvs, i as u32, resolution, &mut rows);

            if rows.len() > num_rows && !has_delta[i] {
                has_delta[i] = true;
                triangles[i].delta_barycentric_x =
                    frame.delta(Vector2::new(1.0 / resolution.width as Real, 0.0));
                triangles[i].delta_barycentric_y =
                    frame.delta(Vector2::new(0.0, 1.0 / resolution.height as Real));
            }
        }

        if !rows.is_empty() {
            tiles.push(UdimTilePixels::new(*tile_number, rows));
        }
    }

    NodePixels { tiles, triangles }
}
