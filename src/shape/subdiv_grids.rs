use core::ops::Range;

use crate::math::{Point, Real};
use crate::shape::{check_attribute_len, Mesh, OffsetIndices, TopologyError};

/// A vertex of a multires grid.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct GridCoord {
    /// The grid index.
    pub grid: u32,
    /// The column of the vertex in the grid.
    pub x: u16,
    /// The row of the vertex in the grid.
    pub y: u16,
}

/// The multires grids of a subdivided base mesh.
///
/// Every corner of every base face owns one square grid of `grid_size * grid_size` vertices.
/// Grids are numbered like the base mesh corners, so the grids of a base face are contiguous.
/// Positions, masks and hidden flags are stored per grid vertex, grid after grid, row after row.
#[derive(Clone, Debug)]
pub struct SubdivGrids {
    grid_size: usize,
    faces: OffsetIndices,
    positions: Vec<Point<Real>>,
    masks: Option<Vec<Real>>,
    grid_hidden: Option<Vec<bool>>,
    material_indices: Option<Vec<u32>>,
}

impl SubdivGrids {
    /// Creates grids from the base face to grid offsets and the grid vertex positions.
    pub fn new(
        grid_size: usize,
        faces: OffsetIndices,
        positions: Vec<Point<Real>>,
    ) -> Result<Self, TopologyError> {
        if grid_size < 2 {
            return Err(TopologyError::InvalidGridSize(grid_size));
        }

        check_attribute_len(
            "positions",
            faces.total_size() * grid_size * grid_size,
            positions.len(),
        )?;

        Ok(Self {
            grid_size,
            faces,
            positions,
            masks: None,
            grid_hidden: None,
            material_indices: None,
        })
    }

    /// Creates grids laid out over the faces of `base`, one grid per base corner.
    ///
    /// The base mesh material indices are carried over.
    pub fn from_base_mesh(
        base: &Mesh,
        grid_size: usize,
        positions: Vec<Point<Real>>,
    ) -> Result<Self, TopologyError> {
        let mut result = Self::new(grid_size, base.faces().clone(), positions)?;
        result.material_indices = base.material_indices().map(|m| m.to_vec());
        Ok(result)
    }

    /// The number of vertices along each side of a grid.
    #[inline]
    pub fn grid_size(&self) -> usize {
        self.grid_size
    }

    /// The number of vertices of each grid.
    #[inline]
    pub fn grid_area(&self) -> usize {
        self.grid_size * self.grid_size
    }

    /// The total number of grids.
    #[inline]
    pub fn grid_count(&self) -> usize {
        self.faces.total_size()
    }

    /// The base face to grid offsets.
    #[inline]
    pub fn faces(&self) -> &OffsetIndices {
        &self.faces
    }

    /// The grids owned by a base face.
    #[inline]
    pub fn face_grids(&self, face: usize) -> Range<usize> {
        self.faces.range(face)
    }

    /// The range of the vertices of a grid in the per-vertex arrays.
    #[inline]
    pub fn grid_range(&self, grid: usize) -> Range<usize> {
        let area = self.grid_area();
        grid * area..(grid + 1) * area
    }

    /// The index of the vertex `(x, y)` inside of a grid.
    #[inline]
    pub fn xy_to_index(&self, x: usize, y: usize) -> usize {
        y * self.grid_size + x
    }

    /// The index of a grid vertex in the per-vertex arrays.
    #[inline]
    pub fn coord_to_index(&self, coord: GridCoord) -> usize {
        self.grid_range(coord.grid as usize).start
            + self.xy_to_index(coord.x as usize, coord.y as usize)
    }

    /// The grid vertex positions.
    #[inline]
    pub fn positions(&self) -> &[Point<Real>] {
        &self.positions
    }

    /// Mutable access to the grid vertex positions.
    #[inline]
    pub fn positions_mut(&mut self) -> &mut [Point<Real>] {
        &mut self.positions
    }

    /// The grid vertex masks, if any.
    #[inline]
    pub fn masks(&self) -> Option<&[Real]> {
        self.masks.as_deref()
    }

    /// Sets the grid vertex masks.
    pub fn set_masks(&mut self, masks: Vec<Real>) -> Result<(), TopologyError> {
        check_attribute_len("mask", self.positions.len(), masks.len())?;
        self.masks = Some(masks);
        Ok(())
    }

    /// The grid vertex hidden flags, if any.
    #[inline]
    pub fn grid_hidden(&self) -> Option<&[bool]> {
        self.grid_hidden.as_deref()
    }

    /// Sets the grid vertex hidden flags.
    pub fn set_grid_hidden(&mut self, hidden: Vec<bool>) -> Result<(), TopologyError> {
        check_attribute_len("grid_hidden", self.positions.len(), hidden.len())?;
        self.grid_hidden = Some(hidden);
        Ok(())
    }

    /// The per base face material indices, if any.
    #[inline]
    pub fn material_indices(&self) -> Option<&[u32]> {
        self.material_indices.as_deref()
    }

    /// Sets the per base face material indices.
    pub fn set_material_indices(&mut self, indices: Vec<u32>) -> Result<(), TopologyError> {
        check_attribute_len("material_index", self.faces.len(), indices.len())?;
        self.material_indices = Some(indices);
        Ok(())
    }

    /// Is the grid quad with lower corner `(x, y)` hidden?
    ///
    /// A quad is hidden as soon as one of its four vertices is hidden.
    pub fn is_grid_face_hidden(&self, grid: usize, x: usize, y: usize) -> bool {
        let Some(hidden) = &self.grid_hidden else {
            return false;
        };
        let base = self.grid_range(grid).start;
        [(x, y), (x + 1, y), (x + 1, y + 1), (x, y + 1)]
            .iter()
            .any(|(x, y)| hidden[base + self.xy_to_index(*x, *y)])
    }

    /// Does the grid have at least one visible vertex?
    pub fn is_grid_visible(&self, grid: usize) -> bool {
        match &self.grid_hidden {
            Some(hidden) => hidden[self.grid_range(grid)].iter().any(|h| !*h),
            None => true,
        }
    }
}
