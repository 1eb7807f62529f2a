//! Axis Aligned Bounding Box.

use crate::bounding_volume::BoundingVolume;
use crate::math::{Point, Real, Vector, DIM};
use na;

/// An Axis-Aligned Bounding Box (AABB).
///
/// # Structure
///
/// - **mins**: The point with the smallest coordinates on each axis.
/// - **maxs**: The point with the largest coordinates on each axis.
/// - **Invariant**: `mins[i] <= maxs[i]` on every axis as soon as at least one point was merged
///   into the box.
///
/// An empty box (see [`Aabb::new_invalid`]) has `mins` set to `+inf` and `maxs` set to `-inf`.
/// Merging anything into an empty box yields that thing's bounds exactly, so folding
/// [`Aabb::take_point`] or [`BoundingVolume::merge`] from an empty box never needs a special first
/// iteration.
///
/// # Example
///
/// ```rust
/// use pbvh3d::bounding_volume::Aabb;
/// use nalgebra::Point3;
///
/// let mut aabb = Aabb::new_invalid();
/// aabb.take_point(Point3::new(1.0, 2.0, 3.0));
/// aabb.take_point(Point3::new(-1.0, 4.0, 2.0));
///
/// assert_eq!(aabb.mins, Point3::new(-1.0, 2.0, 2.0));
/// assert_eq!(aabb.maxs, Point3::new(1.0, 4.0, 3.0));
/// assert_eq!(aabb.widest_axis(), 1);
/// ```
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Debug, PartialEq, Copy, Clone)]
#[repr(C)]
pub struct Aabb {
    /// The point with minimum coordinates.
    pub mins: Point<Real>,
    /// The point with maximum coordinates.
    pub maxs: Point<Real>,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::new_invalid()
    }
}

impl Aabb {
    /// Creates a new AABB from its minimum and maximum corners.
    #[inline]
    pub fn new(mins: Point<Real>, maxs: Point<Real>) -> Aabb {
        Aabb { mins, maxs }
    }

    /// Creates an invalid (empty) AABB.
    ///
    /// Its `mins` components are set to `+inf` and its `maxs` components are set to `-inf`.
    /// This is the neutral element of [`BoundingVolume::merge`].
    #[inline]
    pub fn new_invalid() -> Self {
        Self::new(
            Vector::repeat(Real::INFINITY).into(),
            Vector::repeat(Real::NEG_INFINITY).into(),
        )
    }

    /// Creates a zero-sized AABB located at the origin.
    #[inline]
    pub fn zero() -> Self {
        Self::new(Point::origin(), Point::origin())
    }

    /// Creates the smallest AABB enclosing all the given points.
    ///
    /// Returns an invalid AABB if the iterator is empty.
    pub fn from_points<I>(pts: I) -> Self
    where
        I: IntoIterator<Item = Point<Real>>,
    {
        let mut result = Self::new_invalid();
        for pt in pts {
            result.take_point(pt);
        }
        result
    }

    /// Resets this AABB to the invalid (empty) state.
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::new_invalid();
    }

    /// Returns `true` if at least one point was merged into this AABB.
    #[inline]
    pub fn is_valid(&self) -> bool {
        na::partial_le(&self.mins, &self.maxs)
    }

    /// Enlarges this `Aabb` so it also contains the point `pt`.
    #[inline]
    pub fn take_point(&mut self, pt: Point<Real>) {
        self.mins = self.mins.coords.inf(&pt.coords).into();
        self.maxs = self.maxs.coords.sup(&pt.coords).into();
    }

    /// The center of this `Aabb`.
    ///
    /// This is the centroid `(mins + maxs) / 2` and is computed on demand.
    #[inline]
    pub fn center(&self) -> Point<Real> {
        na::center(&self.mins, &self.maxs)
    }

    /// The extents of this `Aabb`.
    #[inline]
    pub fn extents(&self) -> Vector<Real> {
        self.maxs - self.mins
    }

    /// The axis along which this `Aabb` has its largest extent.
    ///
    /// Ties are broken toward the lowest axis index, so a cube returns `0`.
    pub fn widest_axis(&self) -> usize {
        let extents = self.extents();
        let mut best = 0;

        for i in 1..DIM {
            if extents[i] > extents[best] {
                best = i;
            }
        }

        best
    }

    /// Checks if this `Aabb` contains the given point.
    #[inline]
    pub fn contains_local_point(&self, point: &Point<Real>) -> bool {
        (0..DIM).all(|i| point[i] >= self.mins[i] && point[i] <= self.maxs[i])
    }
}

impl BoundingVolume for Aabb {
    #[inline]
    fn center(&self) -> Point<Real> {
        self.center()
    }

    #[inline]
    fn intersects(&self, other: &Aabb) -> bool {
        na::partial_le(&self.mins, &other.maxs) && na::partial_ge(&self.maxs, &other.mins)
    }

    #[inline]
    fn contains(&self, other: &Aabb) -> bool {
        na::partial_le(&self.mins, &other.mins) && na::partial_ge(&self.maxs, &other.maxs)
    }

    #[inline]
    fn merge(&mut self, other: &Aabb) {
        self.mins = self.mins.inf(&other.mins);
        self.maxs = self.maxs.sup(&other.maxs);
    }

    #[inline]
    fn merged(&self, other: &Aabb) -> Aabb {
        Aabb {
            mins: self.mins.inf(&other.mins),
            maxs: self.maxs.sup(&other.maxs),
        }
    }
}
