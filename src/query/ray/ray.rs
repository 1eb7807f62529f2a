//! Traits and structure needed to cast rays.

use crate::math::{Point, Real, Vector};

/// A ray that can be cast against geometric primitives.
///
/// Points along the ray are `origin + dir * t` for `t >= 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[repr(C)]
pub struct Ray {
    /// Starting point of the ray.
    pub origin: Point<Real>,
    /// Direction vector of the ray.
    ///
    /// Intersection queries accept any non-zero direction and express the depth in multiples of
    /// its length. Nearest-to-ray queries expect a unit direction.
    pub dir: Vector<Real>,
}

impl Ray {
    /// Creates a new ray from an origin point and direction vector.
    pub fn new(origin: Point<Real>, dir: Vector<Real>) -> Ray {
        Ray { origin, dir }
    }

    /// Returns this ray with a unit-length direction.
    ///
    /// A ray with a zero direction is returned unchanged.
    pub fn normalized(&self) -> Ray {
        let dir = self.dir.try_normalize(0.0).unwrap_or(self.dir);
        Ray::new(self.origin, dir)
    }

    /// Computes the point at the given parameter on this line.
    ///
    /// This computes `self.origin + self.dir * t`.
    #[inline]
    pub fn point_at(&self, t: Real) -> Point<Real> {
        self.origin + self.dir * t
    }
}

/// Structure containing the result of a successful ray cast.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct RayIntersection {
    /// The time of impact of the ray with the object.
    ///
    /// The exact contact point can be computed with `ray.point_at(time_of_impact)`.
    pub time_of_impact: Real,

    /// The unit normal at the intersection point, oriented toward the ray origin.
    pub normal: Vector<Real>,
}

impl RayIntersection {
    #[inline]
    /// Creates a new `RayIntersection`.
    pub fn new(time_of_impact: Real, normal: Vector<Real>) -> RayIntersection {
        RayIntersection {
            time_of_impact,
            normal,
        }
    }
}
