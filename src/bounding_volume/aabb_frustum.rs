use crate::bounding_volume::Aabb;
use crate::math::{Real, Vector, Vector4, DIM};

/// A set of clipping planes `(nx, ny, nz, d)`.
///
/// A point `p` lies on the inner side of a plane when `n.dot(p) + d >= 0`.
pub type FrustumPlanes = [Vector4<Real>];

/// The result of testing an [`Aabb`] against a set of planes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PlaneAabbIsect {
    /// The box lies entirely on the inner side of every plane.
    Inside,
    /// The box lies entirely on the outer side of at least one plane.
    Outside,
    /// The box straddles at least one plane.
    Intersect,
}

/// Classifies `aabb` against the given frustum planes.
///
/// This is conservative: a box near a frustum corner may be reported as intersecting even if it
/// lies outside of the actual frustum volume.
pub fn test_frustum_aabb(aabb: &Aabb, planes: &FrustumPlanes) -> PlaneAabbIsect {
    if !aabb.is_valid() {
        return PlaneAabbIsect::Outside;
    }

    let mut result = PlaneAabbIsect::Inside;

    for plane in planes {
        let normal = plane.xyz();
        let mut vmin = Vector::zeros();
        let mut vmax = Vector::zeros();

        for axis in 0..DIM {
            if normal[axis] < 0.0 {
                vmin[axis] = aabb.mins[axis];
                vmax[axis] = aabb.maxs[axis];
            } else {
                vmin[axis] = aabb.maxs[axis];
                vmax[axis] = aabb.mins[axis];
            }
        }

        if normal.dot(&vmin) + plane.w < 0.0 {
            return PlaneAabbIsect::Outside;
        }
        if normal.dot(&vmax) + plane.w <= 0.0 {
            result = PlaneAabbIsect::Intersect;
        }
    }

    result
}

#[cfg(test)]
mod test {
    use super::{test_frustum_aabb, PlaneAabbIsect};
    use crate::bounding_volume::Aabb;
    use crate::math::{Point, Vector4};

    fn unit_box_planes() -> [Vector4<f32>; 2] {
        // Slab 0 <= x <= 1.
        [Vector4::new(1.0, 0.0, 0.0, 0.0), Vector4::new(-1.0, 0.0, 0.0, 1.0)]
    }

    #[test]
    fn classify_boxes_against_slab() {
        let planes = unit_box_planes();
        let inside = Aabb::new(Point::new(0.25, -5.0, -5.0), Point::new(0.75, 5.0, 5.0));
        let outside = Aabb::new(Point::new(1.5, 0.0, 0.0), Point::new(2.0, 1.0, 1.0));
        let straddling = Aabb::new(Point::new(0.5, 0.0, 0.0), Point::new(1.5, 1.0, 1.0));

        assert_eq!(test_frustum_aabb(&inside, &planes), PlaneAabbIsect::Inside);
        assert_eq!(test_frustum_aabb(&outside, &planes), PlaneAabbIsect::Outside);
        assert_eq!(
            test_frustum_aabb(&straddling, &planes),
            PlaneAabbIsect::Intersect
        );
        assert_eq!(
            test_frustum_aabb(&Aabb::new_invalid(), &planes),
            PlaneAabbIsect::Outside
        );
    }
}
