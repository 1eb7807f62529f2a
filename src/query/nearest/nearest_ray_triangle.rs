use crate::math::{Point, Real};
use crate::query::Ray;

/// Squared distance between the ray line and the segment `[a, b]`.
///
/// Returns the squared perpendicular distance from the closest point on the segment to the ray
/// line, and the depth of that point along the ray. If the segment is parallel to the ray, `a` is
/// used as the closest point.
pub fn dist_squared_ray_to_segment(ray: &Ray, a: &Point<Real>, b: &Point<Real>) -> (Real, Real) {
    let u = *b - *a;
    let w = *a - ray.origin;
    let uu = u.norm_squared();
    let ud = u.dot(&ray.dir);
    let dd = ray.dir.norm_squared();
    let denom = uu * dd - ud * ud;

    let closest = if denom == 0.0 {
        *a
    } else {
        let s = (ud * ray.dir.dot(&w) - dd * u.dot(&w)) / denom;
        if s <= 0.0 {
            *a
        } else if s >= 1.0 {
            *b
        } else {
            *a + u * s
        }
    };

    let dvec = closest - ray.origin;
    let depth = dvec.dot(&ray.dir);
    (dvec.norm_squared() - depth * depth, depth)
}

/// Squared distance between the ray line and the edges of a triangle.
///
/// This assumes the ray does not cross the triangle, so only its three edges are tested.
/// Returns the smallest squared distance and the corresponding depth along the ray.
pub fn dist_squared_ray_to_triangle_edges(
    ray: &Ray,
    v0: &Point<Real>,
    v1: &Point<Real>,
    v2: &Point<Real>,
) -> (Real, Real) {
    let tri = [v0, v1, v2];
    let mut best = (Real::MAX, Real::MAX);

    for (i, j) in [(0, 2), (1, 0), (2, 1)] {
        let test = dist_squared_ray_to_segment(ray, tri[i], tri[j]);
        if test.0 < best.0 || i == 0 {
            best = test;
        }
    }

    best
}

/// Updates `depth` and `dist_sq` if the triangle `(t0, t1, t2)` passes strictly closer to the
/// ray than `dist_sq`.
pub fn ray_face_nearest_tri(
    ray: &Ray,
    t0: &Point<Real>,
    t1: &Point<Real>,
    t2: &Point<Real>,
    depth: &mut Real,
    dist_sq: &mut Real,
) -> bool {
    let (dist_sq_test, depth_test) = dist_squared_ray_to_triangle_edges(ray, t0, t1, t2);
    if dist_sq_test < *dist_sq {
        *dist_sq = dist_sq_test;
        *depth = depth_test;
        true
    } else {
        false
    }
}

/// Updates `depth` and `dist_sq` if the quad `(t0, t1, t2, t3)` passes strictly closer to the
/// ray than `dist_sq`.
///
/// The quad is split into `(t0, t1, t2)` and `(t0, t2, t3)`. The second triangle is only tested
/// once the first one improved the current best distance.
pub fn ray_face_nearest_quad(
    ray: &Ray,
    t0: &Point<Real>,
    t1: &Point<Real>,
    t2: &Point<Real>,
    t3: &Point<Real>,
    depth: &mut Real,
    dist_sq: &mut Real,
) -> bool {
    if ray_face_nearest_tri(ray, t0, t1, t2, depth, dist_sq) {
        let _ = ray_face_nearest_tri(ray, t0, t2, t3, depth, dist_sq);
        true
    } else {
        false
    }
}
