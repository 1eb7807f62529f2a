use crate::math::{Point, Real, Vector3};
use crate::query::{Ray, RayIntersection};

/// Computes the intersection between a triangle and a ray.
///
/// Both faces of the triangle are considered. If an intersection is found, the time of impact,
/// the normal oriented toward the ray origin, and the barycentric coordinates of the intersection
/// point are returned.
pub fn local_ray_intersection_with_triangle(
    a: &Point<Real>,
    b: &Point<Real>,
    c: &Point<Real>,
    ray: &Ray,
) -> Option<(RayIntersection, Vector3<Real>)> {
    let ab = *b - *a;
    let ac = *c - *a;

    // normal
    let n = ab.cross(&ac);
    let d = n.dot(&ray.dir);

    // the normal and the ray direction are parallel
    if d == 0.0 {
        return None;
    }

    let ap = ray.origin - *a;
    let t = ap.dot(&n);

    // the ray does not intersect the halfspace defined by the triangle
    if (t < 0.0 && d < 0.0) || (t > 0.0 && d > 0.0) {
        return None;
    }

    let d = d.abs();

    //
    // intersection: compute barycentric coordinates
    //
    let e = -ray.dir.cross(&ap);

    let mut v;
    let mut w;
    let toi;
    let normal;

    if t < 0.0 {
        v = -ac.dot(&e);

        if v < 0.0 || v > d {
            return None;
        }

        w = ab.dot(&e);

        if w < 0.0 || v + w > d {
            return None;
        }

        let invd = 1.0 / d;
        toi = -t * invd;
        normal = -n.normalize();
        v *= invd;
        w *= invd;
    } else {
        v = ac.dot(&e);

        if v < 0.0 || v > d {
            return None;
        }

        w = -ab.dot(&e);

        if w < 0.0 || v + w > d {
            return None;
        }

        let invd = 1.0 / d;
        toi = t * invd;
        normal = n.normalize();
        v *= invd;
        w *= invd;
    }

    Some((
        RayIntersection::new(toi, normal),
        Vector3::new(-v - w + 1.0, v, w),
    ))
}

/// Intersects a ray with the triangle `(t0, t1, t2)`.
///
/// Returns `true` and overwrites `depth` only if the triangle is hit strictly closer than the
/// current value of `depth`.
pub fn ray_face_intersection_tri(
    ray: &Ray,
    t0: &Point<Real>,
    t1: &Point<Real>,
    t2: &Point<Real>,
    depth: &mut Real,
) -> bool {
    match local_ray_intersection_with_triangle(t0, t1, t2, ray) {
        Some((inter, _)) if inter.time_of_impact < *depth => {
            *depth = inter.time_of_impact;
            true
        }
        _ => false,
    }
}

/// Intersects a ray with the quad `(t0, t1, t2, t3)`, split as `(t0, t1, t2)` and `(t0, t2, t3)`.
///
/// Returns `true` and overwrites `depth` only if one of the two triangles is hit strictly closer
/// than the current value of `depth`.
pub fn ray_face_intersection_quad(
    ray: &Ray,
    t0: &Point<Real>,
    t1: &Point<Real>,
    t2: &Point<Real>,
    t3: &Point<Real>,
    depth: &mut Real,
) -> bool {
    ray_face_intersection_tri(ray, t0, t1, t2, depth)
        || ray_face_intersection_tri(ray, t0, t2, t3, depth)
}
