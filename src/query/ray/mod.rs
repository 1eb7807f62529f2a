//! Ray-casting related definitions and implementations.

#[doc(inline)]
pub use self::ray::{Ray, RayIntersection};
pub use self::ray_triangle::{
    local_ray_intersection_with_triangle, ray_face_intersection_quad, ray_face_intersection_tri,
};

#[doc(hidden)]
pub mod ray;
mod ray_aabb;
mod ray_triangle;
