//! Geometric queries between rays and mesh primitives.
//!
//! All the functions of this module operate on primitives expressed in the same local space as
//! the ray. They report misses through `Option`/`bool` results and never panic on degenerate
//! geometry.

pub use self::nearest::{
    dist_squared_ray_to_segment, dist_squared_ray_to_triangle_edges, ray_face_nearest_quad,
    ray_face_nearest_tri,
};
pub use self::ray::{
    local_ray_intersection_with_triangle, ray_face_intersection_quad, ray_face_intersection_tri,
    Ray, RayIntersection,
};

pub mod nearest;
pub mod ray;
