//! Closest-approach queries between a ray and mesh primitives.
//!
//! These are used by brushes that need the primitive passing nearest to the view ray rather than
//! a strict hit. The ray direction is expected to be normalized: depths are expressed along the
//! ray and squared distances are measured perpendicularly to the ray line.

pub use self::nearest_ray_triangle::{
    dist_squared_ray_to_segment, dist_squared_ray_to_triangle_edges, ray_face_nearest_quad,
    ray_face_nearest_tri,
};

mod nearest_ray_aabb;
mod nearest_ray_triangle;
