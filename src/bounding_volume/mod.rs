//! Bounding volumes.

#[doc(inline)]
pub use crate::bounding_volume::aabb::Aabb;
#[doc(inline)]
pub use crate::bounding_volume::aabb_frustum::{test_frustum_aabb, FrustumPlanes, PlaneAabbIsect};
#[doc(inline)]
pub use crate::bounding_volume::bounding_volume::BoundingVolume;

#[doc(hidden)]
pub mod bounding_volume;

#[doc(hidden)]
pub mod aabb;
mod aabb_frustum;
