/*!
pbvh3d
========

**pbvh3d** is a bounding volume hierarchy specialized for sculpting and painting
on dense meshes, written with the rust programming language.

The same tree structure indexes three kinds of geometry:
- regular polygon meshes, where the primitives are the triangles of the mesh triangulation,
- multires grids, where the primitives are the grids of a subdivided base mesh,
- dynamic-topology meshes, where leaves own live sets of face and vertex handles.

On top of the tree, the crate provides ray-casting and nearest-to-ray queries, per-node
dirty tracking, per-vertex color access over point or corner attributes, and a
per-node cache of the image pixels covered by each triangle.
*/

#![deny(non_camel_case_types)]
#![deny(unused_parens)]
#![deny(non_upper_case_globals)]
#![deny(unused_results)]
#![warn(missing_docs)]
#![warn(unused_imports)]
#![allow(missing_copy_implementations)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::module_inception)]
#![allow(clippy::manual_range_contains)]
#![allow(clippy::type_complexity)]

#[cfg(feature = "serde-serialize")]
#[macro_use]
extern crate serde;
#[macro_use]
extern crate approx;
extern crate num_traits as num;

pub extern crate nalgebra as na;

pub mod bounding_volume;
pub mod paint;
pub mod partitioning;
pub mod query;
pub mod shape;
pub mod utils;

mod real {
    /// The scalar type used throughout this crate.
    pub use f32 as Real;
}

/// Compilation flags dependent aliases for mathematical types.
pub mod math {
    pub use super::real::*;
    pub use na::{Point2, Point3, Vector2, Vector3, Vector4};

    /// The default tolerance used for geometric operations.
    pub const DEFAULT_EPSILON: Real = Real::EPSILON;

    /// The dimension of the space.
    pub const DIM: usize = 3;

    /// The point type.
    pub use Point3 as Point;

    /// The vector type.
    pub use Vector3 as Vector;

    /// A linear-space RGBA color.
    pub type Color = Vector4<Real>;
}
