//! Spatial partitioning tools.

pub use self::pbvh::{
    node_frustum_contain_aabb, node_frustum_exclude_aabb, DynTopoLeafData, GridsLeafData, Leaves,
    MeshLeafData, Pbvh, PbvhBuildOptions, PbvhNearestHit, PbvhNode, PbvhNodeData, PbvhNodeFlags,
    PbvhPrimHit, PbvhRayHit, PbvhSource, PbvhType, PbvhVertRef, TraversalAction,
};

pub mod pbvh;
