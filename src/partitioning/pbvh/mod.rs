pub use pbvh_node::{
    DynTopoLeafData, GridsLeafData, MeshLeafData, PbvhNode, PbvhNodeData, PbvhNodeFlags,
};
pub use pbvh_queries::{
    node_frustum_contain_aabb, node_frustum_exclude_aabb, PbvhNearestHit, PbvhPrimHit, PbvhRayHit,
    PbvhVertRef,
};
pub use pbvh_traverse::{Leaves, TraversalAction};
pub use pbvh_tree::{Pbvh, PbvhBuildOptions, PbvhSource, PbvhType};

mod pbvh_build;
mod pbvh_dyntopo;
mod pbvh_flags;
mod pbvh_node;
mod pbvh_pixels;
mod pbvh_queries;
mod pbvh_refit;
mod pbvh_traverse;
mod pbvh_tree;
mod pbvh_validation;
