use bitflags::bitflags;
use indexmap::IndexSet;

use crate::bounding_volume::Aabb;
use crate::math::{Color, Real};
use crate::paint::NodePixels;
use crate::shape::{FaceHandle, VertHandle};
use crate::utils::ArenaRange;

bitflags! {
    /// The status and dirty bits of a PBVH node.
    ///
    /// Every cache derived from a node is guarded by its own bit: the subsystem owning the
    /// cache checks and clears it, and never relies on another bit.
    #[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct PbvhNodeFlags: u32 {
        /// The node is a leaf.
        const LEAF = 1 << 0;
        /// The node bounding box is stale.
        const UPDATE_BB = 1 << 1;
        /// The original bounding box must be reset to the current one.
        const UPDATE_ORIGINAL_BB = 1 << 2;
        /// The vertex normals of the node are stale.
        const UPDATE_NORMALS = 1 << 3;
        /// The draw buffers of the node are stale.
        const UPDATE_DRAW_BUFFERS = 1 << 4;
        /// The node region must be redrawn.
        const UPDATE_REDRAW = 1 << 5;
        /// The fully masked/unmasked bits are stale.
        const UPDATE_MASK = 1 << 6;
        /// The fully hidden bit is stale.
        const UPDATE_VISIBILITY = 1 << 7;
        /// The dyntopo faces of the node changed.
        const UPDATE_TOPOLOGY = 1 << 8;
        /// The pixel cache of the node is stale.
        const REBUILD_PIXELS = 1 << 9;
        /// Every vertex of the node is hidden.
        const FULLY_HIDDEN = 1 << 10;
        /// Every vertex of the node is fully masked.
        const FULLY_MASKED = 1 << 11;
        /// No vertex of the node is masked.
        const FULLY_UNMASKED = 1 << 12;
    }
}

/// The content of a mesh mode leaf.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct MeshLeafData {
    /// The triangles of the leaf, from the primitive arena.
    pub(super) prims: ArenaRange,
    /// The vertices of the leaf, from the vertex arena: unique ones first, then shared ones.
    pub(super) verts: ArenaRange,
    /// The number of unique vertices at the start of `verts`.
    pub(super) unique_verts: u32,
}

/// The content of a multires grids leaf.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct GridsLeafData {
    /// The grids of the leaf, from the primitive arena.
    pub(super) grids: ArenaRange,
}

/// The content of a dynamic topology leaf.
///
/// Vertices are split between the ones owned by this leaf and the ones owned by another leaf
/// but still used by a face of this one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct DynTopoLeafData {
    pub(super) faces: IndexSet<FaceHandle>,
    pub(super) unique_verts: IndexSet<VertHandle>,
    pub(super) other_verts: IndexSet<VertHandle>,
}

/// The mode-specific content of a node. Internal nodes carry the default value of their mode.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum PbvhNodeData {
    /// A node of a mesh PBVH.
    Mesh(MeshLeafData),
    /// A node of a grids PBVH.
    Grids(GridsLeafData),
    /// A node of a dynamic topology PBVH.
    DynTopo(DynTopoLeafData),
}

/// A node of a [`Pbvh`](super::Pbvh).
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct PbvhNode {
    pub(super) aabb: Aabb,
    pub(super) aabb_orig: Aabb,
    /// Index of the first child, the second one being right after. Zero for leaves.
    pub(super) children_offset: u32,
    pub(super) parent: Option<u32>,
    pub(super) flags: PbvhNodeFlags,
    pub(super) debug_draw_gen: u32,
    pub(super) data: PbvhNodeData,
    pub(super) layer_disp: Option<Vec<Real>>,
    pub(super) color_snapshot: Option<Vec<Color>>,
    pub(super) pixels: Option<NodePixels>,
}

impl PbvhNode {
    pub(super) fn new(data: PbvhNodeData, parent: Option<u32>) -> Self {
        Self {
            aabb: Aabb::new_invalid(),
            aabb_orig: Aabb::new_invalid(),
            children_offset: 0,
            parent,
            flags: PbvhNodeFlags::empty(),
            debug_draw_gen: 0,
            data,
            layer_disp: None,
            color_snapshot: None,
            pixels: None,
        }
    }

    /// Drops the buffers indexed by unique vertex slot.
    pub(super) fn free_vertex_buffers(&mut self) {
        self.layer_disp = None;
        self.color_snapshot = None;
    }

    /// The current bounding box of the node.
    ///
    /// It is stale while [`PbvhNodeFlags::UPDATE_BB`] is set.
    #[inline]
    pub fn aabb(&self) -> &Aabb {
        &self.aabb
    }

    /// The bounding box of the node at the time of the last snapshot.
    #[inline]
    pub fn aabb_orig(&self) -> &Aabb {
        &self.aabb_orig
    }

    #[inline]
    pub(super) fn aabb_for(&self, use_original: bool) -> &Aabb {
        if use_original {
            &self.aabb_orig
        } else {
            &self.aabb
        }
    }

    /// Is this node a leaf?
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.flags.contains(PbvhNodeFlags::LEAF)
    }

    /// The indices of the two children of an internal node.
    #[inline]
    pub fn children(&self) -> Option<[u32; 2]> {
        (!self.is_leaf()).then_some([self.children_offset, self.children_offset + 1])
    }

    /// The index of the parent node, `None` for the root.
    #[inline]
    pub fn parent(&self) -> Option<u32> {
        self.parent
    }

    /// The status bits of the node.
    #[inline]
    pub fn flags(&self) -> PbvhNodeFlags {
        self.flags
    }

    /// A counter bumped every time the leaf bounds or topology are recomputed.
    ///
    /// This is meant for debug visualization only.
    #[inline]
    pub fn debug_draw_gen(&self) -> u32 {
        self.debug_draw_gen
    }

    /// The mode-specific content of the node.
    #[inline]
    pub fn data(&self) -> &PbvhNodeData {
        &self.data
    }

    /// Is every vertex of this node hidden?
    #[inline]
    pub fn is_fully_hidden(&self) -> bool {
        self.flags.contains(PbvhNodeFlags::FULLY_HIDDEN)
    }

    /// Is every vertex of this node fully masked?
    #[inline]
    pub fn is_fully_masked(&self) -> bool {
        self.flags.contains(PbvhNodeFlags::FULLY_MASKED)
    }

    /// Is every vertex of this node unmasked?
    #[inline]
    pub fn is_fully_unmasked(&self) -> bool {
        self.flags.contains(PbvhNodeFlags::FULLY_UNMASKED)
    }

    /// The pixel cache of the node, if it was built.
    #[inline]
    pub fn pixels(&self) -> Option<&NodePixels> {
        self.pixels.as_ref()
    }

    /// The number of primitives of a leaf: triangles, grids or dyntopo faces.
    pub fn prim_count(&self) -> usize {
        match &self.data {
            PbvhNodeData::Mesh(data) => data.prims.len(),
            PbvhNodeData::Grids(data) => data.grids.len(),
            PbvhNodeData::DynTopo(data) => data.faces.len(),
        }
    }

    pub(super) fn mesh_data(&self) -> &MeshLeafData {
        match &self.data {
            PbvhNodeData::Mesh(data) => data,
            _ => panic!("expected a mesh PBVH node"),
        }
    }

    pub(super) fn grids_data(&self) -> &GridsLeafData {
        match &self.data {
            PbvhNodeData::Grids(data) => data,
            _ => panic!("expected a grids PBVH node"),
        }
    }

    pub(super) fn dyntopo_data(&self) -> &DynTopoLeafData {
        match &self.data {
            PbvhNodeData::DynTopo(data) => data,
            _ => panic!("expected a dyntopo PBVH node"),
        }
    }

    pub(super) fn dyntopo_data_mut(&mut self) -> &mut DynTopoLeafData {
        match &mut self.data {
            PbvhNodeData::DynTopo(data) => data,
            _ => panic!("expected a dyntopo PBVH node"),
        }
    }
}
