use core::ops::Range;

use indexmap::IndexSet;

use crate::bounding_volume::Aabb;
use crate::math::{Color, Real};
use crate::paint::VertexColorAccessor;
use crate::partitioning::pbvh::{PbvhNode, PbvhNodeData, PbvhNodeFlags};
use crate::shape::{DynMesh, FaceHandle, Mesh, SubdivGrids, VertHandle};
use crate::utils::IndexArena;

/// Marks a dyntopo face or vertex that does not belong to any leaf.
pub(super) const NO_NODE: u32 = u32::MAX;

/// The kind of geometry indexed by a [`Pbvh`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum PbvhType {
    /// The primitives are the triangles of a [`Mesh`] triangulation.
    Mesh,
    /// The primitives are the grids of [`SubdivGrids`].
    Grids,
    /// The leaves own live face sets of a [`DynMesh`].
    DynTopo,
}

/// The geometry a [`Pbvh`] was built on, passed back to every operation reading it.
///
/// The tree never copies the geometry. Passing a source of a different kind than the tree's is
/// a contract violation that panics.
#[derive(Copy, Clone, Debug)]
pub enum PbvhSource<'a> {
    /// A regular mesh.
    Mesh(&'a Mesh),
    /// Multires grids.
    Grids(&'a SubdivGrids),
    /// A dynamic topology mesh.
    DynTopo(&'a DynMesh),
}

impl PbvhSource<'_> {
    /// The kind of tree this source can be used with.
    pub fn ty(&self) -> PbvhType {
        match self {
            Self::Mesh(_) => PbvhType::Mesh,
            Self::Grids(_) => PbvhType::Grids,
            Self::DynTopo(_) => PbvhType::DynTopo,
        }
    }
}

impl<'a> From<&'a Mesh> for PbvhSource<'a> {
    fn from(mesh: &'a Mesh) -> Self {
        Self::Mesh(mesh)
    }
}

impl<'a> From<&'a SubdivGrids> for PbvhSource<'a> {
    fn from(grids: &'a SubdivGrids) -> Self {
        Self::Grids(grids)
    }
}

impl<'a> From<&'a DynMesh> for PbvhSource<'a> {
    fn from(mesh: &'a DynMesh) -> Self {
        Self::DynTopo(mesh)
    }
}

/// The parameters of a [`Pbvh`] build.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct PbvhBuildOptions {
    /// The maximum number of triangles of a mesh leaf, or faces of a dyntopo leaf.
    pub leaf_limit: usize,
    /// The maximum number of grid vertices of a grids leaf.
    ///
    /// The leaf limit of a grids tree, counted in base faces, is
    /// `max(grid_base_limit / grid_area, 1)`.
    pub grid_base_limit: usize,
    /// The maximum depth of the tree. Nodes at depth `max_depth - 1` are always leaves.
    pub max_depth: usize,
    /// Keep splitting leaves until each one only contains a single material.
    pub split_by_material: bool,
}

impl Default for PbvhBuildOptions {
    fn default() -> Self {
        Self {
            leaf_limit: 2500,
            grid_base_limit: 800,
            max_depth: 100,
            split_by_material: true,
        }
    }
}

impl PbvhBuildOptions {
    /// Sets [`Self::leaf_limit`].
    #[must_use]
    pub fn with_leaf_limit(mut self, leaf_limit: usize) -> Self {
        self.leaf_limit = leaf_limit;
        self
    }

    /// Sets [`Self::grid_base_limit`].
    #[must_use]
    pub fn with_grid_base_limit(mut self, grid_base_limit: usize) -> Self {
        self.grid_base_limit = grid_base_limit;
        self
    }

    /// Sets [`Self::max_depth`].
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Sets [`Self::split_by_material`].
    #[must_use]
    pub fn with_split_by_material(mut self, split_by_material: bool) -> Self {
        self.split_by_material = split_by_material;
        self
    }
}

/// A bounding volume hierarchy over sculpted geometry.
///
/// Nodes are stored in a flat array, the root being at index 0. The two children of an
/// internal node are stored next to each other, always after their parent. Leaves reference
/// their primitives and vertices as ranges of two arenas shared by the whole tree, so that
/// leaves never overlap and can be processed in parallel.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Pbvh {
    pub(super) ty: PbvhType,
    pub(super) nodes: Vec<PbvhNode>,
    pub(super) prim_indices: IndexArena,
    pub(super) vert_indices: IndexArena,
    // Parallel to `prim_indices`: the slot of each triangle corner in its leaf vertex range.
    pub(super) face_vert_indices: Vec<[u32; 3]>,
    pub(super) options: PbvhBuildOptions,
    pub(super) leaf_limit: usize,
    pub(super) totvert: usize,
    pub(super) grid_area: usize,
    // Dyntopo only, indexed by handle.
    pub(super) face_node: Vec<u32>,
    pub(super) vert_node: Vec<u32>,
    pub(super) generation: u32,
}

impl Pbvh {
    /// The kind of geometry indexed by this tree.
    #[inline]
    pub fn ty(&self) -> PbvhType {
        self.ty
    }

    /// The options this tree was built with.
    #[inline]
    pub fn options(&self) -> &PbvhBuildOptions {
        &self.options
    }

    /// The maximum number of primitives of a leaf, in the unit of this tree's primitives.
    ///
    /// For grids, this is the number of base faces computed from
    /// [`PbvhBuildOptions::grid_base_limit`].
    #[inline]
    pub fn leaf_limit(&self) -> usize {
        self.leaf_limit
    }

    /// The number of vertices of the geometry at build time.
    #[inline]
    pub fn totvert(&self) -> usize {
        self.totvert
    }

    /// A counter incremented on each structural change of the tree.
    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// All the nodes of the tree, the root first.
    #[inline]
    pub fn nodes(&self) -> &[PbvhNode] {
        &self.nodes
    }

    /// The node at index `i`.
    #[inline]
    pub fn node(&self, i: u32) -> &PbvhNode {
        &self.nodes[i as usize]
    }

    /// The number of nodes, internal nodes included.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The number of leaves.
    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// The bounding box of the whole tree, or a zero box for an empty tree.
    pub fn bounds(&self) -> Aabb {
        match self.nodes.first() {
            Some(root) if root.aabb.is_valid() => root.aabb,
            _ => Aabb::zero(),
        }
    }

    #[inline]
    pub(super) fn assert_source(&self, source: &PbvhSource) {
        assert_eq!(
            source.ty(),
            self.ty,
            "the PBVH source does not match the tree type"
        );
    }

    pub(super) fn leaf(&self, node: u32) -> &PbvhNode {
        let node = &self.nodes[node as usize];
        assert!(node.is_leaf(), "expected a PBVH leaf");
        node
    }

    /// The triangle indices of a mesh leaf, or the grid indices of a grids leaf.
    ///
    /// Dyntopo leaves have no primitive range: see [`Self::node_dyntopo_faces`].
    pub fn node_prims(&self, node: u32) -> &[u32] {
        match &self.leaf(node).data {
            PbvhNodeData::Mesh(data) => self.prim_indices.get(&data.prims),
            PbvhNodeData::Grids(data) => self.prim_indices.get(&data.grids),
            PbvhNodeData::DynTopo(_) => &[],
        }
    }

    /// The grid indices of a grids leaf.
    pub fn node_grids(&self, node: u32) -> &[u32] {
        self.prim_indices.get(&self.leaf(node).grids_data().grids)
    }

    /// The vertices of a mesh leaf: [`Self::node_unique_verts`] followed by
    /// [`Self::node_shared_verts`], each sorted.
    pub fn node_verts(&self, node: u32) -> &[u32] {
        self.vert_indices.get(&self.leaf(node).mesh_data().verts)
    }

    /// The vertices of a mesh leaf that no other leaf owns.
    pub fn node_unique_verts(&self, node: u32) -> &[u32] {
        let data = self.leaf(node).mesh_data();
        &self.vert_indices.get(&data.verts)[..data.unique_verts as usize]
    }

    /// The vertices of a mesh leaf owned by another leaf.
    pub fn node_shared_verts(&self, node: u32) -> &[u32] {
        let data = self.leaf(node).mesh_data();
        &self.vert_indices.get(&data.verts)[data.unique_verts as usize..]
    }

    /// For each triangle of a mesh leaf, the positions of its corners in [`Self::node_verts`].
    pub fn node_face_vert_indices(&self, node: u32) -> &[[u32; 3]] {
        let data = self.leaf(node).mesh_data();
        &self.face_vert_indices[data.prims.as_range()]
    }

    /// The grid vertex index ranges of a grids leaf, one per grid.
    pub fn node_grid_vert_ranges<'a>(
        &'a self,
        grids: &'a SubdivGrids,
        node: u32,
    ) -> impl Iterator<Item = Range<usize>> + 'a {
        self.node_grids(node)
            .iter()
            .map(move |grid| grids.grid_range(*grid as usize))
    }

    /// The faces of a dyntopo leaf.
    pub fn node_dyntopo_faces(&self, node: u32) -> &IndexSet<FaceHandle> {
        &self.leaf(node).dyntopo_data().faces
    }

    /// The vertices owned by a dyntopo leaf.
    pub fn node_dyntopo_unique_verts(&self, node: u32) -> &IndexSet<VertHandle> {
        &self.leaf(node).dyntopo_data().unique_verts
    }

    /// The vertices used by a dyntopo leaf but owned by another one.
    pub fn node_dyntopo_other_verts(&self, node: u32) -> &IndexSet<VertHandle> {
        &self.leaf(node).dyntopo_data().other_verts
    }

    /// The leaf a dyntopo face belongs to.
    pub fn dyntopo_face_node(&self, face: FaceHandle) -> Option<u32> {
        self.face_node
            .get(face.index())
            .copied()
            .filter(|n| *n != NO_NODE)
    }

    /// The leaf owning a dyntopo vertex.
    pub fn dyntopo_vert_node(&self, vert: VertHandle) -> Option<u32> {
        self.vert_node
            .get(vert.index())
            .copied()
            .filter(|n| *n != NO_NODE)
    }

    /// The number of vertices a leaf owns.
    pub fn node_unique_vert_count(&self, node: u32) -> usize {
        match &self.leaf(node).data {
            PbvhNodeData::Mesh(data) => data.unique_verts as usize,
            PbvhNodeData::Grids(data) => data.grids.len() * self.grid_area,
            PbvhNodeData::DynTopo(data) => data.unique_verts.len(),
        }
    }

    /// The layer brush displacement buffer of a leaf, one value per unique vertex.
    ///
    /// The buffer is allocated and zeroed on first access.
    pub fn node_layer_disp_mut(&mut self, node: u32) -> &mut [Real] {
        let len = self.node_unique_vert_count(node);
        self.nodes[node as usize]
            .layer_disp
            .get_or_insert_with(|| vec![0.0; len])
    }

    /// The layer brush displacement buffer of a leaf, if it was allocated.
    pub fn node_layer_disp(&self, node: u32) -> Option<&[Real]> {
        self.leaf(node).layer_disp.as_deref()
    }

    /// Frees the layer brush displacement buffer of a leaf.
    pub fn free_layer_disp(&mut self, node: u32) {
        self.nodes[node as usize].layer_disp = None;
    }

    /// Snapshots the colors of the vertices of a mesh leaf, in [`Self::node_verts`] order.
    pub fn store_node_colors(&mut self, node: u32, colors: &VertexColorAccessor) {
        let verts = self.node_verts(node);
        let mut snapshot = vec![Color::zeros(); verts.len()];
        colors.store_colors_vertex(verts, &mut snapshot);
        self.nodes[node as usize].color_snapshot = Some(snapshot);
    }

    /// The color snapshot of a leaf, if any.
    pub fn node_color_snapshot(&self, node: u32) -> Option<&[Color]> {
        self.leaf(node).color_snapshot.as_deref()
    }

    /// Frees the color snapshot of a leaf.
    pub fn free_node_colors(&mut self, node: u32) {
        self.nodes[node as usize].color_snapshot = None;
    }

    pub(super) fn set_flags(&mut self, nodes: &[u32], flags: PbvhNodeFlags) {
        for node in nodes {
            self.nodes[*node as usize].flags |= flags;
        }
    }
}
