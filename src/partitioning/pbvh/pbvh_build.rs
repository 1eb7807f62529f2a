use core::ops::Range;

use ordered_float::OrderedFloat;

use crate::bounding_volume::Aabb;
use crate::math::{Point, Real};
use crate::partitioning::pbvh::pbvh_tree::NO_NODE;
use crate::partitioning::pbvh::{
    DynTopoLeafData, GridsLeafData, MeshLeafData, Pbvh, PbvhBuildOptions, PbvhNode, PbvhNodeData,
    PbvhNodeFlags, PbvhSource, PbvhType,
};
use crate::shape::{DynMesh, FaceHandle, Mesh, SubdivGrids};
use crate::utils::{self, IndexArena};

/// A node of the tree being built, before its mode-specific content is known.
#[derive(Clone, Debug)]
pub(super) struct BuildNode {
    pub parent: Option<u32>,
    /// Zero while the node is a leaf.
    pub children_offset: u32,
    /// The primitives of a leaf, as a range of the partitioned primitive array.
    pub range: Range<usize>,
}

impl BuildNode {
    fn new(parent: Option<u32>, range: Range<usize>) -> Self {
        Self {
            parent,
            children_offset: 0,
            range,
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children_offset == 0
    }

    pub fn to_node(&self, data: PbvhNodeData) -> PbvhNode {
        let mut result = PbvhNode::new(data, self.parent);
        result.children_offset = self.children_offset;
        if self.is_leaf() {
            result.flags = PbvhNodeFlags::LEAF;
        }
        result
    }
}

/// The primitive data read by the median split.
pub(super) struct BuildContext<'a> {
    /// Primitive centroids, indexed by primitive.
    pub centers: &'a [Point<Real>],
    /// Primitive materials, indexed by primitive, if leaves must not mix materials.
    pub materials: Option<&'a [u32]>,
    pub leaf_limit: usize,
    pub max_depth: usize,
}

impl BuildContext<'_> {
    /// Partitions `prims` and returns the tree over it.
    ///
    /// The node at index 0 is the root, and children are always pushed after their parent.
    pub fn build(&self, prims: &mut [u32]) -> Vec<BuildNode> {
        let mut nodes = vec![BuildNode::new(None, 0..prims.len())];
        self.build_recursive(&mut nodes, 0, prims, 0, 0);
        nodes
    }

    fn build_recursive(
        &self,
        nodes: &mut Vec<BuildNode>,
        node_id: usize,
        prims: &mut [u32],
        offset: usize,
        depth: usize,
    ) {
        let mixed = self.has_mixed_materials(prims);

        let split = if depth + 1 >= self.max_depth {
            None
        } else if prims.len() > self.leaf_limit {
            self.median_split(prims)
                .or_else(|| mixed.then(|| self.material_split(prims)))
        } else if mixed {
            Some(self.material_split(prims))
        } else {
            None
        };

        let Some(split) = split else {
            nodes[node_id].range = offset..offset + prims.len();
            return;
        };

        let children = nodes.len();
        nodes[node_id].children_offset = children as u32;
        nodes.push(BuildNode::new(Some(node_id as u32), 0..0));
        nodes.push(BuildNode::new(Some(node_id as u32), 0..0));

        let (left, right) = prims.split_at_mut(split);
        self.build_recursive(nodes, children, left, offset, depth + 1);
        self.build_recursive(nodes, children + 1, right, offset + split, depth + 1);
    }

    /// Partitions `prims` around the median centroid along the widest axis.
    ///
    /// Returns `None` if all the centroids coincide.
    fn median_split(&self, prims: &mut [u32]) -> Option<usize> {
        let bounds = Aabb::from_points(prims.iter().map(|p| self.centers[*p as usize]));
        let axis = bounds.widest_axis();

        if !(bounds.extents()[axis] > 0.0) {
            log::trace!(
                "Forcing a leaf of {} primitives with identical centroids.",
                prims.len()
            );
            return None;
        }

        let mid = prims.len() / 2;
        let _ = prims
            .select_nth_unstable_by_key(mid, |p| OrderedFloat(self.centers[*p as usize][axis]));
        Some(mid)
    }

    fn has_mixed_materials(&self, prims: &[u32]) -> bool {
        match (self.materials, prims.first()) {
            (Some(materials), Some(first)) => {
                let first = materials[*first as usize];
                prims.iter().any(|p| materials[*p as usize] != first)
            }
            _ => false,
        }
    }

    /// Moves the primitives sharing the material of the first one to the front.
    ///
    /// Only called on ranges with mixed materials, so both sides are non-empty.
    fn material_split(&self, prims: &mut [u32]) -> usize {
        let Some(materials) = self.materials else {
            return prims.len();
        };
        let first = materials[prims[0] as usize];
        let mut split = 0;

        for i in 0..prims.len() {
            if materials[prims[i] as usize] == first {
                prims.swap(split, i);
                split += 1;
            }
        }

        split
    }
}

#[inline]
fn local_vert_slot(unique: &[u32], shared: &[u32], vert: u32) -> u32 {
    match unique.binary_search(&vert) {
        Ok(i) => i as u32,
        Err(_) => (unique.len() + shared.partition_point(|v| *v < vert)) as u32,
    }
}

impl Pbvh {
    fn empty(ty: PbvhType, options: PbvhBuildOptions, leaf_limit: usize, totvert: usize) -> Self {
        Self {
            ty,
            nodes: vec![],
            prim_indices: IndexArena::new(),
            vert_indices: IndexArena::new(),
            face_vert_indices: vec![],
            options,
            leaf_limit,
            totvert,
            grid_area: 0,
            face_node: vec![],
            vert_node: vec![],
            generation: 0,
        }
    }

    /// Builds a tree over any kind of source geometry.
    pub fn build<'a>(source: impl Into<PbvhSource<'a>>, options: PbvhBuildOptions) -> Self {
        match source.into() {
            PbvhSource::Mesh(mesh) => Self::from_mesh(mesh, options),
            PbvhSource::Grids(grids) => Self::from_grids(grids, options),
            PbvhSource::DynTopo(mesh) => Self::from_dyntopo(mesh, options),
        }
    }

    /// Builds a tree over the triangles of a mesh.
    pub fn from_mesh(mesh: &Mesh, options: PbvhBuildOptions) -> Self {
        let leaf_limit = options.leaf_limit.max(1);
        let mut prims: Vec<u32> = (0..mesh.triangle_count() as u32).collect();
        let centers = utils::map_collect(&prims, |tri| {
            Aabb::from_points(mesh.tri_positions(*tri as usize)).center()
        });
        let tri_materials: Option<Vec<u32>> = mesh
            .material_indices()
            .filter(|_| options.split_by_material)
            .map(|materials| {
                mesh.tri_faces()
                    .iter()
                    .map(|face| materials[*face as usize])
                    .collect()
            });

        let ctx = BuildContext {
            centers: &centers,
            materials: tri_materials.as_deref(),
            leaf_limit,
            max_depth: options.max_depth,
        };
        let build_nodes = ctx.build(&mut prims);

        let mut result = Self::empty(PbvhType::Mesh, options, leaf_limit, mesh.vertex_count());
        result.prim_indices.replace(prims);
        result.nodes = build_nodes
            .iter()
            .map(|node| {
                let data = MeshLeafData {
                    prims: result
                        .prim_indices
                        .range(node.range.start, node.range.len()),
                    ..Default::default()
                };
                node.to_node(PbvhNodeData::Mesh(data))
            })
            .collect();
        result.build_mesh_leaf_verts(mesh);
        result.finish_build(PbvhSource::Mesh(mesh));
        result
    }

    /// Builds a tree over multires grids.
    ///
    /// The split runs over base faces, then the face list of each leaf is expanded into the
    /// grids of those faces.
    pub fn from_grids(grids: &SubdivGrids, options: PbvhBuildOptions) -> Self {
        let grid_area = grids.grid_area();
        let leaf_limit = (options.grid_base_limit / grid_area).max(1);
        let mut faces: Vec<u32> = (0..grids.faces().len() as u32).collect();
        let centers = utils::map_collect(&faces, |face| {
            let positions = grids.positions();
            Aabb::from_points(
                grids
                    .face_grids(*face as usize)
                    .flat_map(|grid| positions[grids.grid_range(grid)].iter().copied()),
            )
            .center()
        });

        let ctx = BuildContext {
            centers: &centers,
            materials: grids.material_indices().filter(|_| options.split_by_material),
            leaf_limit,
            max_depth: options.max_depth,
        };
        let build_nodes = ctx.build(&mut faces);

        let mut grid_indices = Vec::with_capacity(grids.grid_count());
        let mut grid_ranges = Vec::with_capacity(build_nodes.len());
        for node in &build_nodes {
            let start = grid_indices.len();
            if node.is_leaf() {
                for face in &faces[node.range.clone()] {
                    grid_indices.extend(grids.face_grids(*face as usize).map(|g| g as u32));
                }
            }
            grid_ranges.push((start, grid_indices.len() - start));
        }

        let mut result = Self::empty(
            PbvhType::Grids,
            options,
            leaf_limit,
            grids.positions().len(),
        );
        result.grid_area = grid_area;
        result.prim_indices.replace(grid_indices);
        result.nodes = build_nodes
            .iter()
            .zip(grid_ranges)
            .map(|(node, (start, len))| {
                let data = GridsLeafData {
                    grids: result.prim_indices.range(start, len),
                };
                node.to_node(PbvhNodeData::Grids(data))
            })
            .collect();
        result.finish_build(PbvhSource::Grids(grids));
        result
    }

    /// Builds a tree over the faces of a dynamic topology mesh.
    pub fn from_dyntopo(mesh: &DynMesh, options: PbvhBuildOptions) -> Self {
        let leaf_limit = options.leaf_limit.max(1);
        let mut faces: Vec<u32> = mesh.faces().map(|f| f.0).collect();
        let centers = dyntopo_face_centers(mesh, &faces);

        let ctx = BuildContext {
            centers: &centers,
            materials: None,
            leaf_limit,
            max_depth: options.max_depth,
        };
        let build_nodes = ctx.build(&mut faces);

        let mut result = Self::empty(PbvhType::DynTopo, options, leaf_limit, mesh.vert_count());
        result.face_node = vec![NO_NODE; mesh.face_capacity()];
        result.vert_node = vec![NO_NODE; mesh.vert_capacity()];
        result.nodes = build_nodes
            .iter()
            .map(|node| {
                let mut data = DynTopoLeafData::default();
                if node.is_leaf() {
                    data.faces = faces[node.range.clone()]
                        .iter()
                        .map(|f| FaceHandle(*f))
                        .collect();
                }
                node.to_node(PbvhNodeData::DynTopo(data))
            })
            .collect();

        for node in 0..result.nodes.len() as u32 {
            if result.nodes[node as usize].is_leaf() {
                result.dyntopo_assign_leaf_verts(mesh, node);
            }
        }

        result.finish_build(PbvhSource::DynTopo(mesh));
        result
    }

    /// Fills the vertex arena and the triangle corner slots of every mesh leaf.
    ///
    /// A vertex is unique to the first leaf, in node order, that references it.
    fn build_mesh_leaf_verts(&mut self, mesh: &Mesh) {
        let leaves: Vec<u32> = self.all_leaf_nodes();

        let leaf_verts = utils::map_collect(&leaves, |leaf| {
            let prims = self.prim_indices.get(&self.nodes[*leaf as usize].mesh_data().prims);
            let mut verts: Vec<u32> = prims
                .iter()
                .flat_map(|tri| mesh.tri_verts(*tri as usize))
                .collect();
            verts.sort_unstable();
            verts.dedup();
            verts
        });

        let mut vert_used = vec![false; mesh.vertex_count()];
        let mut vert_data = Vec::with_capacity(leaf_verts.iter().map(|v| v.len()).sum());
        let mut vert_ranges = Vec::with_capacity(leaves.len());

        for verts in &leaf_verts {
            let (unique, shared): (Vec<u32>, Vec<u32>) = verts
                .iter()
                .copied()
                .partition(|v| !core::mem::replace(&mut vert_used[*v as usize], true));
            vert_ranges.push((vert_data.len(), unique.len(), shared.len()));
            vert_data.extend_from_slice(&unique);
            vert_data.extend_from_slice(&shared);
        }

        self.vert_indices.replace(vert_data);

        for (leaf, (start, unique, shared)) in leaves.iter().zip(vert_ranges) {
            let verts = self.vert_indices.range(start, unique + shared);
            if let PbvhNodeData::Mesh(data) = &mut self.nodes[*leaf as usize].data {
                data.verts = verts;
                data.unique_verts = unique as u32;
            }
        }

        let corner_slots = utils::map_collect(&leaves, |leaf| {
            let data = self.nodes[*leaf as usize].mesh_data();
            let verts = self.vert_indices.get(&data.verts);
            let (unique, shared) = verts.split_at(data.unique_verts as usize);
            self.prim_indices
                .get(&data.prims)
                .iter()
                .map(|tri| {
                    mesh.tri_verts(*tri as usize)
                        .map(|v| local_vert_slot(unique, shared, v))
                })
                .collect::<Vec<_>>()
        });

        self.face_vert_indices = vec![[0; 3]; self.prim_indices.len()];
        for (leaf, slots) in leaves.iter().zip(corner_slots) {
            let range = self.nodes[*leaf as usize].mesh_data().prims.as_range();
            self.face_vert_indices[range].copy_from_slice(&slots);
        }
    }

    /// Computes the bounds and status bits of a freshly built tree.
    fn finish_build(&mut self, source: PbvhSource) {
        let leaves = self.all_leaf_nodes();
        self.set_flags(
            &leaves,
            PbvhNodeFlags::UPDATE_BB
                | PbvhNodeFlags::UPDATE_ORIGINAL_BB
                | PbvhNodeFlags::UPDATE_MASK
                | PbvhNodeFlags::UPDATE_VISIBILITY
                | PbvhNodeFlags::UPDATE_DRAW_BUFFERS
                | PbvhNodeFlags::UPDATE_REDRAW,
        );
        self.update_bounds(source);
        self.store_bounds_orig();
        self.update_mask(source);
        self.update_visibility(source);
        self.generation = self.generation.wrapping_add(1);

        log::debug!(
            "Built a {:?} PBVH over {} primitives: {} nodes, {} leaves.",
            self.ty,
            match source {
                PbvhSource::Mesh(mesh) => mesh.triangle_count(),
                PbvhSource::Grids(grids) => grids.grid_count(),
                PbvhSource::DynTopo(mesh) => mesh.face_count(),
            },
            self.nodes.len(),
            leaves.len()
        );
    }
}

/// The centroids of the given dyntopo faces, indexed by face handle.
pub(super) fn dyntopo_face_centers(mesh: &DynMesh, faces: &[u32]) -> Vec<Point<Real>> {
    let mut centers = vec![Point::origin(); mesh.face_capacity()];
    for face in faces {
        centers[*face as usize] =
            Aabb::from_points(mesh.face_positions(FaceHandle(*face))).center();
    }
    centers
}
