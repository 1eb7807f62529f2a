use crate::bounding_volume::BoundingVolume;
use crate::partitioning::pbvh::{Pbvh, PbvhNodeData, PbvhNodeFlags, PbvhSource};
use crate::shape::{DynMesh, Mesh, SubdivGrids};

impl Pbvh {
    /// Panics if the tree isn’t well-formed.
    ///
    /// The tree is well-formed if it is topologically correct (every node is reachable once
    /// from the root, children come after their parent and point back to it), if its leaves
    /// partition the primitives of `source` and their vertices, and if the boxes of every
    /// internal node not tagged with [`PbvhNodeFlags::UPDATE_BB`] contain the ones of its
    /// children.
    pub fn assert_well_formed<'a>(&self, source: impl Into<PbvhSource<'a>>) {
        let source = source.into();
        self.assert_source(&source);

        if self.nodes.is_empty() {
            return;
        }

        assert_eq!(self.nodes[0].parent, None, "the root has a parent");
        let mut visited = vec![false; self.nodes.len()];
        self.assert_well_formed_recurse(0, &mut visited);
        assert!(
            visited.iter().all(|v| *v),
            "some nodes are unreachable from the root"
        );

        match source {
            PbvhSource::Mesh(mesh) => self.assert_mesh_leaves(mesh),
            PbvhSource::Grids(grids) => self.assert_grids_leaves(grids),
            PbvhSource::DynTopo(mesh) => self.assert_dyntopo_leaves(mesh),
        }
    }

    fn assert_well_formed_recurse(&self, id: u32, visited: &mut [bool]) {
        assert!(
            !core::mem::replace(&mut visited[id as usize], true),
            "Detected loop. Node {} visited twice.",
            id
        );

        let node = &self.nodes[id as usize];
        let Some(children) = node.children() else {
            assert_eq!(node.children_offset, 0, "leaf {} has children", id);
            return;
        };

        for child in children {
            assert!(child > id, "child {} is stored before its parent {}", child, id);
            assert!((child as usize) < self.nodes.len());
            let child_node = &self.nodes[child as usize];
            assert_eq!(child_node.parent, Some(id));

            let stale = PbvhNodeFlags::UPDATE_BB;
            if !node.flags.contains(stale) && !child_node.flags.contains(stale) {
                assert!(
                    node.aabb.contains(&child_node.aabb),
                    "node {} does not contain its child {}",
                    id,
                    child
                );
            }

            self.assert_well_formed_recurse(child, visited);
        }
    }

    fn assert_mesh_leaves(&self, mesh: &Mesh) {
        let mut prims = vec![];
        let mut unique_owner = vec![None; mesh.vertex_count()];

        for leaf in self.all_leaf_nodes() {
            let PbvhNodeData::Mesh(data) = &self.nodes[leaf as usize].data else {
                panic!("leaf {} is not a mesh leaf", leaf);
            };
            assert!(data.unique_verts as usize <= data.verts.len());
            let leaf_prims = self.node_prims(leaf);
            prims.extend_from_slice(leaf_prims);

            let verts = self.node_verts(leaf);
            let mut expected: Vec<u32> = leaf_prims
                .iter()
                .flat_map(|t| mesh.tri_verts(*t as usize))
                .collect();
            expected.sort_unstable();
            expected.dedup();
            let mut actual = verts.to_vec();
            actual.sort_unstable();
            assert_eq!(actual, expected, "leaf {} has wrong vertices", leaf);

            for vert in self.node_unique_verts(leaf) {
                let owner = &mut unique_owner[*vert as usize];
                assert_eq!(*owner, None, "vertex {} is unique to two leaves", vert);
                *owner = Some(leaf);
            }

            for (tri, slots) in leaf_prims.iter().zip(self.node_face_vert_indices(leaf)) {
                let tri_verts = mesh.tri_verts(*tri as usize);
                for (vert, slot) in tri_verts.iter().zip(slots) {
                    assert_eq!(verts[*slot as usize], *vert);
                }
            }
        }

        for leaf in self.all_leaf_nodes() {
            for vert in self.node_shared_verts(leaf) {
                let owner = unique_owner[*vert as usize];
                assert!(
                    owner.is_some() && owner != Some(leaf),
                    "shared vertex {} of leaf {} is not unique to another leaf",
                    vert,
                    leaf
                );
            }
        }

        prims.sort_unstable();
        assert!(
            prims.iter().copied().eq(0..mesh.triangle_count() as u32),
            "the leaves do not partition the triangles"
        );
    }

    fn assert_grids_leaves(&self, grids: &SubdivGrids) {
        let mut prims: Vec<u32> = self
            .all_leaf_nodes()
            .into_iter()
            .flat_map(|leaf| self.node_grids(leaf).iter().copied())
            .collect();
        prims.sort_unstable();
        assert!(
            prims.iter().copied().eq(0..grids.grid_count() as u32),
            "the leaves do not partition the grids"
        );
    }

    fn assert_dyntopo_leaves(&self, mesh: &DynMesh) {
        let mut face_count = 0;

        for leaf in self.all_leaf_nodes() {
            let PbvhNodeData::DynTopo(data) = &self.nodes[leaf as usize].data else {
                panic!("leaf {} is not a dyntopo leaf", leaf);
            };
            face_count += data.faces.len();

            for face in &data.faces {
                assert_eq!(self.dyntopo_face_node(*face), Some(leaf));
                let verts = mesh
                    .face(*face)
                    .map(|f| f.verts())
                    .unwrap_or_else(|| panic!("leaf {} references a dead face", leaf));
                for vert in verts {
                    assert!(
                        data.unique_verts.contains(&vert) || data.other_verts.contains(&vert),
                        "vertex {:?} of leaf {} is not tracked",
                        vert,
                        leaf
                    );
                }
            }

            for vert in &data.unique_verts {
                assert_eq!(self.dyntopo_vert_node(*vert), Some(leaf));
            }
            for vert in &data.other_verts {
                let owner = self.dyntopo_vert_node(*vert);
                assert!(owner.is_some() && owner != Some(leaf));
            }
        }

        assert_eq!(face_count, mesh.face_count(), "the leaves do not cover the faces");
    }
}
