use indexmap::IndexSet;

use crate::bounding_volume::Aabb;
use crate::math::Point;
use crate::partitioning::pbvh::pbvh_build::BuildContext;
use crate::partitioning::pbvh::pbvh_tree::NO_NODE;
use crate::partitioning::pbvh::{
    DynTopoLeafData, Pbvh, PbvhNode, PbvhNodeData, PbvhNodeFlags, PbvhSource,
};
use crate::shape::{DynMesh, FaceHandle, VertHandle};

/// The flags of a leaf whose face set was just rewritten.
const REBUILT_LEAF_FLAGS: PbvhNodeFlags = PbvhNodeFlags::LEAF
    .union(PbvhNodeFlags::UPDATE_BB)
    .union(PbvhNodeFlags::UPDATE_ORIGINAL_BB)
    .union(PbvhNodeFlags::UPDATE_MASK)
    .union(PbvhNodeFlags::UPDATE_VISIBILITY)
    .union(PbvhNodeFlags::UPDATE_DRAW_BUFFERS)
    .union(PbvhNodeFlags::UPDATE_REDRAW)
    .union(PbvhNodeFlags::UPDATE_TOPOLOGY)
    .union(PbvhNodeFlags::REBUILD_PIXELS);

fn set_owner(owners: &mut Vec<u32>, index: usize, node: u32) {
    if index >= owners.len() {
        owners.resize(index + 1, NO_NODE);
    }
    owners[index] = node;
}

impl Pbvh {
    fn dyntopo_owner(&self, vert: VertHandle) -> u32 {
        self.vert_node.get(vert.index()).copied().unwrap_or(NO_NODE)
    }

    /// Assigns the faces of a leaf to it, and splits the vertices of those faces between the
    /// ones it owns and the ones already owned by another leaf.
    pub(super) fn dyntopo_assign_leaf_verts(&mut self, mesh: &DynMesh, node: u32) {
        let faces: Vec<FaceHandle> = self.nodes[node as usize]
            .dyntopo_data()
            .faces
            .iter()
            .copied()
            .collect();
        let mut unique_verts = IndexSet::new();
        let mut other_verts = IndexSet::new();

        for face in faces {
            set_owner(&mut self.face_node, face.index(), node);
            let Some(face) = mesh.face(face) else {
                continue;
            };

            for vert in face.verts() {
                let owner = self.dyntopo_owner(vert);
                if owner == NO_NODE {
                    set_owner(&mut self.vert_node, vert.index(), node);
                    let _ = unique_verts.insert(vert);
                } else if owner == node {
                    let _ = unique_verts.insert(vert);
                } else {
                    let _ = other_verts.insert(vert);
                }
            }
        }

        let data = self.nodes[node as usize].dyntopo_data_mut();
        data.unique_verts = unique_verts;
        data.other_verts = other_verts;
    }

    fn tag_dyntopo_leaf_changed(&mut self, node: u32) {
        let node = &mut self.nodes[node as usize];
        node.flags |= REBUILT_LEAF_FLAGS;
        node.debug_draw_gen = node.debug_draw_gen.wrapping_add(1);
        node.free_vertex_buffers();
    }

    /// Adds a face of `mesh`, created by a topology edit, to a dyntopo leaf.
    ///
    /// The face vertices that no leaf owns become owned by `node`. The leaf is tagged for a
    /// topology and bounds update.
    pub fn dyntopo_add_face(&mut self, mesh: &DynMesh, node: u32, face: FaceHandle) {
        assert!(self.nodes[node as usize].is_leaf(), "expected a PBVH leaf");
        let Some(verts) = mesh.face(face).map(|f| f.verts()) else {
            return;
        };

        set_owner(&mut self.face_node, face.index(), node);
        let _ = self.nodes[node as usize]
            .dyntopo_data_mut()
            .faces
            .insert(face);

        for vert in verts {
            let owner = self.dyntopo_owner(vert);
            if owner == NO_NODE {
                set_owner(&mut self.vert_node, vert.index(), node);
            }
            let data = self.nodes[node as usize].dyntopo_data_mut();
            if owner == NO_NODE || owner == node {
                let _ = data.unique_verts.insert(vert);
            } else {
                let _ = data.other_verts.insert(vert);
            }
        }

        self.tag_dyntopo_leaf_changed(node);
    }

    /// Removes a face from its dyntopo leaf, before it is deleted from `mesh`.
    ///
    /// A vertex owned by that leaf and no longer used by any of its faces is handed over to
    /// the leaf of another face using it, or left unowned. Returns the leaf the face was
    /// removed from.
    pub fn dyntopo_remove_face(&mut self, mesh: &DynMesh, face: FaceHandle) -> Option<u32> {
        let node = self.dyntopo_face_node(face)?;
        self.face_node[face.index()] = NO_NODE;
        let _ = self.nodes[node as usize]
            .dyntopo_data_mut()
            .faces
            .shift_remove(&face);

        if let Some(verts) = mesh.face(face).map(|f| f.verts()) {
            for vert in verts {
                let Some(adjacent) = mesh.vert(vert).map(|v| v.faces()) else {
                    continue;
                };
                let remaining = || adjacent.iter().filter(|f| **f != face);
                if remaining().any(|f| self.dyntopo_face_node(*f) == Some(node)) {
                    continue;
                }

                let data = self.nodes[node as usize].dyntopo_data_mut();
                let _ = data.other_verts.shift_remove(&vert);
                if !data.unique_verts.shift_remove(&vert) {
                    continue;
                }

                match remaining().find_map(|f| self.dyntopo_face_node(*f)) {
                    Some(new_owner) => {
                        self.vert_node[vert.index()] = new_owner;
                        let data = self.nodes[new_owner as usize].dyntopo_data_mut();
                        let _ = data.other_verts.shift_remove(&vert);
                        let _ = data.unique_verts.insert(vert);
                        let new_owner = &mut self.nodes[new_owner as usize];
                        new_owner.flags |= PbvhNodeFlags::UPDATE_DRAW_BUFFERS;
                        new_owner.free_vertex_buffers();
                    }
                    None => self.vert_node[vert.index()] = NO_NODE,
                }
            }
        }

        self.tag_dyntopo_leaf_changed(node);
        Some(node)
    }

    fn node_depth(&self, mut node: u32) -> usize {
        let mut depth = 0;
        while let Some(parent) = self.nodes[node as usize].parent {
            node = parent;
            depth += 1;
        }
        depth
    }

    /// Rebalances a dyntopo tree after topology edits.
    ///
    /// Leaves with more faces than the leaf limit are split with the build median split, the
    /// new nodes being appended to the node array. Sibling leaves holding together at most
    /// half the leaf limit are joined back into their parent, and the node array is
    /// compacted. Bounds, mask and visibility bits of the affected nodes are refreshed.
    ///
    /// Returns `true` if the tree structure changed. Node indices obtained before a change
    /// are invalidated.
    pub fn dyntopo_update_topology(&mut self, mesh: &DynMesh) -> bool {
        let source = PbvhSource::DynTopo(mesh);
        self.assert_source(&source);

        if self.nodes.is_empty() {
            return false;
        }

        let splits = self.dyntopo_split_leaves(mesh);
        let joins = self.dyntopo_join_leaves(mesh);
        let changed = splits + joins > 0;

        if changed {
            self.generation = self.generation.wrapping_add(1);
            log::trace!(
                "Dyntopo update: {} leaves split, {} leaves joined, {} nodes.",
                splits,
                joins,
                self.nodes.len()
            );
        }

        for node in &mut self.nodes {
            node.flags.remove(PbvhNodeFlags::UPDATE_TOPOLOGY);
        }

        let all_nodes: Vec<u32> = (0..self.nodes.len() as u32).collect();
        self.update_bb_redraw(
            source,
            &all_nodes,
            PbvhNodeFlags::UPDATE_BB | PbvhNodeFlags::UPDATE_ORIGINAL_BB,
        );
        self.update_mask(source);
        self.update_visibility(source);

        changed
    }

    fn dyntopo_split_leaves(&mut self, mesh: &DynMesh) -> usize {
        let mut splits = 0;
        let mut id = 0;

        // Appended children are visited too, in case they still exceed the limit.
        while id < self.nodes.len() {
            let node = &self.nodes[id];
            if node.is_leaf() && node.prim_count() > self.leaf_limit {
                let depth = self.node_depth(id as u32);
                if depth + 1 < self.options.max_depth
                    && self.dyntopo_split_leaf(mesh, id as u32, depth)
                {
                    splits += 1;
                }
            }
            id += 1;
        }

        splits
    }

    fn dyntopo_split_leaf(&mut self, mesh: &DynMesh, leaf: u32, depth: usize) -> bool {
        let faces: Vec<FaceHandle> = self.nodes[leaf as usize]
            .dyntopo_data()
            .faces
            .iter()
            .copied()
            .collect();
        let centers: Vec<_> = faces
            .iter()
            .map(|f| match mesh.face(*f) {
                Some(_) => Aabb::from_points(mesh.face_positions(*f)).center(),
                None => Point::origin(),
            })
            .collect();
        let mut local: Vec<u32> = (0..faces.len() as u32).collect();

        let ctx = BuildContext {
            centers: &centers,
            materials: None,
            leaf_limit: self.leaf_limit,
            max_depth: self.options.max_depth - depth,
        };
        let build_nodes = ctx.build(&mut local);
        if build_nodes.len() == 1 {
            return false;
        }

        // The leaf gives up its vertices before its children claim them.
        let old = core::mem::take(self.nodes[leaf as usize].dyntopo_data_mut());
        for vert in &old.unique_verts {
            self.vert_node[vert.index()] = NO_NODE;
        }

        let start = self.nodes.len() as u32;
        let map_id = |k: usize| if k == 0 { leaf } else { start + k as u32 - 1 };

        for (k, build_node) in build_nodes.iter().enumerate().skip(1) {
            let mut data = DynTopoLeafData::default();
            if build_node.is_leaf() {
                data.faces = local[build_node.range.clone()]
                    .iter()
                    .map(|i| faces[*i as usize])
                    .collect();
            }
            let mut node = PbvhNode::new(
                PbvhNodeData::DynTopo(data),
                build_node.parent.map(|p| map_id(p as usize)),
            );
            if !build_node.is_leaf() {
                node.children_offset = map_id(build_node.children_offset as usize);
                node.flags = PbvhNodeFlags::UPDATE_BB | PbvhNodeFlags::UPDATE_ORIGINAL_BB;
            }
            debug_assert_eq!(self.nodes.len() as u32, map_id(k));
            self.nodes.push(node);
        }

        let parent = &mut self.nodes[leaf as usize];
        parent.children_offset = map_id(build_nodes[0].children_offset as usize);
        parent.flags = PbvhNodeFlags::UPDATE_BB | PbvhNodeFlags::UPDATE_ORIGINAL_BB;
        parent.free_vertex_buffers();
        parent.pixels = None;

        for k in 1..build_nodes.len() {
            if build_nodes[k].is_leaf() {
                let id = map_id(k);
                self.dyntopo_assign_leaf_verts(mesh, id);
                self.tag_dyntopo_leaf_changed(id);
            }
        }

        true
    }

    fn dyntopo_join_leaves(&mut self, mesh: &DynMesh) -> usize {
        let threshold = self.leaf_limit / 2;
        let mut removed = vec![false; self.nodes.len()];
        let mut joins = 0;

        // Children come after their parent, so a joined parent is visited after its children.
        for id in (0..self.nodes.len()).rev() {
            let Some([left, right]) = self.nodes[id].children() else {
                continue;
            };
            let (l, r) = (&self.nodes[left as usize], &self.nodes[right as usize]);
            if !l.is_leaf() || !r.is_leaf() || l.prim_count() + r.prim_count() > threshold {
                continue;
            }

            let mut faces =
                core::mem::take(&mut self.nodes[left as usize].dyntopo_data_mut().faces);
            faces.extend(self.nodes[right as usize].dyntopo_data().faces.iter().copied());

            for child in [left, right] {
                let data = core::mem::take(self.nodes[child as usize].dyntopo_data_mut());
                for vert in &data.unique_verts {
                    self.vert_node[vert.index()] = NO_NODE;
                }
                removed[child as usize] = true;
            }

            let node = &mut self.nodes[id];
            node.children_offset = 0;
            node.dyntopo_data_mut().faces = faces;
            self.dyntopo_assign_leaf_verts(mesh, id as u32);
            self.tag_dyntopo_leaf_changed(id as u32);
            joins += 1;
        }

        if joins > 0 {
            self.compact_nodes(&removed);
        }

        joins
    }

    /// Drops the removed nodes and renumbers the remaining ones, keeping their order.
    fn compact_nodes(&mut self, removed: &[bool]) {
        let mut remap = vec![NO_NODE; self.nodes.len()];
        let mut next = 0;
        for (id, removed) in removed.iter().enumerate() {
            if !removed {
                remap[id] = next;
                next += 1;
            }
        }

        let nodes = core::mem::take(&mut self.nodes);
        self.nodes = nodes
            .into_iter()
            .zip(removed)
            .filter(|(_, removed)| !**removed)
            .map(|(mut node, _)| {
                node.parent = node.parent.map(|p| remap[p as usize]);
                if node.children_offset != 0 {
                    node.children_offset = remap[node.children_offset as usize];
                }
                node
            })
            .collect();

        for owner in self.face_node.iter_mut().chain(self.vert_node.iter_mut()) {
            if *owner != NO_NODE {
                *owner = remap[*owner as usize];
            }
        }
    }
}
