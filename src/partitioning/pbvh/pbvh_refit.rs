use std::collections::BTreeSet;

use crate::bounding_volume::{Aabb, BoundingVolume};
use crate::partitioning::pbvh::{Pbvh, PbvhNodeData, PbvhNodeFlags, PbvhSource};
use crate::utils;

impl Pbvh {
    /// Recomputes the box of a leaf from the current positions of its vertices.
    fn compute_leaf_aabb(&self, source: PbvhSource, leaf: u32) -> Aabb {
        match (source, &self.nodes[leaf as usize].data) {
            (PbvhSource::Mesh(mesh), PbvhNodeData::Mesh(data)) => {
                let positions = mesh.positions();
                Aabb::from_points(
                    self.vert_indices
                        .get(&data.verts)
                        .iter()
                        .map(|v| positions[*v as usize]),
                )
            }
            (PbvhSource::Grids(grids), PbvhNodeData::Grids(data)) => {
                let positions = grids.positions();
                Aabb::from_points(
                    self.prim_indices
                        .get(&data.grids)
                        .iter()
                        .flat_map(|grid| {
                            positions[grids.grid_range(*grid as usize)].iter().copied()
                        }),
                )
            }
            (PbvhSource::DynTopo(mesh), PbvhNodeData::DynTopo(data)) => Aabb::from_points(
                data.unique_verts
                    .iter()
                    .chain(data.other_verts.iter())
                    .map(|v| mesh.position(*v)),
            ),
            _ => unreachable!("the PBVH source does not match the tree type"),
        }
    }

    /// Recomputes the bounds of every leaf tagged with [`PbvhNodeFlags::UPDATE_BB`], then
    /// their ancestors.
    pub fn update_bounds<'a>(&mut self, source: impl Into<PbvhSource<'a>>) {
        let nodes: Vec<u32> = self.search_nodes(|node| {
            !node.is_leaf() || node.flags.contains(PbvhNodeFlags::UPDATE_BB)
        });
        self.update_bb_redraw(source, &nodes, PbvhNodeFlags::UPDATE_BB);
    }

    /// Refreshes the bounds and redraw state of a subset of nodes.
    ///
    /// `flags` selects the work:
    /// - [`PbvhNodeFlags::UPDATE_BB`]: the leaves of `nodes` tagged with this flag get their box
    ///   recomputed from scratch, in parallel. Tagged internal nodes of `nodes` are then set to
    ///   the union of their children, and the ancestors of every refreshed node are updated.
    /// - [`PbvhNodeFlags::UPDATE_ORIGINAL_BB`]: the tagged nodes of `nodes` copy their current
    ///   box to their original box.
    /// - [`PbvhNodeFlags::UPDATE_REDRAW`]: the redraw bit of `nodes` is cleared.
    ///
    /// Each flag is only cleared on the nodes of `nodes`. A node outside of the subset keeps its
    /// flag, and its box stays stale.
    pub fn update_bb_redraw<'a>(
        &mut self,
        source: impl Into<PbvhSource<'a>>,
        nodes: &[u32],
        flags: PbvhNodeFlags,
    ) {
        let source = source.into();
        self.assert_source(&source);

        if flags.contains(PbvhNodeFlags::UPDATE_BB) {
            let (mut leaves, mut internals): (Vec<u32>, Vec<u32>) = nodes
                .iter()
                .copied()
                .filter(|id| self.nodes[*id as usize].flags.contains(PbvhNodeFlags::UPDATE_BB))
                .partition(|id| self.nodes[*id as usize].is_leaf());

            let boxes = utils::map_collect(&leaves, |leaf| self.compute_leaf_aabb(source, *leaf));
            for (leaf, aabb) in leaves.iter().zip(boxes) {
                let node = &mut self.nodes[*leaf as usize];
                node.aabb = aabb;
                node.flags.remove(PbvhNodeFlags::UPDATE_BB);
                node.debug_draw_gen = node.debug_draw_gen.wrapping_add(1);
            }

            // Children are always stored after their parent.
            internals.sort_unstable_by(|a, b| b.cmp(a));
            for id in &internals {
                let _ = self.refit_internal(*id);
                self.nodes[*id as usize].flags.remove(PbvhNodeFlags::UPDATE_BB);
            }

            leaves.append(&mut internals);
            self.flush_bounds_to_parents(&leaves);
        }

        if flags.contains(PbvhNodeFlags::UPDATE_ORIGINAL_BB) {
            for id in nodes {
                let node = &mut self.nodes[*id as usize];
                if node.flags.contains(PbvhNodeFlags::UPDATE_ORIGINAL_BB) {
                    node.aabb_orig = node.aabb;
                    node.flags.remove(PbvhNodeFlags::UPDATE_ORIGINAL_BB);
                }
            }
        }

        if flags.contains(PbvhNodeFlags::UPDATE_REDRAW) {
            self.update_redraw(nodes);
        }
    }

    /// Sets the box of an internal node to the union of its children boxes.
    ///
    /// Returns `true` if the box changed.
    fn refit_internal(&mut self, id: u32) -> bool {
        let Some([left, right]) = self.nodes[id as usize].children() else {
            return false;
        };
        let merged = self.nodes[left as usize]
            .aabb
            .merged(&self.nodes[right as usize].aabb);
        let node = &mut self.nodes[id as usize];
        let changed = node.aabb != merged;
        node.aabb = merged;
        changed
    }

    /// Recomputes the boxes of the ancestors of `nodes`, deepest first.
    ///
    /// Propagation stops at ancestors whose box does not change.
    pub fn flush_bounds_to_parents(&mut self, nodes: &[u32]) {
        let mut pending: BTreeSet<u32> = nodes
            .iter()
            .filter_map(|id| self.nodes[*id as usize].parent)
            .collect();

        while let Some(id) = pending.pop_last() {
            if self.refit_internal(id) {
                if let Some(parent) = self.nodes[id as usize].parent {
                    let _ = pending.insert(parent);
                }
            }
        }
    }

    /// Copies the current box of every node into its original box.
    pub fn store_bounds_orig(&mut self) {
        for node in &mut self.nodes {
            node.aabb_orig = node.aabb;
            node.flags.remove(PbvhNodeFlags::UPDATE_ORIGINAL_BB);
        }
    }

    /// Clears the redraw bit of the given nodes.
    pub fn update_redraw(&mut self, nodes: &[u32]) {
        for id in nodes {
            self.nodes[*id as usize]
                .flags
                .remove(PbvhNodeFlags::UPDATE_REDRAW);
        }
    }

    /// Notifies the tree that every vertex position of the source changed.
    ///
    /// All the leaves are tagged, then the current and original boxes are recomputed.
    pub fn vert_coords_apply<'a>(&mut self, source: impl Into<PbvhSource<'a>>) {
        let leaves = self.all_leaf_nodes();
        self.tag_positions_changed(&leaves);
        self.update_bounds(source);
        self.store_bounds_orig();
    }
}
