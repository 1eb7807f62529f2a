use crate::math::Real;
use crate::partitioning::pbvh::{Pbvh, PbvhNodeData, PbvhNodeFlags, PbvhSource};
use crate::utils;

impl Pbvh {
    /// Tags nodes whose vertices moved.
    pub fn tag_positions_changed(&mut self, nodes: &[u32]) {
        self.set_flags(
            nodes,
            PbvhNodeFlags::UPDATE_BB
                | PbvhNodeFlags::UPDATE_NORMALS
                | PbvhNodeFlags::UPDATE_DRAW_BUFFERS
                | PbvhNodeFlags::UPDATE_REDRAW
                | PbvhNodeFlags::REBUILD_PIXELS,
        );
    }

    /// Tags nodes whose hidden state changed.
    pub fn tag_visibility_changed(&mut self, nodes: &[u32]) {
        self.set_flags(
            nodes,
            PbvhNodeFlags::UPDATE_VISIBILITY | PbvhNodeFlags::UPDATE_DRAW_BUFFERS,
        );
    }

    /// Tags nodes whose mask values changed.
    pub fn tag_masks_changed(&mut self, nodes: &[u32]) {
        self.set_flags(
            nodes,
            PbvhNodeFlags::UPDATE_MASK | PbvhNodeFlags::UPDATE_DRAW_BUFFERS,
        );
    }

    /// Tags nodes whose dyntopo faces changed.
    pub fn tag_topology_changed(&mut self, nodes: &[u32]) {
        self.set_flags(
            nodes,
            PbvhNodeFlags::UPDATE_TOPOLOGY
                | PbvhNodeFlags::UPDATE_DRAW_BUFFERS
                | PbvhNodeFlags::REBUILD_PIXELS,
        );
    }

    /// Tags every leaf for a pixel cache rebuild, after a change of UV map or image.
    pub fn mark_rebuild_pixels(&mut self) {
        let leaves = self.all_leaf_nodes();
        self.set_flags(&leaves, PbvhNodeFlags::REBUILD_PIXELS);
    }

    fn tagged_leaves(&self, flag: PbvhNodeFlags) -> Vec<u32> {
        self.search_nodes(|node| !node.is_leaf() || node.flags.contains(flag))
    }

    /// Recomputes the fully masked and fully unmasked bits of the leaves tagged with
    /// [`PbvhNodeFlags::UPDATE_MASK`].
    ///
    /// A vertex is masked at `1.0` and unmasked at or below `0.0`. Without mask data, every
    /// vertex is unmasked.
    pub fn update_mask<'a>(&mut self, source: impl Into<PbvhSource<'a>>) {
        let source = source.into();
        self.assert_source(&source);

        let leaves = self.tagged_leaves(PbvhNodeFlags::UPDATE_MASK);
        let states = utils::map_collect(&leaves, |leaf| {
            let data = &self.nodes[*leaf as usize].data;
            let masks: Vec<Real> = match (source, data) {
                (PbvhSource::Mesh(mesh), PbvhNodeData::Mesh(data)) => match mesh.mask() {
                    Some(mask) => self
                        .vert_indices
                        .get(&data.verts)
                        .iter()
                        .map(|v| mask[*v as usize])
                        .collect(),
                    None => return (false, true),
                },
                (PbvhSource::Grids(grids), PbvhNodeData::Grids(data)) => match grids.masks() {
                    Some(mask) => self
                        .prim_indices
                        .get(&data.grids)
                        .iter()
                        .flat_map(|grid| mask[grids.grid_range(*grid as usize)].iter().copied())
                        .collect(),
                    None => return (false, true),
                },
                (PbvhSource::DynTopo(mesh), PbvhNodeData::DynTopo(data)) => {
                    if !mesh.has_mask() {
                        return (false, true);
                    }
                    data.unique_verts
                        .iter()
                        .chain(data.other_verts.iter())
                        .filter_map(|v| mesh.vert(*v).map(|v| v.mask))
                        .collect()
                }
                _ => unreachable!("the PBVH source does not match the tree type"),
            };

            (
                masks.iter().all(|m| *m == 1.0),
                masks.iter().all(|m| *m <= 0.0),
            )
        });

        for (leaf, (fully_masked, fully_unmasked)) in leaves.iter().zip(states) {
            let flags = &mut self.nodes[*leaf as usize].flags;
            flags.set(PbvhNodeFlags::FULLY_MASKED, fully_masked);
            flags.set(PbvhNodeFlags::FULLY_UNMASKED, fully_unmasked);
            flags.remove(PbvhNodeFlags::UPDATE_MASK);
        }
    }

    /// Recomputes the fully hidden bit of the leaves tagged with
    /// [`PbvhNodeFlags::UPDATE_VISIBILITY`].
    ///
    /// A mesh or dyntopo leaf is fully hidden when all its vertices are hidden. A grids leaf is
    /// fully hidden when none of its grids has a visible vertex.
    pub fn update_visibility<'a>(&mut self, source: impl Into<PbvhSource<'a>>) {
        let source = source.into();
        self.assert_source(&source);

        let leaves = self.tagged_leaves(PbvhNodeFlags::UPDATE_VISIBILITY);
        let hidden = utils::map_collect(&leaves, |leaf| {
            match (source, &self.nodes[*leaf as usize].data) {
                (PbvhSource::Mesh(mesh), PbvhNodeData::Mesh(data)) => {
                    mesh.hide_vert().is_some_and(|hide_vert| {
                        self.vert_indices
                            .get(&data.verts)
                            .iter()
                            .all(|v| hide_vert[*v as usize])
                    })
                }
                (PbvhSource::Grids(grids), PbvhNodeData::Grids(data)) => {
                    grids.grid_hidden().is_some()
                        && self
                            .prim_indices
                            .get(&data.grids)
                            .iter()
                            .all(|grid| !grids.is_grid_visible(*grid as usize))
                }
                (PbvhSource::DynTopo(mesh), PbvhNodeData::DynTopo(data)) => {
                    let mut verts = data.unique_verts.iter().chain(data.other_verts.iter());
                    let mut any = false;
                    verts.all(|v| {
                        any = true;
                        mesh.vert(*v).is_some_and(|v| v.hidden)
                    }) && any
                }
                _ => unreachable!("the PBVH source does not match the tree type"),
            }
        });

        for (leaf, fully_hidden) in leaves.iter().zip(hidden) {
            let flags = &mut self.nodes[*leaf as usize].flags;
            flags.set(PbvhNodeFlags::FULLY_HIDDEN, fully_hidden);
            flags.remove(PbvhNodeFlags::UPDATE_VISIBILITY);
        }
    }
}
