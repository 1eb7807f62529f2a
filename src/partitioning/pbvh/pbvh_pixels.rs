use std::collections::BTreeMap;

use crate::math::{Point2, Real};
use crate::paint::{self, ImageTileSource, NodePixels, PixelCacheState, PixelRect};
use crate::partitioning::pbvh::{Pbvh, PbvhNodeFlags, PbvhSource};
use crate::shape::Mesh;
use crate::utils;

impl Pbvh {
    /// Rebuilds the pixel cache of every leaf tagged with [`PbvhNodeFlags::REBUILD_PIXELS`].
    ///
    /// Leaves are processed in parallel, and this blocks until all of them are done. Nothing
    /// happens if the mesh has no UV map. The redraw state of the tiles of a replaced cache is
    /// kept. Returns the number of rebuilt leaves.
    pub fn rebuild_pixels<S: ?Sized + ImageTileSource>(
        &mut self,
        mesh: &Mesh,
        images: &S,
    ) -> usize {
        self.assert_source(&PbvhSource::Mesh(mesh));

        let Some(uv_map) = mesh.uv_map() else {
            log::debug!("Skipping the pixel cache rebuild of a mesh without UV map.");
            return 0;
        };

        let leaves = self.search_nodes(|node| {
            !node.is_leaf() || node.flags.contains(PbvhNodeFlags::REBUILD_PIXELS)
        });
        if leaves.is_empty() {
            return 0;
        }

        let tile_numbers = images.tiles();
        let corner_tris = mesh.corner_tris();
        let caches = utils::map_collect(&leaves, |leaf| {
            let prims = self.node_prims(*leaf);
            let tri_verts: Vec<[u32; 3]> =
                prims.iter().map(|t| mesh.tri_verts(*t as usize)).collect();
            let tri_uvs: Vec<[Point2<Real>; 3]> = prims
                .iter()
                .map(|t| corner_tris[*t as usize].map(|corner| uv_map[corner as usize]))
                .collect();
            paint::extract_node_pixels(images, &tile_numbers, &tri_verts, &tri_uvs)
        });

        for (leaf, mut pixels) in leaves.iter().zip(caches) {
            let node = &mut self.nodes[*leaf as usize];
            if let Some(previous) = &node.pixels {
                pixels.keep_dirty_state(previous);
            }
            node.pixels = Some(pixels);
            node.flags.remove(PbvhNodeFlags::REBUILD_PIXELS);
        }

        leaves.len()
    }

    /// The pixel cache state of a leaf.
    pub fn pixel_cache_state(&self, node: u32) -> PixelCacheState {
        let node = self.leaf(node);
        if node.flags.contains(PbvhNodeFlags::REBUILD_PIXELS) {
            PixelCacheState::Dirty
        } else if node.pixels.is_some() {
            PixelCacheState::Built
        } else {
            PixelCacheState::NoCache
        }
    }

    /// Mutable access to the pixel cache of a leaf, for paint brushes.
    pub fn node_pixels_mut(&mut self, node: u32) -> Option<&mut NodePixels> {
        let _ = self.leaf(node);
        self.nodes[node as usize].pixels.as_mut()
    }

    /// Marks a painted region of a leaf inside an image tile, or all its rows in that tile when
    /// `region` is `None`.
    ///
    /// Returns `false` if the leaf has no cached pixels in this tile.
    pub fn mark_pixels_dirty(
        &mut self,
        node: u32,
        tile_number: u32,
        region: Option<PixelRect>,
    ) -> bool {
        match self
            .node_pixels_mut(node)
            .and_then(|pixels| pixels.tile_mut(tile_number))
        {
            Some(tile) => {
                tile.mark_dirty(region);
                true
            }
            None => false,
        }
    }

    /// Hands the painted region of every image tile to `f`, then clears the redraw state.
    ///
    /// Regions of a same tile are merged across leaves. Tiles are reported in increasing tile
    /// number order.
    pub fn flush_dirty_pixels(&mut self, mut f: impl FnMut(u32, PixelRect)) {
        let mut regions: BTreeMap<u32, PixelRect> = BTreeMap::new();

        for node in &mut self.nodes {
            let Some(pixels) = &mut node.pixels else {
                continue;
            };
            for tile in pixels.tiles_mut() {
                if let Some(region) = tile.take_dirty_region() {
                    let _ = regions
                        .entry(tile.tile_number)
                        .and_modify(|r| *r = r.merged(&region))
                        .or_insert(region);
                }
            }
        }

        for (tile_number, region) in regions {
            f(tile_number, region);
        }
    }

    /// Frees the pixel cache of every leaf, back to [`PixelCacheState::NoCache`].
    pub fn free_pixels(&mut self) {
        for node in &mut self.nodes {
            node.pixels = None;
            node.flags.remove(PbvhNodeFlags::REBUILD_PIXELS);
        }
    }
}
