use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};

use pbvh3d::math::{Point2, Real};
use pbvh3d::paint::{ImageTileSource, PixelCacheState, PixelRect, TileResolution};
use pbvh3d::partitioning::{Pbvh, PbvhBuildOptions};
use pbvh3d::shape::Mesh;

use crate::jittered_mesh;

const N: usize = 10;
const RESOLUTION: u32 = 32;

struct TiledImage {
    tiles: Vec<u32>,
    unavailable: Vec<u32>,
    live: AtomicI32,
    acquisitions: AtomicUsize,
}

impl TiledImage {
    fn new(tiles: Vec<u32>, unavailable: Vec<u32>) -> Self {
        Self {
            tiles,
            unavailable,
            live: AtomicI32::new(0),
            acquisitions: AtomicUsize::new(0),
        }
    }
}

impl ImageTileSource for TiledImage {
    fn tiles(&self) -> Vec<u32> {
        self.tiles.clone()
    }

    fn acquire(&self, tile_number: u32) -> Option<TileResolution> {
        if self.unavailable.contains(&tile_number) {
            return None;
        }
        let _ = self.live.fetch_add(1, Ordering::SeqCst);
        let _ = self.acquisitions.fetch_add(1, Ordering::SeqCst);
        Some(TileResolution::new(RESOLUTION, RESOLUTION))
    }

    fn release(&self, _: u32) {
        let _ = self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A jittered mesh whose UV layout spreads over the tiles 1001 and 1002.
fn two_tile_mesh(seed: u64) -> Mesh {
    let mut mesh = jittered_mesh(N, seed);
    let uvs: Vec<_> = mesh
        .corner_verts()
        .iter()
        .map(|v| {
            let p = mesh.positions()[*v as usize];
            Point2::new(p.x / N as Real * 2.0, p.y / N as Real)
        })
        .collect();
    mesh.set_uv_map(uvs).unwrap();
    mesh
}

fn prepared_pbvh(mesh: &Mesh) -> Pbvh {
    let mut pbvh = Pbvh::from_mesh(mesh, PbvhBuildOptions::default().with_leaf_limit(12));
    pbvh.mark_rebuild_pixels();
    pbvh
}

#[test]
fn pixels_are_covered_at_most_once() {
    let mesh = two_tile_mesh(21);
    let mut pbvh = prepared_pbvh(&mesh);
    let images = TiledImage::new(vec![1001, 1002], vec![]);

    let rebuilt = pbvh.rebuild_pixels(&mesh, &images);
    assert_eq!(rebuilt, pbvh.leaf_count());
    assert_eq!(images.live.load(Ordering::SeqCst), 0);

    let mut covered = HashSet::new();
    let mut tiles_seen = HashSet::new();
    for leaf in pbvh.all_leaf_nodes() {
        assert_eq!(pbvh.pixel_cache_state(leaf), PixelCacheState::Built);
        let pixels = pbvh.node(leaf).pixels().unwrap();
        assert_eq!(pixels.triangles().len(), pbvh.node_prims(leaf).len());

        for tile in pixels.tiles() {
            let _ = tiles_seen.insert(tile.tile_number);
            for row in &tile.rows {
                let triangle = &pixels.triangles()[row.triangle as usize];
                for (x, barycentric) in row.pixels(triangle.delta_barycentric_x) {
                    assert!(x < RESOLUTION && row.y < RESOLUTION);
                    assert!(
                        covered.insert((tile.tile_number, x, row.y)),
                        "pixel ({}, {}) of tile {} is covered twice",
                        x,
                        row.y,
                        tile.tile_number
                    );
                    let eps = 1.0e-4;
                    assert!(barycentric.x >= -eps && barycentric.y >= -eps);
                    assert!(barycentric.x + barycentric.y <= 1.0 + eps);
                }
            }
        }
    }

    assert_eq!(tiles_seen, HashSet::from([1001, 1002]));
    // Most of both tiles lies inside the jittered layout.
    assert!(covered.len() > (RESOLUTION * RESOLUTION) as usize);
}

#[test]
fn rebuilding_twice_gives_the_same_cache() {
    let mesh = two_tile_mesh(4);
    let mut pbvh = prepared_pbvh(&mesh);
    let images = TiledImage::new(vec![1001, 1002], vec![]);

    let _ = pbvh.rebuild_pixels(&mesh, &images);
    let first: Vec<_> = pbvh
        .all_leaf_nodes()
        .into_iter()
        .map(|leaf| pbvh.node(leaf).pixels().cloned())
        .collect();

    assert_eq!(pbvh.rebuild_pixels(&mesh, &images), 0);

    pbvh.mark_rebuild_pixels();
    assert!(pbvh
        .all_leaf_nodes()
        .into_iter()
        .all(|leaf| pbvh.pixel_cache_state(leaf) == PixelCacheState::Dirty));
    let _ = pbvh.rebuild_pixels(&mesh, &images);
    let second: Vec<_> = pbvh
        .all_leaf_nodes()
        .into_iter()
        .map(|leaf| pbvh.node(leaf).pixels().cloned())
        .collect();

    assert_eq!(first, second);
}

#[test]
fn unavailable_tiles_are_skipped() {
    let mesh = two_tile_mesh(13);
    let mut pbvh = prepared_pbvh(&mesh);
    let images = TiledImage::new(vec![1001, 1002], vec![1002]);

    let _ = pbvh.rebuild_pixels(&mesh, &images);
    assert_eq!(images.live.load(Ordering::SeqCst), 0);
    assert_eq!(images.acquisitions.load(Ordering::SeqCst), pbvh.leaf_count());

    for leaf in pbvh.all_leaf_nodes() {
        let pixels = pbvh.node(leaf).pixels().unwrap();
        assert!(pixels.tile(1002).is_none());
        assert!(pixels.tiles().iter().all(|t| t.tile_number == 1001));
    }
}

#[test]
fn painted_regions_are_merged_per_tile() {
    let mesh = two_tile_mesh(30);
    let mut pbvh = prepared_pbvh(&mesh);
    let images = TiledImage::new(vec![1001, 1002], vec![]);
    let _ = pbvh.rebuild_pixels(&mesh, &images);

    let mut expected = BTreeMap::new();
    for leaf in pbvh.all_leaf_nodes() {
        let tiles: Vec<_> = pbvh
            .node(leaf)
            .pixels()
            .unwrap()
            .tiles()
            .iter()
            .map(|t| (t.tile_number, t.rows_bounds().unwrap()))
            .collect();
        for (tile_number, bounds) in tiles {
            assert!(pbvh.mark_pixels_dirty(leaf, tile_number, None));
            let _ = expected
                .entry(tile_number)
                .and_modify(|r: &mut PixelRect| *r = r.merged(&bounds))
                .or_insert(bounds);
        }
    }

    let mut flushed = vec![];
    pbvh.flush_dirty_pixels(|tile, region| flushed.push((tile, region)));
    assert_eq!(flushed, expected.into_iter().collect::<Vec<_>>());

    let mut again = 0;
    pbvh.flush_dirty_pixels(|_, _| again += 1);
    assert_eq!(again, 0);
}
