use pbvh3d::bounding_volume::{Aabb, BoundingVolume};
use pbvh3d::math::Vector;
use pbvh3d::partitioning::{Pbvh, PbvhBuildOptions, PbvhNodeFlags};

use crate::jittered_mesh;

#[test]
fn leaves_partition_triangles_and_vertices() {
    for seed in 0..4 {
        let mesh = jittered_mesh(12, seed);

        for leaf_limit in [1, 7, 50, 10_000] {
            let options = PbvhBuildOptions::default().with_leaf_limit(leaf_limit);
            let pbvh = Pbvh::from_mesh(&mesh, options);
            pbvh.assert_well_formed(&mesh);
            assert_eq!(pbvh.totvert(), mesh.vertex_count());

            let mut unique_total = 0;
            let mut prim_total = 0;
            for leaf in pbvh.all_leaf_nodes() {
                let prims = pbvh.node_prims(leaf);
                if prims.len() > leaf_limit {
                    // Only triangles sharing a single centroid can't be split further.
                    let centers: Vec<_> = prims
                        .iter()
                        .map(|t| Aabb::from_points(mesh.tri_positions(*t as usize)).center())
                        .collect();
                    assert!(
                        centers.iter().all(|c| *c == centers[0]),
                        "leaf {} holds {} triangles with distinct centroids",
                        leaf,
                        prims.len()
                    );
                }
                prim_total += prims.len();
                unique_total += pbvh.node_unique_verts(leaf).len();

                let unique = pbvh.node_unique_verts(leaf);
                let shared = pbvh.node_shared_verts(leaf);
                assert!(unique.windows(2).all(|w| w[0] < w[1]));
                assert!(shared.windows(2).all(|w| w[0] < w[1]));
                assert!(unique.iter().all(|v| shared.binary_search(v).is_err()));
            }

            assert_eq!(prim_total, mesh.triangle_count());
            assert_eq!(unique_total, mesh.vertex_count());
        }
    }
}

#[test]
fn builds_are_deterministic() {
    let mesh = jittered_mesh(16, 7);
    let options = PbvhBuildOptions::default().with_leaf_limit(9);
    let a = Pbvh::from_mesh(&mesh, options);
    let b = Pbvh::from_mesh(&mesh, options);

    assert_eq!(a.node_count(), b.node_count());
    for leaf in a.all_leaf_nodes() {
        assert_eq!(a.node_prims(leaf), b.node_prims(leaf));
        assert_eq!(a.node_verts(leaf), b.node_verts(leaf));
        assert_eq!(a.node(leaf).aabb(), b.node(leaf).aabb());
    }
}

#[test]
fn boxes_stay_conservative_after_random_moves() {
    let mut mesh = jittered_mesh(10, 3);
    let mut pbvh = Pbvh::from_mesh(&mesh, PbvhBuildOptions::default().with_leaf_limit(6));
    let mut rng = oorandom::Rand32::new(11);

    for _ in 0..20 {
        let mut moved = vec![];
        for _ in 0..5 {
            let v = rng.rand_range(0..mesh.vertex_count() as u32);
            let offset = Vector::new(
                rng.rand_float() - 0.5,
                rng.rand_float() - 0.5,
                rng.rand_float() * 2.0 - 1.0,
            );
            mesh.positions_mut()[v as usize] += offset;
            moved.push(v);
        }

        let touched: Vec<u32> = pbvh
            .all_leaf_nodes()
            .into_iter()
            .filter(|leaf| pbvh.node_verts(*leaf).iter().any(|v| moved.contains(v)))
            .collect();
        pbvh.tag_positions_changed(&touched);
        pbvh.update_bounds(&mesh);
        pbvh.assert_well_formed(&mesh);

        for leaf in pbvh.all_leaf_nodes() {
            let node = pbvh.node(leaf);
            assert!(!node.flags().contains(PbvhNodeFlags::UPDATE_BB));
            for v in pbvh.node_verts(leaf) {
                assert!(node.aabb().contains_local_point(&mesh.positions()[*v as usize]));
            }
            assert!(pbvh.bounds().contains(node.aabb()));
        }
    }
}
