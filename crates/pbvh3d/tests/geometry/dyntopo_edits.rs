use pbvh3d::math::Point;
use pbvh3d::partitioning::{Pbvh, PbvhBuildOptions, PbvhNodeFlags};
use pbvh3d::shape::{DynMesh, FaceHandle};

use crate::jittered_grid;

const LEAF_LIMIT: usize = 16;

fn random_face(mesh: &DynMesh, rng: &mut oorandom::Rand32) -> FaceHandle {
    let k = rng.rand_range(0..mesh.face_count() as u32) as usize;
    mesh.faces().nth(k).unwrap()
}

/// Replaces a face by three triangles fanned around its center.
fn subdivide_face(pbvh: &mut Pbvh, mesh: &mut DynMesh, face: FaceHandle) {
    let [a, b, c] = mesh.face(face).unwrap().verts();
    let co = mesh.face_positions(face);
    let center = Point::from((co[0].coords + co[1].coords + co[2].coords) / 3.0);

    let node = pbvh.dyntopo_remove_face(mesh, face).unwrap();
    let _ = mesh.remove_face(face).unwrap();

    let m = mesh.add_vert(center);
    for verts in [[a, b, m], [b, c, m], [c, a, m]] {
        let new_face = mesh.add_face(verts).unwrap();
        pbvh.dyntopo_add_face(mesh, node, new_face);
    }
}

fn assert_tree_matches_mesh(pbvh: &Pbvh, mesh: &DynMesh) {
    pbvh.assert_well_formed(mesh);

    for leaf in pbvh.all_leaf_nodes() {
        let node = pbvh.node(leaf);
        assert!(!node.flags().contains(PbvhNodeFlags::UPDATE_TOPOLOGY));
        assert!(!node.flags().contains(PbvhNodeFlags::UPDATE_BB));
        assert!(node.prim_count() <= LEAF_LIMIT);

        for face in pbvh.node_dyntopo_faces(leaf) {
            for pt in mesh.face_positions(*face) {
                assert!(node.aabb().contains_local_point(&pt));
            }
        }
    }
}

#[test]
fn random_subdivisions_keep_the_tree_valid() {
    let mut rng = oorandom::Rand32::new(1234);
    let (positions, triangles) = jittered_grid(6, &mut rng);
    let mut mesh = DynMesh::from_triangles(&positions, &triangles).unwrap();
    let options = PbvhBuildOptions::default().with_leaf_limit(LEAF_LIMIT);
    let mut pbvh = Pbvh::from_dyntopo(&mesh, options);
    pbvh.assert_well_formed(&mesh);

    let initial_leaves = pbvh.leaf_count();
    let mut generation = pbvh.generation();

    for _ in 0..15 {
        for _ in 0..20 {
            let face = random_face(&mesh, &mut rng);
            subdivide_face(&mut pbvh, &mut mesh, face);
        }

        if pbvh.dyntopo_update_topology(&mesh) {
            assert_ne!(pbvh.generation(), generation);
            generation = pbvh.generation();
        }
        assert_tree_matches_mesh(&pbvh, &mesh);
    }

    assert_eq!(mesh.face_count(), triangles.len() + 15 * 20 * 2);
    assert!(pbvh.leaf_count() > initial_leaves);
}

#[test]
fn random_removals_join_leaves_back() {
    let mut rng = oorandom::Rand32::new(99);
    let (positions, triangles) = jittered_grid(8, &mut rng);
    let mut mesh = DynMesh::from_triangles(&positions, &triangles).unwrap();
    let options = PbvhBuildOptions::default().with_leaf_limit(LEAF_LIMIT);
    let mut pbvh = Pbvh::from_dyntopo(&mesh, options);
    let initial_leaves = pbvh.leaf_count();

    while mesh.face_count() > 4 {
        for _ in 0..10 {
            if mesh.face_count() <= 4 {
                break;
            }
            let face = random_face(&mesh, &mut rng);
            let _ = pbvh.dyntopo_remove_face(&mesh, face).unwrap();
            let _ = mesh.remove_face(face).unwrap();
            assert_eq!(pbvh.dyntopo_face_node(face), None);
        }

        let _ = pbvh.dyntopo_update_topology(&mesh);
        assert_tree_matches_mesh(&pbvh, &mesh);
    }

    assert!(pbvh.leaf_count() < initial_leaves);

    // Every vertex still used by a face is owned by the leaf of one of its faces.
    for vert in mesh.verts() {
        let faces = mesh.vert(vert).unwrap().faces();
        match pbvh.dyntopo_vert_node(vert) {
            Some(owner) => assert!(faces
                .iter()
                .any(|f| pbvh.dyntopo_face_node(*f) == Some(owner))),
            None => assert!(faces.is_empty()),
        }
    }
}

#[test]
fn moved_dyntopo_vertices_refresh_the_leaf_boxes() {
    let mut rng = oorandom::Rand32::new(5);
    let (positions, triangles) = jittered_grid(5, &mut rng);
    let mut mesh = DynMesh::from_triangles(&positions, &triangles).unwrap();
    let mut pbvh = Pbvh::from_dyntopo(&mesh, PbvhBuildOptions::default().with_leaf_limit(8));

    let verts: Vec<_> = mesh.verts().collect();
    for vert in &verts {
        mesh.vert_mut(*vert).unwrap().position.z += rng.rand_float() * 3.0;
    }

    let leaves = pbvh.all_leaf_nodes();
    pbvh.tag_positions_changed(&leaves);
    pbvh.update_bounds(&mesh);
    assert_tree_matches_mesh(&pbvh, &mesh);
}
