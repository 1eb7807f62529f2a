use pbvh3d::math::{Point, Real, Vector};
use pbvh3d::partitioning::{Pbvh, PbvhBuildOptions, PbvhVertRef};
use pbvh3d::query::{ray_face_intersection_tri, ray_face_nearest_tri, Ray};
use pbvh3d::shape::Mesh;

use crate::jittered_mesh;

fn random_down_ray(rng: &mut oorandom::Rand32, extent: Real) -> Ray {
    let origin = Point::new(
        rng.rand_float() * extent,
        rng.rand_float() * extent,
        2.0 + rng.rand_float(),
    );
    let dir = Vector::new(
        (rng.rand_float() - 0.5) * 0.5,
        (rng.rand_float() - 0.5) * 0.5,
        -1.0,
    );
    Ray::new(origin, dir)
}

fn brute_force_raycast(mesh: &Mesh, ray: &Ray) -> Option<(u32, Real)> {
    let mut depth = Real::MAX;
    let mut best = None;
    for t in 0..mesh.triangle_count() {
        let co = mesh.tri_positions(t);
        if ray_face_intersection_tri(ray, &co[0], &co[1], &co[2], &mut depth) {
            best = Some((t as u32, depth));
        }
    }
    best
}

#[test]
fn raycast_matches_brute_force() {
    let mesh = jittered_mesh(16, 42);
    let mut rng = oorandom::Rand32::new(5);

    for leaf_limit in [1, 10, 64] {
        let pbvh = Pbvh::from_mesh(&mesh, PbvhBuildOptions::default().with_leaf_limit(leaf_limit));

        for _ in 0..200 {
            let ray = random_down_ray(&mut rng, 16.0);
            let expected = brute_force_raycast(&mesh, &ray);
            let hit = pbvh.raycast_closest(&mesh, &ray, false);

            match (expected, hit) {
                (None, None) => {}
                (Some((tri, depth)), Some(hit)) => {
                    assert_eq!(hit.hit.primitive, tri);
                    assert_eq!(hit.depth, depth);
                    assert!(pbvh.node_prims(hit.node).contains(&tri));

                    let PbvhVertRef::Mesh(v) = hit.hit.active_vertex else {
                        panic!("unexpected vertex reference {:?}", hit.hit.active_vertex);
                    };
                    assert!(mesh.tri_verts(tri as usize).contains(&v));
                    assert_relative_eq!(hit.hit.face_normal.norm(), 1.0, epsilon = 1.0e-5);
                }
                (expected, hit) => panic!("brute force: {:?}, pbvh: {:?}", expected, hit),
            }
        }
    }
}

#[test]
fn rays_leaving_the_mesh_hit_nothing() {
    let mesh = jittered_mesh(6, 1);
    let pbvh = Pbvh::from_mesh(&mesh, PbvhBuildOptions::default().with_leaf_limit(4));

    let upward = Ray::new(Point::new(3.0, 3.0, 1.0), Vector::z());
    let beside = Ray::new(Point::new(-5.0, -5.0, 1.0), -Vector::z());
    assert!(pbvh.raycast_closest(&mesh, &upward, false).is_none());
    assert!(pbvh.raycast_closest(&mesh, &beside, false).is_none());
}

#[test]
fn nearest_to_ray_matches_brute_force() {
    let mesh = jittered_mesh(12, 9);
    let pbvh = Pbvh::from_mesh(&mesh, PbvhBuildOptions::default().with_leaf_limit(8));
    let mut rng = oorandom::Rand32::new(77);

    for _ in 0..100 {
        let ray = random_down_ray(&mut rng, 12.0).normalized();

        let mut expected = Real::MAX;
        let mut depth = 0.0;
        for t in 0..mesh.triangle_count() {
            let co = mesh.tri_positions(t);
            let _ = ray_face_nearest_tri(&ray, &co[0], &co[1], &co[2], &mut depth, &mut expected);
        }

        let hit = pbvh.nearest_to_ray(&mesh, &ray, false).unwrap();
        assert_relative_eq!(hit.dist_sq, expected, epsilon = 1.0e-5);
        assert!(hit.depth > 0.0);
    }
}
