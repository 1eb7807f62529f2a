use pbvh3d::bounding_volume::BoundingVolume;
use pbvh3d::math::{Point, Real, Vector};
use pbvh3d::partitioning::{Pbvh, PbvhBuildOptions, PbvhVertRef};
use pbvh3d::query::Ray;
use pbvh3d::shape::{GridCoord, Mesh, SubdivGrids};

const GRID_SIZE: usize = 5;

/// Grids over a `n * n` quad base mesh, each grid covering one quarter of its base face.
fn quad_grids(n: usize) -> SubdivGrids {
    let row = n as u32 + 1;
    let base_positions: Vec<_> = (0..=n)
        .flat_map(|y| (0..=n).map(move |x| Point::new(x as Real, y as Real, 0.0)))
        .collect();
    let faces: Vec<[u32; 4]> = (0..n as u32)
        .flat_map(|y| {
            (0..n as u32).map(move |x| {
                let a = y * row + x;
                [a, a + 1, a + row + 1, a + row]
            })
        })
        .collect();
    let base = Mesh::new(base_positions, &faces).unwrap();

    let corner_offsets = [(0.0, 0.0), (0.5, 0.0), (0.5, 0.5), (0.0, 0.5)];
    let step = 0.5 / (GRID_SIZE - 1) as Real;
    let mut positions = vec![];
    for face in 0..faces.len() {
        let origin = Vector::new((face % n) as Real, (face / n) as Real, 0.0);
        for (ox, oy) in corner_offsets {
            for y in 0..GRID_SIZE {
                for x in 0..GRID_SIZE {
                    positions.push(
                        Point::new(ox + x as Real * step, oy + y as Real * step, 0.0) + origin,
                    );
                }
            }
        }
    }

    SubdivGrids::from_base_mesh(&base, GRID_SIZE, positions).unwrap()
}

#[test]
fn leaves_hold_whole_base_faces() {
    let grids = quad_grids(6);
    let grid_area = GRID_SIZE * GRID_SIZE;

    for faces_per_leaf in [1, 3, 8] {
        let options = PbvhBuildOptions::default().with_grid_base_limit(faces_per_leaf * grid_area);
        let pbvh = Pbvh::from_grids(&grids, options);
        pbvh.assert_well_formed(&grids);
        assert_eq!(pbvh.leaf_limit(), faces_per_leaf);
        assert_eq!(pbvh.totvert(), grids.positions().len());

        for leaf in pbvh.all_leaf_nodes() {
            let leaf_grids = pbvh.node_grids(leaf);
            assert_eq!(leaf_grids.len() % 4, 0);
            assert!(leaf_grids.len() / 4 <= faces_per_leaf);
            for face_grids in leaf_grids.chunks(4) {
                let first = face_grids[0];
                assert_eq!(first % 4, 0);
                assert_eq!(face_grids, [first, first + 1, first + 2, first + 3]);
            }

            let aabb = pbvh.node(leaf).aabb();
            for range in pbvh.node_grid_vert_ranges(&grids, leaf) {
                for pt in &grids.positions()[range] {
                    assert!(aabb.contains_local_point(pt));
                }
            }
        }
    }
}

#[test]
fn grid_raycast_hits_the_expected_grid_vertex() {
    let grids = quad_grids(4);
    let pbvh = Pbvh::from_grids(&grids, PbvhBuildOptions::default().with_grid_base_limit(50));
    let step = 0.5 / (GRID_SIZE - 1) as Real;

    // Base face 5 is at (1, 1); its third grid covers [1.5, 2] x [1.5, 2].
    let target = Point::new(1.5 + step * 1.1, 1.5 + step * 2.9, 0.0);
    let ray = Ray::new(target + Vector::z(), -Vector::z());
    let hit = pbvh.raycast_closest(&grids, &ray, false).unwrap();

    assert_eq!(hit.hit.primitive, 5 * 4 + 2);
    assert_relative_eq!(hit.depth, 1.0, epsilon = 1.0e-5);
    assert_eq!(
        hit.hit.active_vertex,
        PbvhVertRef::Grids(GridCoord {
            grid: 22,
            x: 1,
            y: 3
        })
    );
    assert_relative_eq!(hit.hit.face_normal.z.abs(), 1.0, epsilon = 1.0e-5);
    assert!(pbvh.node_grids(hit.node).contains(&22));
}

#[test]
fn hiding_every_grid_element_hides_the_leaves() {
    let mut grids = quad_grids(3);
    let hidden = vec![true; grids.positions().len()];
    grids.set_grid_hidden(hidden).unwrap();

    let pbvh = Pbvh::from_grids(&grids, PbvhBuildOptions::default().with_grid_base_limit(25));
    assert!(pbvh
        .all_leaf_nodes()
        .into_iter()
        .all(|leaf| pbvh.node(leaf).is_fully_hidden()));

    let ray = Ray::new(Point::new(1.3, 1.3, 1.0), -Vector::z());
    assert!(pbvh.raycast_closest(&grids, &ray, false).is_none());
    assert!(pbvh.nearest_to_ray(&grids, &ray, false).is_none());
}
