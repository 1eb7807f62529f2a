use pbvh3d::math::{Color, Real};
use pbvh3d::paint::{AttrDomain, ColorData, ColorEncoding, ColorLayer};
use pbvh3d::partitioning::{Pbvh, PbvhBuildOptions};

use crate::jittered_mesh;

fn random_color(rng: &mut oorandom::Rand32) -> Color {
    Color::new(rng.rand_float(), rng.rand_float(), rng.rand_float(), rng.rand_float())
}

#[test]
fn colors_round_trip_on_every_layer_kind() {
    let mut rng = oorandom::Rand32::new(3);

    for domain in [AttrDomain::Point, AttrDomain::Corner] {
        for encoding in [ColorEncoding::ByteSrgb, ColorEncoding::LinearFloat] {
            let mut mesh = jittered_mesh(5, 2);
            let len = match domain {
                AttrDomain::Point => mesh.vertex_count(),
                AttrDomain::Corner => mesh.corner_verts().len(),
            };
            mesh.set_color_layer(ColorLayer::zeroed(domain, encoding, len))
                .unwrap();
            let vertex_count = mesh.vertex_count() as u32;
            let mut colors = mesh.color_accessor().unwrap();

            // Half a byte step in sRGB space, scaled by the largest slope of the sRGB decode
            // curve (about 2.28, reached at 1.0).
            let tolerance: Real = match encoding {
                ColorEncoding::ByteSrgb => 0.5 / 255.0 * 2.3,
                ColorEncoding::LinearFloat => 1.0e-6,
            };

            let expected: Vec<Color> = (0..vertex_count).map(|_| random_color(&mut rng)).collect();
            for (v, color) in expected.iter().enumerate() {
                colors.set(v as u32, color);
            }
            for (v, color) in expected.iter().enumerate() {
                assert_relative_eq!(colors.get(v as u32), *color, epsilon = tolerance);
            }
        }
    }
}

#[test]
fn corner_reads_average_the_vertex_corners() {
    let mut mesh = jittered_mesh(3, 8);
    let corner_count = mesh.corner_verts().len();
    let corner_verts = mesh.corner_verts().to_vec();

    // Corners of vertex 5 alternate between two colors.
    let red = [1.0, 0.0, 0.0, 1.0];
    let blue = [0.0, 0.0, 1.0, 1.0];
    let mut data = vec![[0.0; 4]; corner_count];
    let mut parity = false;
    let mut vert_corners = 0;
    for (corner, vert) in corner_verts.iter().enumerate() {
        if *vert == 5 {
            data[corner] = if parity { blue } else { red };
            parity = !parity;
            vert_corners += 1;
        }
    }
    assert_eq!(vert_corners % 2, 0);

    mesh.set_color_layer(ColorLayer::new(
        AttrDomain::Corner,
        ColorData::LinearFloat(data),
    ))
    .unwrap();
    let mut colors = mesh.color_accessor().unwrap();
    assert_eq!(colors.get(5), Color::new(0.5, 0.0, 0.5, 1.0));

    let green = Color::new(0.0, 1.0, 0.0, 1.0);
    colors.set(5, &green);
    assert_eq!(colors.get(5), green);

    let ColorData::LinearFloat(data) = mesh.color_layer().unwrap().data() else {
        unreachable!()
    };
    for (corner, vert) in corner_verts.iter().enumerate() {
        if *vert == 5 {
            assert_eq!(data[corner], [0.0, 1.0, 0.0, 1.0]);
        } else {
            assert_eq!(data[corner], [0.0; 4]);
        }
    }
}

#[test]
fn node_snapshots_match_the_layer() {
    let mut mesh = jittered_mesh(8, 4);
    let len = mesh.vertex_count();
    mesh.set_color_layer(ColorLayer::zeroed(
        AttrDomain::Point,
        ColorEncoding::LinearFloat,
        len,
    ))
    .unwrap();

    let mut pbvh = Pbvh::from_mesh(&mesh, PbvhBuildOptions::default().with_leaf_limit(16));
    let mut rng = oorandom::Rand32::new(19);
    let mut colors = mesh.color_accessor().unwrap();
    for v in 0..len as u32 {
        colors.set(v, &random_color(&mut rng));
    }

    for leaf in pbvh.all_leaf_nodes() {
        pbvh.store_node_colors(leaf, &colors);
        let verts = pbvh.node_verts(leaf).to_vec();
        let snapshot = pbvh.node_color_snapshot(leaf).unwrap();
        assert_eq!(snapshot.len(), verts.len());
        for (v, color) in verts.iter().zip(snapshot) {
            assert_eq!(colors.get(*v), *color);
        }

        let mut expected = vec![Color::zeros(); verts.len()];
        colors.store_colors_vertex(&verts, &mut expected);
        assert_eq!(snapshot, &expected[..]);
    }
}
