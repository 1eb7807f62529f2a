#[macro_use]
extern crate approx;

use pbvh3d::math::{Point, Real};
use pbvh3d::shape::Mesh;

mod dyntopo_edits;
mod grids_build;
mod mesh_build;
mod pixel_cache;
mod ray_queries;
mod vertex_colors;

/// The positions and triangles of a `n * n` quad grid on the `z = 0` plane, with vertices
/// randomly moved inside of their cell.
pub fn jittered_grid(n: usize, rng: &mut oorandom::Rand32) -> (Vec<Point<Real>>, Vec<[u32; 3]>) {
    let mut positions = vec![];
    for y in 0..=n {
        for x in 0..=n {
            let jitter_x = (rng.rand_float() - 0.5) * 0.4;
            let jitter_y = (rng.rand_float() - 0.5) * 0.4;
            positions.push(Point::new(
                x as Real + jitter_x,
                y as Real + jitter_y,
                rng.rand_float() * 0.1,
            ));
        }
    }

    let row = n as u32 + 1;
    let mut triangles = vec![];
    for y in 0..n as u32 {
        for x in 0..n as u32 {
            let a = y * row + x;
            let (b, c, d) = (a + 1, a + row + 1, a + row);
            triangles.push([a, b, c]);
            triangles.push([a, c, d]);
        }
    }

    (positions, triangles)
}

/// A [`jittered_grid`] mesh.
pub fn jittered_mesh(n: usize, seed: u64) -> Mesh {
    let mut rng = oorandom::Rand32::new(seed);
    let (positions, triangles) = jittered_grid(n, &mut rng);
    Mesh::from_triangles(positions, &triangles).unwrap()
}
