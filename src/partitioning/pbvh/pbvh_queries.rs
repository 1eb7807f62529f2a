use ordered_float::OrderedFloat;

use crate::bounding_volume::{test_frustum_aabb, FrustumPlanes, PlaneAabbIsect};
use crate::math::{Point, Real, Vector};
use crate::partitioning::pbvh::{Pbvh, PbvhNode, PbvhSource};
use crate::query::{
    ray_face_intersection_quad, ray_face_intersection_tri, ray_face_nearest_quad,
    ray_face_nearest_tri, Ray,
};
use crate::shape::{DynMesh, GridCoord, Mesh, SubdivGrids, VertHandle};

/// A vertex of the source geometry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PbvhVertRef {
    /// A mesh vertex index.
    Mesh(u32),
    /// A grid vertex.
    Grids(GridCoord),
    /// A dyntopo vertex.
    DynTopo(VertHandle),
}

/// The primitive of a leaf hit by a ray.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PbvhPrimHit {
    /// The triangle index in mesh mode, the grid index in grids mode, or the face handle
    /// index in dyntopo mode.
    pub primitive: u32,
    /// The corner of the hit primitive closest to the hit point.
    pub active_vertex: PbvhVertRef,
    /// The unit normal of the hit triangle or quad.
    pub face_normal: Vector<Real>,
}

/// The closest primitive hit by a ray, see [`Pbvh::raycast_closest`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PbvhRayHit {
    /// The leaf containing the hit primitive.
    pub node: u32,
    /// The ray parameter of the hit.
    pub depth: Real,
    /// The hit primitive.
    pub hit: PbvhPrimHit,
}

/// The primitive passing closest to a ray, see [`Pbvh::nearest_to_ray`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PbvhNearestHit {
    /// The leaf containing the primitive.
    pub node: u32,
    /// The ray parameter of the point of the ray closest to the primitive.
    pub depth: Real,
    /// The squared distance between the primitive and the ray.
    pub dist_sq: Real,
}

fn nearest_corner<const N: usize>(corners: &[Point<Real>; N], pt: &Point<Real>) -> usize {
    (0..N)
        .min_by_key(|i| OrderedFloat(na::distance_squared(&corners[*i], pt)))
        .unwrap_or(0)
}

fn triangle_normal(co: &[Point<Real>; 3]) -> Vector<Real> {
    (co[1] - co[0])
        .cross(&(co[2] - co[0]))
        .try_normalize(0.0)
        .unwrap_or_else(Vector::zeros)
}

fn quad_normal(co: &[Point<Real>; 4]) -> Vector<Real> {
    (co[0] - co[2])
        .cross(&(co[1] - co[3]))
        .try_normalize(0.0)
        .unwrap_or_else(Vector::zeros)
}

/// Is the frustum at least partially containing the node box?
pub fn node_frustum_contain_aabb(node: &PbvhNode, planes: &FrustumPlanes) -> bool {
    test_frustum_aabb(node.aabb(), planes) != PlaneAabbIsect::Outside
}

/// Is the node box at least partially outside of the frustum?
pub fn node_frustum_exclude_aabb(node: &PbvhNode, planes: &FrustumPlanes) -> bool {
    test_frustum_aabb(node.aabb(), planes) != PlaneAabbIsect::Inside
}

impl Pbvh {
    /// The leaves whose box intersects the frustum, sorted in increasing order.
    pub fn search_frustum(&self, planes: &FrustumPlanes) -> Vec<u32> {
        self.search_nodes(|node| node_frustum_contain_aabb(node, planes))
    }

    /// The closest visible primitive along `ray`.
    ///
    /// With `use_original` the leaves are culled with their original boxes, but primitives
    /// are always tested at their current positions.
    pub fn raycast_closest<'a>(
        &self,
        source: impl Into<PbvhSource<'a>>,
        ray: &Ray,
        use_original: bool,
    ) -> Option<PbvhRayHit> {
        let source = source.into();
        self.assert_source(&source);

        let mut result = None;
        self.raycast(ray, use_original, |node, depth| {
            if let Some(hit) = self.node_raycast(source, node, ray, depth) {
                result = Some(PbvhRayHit {
                    node,
                    depth: *depth,
                    hit,
                });
            }
        });
        result
    }

    /// Intersects `ray` with the visible primitives of a leaf.
    ///
    /// Returns the hit primitive, and lowers `depth`, only for hits strictly closer than `depth`.
    pub fn node_raycast(
        &self,
        source: PbvhSource,
        node: u32,
        ray: &Ray,
        depth: &mut Real,
    ) -> Option<PbvhPrimHit> {
        match source {
            PbvhSource::Mesh(mesh) => self.raycast_mesh_node(mesh, node, ray, depth),
            PbvhSource::Grids(grids) => self.raycast_grids_node(grids, node, ray, depth),
            PbvhSource::DynTopo(mesh) => self.raycast_dyntopo_node(mesh, node, ray, depth),
        }
    }

    fn raycast_mesh_node(
        &self,
        mesh: &Mesh,
        node: u32,
        ray: &Ray,
        depth: &mut Real,
    ) -> Option<PbvhPrimHit> {
        let hide_face = mesh.hide_face();
        let mut result = None;

        for tri in self.node_prims(node) {
            let t = *tri as usize;
            if hide_face.is_some_and(|hidden| hidden[mesh.tri_faces()[t] as usize]) {
                continue;
            }

            let co = mesh.tri_positions(t);
            if ray_face_intersection_tri(ray, &co[0], &co[1], &co[2], depth) {
                let corner = nearest_corner(&co, &ray.point_at(*depth));
                result = Some(PbvhPrimHit {
                    primitive: *tri,
                    active_vertex: PbvhVertRef::Mesh(mesh.tri_verts(t)[corner]),
                    face_normal: triangle_normal(&co),
                });
            }
        }

        result
    }

    fn raycast_grids_node(
        &self,
        grids: &SubdivGrids,
        node: u32,
        ray: &Ray,
        depth: &mut Real,
    ) -> Option<PbvhPrimHit> {
        let grid_size = grids.grid_size();
        let positions = grids.positions();
        let mut result = None;

        for grid in self.node_grids(node) {
            let g = *grid as usize;
            let base = grids.grid_range(g).start;

            for y in 0..grid_size - 1 {
                for x in 0..grid_size - 1 {
                    if grids.is_grid_face_hidden(g, x, y) {
                        continue;
                    }

                    let corners = [(x, y + 1), (x + 1, y + 1), (x + 1, y), (x, y)];
                    let co = corners.map(|(x, y)| positions[base + grids.xy_to_index(x, y)]);

                    if ray_face_intersection_quad(ray, &co[0], &co[1], &co[2], &co[3], depth) {
                        let (cx, cy) = corners[nearest_corner(&co, &ray.point_at(*depth))];
                        result = Some(PbvhPrimHit {
                            primitive: *grid,
                            active_vertex: PbvhVertRef::Grids(GridCoord {
                                grid: *grid,
                                x: cx as u16,
                                y: cy as u16,
                            }),
                            face_normal: quad_normal(&co),
                        });
                    }
                }
            }
        }

        result
    }

    fn raycast_dyntopo_node(
        &self,
        mesh: &DynMesh,
        node: u32,
        ray: &Ray,
        depth: &mut Real,
    ) -> Option<PbvhPrimHit> {
        let mut result = None;

        for face in self.node_dyntopo_faces(node) {
            let Some(verts) = mesh.face(*face).map(|f| f.verts()) else {
                continue;
            };
            if verts
                .iter()
                .any(|v| mesh.vert(*v).is_some_and(|v| v.hidden))
            {
                continue;
            }

            let co = mesh.face_positions(*face);
            if ray_face_intersection_tri(ray, &co[0], &co[1], &co[2], depth) {
                let corner = nearest_corner(&co, &ray.point_at(*depth));
                result = Some(PbvhPrimHit {
                    primitive: face.0,
                    active_vertex: PbvhVertRef::DynTopo(verts[corner]),
                    face_normal: triangle_normal(&co),
                });
            }
        }

        result
    }

    /// The visible primitive passing closest to `ray`.
    ///
    /// The ray is normalized first, so depths are distances along the ray. Ties are won by the
    /// first primitive found.
    pub fn nearest_to_ray<'a>(
        &self,
        source: impl Into<PbvhSource<'a>>,
        ray: &Ray,
        use_original: bool,
    ) -> Option<PbvhNearestHit> {
        let source = source.into();
        self.assert_source(&source);

        let ray = ray.normalized();
        let mut result = None;
        self.find_nearest_to_ray(&ray, use_original, |node, dist_sq| {
            let mut depth = 0.0;
            if self.node_nearest_to_ray(source, node, &ray, &mut depth, dist_sq) {
                result = Some(PbvhNearestHit {
                    node,
                    depth,
                    dist_sq: *dist_sq,
                });
            }
        });
        result
    }

    /// Finds the visible primitive of a leaf passing closest to `ray`.
    ///
    /// Returns `true`, and updates `depth` and `dist_sq`, only if a primitive passes strictly
    /// closer than `dist_sq`.
    pub fn node_nearest_to_ray(
        &self,
        source: PbvhSource,
        node: u32,
        ray: &Ray,
        depth: &mut Real,
        dist_sq: &mut Real,
    ) -> bool {
        let mut hit = false;

        match source {
            PbvhSource::Mesh(mesh) => {
                let hide_face = mesh.hide_face();
                for tri in self.node_prims(node) {
                    let t = *tri as usize;
                    if hide_face.is_some_and(|hidden| hidden[mesh.tri_faces()[t] as usize]) {
                        continue;
                    }
                    let co = mesh.tri_positions(t);
                    hit |= ray_face_nearest_tri(ray, &co[0], &co[1], &co[2], depth, dist_sq);
                }
            }
            PbvhSource::Grids(grids) => {
                let grid_size = grids.grid_size();
                let positions = grids.positions();
                for grid in self.node_grids(node) {
                    let g = *grid as usize;
                    let base = grids.grid_range(g).start;
                    for y in 0..grid_size - 1 {
                        for x in 0..grid_size - 1 {
                            if grids.is_grid_face_hidden(g, x, y) {
                                continue;
                            }
                            let co = [(x, y), (x + 1, y), (x + 1, y + 1), (x, y + 1)]
                                .map(|(x, y)| positions[base + grids.xy_to_index(x, y)]);
                            hit |= ray_face_nearest_quad(
                                ray, &co[0], &co[1], &co[2], &co[3], depth, dist_sq,
                            );
                        }
                    }
                }
            }
            PbvhSource::DynTopo(mesh) => {
                for face in self.node_dyntopo_faces(node) {
                    let Some(verts) = mesh.face(*face).map(|f| f.verts()) else {
                        continue;
                    };
                    if verts
                        .iter()
                        .any(|v| mesh.vert(*v).is_some_and(|v| v.hidden))
                    {
                        continue;
                    }
                    let co = mesh.face_positions(*face);
                    hit |= ray_face_nearest_tri(ray, &co[0], &co[1], &co[2], depth, dist_sq);
                }
            }
        }

        hit
    }
}
