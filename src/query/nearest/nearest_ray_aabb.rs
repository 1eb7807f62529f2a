use arrayvec::ArrayVec;

use crate::bounding_volume::Aabb;
use crate::math::{Point, Real, DIM};
use crate::query::Ray;

impl Aabb {
    /// Squared distance between this box and the point `pt`.
    #[inline]
    pub fn distance_squared_to_local_point(&self, pt: &Point<Real>) -> Real {
        let mut result = 0.0;
        for i in 0..DIM {
            let d = if pt[i] < self.mins[i] {
                self.mins[i] - pt[i]
            } else if pt[i] > self.maxs[i] {
                pt[i] - self.maxs[i]
            } else {
                0.0
            };
            result += d * d;
        }
        result
    }

    /// Smallest squared distance between this box and the points of the ray.
    ///
    /// Returns the squared distance and the ray parameter at which it is reached. The distance is
    /// a piecewise quadratic function of the ray parameter, with breakpoints where the ray crosses
    /// one of the box slabs, so it is minimized exactly on each piece.
    pub fn distance_squared_to_ray(&self, ray: &Ray) -> (Real, Real) {
        let mut breaks = ArrayVec::<Real, 7>::new();
        breaks.push(0.0);

        for i in 0..DIM {
            if ray.dir[i] != 0.0 {
                for bound in [self.mins[i], self.maxs[i]] {
                    let t = (bound - ray.origin[i]) / ray.dir[i];
                    if t > 0.0 {
                        breaks.push(t);
                    }
                }
            }
        }

        breaks.sort_unstable_by(|a, b| a.total_cmp(b));

        let mut best_t = 0.0;
        let mut best_dist = self.distance_squared_to_local_point(&ray.origin);

        for (k, &lo) in breaks.iter().enumerate() {
            let hi = breaks.get(k + 1).copied().unwrap_or(Real::MAX);
            let probe = if hi == Real::MAX { lo + 1.0 } else { (lo + hi) * 0.5 };

            // Quadratic coefficients of the squared distance on this piece.
            let mut a = 0.0;
            let mut b = 0.0;
            for i in 0..DIM {
                let p = ray.origin[i] + ray.dir[i] * probe;
                let bound = if p < self.mins[i] {
                    self.mins[i]
                } else if p > self.maxs[i] {
                    self.maxs[i]
                } else {
                    continue;
                };
                a += ray.dir[i] * ray.dir[i];
                b += 2.0 * ray.dir[i] * (ray.origin[i] - bound);
            }

            let t = if a > 0.0 {
                (-b / (2.0 * a)).clamp(lo, hi)
            } else {
                lo
            };
            let dist = self.distance_squared_to_local_point(&ray.point_at(t));

            if dist < best_dist {
                best_dist = dist;
                best_t = t;
            }
        }

        (best_dist, best_t)
    }

    /// Returns `true` if every point of this box has a negative depth along the ray.
    pub fn is_behind_ray(&self, ray: &Ray) -> bool {
        let mut max_depth = 0.0;
        for i in 0..DIM {
            let near = ray.dir[i] * (self.mins[i] - ray.origin[i]);
            let far = ray.dir[i] * (self.maxs[i] - ray.origin[i]);
            max_depth += near.max(far);
        }
        max_depth < 0.0
    }
}
