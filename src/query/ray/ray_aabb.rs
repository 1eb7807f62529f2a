use core::mem;

use crate::bounding_volume::Aabb;
use crate::math::{Real, DIM};
use crate::query::Ray;
use num::Zero;

impl Aabb {
    /// Computes the time of impact of the ray with this box, using the slab test.
    ///
    /// If `solid` is `true`, a ray starting inside of the box has a time of impact of zero.
    /// Otherwise, the exit point is reported for such rays.
    pub fn cast_local_ray(&self, ray: &Ray, max_toi: Real, solid: bool) -> Option<Real> {
        let mut tmin: Real = 0.0;
        let mut tmax: Real = max_toi;

        for i in 0usize..DIM {
            if ray.dir[i].is_zero() {
                if ray.origin[i] < self.mins[i] || ray.origin[i] > self.maxs[i] {
                    return None;
                }
            } else {
                let denom = 1.0 / ray.dir[i];
                let mut inter_with_near_halfspace = (self.mins[i] - ray.origin[i]) * denom;
                let mut inter_with_far_halfspace = (self.maxs[i] - ray.origin[i]) * denom;

                if inter_with_near_halfspace > inter_with_far_halfspace {
                    mem::swap(
                        &mut inter_with_near_halfspace,
                        &mut inter_with_far_halfspace,
                    )
                }

                tmin = tmin.max(inter_with_near_halfspace);
                tmax = tmax.min(inter_with_far_halfspace);

                if tmin > tmax {
                    // This covers the case where tmax is negative because tmin is
                    // initialized at zero.
                    return None;
                }
            }
        }

        if tmin.is_zero() && !solid {
            Some(tmax)
        } else {
            Some(tmin)
        }
    }

    /// Tests if the ray intersects this box, returning the entry parameter if it does.
    ///
    /// A ray starting inside of the box enters it at `0.0`.
    #[inline]
    pub fn intersects_ray(&self, ray: &Ray) -> Option<Real> {
        self.cast_local_ray(ray, Real::MAX, true)
    }
}
