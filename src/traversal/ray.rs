//! Ray setup: world-space to ESVO mirrored-space transform, ray
//! coefficients, and the root span.

use glam::{Mat4, Vec3};

use crate::config::OctreeConfig;

/// A world-space ray.
#[derive(Copy, Clone, Debug)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

/// The ray, transformed into ESVO `[1,2]^3` mirrored space and unified to
/// the "all negative" octant, ready to drive the DFS.
#[derive(Copy, Clone, Debug)]
pub struct RaySetup {
    /// Ray origin in mirrored space.
    pub origin: Vec3,
    /// Ray direction in mirrored space, each component made negative.
    pub direction: Vec3,
    pub t_coef: Vec3,
    pub t_bias: Vec3,
    /// 3-bit XOR mask; bit `i` clear means axis `i` was mirrored.
    pub octant_mask: u8,
    pub t_min: f32,
    pub t_max: f32,
}

impl RaySetup {
    /// Builds ray coefficients and the root span. Returns `None` for a
    /// trivial miss (`t_min > t_max`).
    pub fn new(ray: Ray, config: &OctreeConfig, dir_epsilon: f32) -> Option<Self> {
        let world_to_local = Mat4::from_cols_array_2d(&config.world_to_local);

        let o_local = world_to_local.transform_point3(ray.origin);
        let d_local = world_to_local.transform_vector3(ray.direction);

        // [0,1]^3 -> [1,2]^3 mirrored ESVO space.
        let mut o = o_local + Vec3::ONE;
        let mut d = d_local;

        for axis in 0..3 {
            if d[axis].abs() < dir_epsilon {
                d[axis] = if d[axis] < 0.0 {
                    -dir_epsilon
                } else {
                    dir_epsilon
                };
            }
        }

        let t_coef = Vec3::new(1.0 / -d.x.abs(), 1.0 / -d.y.abs(), 1.0 / -d.z.abs());
        let mut t_bias = t_coef * o;

        let mut octant_mask: u8 = 7;
        for axis in 0..3 {
            if d[axis] > 0.0 {
                octant_mask &= !(1 << axis);
                t_bias[axis] = 3.0 * t_coef[axis] - t_bias[axis];
            }
        }

        // Direction is unified to "all negative" for the rest of the walk.
        d = Vec3::new(-d.x.abs(), -d.y.abs(), -d.z.abs());
        // Keep `o` consistent with the mirrored/unified direction: for a
        // mirrored axis, reflect the origin coordinate about the cube
        // center (1.5) the same way a hit point on that axis is
        // unmirrored at the end of the walk.
        for axis in 0..3 {
            if octant_mask & (1 << axis) == 0 {
                o[axis] = 3.0 - o[axis];
            }
        }

        let t_min_vals = 2.0 * t_coef - t_bias;
        let t_max_vals = t_coef - t_bias;
        let mut t_min = t_min_vals.x.max(t_min_vals.y).max(t_min_vals.z);
        let t_max = t_max_vals.x.min(t_max_vals.y).min(t_max_vals.z);

        t_min = t_min.max(0.0);

        if t_min > t_max {
            return None;
        }

        Some(Self {
            origin: o,
            direction: d,
            t_coef,
            t_bias,
            octant_mask,
            t_min,
            t_max,
        })
    }

    /// The mirrored-space point at parameter `t`.
    #[inline]
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Undoes the octant mirroring for a mirrored-space point, returning
    /// it in the un-mirrored `[1,2]^3` space.
    pub fn unmirror_point(&self, mut p: Vec3) -> Vec3 {
        for axis in 0..3 {
            if self.octant_mask & (1 << axis) == 0 {
                p[axis] = 3.0 - p[axis];
            }
        }
        p
    }

    /// Undoes the octant mirroring for a mirrored-space direction/normal.
    pub fn unmirror_direction(&self, mut n: Vec3) -> Vec3 {
        for axis in 0..3 {
            if self.octant_mask & (1 << axis) == 0 {
                n[axis] = -n[axis];
            }
        }
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Mat4;

    fn identity_config() -> OctreeConfig {
        OctreeConfig::new(
            10,
            3,
            32,
            Vec3::ZERO,
            Vec3::ONE,
            Mat4::IDENTITY,
            Mat4::IDENTITY,
        )
    }

    #[test]
    fn ray_through_cube_has_nonempty_span() {
        let config = identity_config();
        let ray = Ray {
            origin: Vec3::new(0.5, 0.5, -1.0),
            direction: Vec3::new(0.0, 0.0, 1.0),
        };
        let setup = RaySetup::new(ray, &config, 1e-5).expect("ray should hit root span");
        assert!(setup.t_min <= setup.t_max);
    }

    #[test]
    fn ray_missing_cube_is_none() {
        let config = identity_config();
        let ray = Ray {
            origin: Vec3::new(10.0, 10.0, -1.0),
            direction: Vec3::new(0.0, 0.0, 1.0),
        };
        assert!(RaySetup::new(ray, &config, 1e-5).is_none());
    }
}
