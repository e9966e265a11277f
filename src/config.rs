//! Frame-static configuration types.
//!
//! `OctreeConfig` is the `std140`-compatible uniform consumed by the
//! traversal shaders; the rest are ordinary `Default`-implementing option
//! structs consumed by constructors, favoring explicit, injected
//! configuration over hidden constants.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// The octree configuration uniform, bit-exact for shader compatibility.
///
/// Field order and padding match `std140`: two `ivec4`-sized blocks of
/// scalars, two padded `vec3`s, then two `mat4`s.
#[derive(Copy, Clone, Debug, PartialEq, Zeroable, Pod)]
#[repr(C)]
pub struct OctreeConfig {
    pub esvo_max_scale: i32,
    pub user_max_levels: i32,
    pub brick_depth_levels: i32,
    pub brick_size: i32,
    pub min_esvo_scale: i32,
    pub brick_esvo_scale: i32,
    pub bricks_per_axis: i32,
    pub _pad1: i32,
    pub grid_min: [f32; 3],
    pub _pad2: f32,
    pub grid_max: [f32; 3],
    pub _pad3: f32,
    pub local_to_world: [[f32; 4]; 4],
    pub world_to_local: [[f32; 4]; 4],
}

impl OctreeConfig {
    /// Canonical brick edge length in voxels.
    pub const BRICK_SIZE: i32 = 8;

    /// Builds a config from the logical grid bounds and transforms.
    ///
    /// `esvo_max_scale` follows from `user_max_levels` by
    /// `user_to_esvo_scale(user_max_levels - 1)`.
    pub fn new(
        user_max_levels: i32,
        brick_depth_levels: i32,
        bricks_per_axis: i32,
        grid_min: Vec3,
        grid_max: Vec3,
        local_to_world: Mat4,
        world_to_local: Mat4,
    ) -> Self {
        let esvo_max_scale = user_to_esvo_scale(user_max_levels - 1);
        let min_esvo_scale = esvo_max_scale - brick_depth_levels;
        Self {
            esvo_max_scale,
            user_max_levels,
            brick_depth_levels,
            brick_size: Self::BRICK_SIZE,
            min_esvo_scale,
            brick_esvo_scale: min_esvo_scale,
            bricks_per_axis,
            _pad1: 0,
            grid_min: grid_min.to_array(),
            _pad2: 0.0,
            grid_max: grid_max.to_array(),
            _pad3: 0.0,
            local_to_world: local_to_world.to_cols_array_2d(),
            world_to_local: world_to_local.to_cols_array_2d(),
        }
    }
}

/// Converts a user-facing octree level into the ESVO float-exponent scale
/// space, where one unit equals a factor-of-two edge length in `[1,2]^3`.
pub const fn user_to_esvo_scale(user_level: i32) -> i32 {
    user_level
}

/// Tunables for [`crate::graph::RenderGraph`].
#[derive(Copy, Clone, Debug)]
pub struct GraphConfig {
    /// Initial capacity hint for the scheduler's resource-access map,
    /// re-used and grown across frames.
    pub resource_map_capacity_hint: usize,
    /// Maximum number of events drained per `process_events` call before
    /// bailing out, to bound cascade chains.
    pub max_events_per_drain: u32,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            resource_map_capacity_hint: 64,
            max_events_per_drain: 4096,
        }
    }
}

/// Tunables for [`crate::events::EventBus`].
#[derive(Copy, Clone, Debug)]
pub struct EventBusConfig {
    pub expected_capacity: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            expected_capacity: 256,
        }
    }
}

/// Tunables for [`crate::traversal`].
#[derive(Copy, Clone, Debug)]
pub struct TraversalLimits {
    /// DFS stack depth, bounded by the float32 exponent range.
    pub max_stack_depth: u32,
    /// Upper bound on DFS loop iterations before a walk is abandoned.
    pub max_iterations: u32,
    /// Upper bound on brick DDA steps.
    pub max_brick_steps: u32,
    /// Minimum magnitude a ray direction component is clamped to.
    pub dir_epsilon: f32,
}

impl Default for TraversalLimits {
    fn default() -> Self {
        Self {
            max_stack_depth: 23,
            max_iterations: 512,
            max_brick_steps: 300,
            dir_epsilon: 1e-5,
        }
    }
}

/// Tunables for [`crate::upload`].
#[derive(Copy, Clone, Debug)]
pub struct UploadConfig {
    /// Total host-visible staging memory the budget manager will allow
    /// in flight before it starts warning, in bytes.
    pub budget_bytes: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            // 128 MiB: generous enough for a frame's worth of brick
            // streaming without masking a real leak.
            budget_bytes: 128 * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn octree_config_is_pod_sized() {
        // 8 leading i32s + 2 padded vec3s + 2 mat4s, std140-compatible.
        assert_eq!(core::mem::size_of::<OctreeConfig>(), 32 + 16 + 16 + 64 + 64);
    }
}
