//! The three-phase (PUSH/ADVANCE/POP) depth-first traversal kernel.
//!
//! A direct port of the classic ESVO CPU/GPU walk: a stack indexed by
//! scale rather than depth, IEEE-754 exponent extraction to jump
//! multiple levels on POP in one step, and octant mirroring so every
//! ray can be treated as traveling in the all-negative octant.

use glam::Vec3;

use crate::svo::descriptor::{mirrored_to_local, NodeDescriptor, NO_BRICK};
use crate::svo::{Material, MaterialPalette};

use super::brick_dda::{self, BrickView, Sample};
use super::lod::LodParams;
use super::ray::RaySetup;

/// Read-only access to everything the kernel needs to walk a scene.
pub trait SceneView {
    fn node(&self, index: u32) -> NodeDescriptor;

    /// Resolves a far pointer: the child's own descriptor is stored in
    /// the far slot, and its `lo` half holds the absolute child base
    /// index (the usual ESVO far-pointer indirection).
    fn resolve_far_pointer(&self, parent_index: u32, offset: u32) -> u32 {
        self.node(parent_index + offset).lo
    }

    fn brick(&self, brick_index: u32) -> Option<BrickView<'_>>;

    fn material(&self, material_id: u8) -> Option<Material> {
        let _ = material_id;
        None
    }
}

/// A convenience `SceneView` for flat node/brick/palette buffers.
pub struct FlatScene<'a, N> {
    pub nodes: &'a N,
    pub uncompressed: &'a [crate::svo::brick::UncompressedBrick],
    pub palette: &'a MaterialPalette,
}

impl<'a, N> SceneView for FlatScene<'a, N>
where
    N: crate::svo::NodeBuffer,
{
    fn node(&self, index: u32) -> NodeDescriptor {
        self.nodes.node(index)
    }

    fn brick(&self, brick_index: u32) -> Option<BrickView<'_>> {
        self.uncompressed
            .get(brick_index as usize)
            .map(BrickView::Uncompressed)
    }

    fn material(&self, material_id: u8) -> Option<Material> {
        self.palette.get(material_id as u32).copied()
    }
}

/// What the ray found.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Hit {
    Miss,
    /// A brick-level hit: exact position, normal and material/color.
    Surface {
        t: f32,
        position: Vec3,
        normal: Vec3,
        sample: Sample,
    },
    /// An LOD cutoff: the node itself is reported as a flat surface,
    /// with no material sample (no brick was consulted).
    Lod {
        t: f32,
        position: Vec3,
        normal: Vec3,
    },
}

/// Per-walk debug counters, useful for cost visualization and tests.
#[derive(Copy, Clone, Debug, Default)]
pub struct TraversalStats {
    pub iterations: u32,
    pub pushes: u32,
    pub pops: u32,
    pub advances: u32,
    pub brick_steps: u32,
}

use crate::config::TraversalLimits;

const STACK_SIZE: usize = 32;

#[derive(Copy, Clone, Default)]
struct StackEntry {
    parent_index: u32,
    t_max: f32,
}

/// Axis (0,1,2) with the largest `|direction|` component among those
/// set in `mask` (falls back to the global dominant axis if `mask` is
/// zero, e.g. at the very first entry into the root).
fn dominant_masked_axis(mask: u8, direction: Vec3) -> usize {
    let abs = [direction.x.abs(), direction.y.abs(), direction.z.abs()];
    let mut best = None;
    for axis in 0..3 {
        if mask & (1 << axis) != 0 && (best.is_none() || abs[axis] > abs[best.unwrap()]) {
            best = Some(axis);
        }
    }
    best.unwrap_or_else(|| {
        if abs[0] >= abs[1] && abs[0] >= abs[2] {
            0
        } else if abs[1] >= abs[2] {
            1
        } else {
            2
        }
    })
}

/// Runs the DFS walk for a single ray. `root_index` is usually `0`.
pub fn traverse<S: SceneView>(
    scene: &S,
    config: &crate::config::OctreeConfig,
    limits: &TraversalLimits,
    ray: &RaySetup,
    lod: Option<LodParams>,
    mut stats: Option<&mut TraversalStats>,
) -> Hit {
    let mut stack = [StackEntry::default(); STACK_SIZE];

    let esvo_max_scale = config.esvo_max_scale;
    if esvo_max_scale < 0 || esvo_max_scale as usize >= STACK_SIZE {
        return Hit::Miss;
    }
    let mut scale = esvo_max_scale;
    let mut scale_exp2 = scale_to_exp2(scale, esvo_max_scale);

    let mut pos = Vec3::new(1.0, 1.0, 1.0);
    let mut idx: u8 = 0;
    for axis in 0..3 {
        let center = (pos[axis] + scale_exp2) * ray.t_coef[axis] - ray.t_bias[axis];
        if center > ray.t_min {
            idx |= 1 << axis;
            pos[axis] += scale_exp2;
        }
    }

    let mut parent_index: u32 = 0;
    let mut t_min = ray.t_min;
    let mut t_max = ray.t_max;
    let mut h = t_max;
    let mut child_descriptor: Option<NodeDescriptor> = None;
    let mut last_step_mask: u8 = 0;

    let mut iterations: u32 = 0;
    while scale <= esvo_max_scale {
        iterations += 1;
        if iterations > limits.max_iterations {
            return Hit::Miss;
        }
        if let Some(s) = stats.as_deref_mut() {
            s.iterations += 1;
        }

        if child_descriptor.is_none() {
            child_descriptor = Some(scene.node(parent_index));
        }
        let desc = child_descriptor.unwrap();
        let local_octant = mirrored_to_local(idx, ray.octant_mask);

        let corner = pos * ray.t_coef - ray.t_bias;
        let tc_max = corner.x.min(corner.y).min(corner.z);

        if desc.child_exists(local_octant) && t_min <= t_max.min(tc_max) {
            let tv_max = t_max.min(tc_max);

            if desc.child_is_leaf(local_octant) {
                let brick_index = desc.brick_index();
                if brick_index != NO_BRICK {
                    if let Some(brick) = scene.brick(brick_index) {
                        if let Some(hit) = sample_brick(
                            scene,
                            config,
                            limits,
                            ray,
                            pos,
                            scale_exp2,
                            t_min,
                            brick,
                            stats.as_deref_mut(),
                        ) {
                            return hit;
                        }
                        // Brick present but ray exited it without a
                        // solid voxel (e.g. a sparse uncompressed
                        // brick): fall through to ADVANCE.
                    }
                }
            } else {
                if let Some(lod_params) = lod {
                    if lod_params.is_below_cutoff(scale_exp2, tc_max) {
                        let axis = dominant_masked_axis(last_step_mask, ray.direction);
                        let point = ray.point_at(t_min);
                        let mut normal_mirrored = Vec3::ZERO;
                        normal_mirrored[axis] = if ray.direction[axis] > 0.0 { 1.0 } else { -1.0 };
                        return Hit::Lod {
                            t: t_min,
                            position: ray.unmirror_point(point),
                            normal: ray.unmirror_direction(normal_mirrored),
                        };
                    }
                }

                if tc_max < h {
                    stack[scale as usize] = StackEntry {
                        parent_index,
                        t_max,
                    };
                    if let Some(s) = stats.as_deref_mut() {
                        s.pushes += 1;
                    }
                    h = tc_max;
                }

                let child_base = if desc.far_bit() {
                    scene.resolve_far_pointer(parent_index, desc.child_pointer())
                } else {
                    parent_index + desc.child_pointer()
                };
                parent_index = child_base + desc.child_array_index(local_octant);

                let half = scale_exp2 * 0.5;
                scale -= 1;
                if scale < 0 {
                    return Hit::Miss;
                }
                scale_exp2 = half;
                idx = 0;
                for axis in 0..3 {
                    let center = (pos[axis] + half) * ray.t_coef[axis] - ray.t_bias[axis];
                    if center > t_min {
                        idx |= 1 << axis;
                        pos[axis] += half;
                    }
                }
                t_max = tv_max;
                child_descriptor = None;
                last_step_mask = 0;
                continue;
            }
        }

        // ADVANCE
        let mut step_mask: u8 = 0;
        for axis in 0..3 {
            if corner[axis] <= tc_max {
                step_mask |= 1 << axis;
                pos[axis] -= scale_exp2;
            }
        }
        if let Some(s) = stats.as_deref_mut() {
            s.advances += 1;
        }

        t_min = tc_max;
        idx ^= step_mask;
        last_step_mask = step_mask;

        if idx & step_mask != 0 {
            // POP: find the coarsest scale at which any stepped axis's
            // position actually changed, via IEEE-754 exponent extraction.
            let mut differing_bits: u32 = 0;
            for axis in 0..3 {
                if step_mask & (1 << axis) != 0 {
                    let before = pos[axis].to_bits();
                    let after = (pos[axis] + scale_exp2).to_bits();
                    differing_bits |= before ^ after;
                }
            }

            let new_scale = ((differing_bits as f32).to_bits() >> 23) as i32 - 127;
            if new_scale > esvo_max_scale || new_scale < 0 || new_scale as usize >= STACK_SIZE {
                return Hit::Miss;
            }
            scale = new_scale;
            scale_exp2 = scale_to_exp2(scale, esvo_max_scale);

            let entry = stack[scale as usize];
            parent_index = entry.parent_index;
            t_max = entry.t_max;

            for axis in 0..3 {
                let bits = pos[axis].to_bits() >> scale;
                pos[axis] = f32::from_bits(bits << scale);
            }
            idx = {
                let shx = pos.x.to_bits() >> scale;
                let shy = pos.y.to_bits() >> scale;
                let shz = pos.z.to_bits() >> scale;
                ((shx & 1) | ((shy & 1) << 1) | ((shz & 1) << 2)) as u8
            };

            h = 0.0;
            child_descriptor = None;
            if let Some(s) = stats.as_deref_mut() {
                s.pops += 1;
            }
        }
    }

    Hit::Miss
}

fn scale_to_exp2(scale: i32, esvo_max_scale: i32) -> f32 {
    let exponent = scale - esvo_max_scale - 1 + 127;
    if !(0..=255).contains(&exponent) {
        return 0.0;
    }
    f32::from_bits((exponent as u32) << 23)
}

#[allow(clippy::too_many_arguments)]
fn sample_brick<S: SceneView>(
    scene: &S,
    config: &crate::config::OctreeConfig,
    limits: &TraversalLimits,
    ray: &RaySetup,
    box_min: Vec3,
    box_size: f32,
    t_entry: f32,
    brick: BrickView<'_>,
    mut stats: Option<&mut TraversalStats>,
) -> Option<Hit> {
    let brick_size = config.brick_size as f32;
    let entry_mirrored = ray.point_at(t_entry);
    let brick_local = (entry_mirrored - box_min) / box_size * brick_size;
    let direction_local = ray.direction * (brick_size / box_size);

    let result = brick_dda::march(brick_local, direction_local, brick, limits.max_brick_steps);
    if let Some(s) = stats.as_deref_mut() {
        if let Some(hit) = &result {
            s.brick_steps += (hit.t_local.max(0.0) as u32) + 1;
        }
    }

    result.map(|hit| {
        let t = t_entry + hit.t_local;
        let point = ray.point_at(t);
        Hit::Surface {
            t,
            position: ray.unmirror_point(point),
            normal: ray.unmirror_direction(hit.normal),
            sample: hit.sample,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OctreeConfig;
    use crate::svo::builder::{build, NodeSpec};
    use crate::svo::brick::UncompressedBrick;
    use crate::traversal::ray::Ray;
    use glam::Mat4;

    struct TestScene {
        nodes: Vec<NodeDescriptor>,
        bricks: Vec<UncompressedBrick>,
    }

    impl SceneView for TestScene {
        fn node(&self, index: u32) -> NodeDescriptor {
            self.nodes[index as usize]
        }
        fn brick(&self, brick_index: u32) -> Option<BrickView<'_>> {
            self.bricks.get(brick_index as usize).map(BrickView::Uncompressed)
        }
    }

    fn config(levels: i32) -> OctreeConfig {
        OctreeConfig::new(
            levels,
            0,
            1,
            Vec3::ZERO,
            Vec3::ONE,
            Mat4::IDENTITY,
            Mat4::IDENTITY,
        )
    }

    #[test]
    fn empty_scene_is_a_miss() {
        let nodes = build(NodeSpec::empty_leaf());
        let scene = TestScene {
            nodes,
            bricks: vec![],
        };
        let config = config(2);
        let limits = TraversalLimits::default();
        let ray = RaySetup::new(
            Ray {
                origin: Vec3::new(0.5, 0.5, -1.0),
                direction: Vec3::new(0.0, 0.0, 1.0),
            },
            &config,
            limits.dir_epsilon,
        )
        .unwrap();

        let hit = traverse(&scene, &config, &limits, &ray, None, None);
        assert_eq!(hit, Hit::Miss);
    }

    #[test]
    fn single_filled_brick_is_hit_head_on() {
        let mut materials = [0u8; 512];
        materials[0] = 9;
        let brick = UncompressedBrick { materials };

        let mut children: [Option<Box<NodeSpec>>; 8] = Default::default();
        children[0] = Some(Box::new(NodeSpec::leaf(0)));
        let nodes = build(NodeSpec::internal(children));

        let scene = TestScene {
            nodes,
            bricks: vec![brick],
        };
        let config = config(2);
        let limits = TraversalLimits::default();
        let ray = RaySetup::new(
            Ray {
                origin: Vec3::new(0.1, 0.1, -1.0),
                direction: Vec3::new(0.0, 0.0, 1.0),
            },
            &config,
            limits.dir_epsilon,
        )
        .unwrap();

        let hit = traverse(&scene, &config, &limits, &ray, None, None);
        match hit {
            Hit::Surface { sample, .. } => assert_eq!(sample, Sample::Material(9)),
            other => panic!("expected a surface hit, got {other:?}"),
        }
    }

    #[test]
    fn ray_missing_every_branch_is_a_miss() {
        let mut children: [Option<Box<NodeSpec>>; 8] = Default::default();
        children[0] = Some(Box::new(NodeSpec::leaf(0)));
        let nodes = build(NodeSpec::internal(children));
        let brick = UncompressedBrick::filled(3);

        let scene = TestScene {
            nodes,
            bricks: vec![brick],
        };
        let config = config(2);
        let limits = TraversalLimits::default();
        // Passes through octant 7's corner of the cube, never entering
        // octant 0 where the only child lives.
        let ray = RaySetup::new(
            Ray {
                origin: Vec3::new(0.9, 0.9, -1.0),
                direction: Vec3::new(0.0, 0.0, 1.0),
            },
            &config,
            limits.dir_epsilon,
        )
        .unwrap();

        let hit = traverse(&scene, &config, &limits, &ray, None, None);
        assert_eq!(hit, Hit::Miss);
    }
}
