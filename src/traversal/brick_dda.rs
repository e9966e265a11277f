//! Amanatides-Woo DDA marching through an 8x8x8 brick.
//!
//! Runs once the kernel reaches a leaf with an attached brick, in the
//! brick's own `[0,8)^3` voxel grid. An uncompressed brick stores
//! per-voxel occupancy (material id `0` is empty); a compressed brick
//! carries no separate occupancy bit, so every texel of a present brick
//! is solid and the march exists only to find which face the ray
//! entered through.

use glam::Vec3;

use crate::svo::{brick::BRICK_SIZE, CompressedBrick, UncompressedBrick};

/// A borrowed view over either brick representation.
#[derive(Copy, Clone)]
pub enum BrickView<'a> {
    Uncompressed(&'a UncompressedBrick),
    Compressed(&'a CompressedBrick),
}

/// What was sampled at the hit voxel.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Sample {
    Material(u8),
    Shaded { color: [f32; 3], normal: Vec3 },
}

/// The result of a successful brick march.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BrickHit {
    /// Ray parameter advanced from the brick entry point to the hit.
    pub t_local: f32,
    /// Outward face normal, in the same (brick-local, axis-aligned)
    /// frame as the march direction.
    pub normal: Vec3,
    pub sample: Sample,
}

#[inline]
fn voxel_linear(v: [i32; 3]) -> usize {
    (v[2] as usize) * 64 + (v[1] as usize) * 8 + (v[0] as usize)
}

fn is_solid(brick: &BrickView<'_>, v: [i32; 3]) -> bool {
    if v.iter().any(|&c| !(0..BRICK_SIZE as i32).contains(&c)) {
        return false;
    }
    match brick {
        BrickView::Uncompressed(b) => b.material_at(v[0] as usize, v[1] as usize, v[2] as usize) != 0,
        BrickView::Compressed(_) => true,
    }
}

fn sample_at(brick: &BrickView<'_>, v: [i32; 3]) -> Sample {
    let linear = voxel_linear(v);
    match brick {
        BrickView::Uncompressed(b) => {
            Sample::Material(b.material_at(v[0] as usize, v[1] as usize, v[2] as usize))
        }
        BrickView::Compressed(b) => Sample::Shaded {
            color: b.decode_color(linear),
            normal: b.decode_normal(linear),
        },
    }
}

/// Axis index (0=x,1=y,2=z) with the greatest magnitude in `direction`.
fn dominant_axis(direction: Vec3) -> usize {
    let abs = [direction.x.abs(), direction.y.abs(), direction.z.abs()];
    if abs[0] >= abs[1] && abs[0] >= abs[2] {
        0
    } else if abs[1] >= abs[2] {
        1
    } else {
        2
    }
}

/// Marches from `entry` (brick-local, expected within `[0,8]^3` on its
/// boundary) along `direction` (brick-local scale) until a solid voxel
/// is found or the brick is exited. `direction` must have no zero
/// components.
pub fn march(entry: Vec3, direction: Vec3, brick: BrickView<'_>, max_steps: u32) -> Option<BrickHit> {
    let size = BRICK_SIZE as i32;
    let mut voxel = [
        (entry.x.floor() as i32).clamp(0, size - 1),
        (entry.y.floor() as i32).clamp(0, size - 1),
        (entry.z.floor() as i32).clamp(0, size - 1),
    ];

    let step = [
        if direction.x > 0.0 { 1i32 } else { -1 },
        if direction.y > 0.0 { 1i32 } else { -1 },
        if direction.z > 0.0 { 1i32 } else { -1 },
    ];
    let t_delta = [
        (1.0 / direction.x).abs(),
        (1.0 / direction.y).abs(),
        (1.0 / direction.z).abs(),
    ];
    let next_boundary = |axis: usize, v: i32| -> f32 {
        if step[axis] > 0 {
            (v + 1) as f32
        } else {
            v as f32
        }
    };
    let entry_arr = [entry.x, entry.y, entry.z];
    let dir_arr = [direction.x, direction.y, direction.z];
    let mut t_max = [
        (next_boundary(0, voxel[0]) - entry_arr[0]) / dir_arr[0],
        (next_boundary(1, voxel[1]) - entry_arr[1]) / dir_arr[1],
        (next_boundary(2, voxel[2]) - entry_arr[2]) / dir_arr[2],
    ];

    let mut last_axis = dominant_axis(direction);
    let mut t_local = 0.0f32;

    for _ in 0..max_steps {
        if is_solid(&brick, voxel) {
            let mut normal = Vec3::ZERO;
            normal[last_axis] = -(step[last_axis] as f32);
            return Some(BrickHit {
                t_local,
                normal,
                sample: sample_at(&brick, voxel),
            });
        }

        let axis = if t_max[0] <= t_max[1] && t_max[0] <= t_max[2] {
            0
        } else if t_max[1] <= t_max[2] {
            1
        } else {
            2
        };

        t_local = t_max[axis];
        voxel[axis] += step[axis];
        t_max[axis] += t_delta[axis];
        last_axis = axis;

        if !(0..size).contains(&voxel[axis]) {
            return None;
        }
    }

    None
}
