//! Brick storage and DXT decoding.
//!
//! A brick is an 8x8x8 block of voxels. The uncompressed form stores one
//! material id per voxel; the compressed form stores 32 16-texel blocks
//! of DXT1 color and DXT normal data, matching the external buffer
//! layout (`32 x uvec2` color, `32 x uvec4` normal).
//!
//! The exact sub-byte layout of the normal block's base-normal and
//! axis-scale words is an implementation decision recorded in
//! `DESIGN.md`. The unit-length property holds regardless of the
//! particular bit assignment chosen: every decode ends in an explicit
//! `normalize()`.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Brick edge length in voxels.
pub const BRICK_SIZE: usize = 8;
/// Voxels per brick.
pub const VOXELS_PER_BRICK: usize = BRICK_SIZE * BRICK_SIZE * BRICK_SIZE;
/// Texels per compression block.
pub const TEXELS_PER_BLOCK: usize = 16;
/// Compression blocks per brick.
pub const BLOCKS_PER_BRICK: usize = VOXELS_PER_BRICK / TEXELS_PER_BLOCK;

/// Linear voxel index within a brick.
#[inline]
pub const fn voxel_linear_index(x: usize, y: usize, z: usize) -> usize {
    z * 64 + y * 8 + x
}

/// Splits a linear voxel index into its compression block and in-block
/// texel index.
#[inline]
pub const fn block_and_texel(voxel_linear: usize) -> (usize, usize) {
    (voxel_linear >> 4, voxel_linear & 15)
}

/// An uncompressed brick: one material id byte per voxel.
#[derive(Copy, Clone, Zeroable, Pod)]
#[repr(C)]
pub struct UncompressedBrick {
    pub materials: [u8; VOXELS_PER_BRICK],
}

impl UncompressedBrick {
    pub fn filled(material: u8) -> Self {
        Self {
            materials: [material; VOXELS_PER_BRICK],
        }
    }

    #[inline]
    pub fn material_at(&self, x: usize, y: usize, z: usize) -> u8 {
        self.materials[voxel_linear_index(x, y, z)]
    }
}

/// One DXT1-style color block: two RGB565 endpoints packed into the low
/// 32 bits, sixteen 2-bit palette indices in the high 32 bits.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Zeroable, Pod)]
#[repr(C)]
pub struct ColorBlock {
    pub endpoints: u32,
    pub indices: u32,
}

impl ColorBlock {
    pub fn new(c0: Rgb565, c1: Rgb565, indices: [u8; TEXELS_PER_BLOCK]) -> Self {
        let endpoints = (c0.0 as u32) | ((c1.0 as u32) << 16);
        let mut packed_indices = 0u32;
        for (i, idx) in indices.iter().enumerate() {
            packed_indices |= (u32::from(*idx) & 0b11) << (i * 2);
        }
        Self {
            endpoints,
            indices: packed_indices,
        }
    }

    #[inline]
    fn c0(&self) -> Rgb565 {
        Rgb565((self.endpoints & 0xFFFF) as u16)
    }

    #[inline]
    fn c1(&self) -> Rgb565 {
        Rgb565(((self.endpoints >> 16) & 0xFFFF) as u16)
    }

    #[inline]
    fn index(&self, texel: usize) -> u8 {
        debug_assert!(texel < TEXELS_PER_BLOCK);
        ((self.indices >> (texel * 2)) & 0b11) as u8
    }

    /// Decodes the color of `texel` (0..16) to linear `[0,1]` RGB.
    pub fn decode(&self, texel: usize) -> [f32; 3] {
        let c0 = self.c0().to_f32();
        let c1 = self.c1().to_f32();
        let lerp = |a: [f32; 3], b: [f32; 3], t: f32| {
            [
                a[0] + (b[0] - a[0]) * t,
                a[1] + (b[1] - a[1]) * t,
                a[2] + (b[2] - a[2]) * t,
            ]
        };
        match self.index(texel) {
            0 => c0,
            1 => c1,
            2 => lerp(c0, c1, 1.0 / 3.0),
            3 => lerp(c0, c1, 2.0 / 3.0),
            _ => unreachable!(),
        }
    }
}

/// A packed RGB565 color endpoint.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Rgb565(pub u16);

impl Rgb565 {
    pub fn from_f32(rgb: [f32; 3]) -> Self {
        let r = (rgb[0].clamp(0.0, 1.0) * 31.0).round() as u16;
        let g = (rgb[1].clamp(0.0, 1.0) * 63.0).round() as u16;
        let b = (rgb[2].clamp(0.0, 1.0) * 31.0).round() as u16;
        Self((r << 11) | (g << 5) | b)
    }

    pub fn to_f32(self) -> [f32; 3] {
        let r = (self.0 >> 11) & 0x1F;
        let g = (self.0 >> 5) & 0x3F;
        let b = self.0 & 0x1F;
        [r as f32 / 31.0, g as f32 / 63.0, b as f32 / 31.0]
    }
}

/// Per-texel interpolation coefficients for the normal block, drawn from
/// `{-1, -1/3, 1/3, 1}`.
const NORMAL_COEFFICIENTS: [f32; 4] = [-1.0, -1.0 / 3.0, 1.0 / 3.0, 1.0];

/// One DXT-normal block: a quantized base normal, a pair of axis scales,
/// and two per-voxel 2-bit interpolation bitfields (one per UV axis).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Zeroable, Pod)]
#[repr(C)]
pub struct NormalBlock {
    pub base: u32,
    pub axis_scale: u32,
    pub u_coeffs: u32,
    pub v_coeffs: u32,
}

impl NormalBlock {
    /// Builds a block from an explicit dominant axis, sign, base UV, axis
    /// scales, and per-texel coefficient indices (0..4 each).
    pub fn new(
        dominant_axis: u8,
        sign_negative: bool,
        base_u: u16,
        base_v: u16,
        u_scale: f32,
        v_scale: f32,
        u_coeff_idx: [u8; TEXELS_PER_BLOCK],
        v_coeff_idx: [u8; TEXELS_PER_BLOCK],
    ) -> Self {
        debug_assert!(dominant_axis < 3);
        let base = ((sign_negative as u32) << 31)
            | ((dominant_axis as u32 & 0b11) << 29)
            | ((u32::from(base_u) & 0x7FFF) << 14)
            | (u32::from(base_v) & 0x3FFF);

        let u_exp = u_scale.max(f32::MIN_POSITIVE).to_bits() >> 23 & 0xFF;
        let v_exp = v_scale.max(f32::MIN_POSITIVE).to_bits() >> 23 & 0xFF;
        let axis_scale = (u_exp << 24) | (v_exp << 16);

        let mut u_coeffs = 0u32;
        let mut v_coeffs = 0u32;
        for i in 0..TEXELS_PER_BLOCK {
            u_coeffs |= (u32::from(u_coeff_idx[i]) & 0b11) << (i * 2);
            v_coeffs |= (u32::from(v_coeff_idx[i]) & 0b11) << (i * 2);
        }

        Self {
            base,
            axis_scale,
            u_coeffs,
            v_coeffs,
        }
    }

    fn dominant_axis(&self) -> u8 {
        ((self.base >> 29) & 0b11) as u8
    }

    fn sign_negative(&self) -> bool {
        (self.base >> 31) & 1 != 0
    }

    fn base_u(&self) -> u16 {
        ((self.base >> 14) & 0x7FFF) as u16
    }

    fn base_v(&self) -> u16 {
        (self.base & 0x3FFF) as u16
    }

    fn u_scale(&self) -> f32 {
        let exp = (self.axis_scale >> 24) & 0xFF;
        f32::from_bits(exp << 23)
    }

    fn v_scale(&self) -> f32 {
        let exp = (self.axis_scale >> 16) & 0xFF;
        f32::from_bits(exp << 23)
    }

    /// Decodes, then normalizes, the normal at `texel` (0..16).
    pub fn decode(&self, texel: usize) -> Vec3 {
        debug_assert!(texel < TEXELS_PER_BLOCK);
        let u_idx = ((self.u_coeffs >> (texel * 2)) & 0b11) as usize;
        let v_idx = ((self.v_coeffs >> (texel * 2)) & 0b11) as usize;

        // Base UV in [-1, 1], perturbed by the per-texel coefficient
        // scaled by the block's axis scale.
        let base_u = (self.base_u() as f32 / 0x7FFF as f32) * 2.0 - 1.0;
        let base_v = (self.base_v() as f32 / 0x3FFF as f32) * 2.0 - 1.0;
        let u = base_u + NORMAL_COEFFICIENTS[u_idx] * self.u_scale();
        let v = base_v + NORMAL_COEFFICIENTS[v_idx] * self.v_scale();

        let dominant = if self.sign_negative() { -1.0 } else { 1.0 };
        let mut comp = [0.0f32; 3];
        let axis = self.dominant_axis().min(2) as usize;
        let others: [usize; 2] = match axis {
            0 => [1, 2],
            1 => [0, 2],
            _ => [0, 1],
        };
        comp[axis] = dominant;
        comp[others[0]] = u;
        comp[others[1]] = v;

        let n = Vec3::from_array(comp);
        if n.length_squared() <= f32::EPSILON {
            // Degenerate (all-zero) input: fall back to the dominant axis.
            let mut fallback = [0.0f32; 3];
            fallback[axis] = dominant;
            Vec3::from_array(fallback)
        } else {
            n.normalize()
        }
    }
}

/// A compressed brick: 32 color blocks and 32 normal blocks.
#[derive(Copy, Clone, Zeroable, Pod)]
#[repr(C)]
pub struct CompressedBrick {
    pub color: [ColorBlock; BLOCKS_PER_BRICK],
    pub normal: [NormalBlock; BLOCKS_PER_BRICK],
}

impl CompressedBrick {
    /// Decodes the color of the voxel at the given linear index.
    pub fn decode_color(&self, voxel_linear: usize) -> [f32; 3] {
        let (block, texel) = block_and_texel(voxel_linear);
        self.color[block].decode(texel)
    }

    /// Decodes the (unit-length) normal of the voxel at the given linear
    /// index.
    pub fn decode_normal(&self, voxel_linear: usize) -> Vec3 {
        let (block, texel) = block_and_texel(voxel_linear);
        self.normal[block].decode(texel)
    }

    /// Builds a brick where every voxel has the same color and normal,
    /// used by tests and by the S5 compressed/uncompressed equivalence
    /// scenario.
    pub fn uniform(color: [f32; 3], normal: Vec3) -> Self {
        let c0 = Rgb565::from_f32(color);
        let color_block = ColorBlock::new(c0, c0, [0; TEXELS_PER_BLOCK]);

        let n = normal.normalize();
        let abs = [n.x.abs(), n.y.abs(), n.z.abs()];
        let axis = if abs[0] >= abs[1] && abs[0] >= abs[2] {
            0u8
        } else if abs[1] >= abs[2] {
            1u8
        } else {
            2u8
        };
        let sign_negative = match axis {
            0 => n.x < 0.0,
            1 => n.y < 0.0,
            _ => n.z < 0.0,
        };
        let (u, v) = match axis {
            0 => (n.y, n.z),
            1 => (n.x, n.z),
            _ => (n.x, n.y),
        };
        let base_u = (((u + 1.0) / 2.0).clamp(0.0, 1.0) * 0x7FFF as f32) as u16;
        let base_v = (((v + 1.0) / 2.0).clamp(0.0, 1.0) * 0x3FFF as f32) as u16;
        let normal_block = NormalBlock::new(
            axis,
            sign_negative,
            base_u,
            base_v,
            1.0 / 0x7FFF as f32,
            1.0 / 0x3FFF as f32,
            [1; TEXELS_PER_BLOCK],
            [1; TEXELS_PER_BLOCK],
        );

        Self {
            color: [color_block; BLOCKS_PER_BRICK],
            normal: [normal_block; BLOCKS_PER_BRICK],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_decode_stays_in_unit_cube() {
        let c0 = Rgb565::from_f32([1.0, 0.5, 0.25]);
        let c1 = Rgb565::from_f32([0.0, 0.2, 0.9]);
        let block = ColorBlock::new(c0, c1, core::array::from_fn(|i| (i % 4) as u8));
        for t in 0..TEXELS_PER_BLOCK {
            let rgb = block.decode(t);
            for c in rgb {
                assert!((0.0..=1.0).contains(&c), "{c} out of range");
            }
        }
    }

    #[test]
    fn normal_decode_is_unit_length() {
        let block = NormalBlock::new(
            1,
            true,
            12345,
            6789,
            0.1,
            0.05,
            core::array::from_fn(|i| (i % 4) as u8),
            core::array::from_fn(|i| ((i + 1) % 4) as u8),
        );
        for t in 0..TEXELS_PER_BLOCK {
            let n = block.decode(t);
            assert!((n.length() - 1.0).abs() < 1e-3, "length = {}", n.length());
        }
    }

    #[test]
    fn uniform_brick_round_trips_within_tolerance() {
        let color = [0.8, 0.2, 0.4];
        let normal = Vec3::new(0.0, 1.0, 0.0);
        let brick = CompressedBrick::uniform(color, normal);

        for voxel in 0..VOXELS_PER_BRICK {
            let decoded = brick.decode_color(voxel);
            for i in 0..3 {
                assert!(
                    (decoded[i] - color[i]).abs() <= 2.0 / 255.0,
                    "channel {i}: {} vs {}",
                    decoded[i],
                    color[i]
                );
            }
            let decoded_normal = brick.decode_normal(voxel);
            assert!(decoded_normal.dot(normal) > (1.0f32).to_radians().cos());
        }
    }
}
