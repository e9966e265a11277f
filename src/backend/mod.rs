//! Thin `ash`-based resource wrappers.
//!
//! This module does not bootstrap a Vulkan instance/device (that lives
//! entirely in the embedding application); it wraps the raw handles the
//! rest of the crate needs to move through slots, batch barriers for,
//! and recycle once a fence signals.

pub mod buffer;
pub mod descriptors;
pub mod device;
pub mod image;
pub mod sync;

pub use buffer::Buffer;
pub use device::Device;
pub use image::Image;

bitflags::bitflags! {
    /// Coarse read/write access flags the scheduler uses to decide
    /// whether a barrier is needed between two nodes touching the same
    /// resource.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct AccessFlags: u32 {
        const TRANSFER_READ = 0b0000_0001;
        const TRANSFER_WRITE = 0b0000_0010;
        const SHADER_READ = 0b0000_0100;
        const SHADER_WRITE = 0b0000_1000;
        const ACCELERATION_STRUCTURE_READ = 0b0001_0000;
        const ACCELERATION_STRUCTURE_WRITE = 0b0010_0000;
        const COLOR_ATTACHMENT_WRITE = 0b0100_0000;
    }
}

impl AccessFlags {
    /// Whether this access set only ever reads the resource.
    pub fn is_read_only(self) -> bool {
        !self.intersects(
            Self::TRANSFER_WRITE
                | Self::SHADER_WRITE
                | Self::ACCELERATION_STRUCTURE_WRITE
                | Self::COLOR_ATTACHMENT_WRITE,
        )
    }
}

/// Kind of resource bound at a descriptor set binding.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DescriptorType {
    Uniform,
    Storage,
    Sampler,
    Texture,
    AccelerationStructure,
}

/// Image pixel formats the traversal nodes care about.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Rgba8Unorm,
    Rgba16Float,
    R32Uint,
    D32Float,
}

/// Pipeline stage a shader module is bound to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Compute,
    Vertex,
    Fragment,
    RayGen,
    ClosestHit,
    Miss,
}
