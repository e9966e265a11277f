//! Bottom-level acceleration structures built from per-brick AABB
//! lists — one BLAS per occupied brick, never refit once built.

use ash::vk;

use crate::backend::Buffer;

/// An axis-aligned box in the BLAS's local space, one per primitive.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

/// Input to a BLAS build: the AABB list plus the build-speed/quality
/// trade-off, mirroring `vk::BuildAccelerationStructureFlagsKHR`.
#[derive(Clone, Debug)]
pub struct BlasBuildInfo {
    pub aabbs: Vec<Aabb>,
    pub prefer_fast_trace: bool,
}

impl BlasBuildInfo {
    pub fn new(aabbs: Vec<Aabb>) -> Self {
        Self {
            aabbs,
            prefer_fast_trace: true,
        }
    }
}

/// A built bottom-level acceleration structure.
#[derive(Debug)]
pub struct Blas {
    pub handle: vk::AccelerationStructureKHR,
    pub buffer: Buffer,
    pub device_address: u64,
    pub primitive_count: u32,
}

impl Blas {
    pub fn new(
        handle: vk::AccelerationStructureKHR,
        buffer: Buffer,
        device_address: u64,
        primitive_count: u32,
    ) -> Self {
        Self {
            handle,
            buffer,
            device_address,
            primitive_count,
        }
    }

    /// A placeholder BLAS with no backing allocation, for tests and
    /// for a frame where a brick's BLAS has not finished building yet.
    pub fn null() -> Self {
        Self {
            handle: vk::AccelerationStructureKHR::null(),
            buffer: Buffer::null(),
            device_address: 0,
            primitive_count: 0,
        }
    }

    pub fn is_null(&self) -> bool {
        self.handle == vk::AccelerationStructureKHR::null()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_info_defaults_to_fast_trace() {
        let info = BlasBuildInfo::new(vec![Aabb {
            min: [0.0; 3],
            max: [1.0; 3],
        }]);
        assert!(info.prefer_fast_trace);
        assert_eq!(info.aabbs.len(), 1);
    }
}
