//! Top-level acceleration structure: one instance per occupied brick's
//! BLAS, rebuilt (not refit) whenever the instance set changes shape.

use ash::vk;

use super::ArenaHandle;
use crate::backend::Buffer;

/// One entry in the TLAS instance buffer, referencing a BLAS by its
/// arena handle and device address rather than holding it alive.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TlasInstance {
    pub blas: ArenaHandle,
    pub blas_device_address: u64,
    pub transform: [[f32; 4]; 3],
    pub custom_index: u32,
    pub mask: u8,
}

/// A built top-level acceleration structure.
#[derive(Debug)]
pub struct Tlas {
    pub handle: vk::AccelerationStructureKHR,
    pub buffer: Buffer,
    pub instance_count: u32,
}

impl Tlas {
    pub fn new(handle: vk::AccelerationStructureKHR, buffer: Buffer, instance_count: u32) -> Self {
        Self {
            handle,
            buffer,
            instance_count,
        }
    }

    pub fn null() -> Self {
        Self {
            handle: vk::AccelerationStructureKHR::null(),
            buffer: Buffer::null(),
            instance_count: 0,
        }
    }
}

/// Accumulates instances across a frame and tracks whether the next
/// build must be a full rebuild.
///
/// Every change marks the TLAS dirty: hardware TLAS refit only adjusts
/// instance transforms, but brick occupancy changes add or remove
/// instances entirely, which refit cannot express, so this always
/// rebuilds rather than attempting a refit/rebuild split.
#[derive(Default)]
pub struct TlasBuilder {
    instances: Vec<TlasInstance>,
    dirty: bool,
}

impl TlasBuilder {
    pub fn new() -> Self {
        Self {
            instances: Vec::new(),
            dirty: true,
        }
    }

    pub fn clear(&mut self) {
        if !self.instances.is_empty() {
            self.dirty = true;
        }
        self.instances.clear();
    }

    pub fn push(&mut self, instance: TlasInstance) {
        self.instances.push(instance);
        self.dirty = true;
    }

    pub fn instances(&self) -> &[TlasInstance] {
        &self.instances
    }

    pub fn needs_rebuild(&self) -> bool {
        self.dirty
    }

    /// Called once the TLAS for this instance set has actually been
    /// built, so the next unchanged frame is a no-op.
    pub fn mark_built(&mut self) {
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(blas: ArenaHandle) -> TlasInstance {
        TlasInstance {
            blas,
            blas_device_address: 0,
            transform: [[0.0; 4]; 3],
            custom_index: 0,
            mask: 0xff,
        }
    }

    #[test]
    fn unchanged_instance_set_does_not_request_a_rebuild() {
        let mut builder = TlasBuilder::new();
        builder.push(instance(ArenaHandle::from_raw(0)));
        builder.mark_built();
        assert!(!builder.needs_rebuild());
    }

    #[test]
    fn pushing_an_instance_marks_the_builder_dirty_again() {
        let mut builder = TlasBuilder::new();
        builder.mark_built();
        builder.push(instance(ArenaHandle::from_raw(1)));
        assert!(builder.needs_rebuild());
    }
}
