//! A raw GPU buffer handle plus the bookkeeping the upload and graph
//! modules need to recycle it safely.

use ash::vk;

bitflags::bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        const TRANSFER_SRC = 0b0000_0001;
        const TRANSFER_DST = 0b0000_0010;
        const STORAGE = 0b0000_0100;
        const UNIFORM = 0b0000_1000;
        const ACCELERATION_STRUCTURE_INPUT = 0b0001_0000;
        const ACCELERATION_STRUCTURE_STORAGE = 0b0010_0000;
    }
}

/// A GPU buffer. `handle` and `memory` are `NULL_HANDLE` for a
/// default-constructed (not-yet-allocated) buffer.
#[derive(Debug)]
pub struct Buffer {
    pub handle: vk::Buffer,
    pub memory: vk::DeviceMemory,
    pub size: u64,
    pub usage: BufferUsage,
}

impl Buffer {
    pub fn new(handle: vk::Buffer, memory: vk::DeviceMemory, size: u64, usage: BufferUsage) -> Self {
        Self {
            handle,
            memory,
            size,
            usage,
        }
    }

    /// A placeholder buffer with no backing allocation, used by tests
    /// and by slots that have not yet been populated this frame.
    pub fn null() -> Self {
        Self {
            handle: vk::Buffer::null(),
            memory: vk::DeviceMemory::null(),
            size: 0,
            usage: BufferUsage::empty(),
        }
    }

    pub fn is_null(&self) -> bool {
        self.handle == vk::Buffer::null()
    }
}
