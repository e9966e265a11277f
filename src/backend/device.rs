//! A thin, cloneable handle to an externally-bootstrapped Vulkan
//! device. Instance/device creation, surface setup and queue
//! selection happen in the embedding application; this crate only
//! consumes the result.

use ash::vk;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("vulkan call failed: {0:?}")]
    Vulkan(vk::Result),
    #[error("out of pool memory")]
    OutOfPoolMemory,
}

impl From<vk::Result> for DeviceError {
    fn from(result: vk::Result) -> Self {
        match result {
            vk::Result::ERROR_OUT_OF_POOL_MEMORY | vk::Result::ERROR_FRAGMENTED_POOL => {
                DeviceError::OutOfPoolMemory
            }
            other => DeviceError::Vulkan(other),
        }
    }
}

/// A render-capable Vulkan device and its identifying queue family.
#[derive(Clone)]
pub struct Device {
    pub raw: ash::Device,
    pub physical_device: vk::PhysicalDevice,
    pub queue_family: u32,
}

impl Device {
    pub fn new(raw: ash::Device, physical_device: vk::PhysicalDevice, queue_family: u32) -> Self {
        Self {
            raw,
            physical_device,
            queue_family,
        }
    }

    /// # Safety
    ///
    /// `create_info` must describe a valid descriptor pool for this
    /// device.
    pub unsafe fn create_descriptor_pool(
        &self,
        create_info: &vk::DescriptorPoolCreateInfo,
    ) -> Result<vk::DescriptorPool, DeviceError> {
        unsafe { self.raw.create_descriptor_pool(create_info, None) }.map_err(Into::into)
    }

    /// # Safety
    ///
    /// `pool` must have been created by this device and must not be
    /// destroyed while any set allocated from it is still alive.
    pub unsafe fn allocate_descriptor_set(
        &self,
        pool: vk::DescriptorPool,
        layout: vk::DescriptorSetLayout,
    ) -> Result<vk::DescriptorSet, DeviceError> {
        let layouts = [layout];
        let info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(pool)
            .set_layouts(&layouts);
        let sets = unsafe { self.raw.allocate_descriptor_sets(&info) }.map_err(DeviceError::from)?;
        Ok(sets[0])
    }
}
