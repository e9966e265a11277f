//! Descriptor set allocation via growable per-shape pools.
//!
//! Descriptor sets with the same binding shape (same counts of each
//! [`DescriptorType`]) are served from the same bucket of pools; a
//! bucket grows its pools geometrically as it runs out of room.

use std::num::NonZeroU32;

use ash::vk;
use hashbrown::HashMap;
use slab::Slab;

use super::device::{Device, DeviceError};
use super::DescriptorType;

const MIN_POOL_SIZE: NonZeroU32 = NonZeroU32::new(4).unwrap();
const MAX_POOL_SIZE: NonZeroU32 = NonZeroU32::new(64).unwrap();
const GROWTH_FACTOR: NonZeroU32 = NonZeroU32::new(2).unwrap();

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
struct ResourceCount {
    uniform_buffers: u32,
    storage_buffers: u32,
    samplers: u32,
    textures: u32,
    acceleration_structures: u32,
}

impl ResourceCount {
    fn from_bindings(bindings: &[DescriptorType]) -> Self {
        let mut count = Self::default();
        for binding in bindings {
            match binding {
                DescriptorType::Uniform => count.uniform_buffers += 1,
                DescriptorType::Storage => count.storage_buffers += 1,
                DescriptorType::Sampler => count.samplers += 1,
                DescriptorType::Texture => count.textures += 1,
                DescriptorType::AccelerationStructure => count.acceleration_structures += 1,
            }
        }
        count
    }
}

pub struct AllocatedDescriptorSet {
    set: vk::DescriptorSet,
    bucket: ResourceCount,
    pool: usize,
}

impl AllocatedDescriptorSet {
    pub fn raw(&self) -> vk::DescriptorSet {
        self.set
    }
}

pub struct DescriptorSetAllocator {
    device: Device,
    buckets: HashMap<ResourceCount, DescriptorPoolBucket>,
}

impl DescriptorSetAllocator {
    pub fn new(device: Device) -> Self {
        Self {
            device,
            buckets: HashMap::new(),
        }
    }

    /// # Safety
    ///
    /// `layout` must describe exactly the bindings given in `bindings`
    /// and must have been created on the same device.
    pub unsafe fn alloc(
        &mut self,
        bindings: &[DescriptorType],
        layout: vk::DescriptorSetLayout,
    ) -> Result<AllocatedDescriptorSet, DeviceError> {
        let count = ResourceCount::from_bindings(bindings);
        let bucket = self.buckets.entry(count).or_insert_with(DescriptorPoolBucket::new);

        let (set, pool) = unsafe { bucket.alloc(&self.device, &count, layout) }?;
        Ok(AllocatedDescriptorSet {
            set,
            bucket: count,
            pool,
        })
    }

    /// # Safety
    ///
    /// `descriptor_set` must have come from this allocator and must not
    /// be used again afterward.
    pub unsafe fn dealloc(&mut self, descriptor_set: AllocatedDescriptorSet) {
        if let Some(bucket) = self.buckets.get_mut(&descriptor_set.bucket) {
            bucket.free(descriptor_set.pool);
        }
    }
}

struct Pool {
    pool: vk::DescriptorPool,
    free: u32,
    allocated: u32,
}

struct DescriptorPoolBucket {
    pools: Slab<Pool>,
    next_pool_size: NonZeroU32,
}

impl DescriptorPoolBucket {
    fn new() -> Self {
        Self {
            pools: Slab::new(),
            next_pool_size: MIN_POOL_SIZE,
        }
    }

    unsafe fn alloc(
        &mut self,
        device: &Device,
        count: &ResourceCount,
        layout: vk::DescriptorSetLayout,
    ) -> Result<(vk::DescriptorSet, usize), DeviceError> {
        for (key, pool) in self.pools.iter_mut() {
            if pool.free == 0 {
                continue;
            }
            match unsafe { device.allocate_descriptor_set(pool.pool, layout) } {
                Ok(set) => {
                    pool.free -= 1;
                    pool.allocated += 1;
                    return Ok((set, key));
                }
                Err(DeviceError::OutOfPoolMemory) => continue,
                Err(err) => return Err(err),
            }
        }

        let pool_size = self.next_pool_size;
        self.next_pool_size = self.next_pool_size.saturating_mul(GROWTH_FACTOR).min(MAX_POOL_SIZE);

        let sizes = [
            vk::DescriptorPoolSize::default()
                .ty(vk::DescriptorType::UNIFORM_BUFFER)
                .descriptor_count(count.uniform_buffers * pool_size.get()),
            vk::DescriptorPoolSize::default()
                .ty(vk::DescriptorType::STORAGE_BUFFER)
                .descriptor_count(count.storage_buffers * pool_size.get()),
            vk::DescriptorPoolSize::default()
                .ty(vk::DescriptorType::SAMPLER)
                .descriptor_count(count.samplers * pool_size.get()),
            vk::DescriptorPoolSize::default()
                .ty(vk::DescriptorType::SAMPLED_IMAGE)
                .descriptor_count(count.textures * pool_size.get()),
            vk::DescriptorPoolSize::default()
                .ty(vk::DescriptorType::ACCELERATION_STRUCTURE_KHR)
                .descriptor_count(count.acceleration_structures * pool_size.get()),
        ];
        let create_info = vk::DescriptorPoolCreateInfo::default()
            .max_sets(pool_size.get())
            .pool_sizes(&sizes);
        let pool = unsafe { device.create_descriptor_pool(&create_info) }?;

        let key = self.pools.insert(Pool {
            pool,
            free: pool_size.get(),
            allocated: 0,
        });

        let entry = &mut self.pools[key];
        let set = match unsafe { device.allocate_descriptor_set(entry.pool, layout) } {
            Ok(set) => set,
            Err(err) => {
                self.pools.remove(key);
                return Err(err);
            }
        };
        entry.free -= 1;
        entry.allocated += 1;
        Ok((set, key))
    }

    fn free(&mut self, key: usize) {
        if let Some(pool) = self.pools.get_mut(key) {
            pool.free += 1;
            pool.allocated -= 1;
        }
    }
}
