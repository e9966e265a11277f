//! Pre-warmed staging buffer buckets and the batched uploader that
//! draws from them.
//!
//! Buckets are sized so that almost every upload (a dirty brick, a
//! palette update, a TLAS instance buffer) fits a bucket without
//! touching the host allocator; anything larger falls back to a
//! one-shot buffer sized exactly for that transfer.

use crate::backend::Buffer;

/// One bucket size class, pre-warmed with `count` buffers of `size`
/// bytes each.
#[derive(Copy, Clone, Debug)]
struct BucketSpec {
    size: u64,
    count: usize,
}

const BUCKET_SPECS: &[BucketSpec] = &[
    BucketSpec { size: 64 * 1024, count: 4 },
    BucketSpec { size: 1024 * 1024, count: 2 },
    BucketSpec { size: 16 * 1024 * 1024, count: 2 },
];

struct Bucket {
    size: u64,
    free: Vec<Buffer>,
}

/// A pool of pre-warmed staging buffers, selected best-fit-ascending:
/// the smallest bucket that still fits the request. A request larger
/// than every bucket gets a dedicated one-shot buffer instead of
/// growing a bucket permanently.
pub struct StagingPool {
    buckets: Vec<Bucket>,
}

impl StagingPool {
    /// Pre-warms every bucket by calling `alloc` once per buffer.
    pub fn new(mut alloc: impl FnMut(u64) -> Buffer) -> Self {
        let buckets = BUCKET_SPECS
            .iter()
            .map(|spec| Bucket {
                size: spec.size,
                free: (0..spec.count).map(|_| alloc(spec.size)).collect(),
            })
            .collect();
        Self { buckets }
    }

    /// Acquires a buffer able to hold `size` bytes: a pooled bucket
    /// buffer on the common path, or `None` if every bucket able to
    /// fit it is currently exhausted (the caller should fall back to
    /// [`Self::one_shot`]).
    pub fn acquire(&mut self, size: u64) -> Option<Buffer> {
        let bucket = self
            .buckets
            .iter_mut()
            .filter(|b| b.size >= size)
            .min_by_key(|b| b.size)?;
        bucket.free.pop()
    }

    /// Returns a buffer to its bucket once the upload it served has
    /// been consumed by the GPU.
    pub fn release(&mut self, buffer: Buffer) {
        if let Some(bucket) = self.buckets.iter_mut().find(|b| b.size == buffer.size) {
            bucket.free.push(buffer);
        }
        // A buffer whose size doesn't match any bucket was a one-shot
        // allocation and is simply dropped here.
    }

    /// Allocates a dedicated buffer for a transfer too large for any
    /// bucket, or for a bucket that's momentarily out of free buffers.
    pub fn one_shot(&self, size: u64, alloc: impl FnOnce(u64) -> Buffer) -> Buffer {
        alloc(size)
    }

    pub fn bucket_sizes(&self) -> impl Iterator<Item = u64> + '_ {
        self.buckets.iter().map(|b| b.size)
    }
}

/// One pending transfer, grouped into a batch by destination queue so
/// the uploader can signal a single timeline point per batch instead
/// of per-transfer.
pub struct PendingUpload {
    pub staging: Buffer,
    pub destination: Buffer,
    pub size: u64,
    pub queue_family: u32,
}

/// Groups pending uploads by destination queue family; each group
/// becomes one command-buffer submission with one timeline signal.
#[derive(Default)]
pub struct BatchUploader {
    groups: hashbrown::HashMap<u32, Vec<PendingUpload>>,
}

impl BatchUploader {
    pub fn new() -> Self {
        Self {
            groups: hashbrown::HashMap::new(),
        }
    }

    pub fn push(&mut self, upload: PendingUpload) {
        self.groups.entry(upload.queue_family).or_default().push(upload);
    }

    /// Drains every group, in no particular cross-group order (each
    /// group is independent and signals its own timeline point).
    pub fn drain_batches(&mut self) -> impl Iterator<Item = (u32, Vec<PendingUpload>)> + '_ {
        self.groups.drain()
    }

    pub fn pending_count(&self) -> usize {
        self.groups.values().map(|g| g.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::buffer::BufferUsage;
    use ash::vk;

    fn dummy_buffer(size: u64) -> Buffer {
        Buffer::new(vk::Buffer::null(), vk::DeviceMemory::null(), size, BufferUsage::empty())
    }

    #[test]
    fn acquires_the_smallest_bucket_that_fits() {
        let mut pool = StagingPool::new(dummy_buffer);
        let buf = pool.acquire(32 * 1024).unwrap();
        assert_eq!(buf.size, 64 * 1024);
    }

    #[test]
    fn exhausted_bucket_returns_none_rather_than_growing() {
        let mut pool = StagingPool::new(dummy_buffer);
        for _ in 0..4 {
            pool.acquire(64 * 1024).unwrap();
        }
        assert!(pool.acquire(64 * 1024).is_none());
    }

    #[test]
    fn released_buffer_is_reusable() {
        let mut pool = StagingPool::new(dummy_buffer);
        let buf = pool.acquire(1024).unwrap();
        pool.release(buf);
        assert!(pool.acquire(1024).is_some());
    }

    #[test]
    fn batches_are_grouped_by_queue_family() {
        let mut uploader = BatchUploader::new();
        uploader.push(PendingUpload {
            staging: dummy_buffer(1024),
            destination: dummy_buffer(1024),
            size: 1024,
            queue_family: 0,
        });
        uploader.push(PendingUpload {
            staging: dummy_buffer(1024),
            destination: dummy_buffer(1024),
            size: 1024,
            queue_family: 1,
        });
        let batches: Vec<_> = uploader.drain_batches().collect();
        assert_eq!(batches.len(), 2);
    }
}
