//! Timeline-semaphore bookkeeping.
//!
//! The crate never waits on the GPU from a blocking call; instead
//! callers compare an observed counter value against the value a
//! resource was last touched at.

use ash::vk;

/// A monotonically increasing counter backed by a Vulkan timeline
/// semaphore.
#[derive(Debug)]
pub struct TimelineSemaphore {
    pub handle: vk::Semaphore,
}

impl TimelineSemaphore {
    pub fn new(handle: vk::Semaphore) -> Self {
        Self { handle }
    }
}

/// A point on a [`TimelineSemaphore`]'s counter.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimelinePoint(pub u64);

/// Tracks the last-observed value of a timeline semaphore without
/// issuing a Vulkan call, for use in host-testable recycling logic. A
/// real embedding updates this from `vkGetSemaphoreCounterValue`.
#[derive(Debug, Default)]
pub struct FrameClock {
    completed: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self { completed: 0 }
    }

    pub fn completed(&self) -> TimelinePoint {
        TimelinePoint(self.completed)
    }

    pub fn advance_to(&mut self, value: u64) {
        self.completed = self.completed.max(value);
    }

    pub fn is_reached(&self, point: TimelinePoint) -> bool {
        self.completed >= point.0
    }
}
