//! Fence-gated recycling: a retired BLAS/TLAS buffer cannot be freed
//! until the GPU has finished every frame that might still be reading
//! it, tracked via [`FrameClock`] rather than a blocking wait.

use crate::backend::sync::{FrameClock, TimelinePoint};
use crate::backend::Buffer;

struct Retired {
    buffer: Buffer,
    safe_at: TimelinePoint,
}

/// Holds retired acceleration-structure buffers until the timeline
/// clock proves no in-flight frame still references them.
#[derive(Default)]
pub struct RecycleBin {
    pending: Vec<Retired>,
}

impl RecycleBin {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Queues `buffer` for recycling once the clock reaches `safe_at`
    /// (typically the frame index the buffer was retired on, plus the
    /// number of frames in flight).
    pub fn retire(&mut self, buffer: Buffer, safe_at: TimelinePoint) {
        self.pending.push(Retired { buffer, safe_at });
    }

    /// Drains every buffer now safe to actually free, in the order
    /// they were retired.
    pub fn collect_and_take(&mut self, clock: &FrameClock) -> Vec<Buffer> {
        let (ready, still_pending): (Vec<_>, Vec<_>) = self
            .pending
            .drain(..)
            .partition(|entry| clock.is_reached(entry.safe_at));
        self.pending = still_pending;
        ready.into_iter().map(|entry| entry.buffer).collect()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_is_recyclable_once_clock_reaches_its_safe_point() {
        let mut bin = RecycleBin::new();
        bin.retire(Buffer::null(), TimelinePoint(3));
        let mut clock = FrameClock::new();

        clock.advance_to(2);
        let freed = bin.collect_and_take(&clock);
        assert!(freed.is_empty());
        assert_eq!(bin.pending_count(), 1);

        clock.advance_to(3);
        let freed = bin.collect_and_take(&clock);
        assert_eq!(freed.len(), 1);
        assert_eq!(bin.pending_count(), 0);
    }
}
