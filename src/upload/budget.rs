//! Tracks in-flight staging memory against [`UploadConfig::budget_bytes`]
//! and warns once when it crosses an 80% watermark, the same
//! warn-once-then-reset shape as `EventBus::maybe_warn_over_capacity`.

use tracing::warn;

use crate::config::UploadConfig;
use crate::events::{EventBus, FrameEnd, FrameStart};

/// Subscribes to [`FrameStart`]/[`FrameEnd`] to reset its per-frame
/// warning latch; callers report bytes in and out as uploads are
/// queued and retired.
pub struct BudgetManager {
    budget_bytes: u64,
    in_flight_bytes: u64,
    warned_this_frame: bool,
}

impl BudgetManager {
    pub fn new(config: UploadConfig) -> Self {
        Self {
            budget_bytes: config.budget_bytes,
            in_flight_bytes: 0,
            warned_this_frame: false,
        }
    }

    /// Registers this manager's `FrameStart`/`FrameEnd` handlers on
    /// `bus`. The manager itself must outlive the subscription, so
    /// embeddings typically wrap it in an `Arc<Mutex<_>>` before
    /// calling this.
    pub fn subscribe(bus: &mut EventBus, manager: std::sync::Arc<parking_lot::Mutex<Self>>) {
        let start = manager.clone();
        bus.subscribe::<FrameStart, _>(move |_: &FrameStart| {
            start.lock().warned_this_frame = false;
        });
        let end = manager;
        bus.subscribe::<FrameEnd, _>(move |_: &FrameEnd| {
            end.lock().check_watermark();
        });
    }

    /// Accounts for a newly queued upload's staging footprint.
    pub fn reserve(&mut self, bytes: u64) {
        self.in_flight_bytes += bytes;
        self.check_watermark();
    }

    /// Accounts for a batch's staging buffers being recycled.
    pub fn release(&mut self, bytes: u64) {
        self.in_flight_bytes = self.in_flight_bytes.saturating_sub(bytes);
    }

    pub fn in_flight_bytes(&self) -> u64 {
        self.in_flight_bytes
    }

    pub fn is_over_watermark(&self) -> bool {
        self.budget_bytes > 0 && self.in_flight_bytes as f64 > 0.8 * self.budget_bytes as f64
    }

    fn check_watermark(&mut self) {
        if self.warned_this_frame || !self.is_over_watermark() {
            return;
        }
        warn!(
            in_flight_bytes = self.in_flight_bytes,
            budget_bytes = self.budget_bytes,
            "upload staging usage exceeded 80% of its configured budget"
        );
        self.warned_this_frame = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crossing_the_watermark_flags_over_budget() {
        let mut mgr = BudgetManager::new(UploadConfig { budget_bytes: 1000 });
        assert!(!mgr.is_over_watermark());
        mgr.reserve(850);
        assert!(mgr.is_over_watermark());
    }

    #[test]
    fn releasing_bytes_drops_back_under_the_watermark() {
        let mut mgr = BudgetManager::new(UploadConfig { budget_bytes: 1000 });
        mgr.reserve(900);
        mgr.release(500);
        assert!(!mgr.is_over_watermark());
    }

    #[test]
    fn warning_latch_resets_on_frame_start() {
        let mut mgr = BudgetManager::new(UploadConfig { budget_bytes: 1000 });
        mgr.reserve(900);
        assert!(mgr.warned_this_frame);
        mgr.warned_this_frame = false;
        mgr.reserve(0);
        assert!(mgr.warned_this_frame);
    }
}
