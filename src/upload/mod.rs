//! Staging & Upload Budgeting (component C8).
//!
//! [`staging::StagingPool`] keeps a small set of pre-warmed staging
//! buffers so that streaming a dirty brick or palette doesn't hit the
//! host allocator on the common path, and [`staging::BatchUploader`]
//! groups pending transfers by destination queue so one batch signals
//! one timeline point instead of one per transfer. [`budget::BudgetManager`]
//! watches the total staging footprint against a configured budget and
//! warns once per frame if it's crossed.

pub mod budget;
pub mod staging;

pub use budget::BudgetManager;
pub use staging::{BatchUploader, PendingUpload, StagingPool};
