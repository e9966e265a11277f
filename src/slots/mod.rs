//! Resource Slot System (component C3).
//!
//! A sealed union of the GPU handles this crate's nodes pass between
//! each other, with explicit nullability/scope metadata so the graph
//! compiler can reject a missing required input before a single frame
//! runs.

pub mod descriptor;
pub mod registry;
pub mod variant;

pub use descriptor::{
    NodeLabel, Nullability, Scope, SlotError, SlotFlags, SlotLabel, SlotRequirement, SlotRole,
};
pub use registry::{SlotTable, SlotView};
pub use variant::{Registered, Variant};
