//! Slot identity and access-mode metadata.

use thiserror::Error;

/// A unique identifier for a graph node.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeLabel(pub &'static str);

impl NodeLabel {
    #[inline]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }
}

/// A unique identifier for a slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SlotLabel(pub &'static str);

impl SlotLabel {
    /// The slot that always holds the frame's compressed octree buffer.
    pub const OCTREE_NODES: Self = Self("_OCTREE_NODES");
    /// The slot that always holds the frame's acceleration-structure TLAS.
    pub const TLAS: Self = Self("_TLAS");

    #[inline]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }
}

bitflags::bitflags! {
    /// Access mode a node declares for a slot.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct SlotFlags: u32 {
        const READ = 0b01;
        const WRITE = 0b10;
    }
}

/// Whether a slot must be populated for the node to be schedulable.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Nullability {
    Required,
    Optional,
}

/// A slot's relationship to the node that declares it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SlotRole {
    /// The node produces this slot's value for downstream readers.
    Output,
    /// The node merely requires the slot's value to already exist.
    Dependency,
    /// Consulted only while `render` runs, never during `set_up`/`clean_up`.
    ExecuteOnly,
    /// Consulted only during `clean_up`, to release something acquired
    /// by a different node.
    CleanupOnly,
}

/// How long a slot's value is expected to live.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Scope {
    /// Private to one node instance; never shared across nodes.
    NodeLevel,
    /// Shared across the nodes making up one scheduled task, recreated
    /// each time that task runs.
    TaskLevel,
    /// Shared graph-wide, surviving across frames until explicitly
    /// invalidated.
    InstanceLevel,
}

/// A slot's declared contract, attached when a node registers it via
/// [`crate::graph::RenderGraph::add_slot_dependency`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SlotRequirement {
    pub flags: SlotFlags,
    pub nullability: Nullability,
    pub role: SlotRole,
    pub scope: Scope,
}

impl SlotRequirement {
    /// Fails if `role` is `Output` but `flags` never writes the slot: a
    /// node cannot claim to produce a value it only reads.
    pub fn new(
        flags: SlotFlags,
        nullability: Nullability,
        role: SlotRole,
        scope: Scope,
    ) -> Result<Self, SlotError> {
        if role == SlotRole::Output && !flags.contains(SlotFlags::WRITE) {
            return Err(SlotError::ReadOnlyOutput);
        }
        Ok(Self {
            flags,
            nullability,
            role,
            scope,
        })
    }

    pub fn required_frame(flags: SlotFlags) -> Self {
        Self::new(flags, Nullability::Required, SlotRole::Dependency, Scope::TaskLevel)
            .expect("a Dependency role is compatible with any access flags")
    }

    pub fn optional_persistent(flags: SlotFlags) -> Self {
        Self::new(flags, Nullability::Optional, SlotRole::Dependency, Scope::InstanceLevel)
            .expect("a Dependency role is compatible with any access flags")
    }
}

/// Error that can occur on slot access operations.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SlotError {
    #[error("slot not registered")]
    NotRegistered,
    #[error("slot registered with mismatched type")]
    InvalidType,
    #[error("required slot is missing")]
    MissingRequired,
    #[error("a read-only slot cannot be declared in the Output role")]
    ReadOnlyOutput,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_role_requires_write_access() {
        let err = SlotRequirement::new(SlotFlags::READ, Nullability::Required, SlotRole::Output, Scope::TaskLevel)
            .unwrap_err();
        assert_eq!(err, SlotError::ReadOnlyOutput);
    }

    #[test]
    fn output_role_accepts_write_access() {
        let req = SlotRequirement::new(
            SlotFlags::READ | SlotFlags::WRITE,
            Nullability::Required,
            SlotRole::Output,
            Scope::TaskLevel,
        )
        .unwrap();
        assert_eq!(req.role, SlotRole::Output);
    }
}
