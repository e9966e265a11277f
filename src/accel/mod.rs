//! Acceleration-Structure Lifecycle (component C7).
//!
//! BLASes are built once from per-brick AABB lists and never refit; the
//! TLAS is rebuilt (not refit) whenever the set of instances changes.
//! Both live in integer-indexed arenas rather than behind `Arc`s so a
//! TLAS can reference its BLASes without holding a strong reference
//! back into the arena that owns it — see [`ArenaHandle`].

pub mod blas;
pub mod recycle;
pub mod tlas;

use slab::Slab;
use thiserror::Error;

pub use blas::{Blas, BlasBuildInfo};
pub use recycle::RecycleBin;
pub use tlas::{Tlas, TlasBuilder, TlasInstance};

#[derive(Debug, Error)]
pub enum AccelError {
    #[error("acceleration structure handle {0:?} does not exist")]
    UnknownHandle(ArenaHandle),
    #[error("vulkan call failed: {0:?}")]
    Vulkan(ash::vk::Result),
}

impl From<ash::vk::Result> for AccelError {
    fn from(result: ash::vk::Result) -> Self {
        AccelError::Vulkan(result)
    }
}

/// An index into a [`BlasArena`] or [`TlasArena`]. Deliberately not a
/// smart pointer: a TLAS instance refers to a BLAS by handle, so
/// dropping a `Tlas` never cascades into dropping the `Blas`es it
/// points at.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ArenaHandle(usize);

impl ArenaHandle {
    #[cfg(test)]
    pub(crate) fn from_raw(index: usize) -> Self {
        Self(index)
    }
}

/// Owns every live BLAS, indexed by [`ArenaHandle`].
#[derive(Default)]
pub struct BlasArena {
    slots: Slab<Blas>,
}

impl BlasArena {
    pub fn new() -> Self {
        Self { slots: Slab::new() }
    }

    pub fn insert(&mut self, blas: Blas) -> ArenaHandle {
        ArenaHandle(self.slots.insert(blas))
    }

    pub fn get(&self, handle: ArenaHandle) -> Option<&Blas> {
        self.slots.get(handle.0)
    }

    /// Removes and returns the BLAS, for the caller to hand to a
    /// [`RecycleBin`] rather than free immediately.
    pub fn remove(&mut self, handle: ArenaHandle) -> Option<Blas> {
        self.slots.try_remove(handle.0)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Owns every live TLAS, indexed by [`ArenaHandle`]. In practice a
/// frame keeps at most one live TLAS, but the arena shape matches
/// [`BlasArena`] so recycling code can be shared between the two.
#[derive(Default)]
pub struct TlasArena {
    slots: Slab<Tlas>,
}

impl TlasArena {
    pub fn new() -> Self {
        Self { slots: Slab::new() }
    }

    pub fn insert(&mut self, tlas: Tlas) -> ArenaHandle {
        ArenaHandle(self.slots.insert(tlas))
    }

    pub fn get(&self, handle: ArenaHandle) -> Option<&Tlas> {
        self.slots.get(handle.0)
    }

    pub fn remove(&mut self, handle: ArenaHandle) -> Option<Tlas> {
        self.slots.try_remove(handle.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blas_arena_handles_stay_valid_after_unrelated_removal() {
        let mut arena = BlasArena::new();
        let a = arena.insert(Blas::null());
        let b = arena.insert(Blas::null());
        arena.remove(a);
        assert!(arena.get(b).is_some());
        assert!(arena.get(a).is_none());
    }
}
