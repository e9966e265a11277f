//! SVO / Brick Data Model.
//!
//! Exposes pure, read-only accessors over the packed ESVO node buffer and
//! brick buffers. Host-side octree construction is out of scope;
//! `builder` (test-only) exists solely to produce the synthetic scenes
//! the traversal kernel's unit tests need to exercise against.

pub mod brick;
pub mod descriptor;
pub mod palette;

#[cfg(test)]
pub mod builder;

pub use brick::{CompressedBrick, UncompressedBrick};
pub use descriptor::NodeDescriptor;
pub use palette::{Material, MaterialPalette};

/// A read-only view over an ESVO node buffer, indexed from 0 with the
/// root always at index 0.
pub trait NodeBuffer {
    fn node(&self, index: u32) -> NodeDescriptor;
}

impl NodeBuffer for [NodeDescriptor] {
    #[inline]
    fn node(&self, index: u32) -> NodeDescriptor {
        self[index as usize]
    }
}

impl NodeBuffer for Vec<NodeDescriptor> {
    #[inline]
    fn node(&self, index: u32) -> NodeDescriptor {
        self[index as usize]
    }
}
