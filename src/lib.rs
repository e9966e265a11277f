#![deny(unsafe_op_in_unsafe_fn)]

//! Sparse-voxel-octree ray traversal and rendering pipeline compiler.
//!
//! The crate is organised leaves-first, mirroring the component split in
//! the design notes: the data model (`svo`) and the kernel that walks it
//! (`traversal`) know nothing about the graph; the graph (`graph`) and
//! event bus (`events`) know nothing about shaders; the shader pipeline
//! (`shader`) produces a binding ABI that graph nodes consume without the
//! graph ever parsing SPIR-V itself.

pub mod accel;
pub mod backend;
pub mod config;
pub mod events;
pub mod graph;
pub mod shader;
pub mod slots;
pub mod svo;
pub mod traversal;
pub mod upload;
