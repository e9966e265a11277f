//! ESVO Traversal Kernel (component C1).
//!
//! Everything needed to cast a single ray against a packed node buffer
//! and its bricks: coordinate setup (`ray`), the DFS walk (`kernel`),
//! the per-brick DDA march (`brick_dda`), and the LOD cutoff (`lod`).
//! This module is pure host logic with no GPU dependency, mirroring the
//! reference compute/closest-hit shaders under `assets/shaders/`.

pub mod brick_dda;
pub mod kernel;
pub mod lod;
pub mod ray;

pub use brick_dda::{BrickView, Sample};
pub use kernel::{traverse, FlatScene, Hit, SceneView, TraversalStats};
pub use lod::LodParams;
pub use ray::{Ray, RaySetup};
