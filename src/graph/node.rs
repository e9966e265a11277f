//! Node trait, lifecycle, and the per-execution render context.

use ash::vk;
use thiserror::Error;

use crate::slots::{SlotError, SlotView};

/// A render-graph node's position in its own lifecycle, independent of
/// the graph's compiled/dirty state (spec lifecycle: Declared -> Set
/// up -> Compiled -> Executable -> Dirty -> Cleaned).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NodeLifecycle {
    Declared,
    SetUp,
    Compiled,
    Executable,
    Dirty,
    Cleaned,
}

#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Slot(#[from] SlotError),
    #[error("node-specific failure: {0}")]
    Other(String),
}

/// Resources a node needs for one frame's execution.
pub struct RenderContext<'a> {
    pub command_buffer: vk::CommandBuffer,
    pub frame_index: u64,
    pub slots: SlotView<'a>,
}

/// A single render-graph stage.
///
/// `set_up` runs once, the first time the node is scheduled after being
/// added, and again each time a dirty recompile re-runs it; `render`
/// runs every frame the node is scheduled. `clean_up` runs immediately
/// before a dirty node's `set_up` re-runs, releasing whatever that
/// earlier `set_up` acquired, and on every still-set-up node at graph
/// shutdown, in reverse registration order (LIFO), mirroring a stack
/// unwind.
pub trait Node: Send + Sync {
    fn set_up(&mut self) -> Result<(), NodeError> {
        Ok(())
    }

    fn render(&mut self, ctx: &mut RenderContext<'_>) -> Result<(), NodeError>;

    fn clean_up(&mut self) {}
}
