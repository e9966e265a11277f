//! Render Graph (component C4).
//!
//! Nodes declare the slots they read and write; [`RenderGraph::compile`]
//! turns that into a topologically-sorted, barrier-batched execution
//! plan, cached until a node is marked dirty (directly, or by cascade
//! through [`crate::events::EventBus`] when something it depends on
//! changes).

pub mod cleanup;
pub mod node;
pub mod schedule;

use hashbrown::HashMap;
use thiserror::Error;

use crate::backend::AccessFlags;
use crate::config::GraphConfig;
use crate::events::{EventBus, FrameEnd, FrameStart};
use crate::slots::{NodeLabel, SlotError, SlotFlags, SlotLabel, SlotRequirement, SlotTable};

use cleanup::CleanupStack;
pub use node::{Node, NodeError, NodeLifecycle, RenderContext};
use schedule::{ResourceAccess, ScheduleNode, Scheduler, Step};

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("node {0:?} does not exist")]
    UnknownNode(&'static str),
    #[error("required slot {0:?} for node {1:?} has no writer")]
    MissingRequiredSlot(&'static str, &'static str),
    #[error(transparent)]
    Node(#[from] NodeError),
    #[error(transparent)]
    Slot(#[from] SlotError),
}

/// A message published whenever a node's output becomes stale, driving
/// cascade invalidation through the event bus.
pub struct NodeInvalidated(pub NodeLabel);
impl crate::events::Message for NodeInvalidated {}

struct NodeEntry {
    node: Box<dyn Node>,
    lifecycle: NodeLifecycle,
    node_dependencies: Vec<NodeLabel>,
    permissions: HashMap<SlotLabel, SlotFlags>,
    requirements: HashMap<SlotLabel, SlotRequirement>,
}

/// A render graph composed of [`Node`]s.
pub struct RenderGraph {
    order: Vec<NodeLabel>,
    nodes: HashMap<NodeLabel, NodeEntry>,
    scheduler: Scheduler,
    cached_steps: Option<Vec<Step>>,
    cleanup: CleanupStack,
    config: GraphConfig,
    dirty: std::collections::HashSet<NodeLabel>,
    frame_counter: u64,
}

impl RenderGraph {
    pub fn new(config: GraphConfig) -> Self {
        Self {
            order: Vec::new(),
            nodes: HashMap::new(),
            scheduler: Scheduler::new(),
            cached_steps: None,
            cleanup: CleanupStack::new(),
            config,
            dirty: std::collections::HashSet::new(),
            frame_counter: 0,
        }
    }

    /// How many times [`Self::render_frame`] has completed.
    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    pub fn add_node<T: Node + 'static>(&mut self, label: NodeLabel, node: T) {
        self.nodes.insert(
            label,
            NodeEntry {
                node: Box::new(node),
                lifecycle: NodeLifecycle::Declared,
                node_dependencies: Vec::new(),
                permissions: HashMap::new(),
                requirements: HashMap::new(),
            },
        );
        self.order.push(label);
        self.cached_steps = None;
    }

    /// Declares that `to` must run after `from`.
    pub fn connect(&mut self, from: NodeLabel, to: NodeLabel) {
        self.add_node_dependency(to, from);
    }

    pub fn add_node_dependency(&mut self, node: NodeLabel, depends_on: NodeLabel) {
        let Some(entry) = self.nodes.get_mut(&node) else {
            panic!("cannot add dependency: {:?} does not exist", node.0);
        };
        if !entry.node_dependencies.contains(&depends_on) {
            entry.node_dependencies.push(depends_on);
        }
        self.cached_steps = None;
    }

    pub fn add_slot_dependency(
        &mut self,
        node: NodeLabel,
        slot: SlotLabel,
        requirement: SlotRequirement,
    ) {
        let Some(entry) = self.nodes.get_mut(&node) else {
            panic!("cannot add slot: {:?} does not exist", node.0);
        };
        *entry.permissions.entry(slot).or_insert(SlotFlags::empty()) |= requirement.flags;
        entry.requirements.insert(slot, requirement);
        self.cached_steps = None;
    }

    /// Marks a node (and, by cascade, everything depending on it)
    /// dirty, forcing the next [`Self::compile`] to re-run its `set_up`.
    pub fn invalidate(&mut self, label: NodeLabel, events: &mut EventBus) {
        self.dirty.insert(label);
        events.publish(NodeInvalidated(label));
    }

    /// Processes pending invalidation cascades from the event bus:
    /// every node downstream (directly or transitively) of an
    /// invalidated node is also marked dirty.
    pub fn process_invalidation_cascade(&mut self, events: &mut EventBus) {
        events.process_messages(self.config.max_events_per_drain);
        if self.dirty.is_empty() {
            return;
        }

        let mut frontier: Vec<NodeLabel> = self.dirty.iter().copied().collect();
        while let Some(label) = frontier.pop() {
            for (candidate, entry) in &self.nodes {
                if entry.node_dependencies.contains(&label) && self.dirty.insert(*candidate) {
                    frontier.push(*candidate);
                }
            }
        }
        self.cached_steps = None;
    }

    /// Validates required slots, runs the scheduler, and recompiles
    /// every dirty node: `clean_up` (releasing whatever its last
    /// `set_up` acquired) followed by a fresh `set_up`, with a newly
    /// re-registered cleanup-stack entry. A node that was only just
    /// added skips `clean_up` — it has nothing to release yet.
    pub fn compile(&mut self) -> Result<(), GraphError> {
        for label in self.order.clone() {
            let entry = self.nodes.get(&label).unwrap();
            for (slot, req) in &entry.requirements {
                if req.nullability == crate::slots::Nullability::Required
                    && req.flags.contains(SlotFlags::READ)
                {
                    let has_writer = self.nodes.values().any(|other| {
                        other
                            .permissions
                            .get(slot)
                            .is_some_and(|f| f.contains(SlotFlags::WRITE))
                    });
                    if !has_writer {
                        return Err(GraphError::MissingRequiredSlot(slot.0, label.0));
                    }
                }
            }
        }

        let labels = self.order.clone();
        let entries: Vec<ScheduleEntry> = labels
            .iter()
            .map(|label| {
                let entry = self.nodes.get(label).unwrap();
                let resources = entry
                    .permissions
                    .iter()
                    .map(|(slot, flags)| ResourceAccess {
                        slot: *slot,
                        access: flags_to_access(*flags),
                    })
                    .collect();
                ScheduleEntry { resources }
            })
            .collect();

        let label_index: HashMap<NodeLabel, usize> =
            labels.iter().enumerate().map(|(i, l)| (*l, i)).collect();
        let explicit_edges: Vec<(usize, usize)> = labels
            .iter()
            .enumerate()
            .flat_map(|(to_idx, label)| {
                let entry = self.nodes.get(label).unwrap();
                entry
                    .node_dependencies
                    .iter()
                    .map(move |dep| (label_index[dep], to_idx))
            })
            .collect();

        let steps = self.scheduler.schedule(&entries, &explicit_edges);

        for label in &labels {
            let entry = self.nodes.get_mut(label).unwrap();
            let was_dirty = self.dirty.remove(label);
            if was_dirty && entry.lifecycle != NodeLifecycle::Declared {
                entry.node.clean_up();
                self.cleanup.remove(*label);
            }
            if entry.lifecycle == NodeLifecycle::Declared || was_dirty {
                entry.node.set_up()?;
                entry.lifecycle = NodeLifecycle::SetUp;
                self.cleanup.record_set_up(*label);
            }
            entry.lifecycle = NodeLifecycle::Compiled;
        }

        self.cached_steps = Some(steps);
        Ok(())
    }

    /// Executes one frame: publishes `FrameStart`, drains pending
    /// events and recompiles anything that went dirty as a result,
    /// executes every node in schedule order, then publishes
    /// `FrameEnd`, drains once more, and advances the frame counter.
    pub fn render_frame(
        &mut self,
        command_buffer: ash::vk::CommandBuffer,
        frame_index: u64,
        events: &mut EventBus,
        slots: &mut SlotTable,
    ) -> Result<(), GraphError> {
        events.publish(FrameStart { frame_index });
        self.process_invalidation_cascade(events);

        if self.cached_steps.is_none() || !self.dirty.is_empty() {
            self.compile()?;
        }
        let steps = self.cached_steps.as_ref().unwrap().clone();
        let labels = self.order.clone();

        for step in steps {
            match step {
                Step::Barrier(_barrier) => {
                    // Barrier recording is owned by the embedding
                    // application's command buffer; this crate only
                    // determines *when* one is needed.
                }
                Step::Node(index) => {
                    let label = labels[index];
                    let entry = self.nodes.get_mut(&label).unwrap();
                    let view = crate::slots::SlotView::new(&entry.permissions, slots.values_mut());
                    let mut ctx = RenderContext {
                        command_buffer,
                        frame_index,
                        slots: view,
                    };
                    entry.node.render(&mut ctx)?;
                    entry.lifecycle = NodeLifecycle::Executable;
                }
            }
        }

        events.publish(FrameEnd { frame_index });
        events.process_messages(self.config.max_events_per_drain);
        self.frame_counter += 1;
        Ok(())
    }

    /// Tears down every node in reverse set-up order.
    pub fn shutdown(&mut self) {
        let order: Vec<NodeLabel> = self.cleanup.drain_lifo().collect();
        for label in order {
            if let Some(entry) = self.nodes.get_mut(&label) {
                entry.node.clean_up();
                entry.lifecycle = NodeLifecycle::Cleaned;
            }
        }
    }
}

struct ScheduleEntry {
    resources: Vec<ResourceAccess>,
}

impl ScheduleNode for ScheduleEntry {
    fn resources(&self) -> &[ResourceAccess] {
        &self.resources
    }
}

fn flags_to_access(flags: SlotFlags) -> AccessFlags {
    let mut access = AccessFlags::empty();
    if flags.contains(SlotFlags::READ) {
        access |= AccessFlags::SHADER_READ;
    }
    if flags.contains(SlotFlags::WRITE) {
        access |= AccessFlags::SHADER_WRITE;
    }
    access
}
