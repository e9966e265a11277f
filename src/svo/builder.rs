//! Test-only synthetic octree construction.
//!
//! Host-side construction of real octrees is out of scope for this
//! crate; this builder exists purely so the traversal kernel's unit and
//! scenario tests have small, explicit octrees to run against without
//! depending on an external voxelizer.

use std::collections::VecDeque;

use super::descriptor::{NodeDescriptor, NO_BRICK};

/// A child of an octree node, by octant (0..8).
pub enum NodeSpec {
    /// A node with zero or more children. A `None` entry in `children`
    /// means that octant is empty.
    Internal {
        children: [Option<Box<NodeSpec>>; 8],
    },
    /// A leaf, optionally referencing a brick.
    Leaf { brick_index: Option<u32> },
}

impl NodeSpec {
    pub fn leaf(brick_index: u32) -> Self {
        NodeSpec::Leaf {
            brick_index: Some(brick_index),
        }
    }

    pub fn empty_leaf() -> Self {
        NodeSpec::Leaf { brick_index: None }
    }

    pub fn internal(children: [Option<Box<NodeSpec>>; 8]) -> Self {
        NodeSpec::Internal { children }
    }
}

/// Builds a flat, index-0-rooted node buffer from a [`NodeSpec`] tree,
/// preserving the packed-child-array invariant that internal children
/// precede leaf children.
pub fn build(root: NodeSpec) -> Vec<NodeDescriptor> {
    // Placeholder until we know each node's final fields.
    let mut nodes: Vec<NodeDescriptor> = vec![NodeDescriptor::leaf(0, false, 0, 0, NO_BRICK, 0)];
    let mut queue: VecDeque<(usize, NodeSpec)> = VecDeque::new();
    queue.push_back((0, root));

    while let Some((index, spec)) = queue.pop_front() {
        match spec {
            NodeSpec::Leaf { brick_index } => {
                nodes[index] =
                    NodeDescriptor::leaf(0, false, 0, 0, brick_index.unwrap_or(NO_BRICK), 0);
            }
            NodeSpec::Internal { children } => {
                let mut present: Vec<(u8, NodeSpec)> = Vec::new();
                for (octant, child) in children.into_iter().enumerate() {
                    if let Some(child) = child {
                        present.push((octant as u8, *child));
                    }
                }
                // Internal children precede leaf children in memory.
                present.sort_by_key(|(_, spec)| matches!(spec, NodeSpec::Leaf { .. }));

                let mut valid_mask = 0u8;
                let mut leaf_mask = 0u8;
                for (octant, spec) in &present {
                    valid_mask |= 1 << octant;
                    if matches!(spec, NodeSpec::Leaf { .. }) {
                        leaf_mask |= 1 << octant;
                    }
                }

                let child_pointer = if present.is_empty() {
                    0
                } else {
                    (nodes.len() - index) as u32
                };

                for (_, child_spec) in present {
                    nodes.push(NodeDescriptor::leaf(0, false, 0, 0, NO_BRICK, 0));
                    let child_index = nodes.len() - 1;
                    queue.push_back((child_index, child_spec));
                }

                nodes[index] =
                    NodeDescriptor::internal(child_pointer, false, valid_mask, leaf_mask, 0, 0);
            }
        }
    }

    nodes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_leaf_root() {
        let mut children: [Option<Box<NodeSpec>>; 8] = Default::default();
        children[0] = Some(Box::new(NodeSpec::leaf(0)));
        let nodes = build(NodeSpec::internal(children));

        assert_eq!(nodes.len(), 2);
        assert!(nodes[0].child_exists(0));
        assert!(nodes[0].child_is_leaf(0));
        assert_eq!(nodes[0].child_array_index(0), 0);
        assert_eq!(nodes[1].brick_index(), 0);
    }
}
