//! Kahn's algorithm over resource-access dependencies, batching the
//! barriers needed between each wave of schedulable nodes.
//!
//! Two nodes touching the same slot are ordered by the access they
//! declared: any other access creates an edge from every prior accessor
//! to the new one, since a write must be visible (or ordered after) all
//! previous accesses, and a read must happen after the last write.

use std::collections::VecDeque;

use hashbrown::{HashMap, HashSet};
use nohash_hasher::BuildNoHashHasher;

use crate::backend::AccessFlags;
use crate::slots::SlotLabel;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ResourceAccess {
    pub slot: SlotLabel,
    pub access: AccessFlags,
}

pub trait ScheduleNode {
    fn resources(&self) -> &[ResourceAccess];
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Barrier {
    pub slot: SlotLabel,
    pub src_access: AccessFlags,
    pub dst_access: AccessFlags,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Step {
    Barrier(Barrier),
    Node(usize),
}

/// Caches allocation capacities across frames, so a stable graph shape
/// stops reallocating once it has warmed up.
#[derive(Default)]
pub struct Scheduler {
    resource_map_cap: usize,
    predecessors_cap: usize,
    successors_cap: usize,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule<T: ScheduleNode>(
        &mut self,
        nodes: &[T],
        explicit_edges: &[(usize, usize)],
    ) -> Vec<Step> {
        let mut resource_accesses: HashMap<SlotLabel, Vec<usize>> =
            HashMap::with_capacity(self.resource_map_cap);
        let mut last_access: HashMap<SlotLabel, AccessFlags> = HashMap::new();
        let mut predecessors: Vec<Option<HashSet<usize, BuildNoHashHasher<usize>>>> =
            Vec::with_capacity(self.predecessors_cap);
        predecessors.resize_with(nodes.len(), || None);
        let mut successors: Vec<Vec<usize>> = Vec::with_capacity(self.successors_cap);
        successors.resize_with(nodes.len(), Vec::new);

        for &(from, to) in explicit_edges {
            predecessors[to].get_or_insert_with(HashSet::default).insert(from);
            successors[from].push(to);
        }

        for (index, node) in nodes.iter().enumerate() {
            let mut node_preds: HashSet<usize, BuildNoHashHasher<usize>> = HashSet::default();

            for resource in node.resources() {
                if let Some(preds) = resource_accesses.get(&resource.slot) {
                    for &pred in preds {
                        node_preds.insert(pred);
                    }
                }
                resource_accesses.entry(resource.slot).or_default().push(index);
            }

            for &pred in &node_preds {
                successors[pred].push(index);
            }

            match &mut predecessors[index] {
                Some(existing) => existing.extend(node_preds),
                slot @ None => {
                    if !node_preds.is_empty() {
                        *slot = Some(node_preds);
                    }
                }
            }
        }

        self.resource_map_cap = resource_accesses.capacity();
        self.predecessors_cap = predecessors.capacity();
        self.successors_cap = successors.capacity();

        let mut queue: VecDeque<usize> = VecDeque::new();
        for (index, preds) in predecessors.iter().enumerate() {
            if preds.is_none() {
                queue.push_back(index);
            }
        }

        let mut steps = Vec::with_capacity(nodes.len());
        let mut scheduled = vec![false; nodes.len()];

        while !queue.is_empty() {
            let wave: Vec<usize> = queue.drain(..).collect();

            for &index in &wave {
                for &succ in &successors[index] {
                    if let Some(preds) = &mut predecessors[succ] {
                        preds.remove(&index);
                        if preds.is_empty() {
                            predecessors[succ] = None;
                            queue.push_back(succ);
                        }
                    }
                }
            }

            for &index in &wave {
                let node = &nodes[index];
                for res in node.resources() {
                    let prior = last_access.get(&res.slot).copied();
                    let needs_barrier = match prior {
                        Some(prior) => !(prior == res.access && res.access.is_read_only()),
                        None => false,
                    };
                    if needs_barrier {
                        steps.push(Step::Barrier(Barrier {
                            slot: res.slot,
                            src_access: prior.unwrap(),
                            dst_access: res.access,
                        }));
                    }
                    last_access.insert(res.slot, res.access);
                }
            }

            for &index in &wave {
                steps.push(Step::Node(index));
                scheduled[index] = true;
            }
        }

        debug_assert!(
            scheduled.iter().all(|&s| s),
            "dependency cycle: not every node could be scheduled"
        );

        steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestNode {
        resources: Vec<ResourceAccess>,
    }

    impl ScheduleNode for TestNode {
        fn resources(&self) -> &[ResourceAccess] {
            &self.resources
        }
    }

    #[test]
    fn writer_is_scheduled_before_reader_with_a_barrier() {
        let nodes = vec![
            TestNode {
                resources: vec![ResourceAccess {
                    slot: SlotLabel::new("a"),
                    access: AccessFlags::SHADER_WRITE,
                }],
            },
            TestNode {
                resources: vec![ResourceAccess {
                    slot: SlotLabel::new("a"),
                    access: AccessFlags::SHADER_READ,
                }],
            },
        ];
        let mut scheduler = Scheduler::new();
        let steps = scheduler.schedule(&nodes, &[]);

        let node_order: Vec<usize> = steps
            .iter()
            .filter_map(|s| match s {
                Step::Node(i) => Some(*i),
                _ => None,
            })
            .collect();
        assert_eq!(node_order, vec![0, 1]);
        assert!(steps.iter().any(|s| matches!(s, Step::Barrier(_))));
    }

    #[test]
    fn independent_nodes_have_no_ordering_constraint() {
        let nodes = vec![
            TestNode {
                resources: vec![ResourceAccess {
                    slot: SlotLabel::new("a"),
                    access: AccessFlags::SHADER_WRITE,
                }],
            },
            TestNode {
                resources: vec![ResourceAccess {
                    slot: SlotLabel::new("b"),
                    access: AccessFlags::SHADER_WRITE,
                }],
            },
        ];
        let mut scheduler = Scheduler::new();
        let steps = scheduler.schedule(&nodes, &[]);
        assert_eq!(
            steps
                .iter()
                .filter(|s| matches!(s, Step::Node(_)))
                .count(),
            2
        );
    }

    #[test]
    fn explicit_edge_orders_otherwise_unrelated_nodes() {
        let nodes = vec![
            TestNode { resources: vec![] },
            TestNode { resources: vec![] },
        ];
        let mut scheduler = Scheduler::new();
        let steps = scheduler.schedule(&nodes, &[(1, 0)]);
        let node_order: Vec<usize> = steps
            .iter()
            .filter_map(|s| match s {
                Step::Node(i) => Some(*i),
                _ => None,
            })
            .collect();
        assert_eq!(node_order, vec![1, 0]);
    }
}
