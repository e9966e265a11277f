//! End-to-end: a dependency chain A -> B -> C, where invalidating A
//! propagates through the event bus and forces all three nodes through
//! `set_up` again, in dependency order, on the next compile.

use std::sync::{Arc, Mutex};

use esvo_render::config::{EventBusConfig, GraphConfig};
use esvo_render::events::EventBus;
use esvo_render::graph::{Node, NodeError, RenderContext, RenderGraph};
use esvo_render::slots::NodeLabel;

struct RecordingNode {
    name: &'static str,
    log: Arc<Mutex<Vec<&'static str>>>,
}

impl Node for RecordingNode {
    fn set_up(&mut self) -> Result<(), NodeError> {
        self.log.lock().unwrap().push(self.name);
        Ok(())
    }

    fn render(&mut self, _ctx: &mut RenderContext<'_>) -> Result<(), NodeError> {
        Ok(())
    }
}

/// Logs `"{name}:set_up"` / `"{name}:clean_up"` so a test can assert on
/// the exact order the two ran in, not just that `set_up` ran.
struct LifecycleRecordingNode {
    name: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

impl Node for LifecycleRecordingNode {
    fn set_up(&mut self) -> Result<(), NodeError> {
        self.log.lock().unwrap().push(format!("{}:set_up", self.name));
        Ok(())
    }

    fn render(&mut self, _ctx: &mut RenderContext<'_>) -> Result<(), NodeError> {
        Ok(())
    }

    fn clean_up(&mut self) {
        self.log.lock().unwrap().push(format!("{}:clean_up", self.name));
    }
}

#[test]
fn invalidating_the_root_recompiles_the_whole_chain_in_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut graph = RenderGraph::new(GraphConfig::default());
    let mut events = EventBus::new(EventBusConfig::default());

    let a = NodeLabel::new("A");
    let b = NodeLabel::new("B");
    let c = NodeLabel::new("C");

    graph.add_node(a, RecordingNode { name: "A", log: log.clone() });
    graph.add_node(b, RecordingNode { name: "B", log: log.clone() });
    graph.add_node(c, RecordingNode { name: "C", log: log.clone() });
    graph.connect(a, b);
    graph.connect(b, c);

    graph.compile().unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["A", "B", "C"]);
    log.lock().unwrap().clear();

    // Simulate an external event causing A to be invalidated.
    graph.invalidate(a, &mut events);
    graph.process_invalidation_cascade(&mut events);
    graph.compile().unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["A", "B", "C"]);
}

#[test]
fn a_clean_node_outside_the_cascade_is_not_recompiled() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut graph = RenderGraph::new(GraphConfig::default());
    let mut events = EventBus::new(EventBusConfig::default());

    let a = NodeLabel::new("A");
    let b = NodeLabel::new("B");
    let unrelated = NodeLabel::new("Unrelated");

    graph.add_node(a, RecordingNode { name: "A", log: log.clone() });
    graph.add_node(b, RecordingNode { name: "B", log: log.clone() });
    graph.add_node(unrelated, RecordingNode { name: "Unrelated", log: log.clone() });
    graph.connect(a, b);

    graph.compile().unwrap();
    log.lock().unwrap().clear();

    graph.invalidate(b, &mut events);
    graph.process_invalidation_cascade(&mut events);
    graph.compile().unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["B"]);
}

#[test]
fn a_dirty_node_runs_clean_up_before_its_set_up_reruns() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut graph = RenderGraph::new(GraphConfig::default());
    let mut events = EventBus::new(EventBusConfig::default());

    let a = NodeLabel::new("A");
    let b = NodeLabel::new("B");

    graph.add_node(a, LifecycleRecordingNode { name: "A", log: log.clone() });
    graph.add_node(b, LifecycleRecordingNode { name: "B", log: log.clone() });
    graph.connect(a, b);

    graph.compile().unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["A:set_up", "B:set_up"]);
    log.lock().unwrap().clear();

    graph.invalidate(a, &mut events);
    graph.process_invalidation_cascade(&mut events);
    graph.compile().unwrap();

    // Both A (invalidated directly) and B (invalidated by cascade)
    // must release what their first set_up acquired before the fresh
    // one runs, in dependency order.
    assert_eq!(
        *log.lock().unwrap(),
        vec!["A:clean_up", "A:set_up", "B:clean_up", "B:set_up"],
    );
}

#[test]
fn a_node_set_up_for_the_first_time_skips_clean_up() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut graph = RenderGraph::new(GraphConfig::default());

    let a = NodeLabel::new("A");
    graph.add_node(a, LifecycleRecordingNode { name: "A", log: log.clone() });

    graph.compile().unwrap();

    // Nothing was set up before this node existed, so there is
    // nothing for clean_up to release.
    assert_eq!(*log.lock().unwrap(), vec!["A:set_up"]);
}
