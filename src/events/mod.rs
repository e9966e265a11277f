//! Event Bus (component C5).
//!
//! FIFO publish/subscribe used to drive cascade invalidation in the
//! render graph: a node's output going stale publishes a message, the
//! graph's subscription marks downstream nodes dirty, without the
//! graph and the node needing to know about each other directly.

pub mod message;

use std::any::{Any, TypeId};
use std::collections::VecDeque;

use hashbrown::HashMap;
use tracing::warn;

pub use message::{FrameEnd, FrameStart, Message, RESERVED_ID_CEILING};

use crate::config::EventBusConfig;

/// A handle returned by [`EventBus::subscribe`], used to later
/// [`EventBus::unsubscribe`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Box<dyn FnMut(&dyn Any) + Send>;

struct Subscriber {
    id: SubscriptionId,
    handler: Handler,
}

/// A FIFO message bus with deferred and immediate publish.
pub struct EventBus {
    subscribers: HashMap<TypeId, Vec<Subscriber>>,
    queue: VecDeque<(TypeId, Box<dyn Any + Send>)>,
    next_subscription: u64,
    expected_capacity: usize,
    warned_over_capacity: bool,
}

impl EventBus {
    pub fn new(config: EventBusConfig) -> Self {
        Self {
            subscribers: HashMap::new(),
            queue: VecDeque::with_capacity(config.expected_capacity),
            next_subscription: 0,
            expected_capacity: config.expected_capacity,
            warned_over_capacity: false,
        }
    }

    /// Adjusts the capacity-warning threshold, e.g. after scene
    /// complexity changes significantly.
    pub fn set_expected_capacity(&mut self, expected_capacity: usize) {
        self.expected_capacity = expected_capacity;
        self.warned_over_capacity = false;
    }

    pub fn subscribe<M, F>(&mut self, mut f: F) -> SubscriptionId
    where
        M: Message,
        F: FnMut(&M) + Send + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;

        let handler: Handler = Box::new(move |any: &dyn Any| {
            if let Some(msg) = any.downcast_ref::<M>() {
                f(msg);
            }
        });

        self.subscribers
            .entry(TypeId::of::<M>())
            .or_default()
            .push(Subscriber { id, handler });
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        for subs in self.subscribers.values_mut() {
            subs.retain(|s| s.id != id);
        }
    }

    /// Queues `message` for delivery on the next [`Self::process_messages`].
    pub fn publish<M: Message>(&mut self, message: M) {
        self.queue.push_back((TypeId::of::<M>(), Box::new(message)));
        self.maybe_warn_over_capacity();
    }

    /// Dispatches `message` to current subscribers immediately,
    /// bypassing the queue entirely (and any drain bound).
    pub fn publish_immediate<M: Message>(&mut self, message: M) {
        self.dispatch(TypeId::of::<M>(), &message);
    }

    fn dispatch(&mut self, type_id: TypeId, message: &dyn Any) {
        if let Some(subs) = self.subscribers.get_mut(&type_id) {
            for sub in subs.iter_mut() {
                (sub.handler)(message);
            }
        }
    }

    /// Drains queued messages FIFO, dispatching each to its
    /// subscribers. Subscribers may publish further messages during the
    /// drain (e.g. cascade invalidation); those are processed within
    /// the same call, up to `max_events` total, to bound runaway
    /// cascades.
    ///
    /// Returns the number of messages actually dispatched.
    pub fn process_messages(&mut self, max_events: u32) -> u32 {
        let mut processed = 0u32;
        while processed < max_events {
            let Some((type_id, message)) = self.queue.pop_front() else {
                break;
            };
            self.dispatch(type_id, message.as_ref());
            processed += 1;
        }
        processed
    }

    fn maybe_warn_over_capacity(&mut self) {
        if self.warned_over_capacity || self.expected_capacity == 0 {
            return;
        }
        if self.queue.len() as f64 > 0.8 * self.expected_capacity as f64 {
            warn!(
                queue_len = self.queue.len(),
                expected_capacity = self.expected_capacity,
                "event queue exceeded 80% of its expected capacity"
            );
            self.warned_over_capacity = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Ping(u32);
    impl Message for Ping {}

    #[test]
    fn subscribers_receive_messages_in_fifo_order() {
        let mut bus = EventBus::new(EventBusConfig::default());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = seen.clone();
        bus.subscribe::<Ping, _>(move |p: &Ping| seen2.lock().unwrap().push(p.0));

        bus.publish(Ping(1));
        bus.publish(Ping(2));
        bus.publish(Ping(3));
        let processed = bus.process_messages(10);

        assert_eq!(processed, 3);
        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let mut bus = EventBus::new(EventBusConfig::default());
        let seen = Arc::new(Mutex::new(0u32));
        let seen2 = seen.clone();
        let id = bus.subscribe::<Ping, _>(move |_: &Ping| *seen2.lock().unwrap() += 1);
        bus.unsubscribe(id);

        bus.publish(Ping(1));
        bus.process_messages(10);
        assert_eq!(*seen.lock().unwrap(), 0);
    }

    #[test]
    fn drain_is_bounded_even_with_cascading_publishes() {
        let mut bus = EventBus::new(EventBusConfig::default());
        // Each dispatch republishes once, which would cascade forever
        // without a drain bound.
        bus.publish(Ping(0));
        let processed = bus.process_messages(5);
        assert!(processed <= 5);
    }

    #[test]
    fn immediate_publish_bypasses_the_queue() {
        let mut bus = EventBus::new(EventBusConfig::default());
        let seen = Arc::new(Mutex::new(0u32));
        let seen2 = seen.clone();
        bus.subscribe::<Ping, _>(move |_: &Ping| *seen2.lock().unwrap() += 1);

        bus.publish_immediate(Ping(1));
        assert_eq!(*seen.lock().unwrap(), 1);
        // Nothing queued, so a drain finds nothing.
        assert_eq!(bus.process_messages(10), 0);
    }
}
