//! Message identity: reserved built-in IDs plus auto-assigned IDs for
//! application-defined messages.

use std::any::TypeId;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

use hashbrown::HashMap;
use parking_lot::Mutex;

/// IDs below this are reserved for messages this crate defines itself
/// (frame lifecycle, graph dirtying).
pub const RESERVED_ID_CEILING: u32 = 1000;

static NEXT_ID: AtomicU32 = AtomicU32::new(RESERVED_ID_CEILING);

fn registry() -> &'static Mutex<HashMap<TypeId, u32>> {
    static REGISTRY: OnceLock<Mutex<HashMap<TypeId, u32>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// A message type that can travel through the [`super::EventBus`].
pub trait Message: Send + Sync + 'static {
    /// A reserved, fixed ID (`< RESERVED_ID_CEILING`). Types that don't
    /// need a stable wire ID should use [`Message::id`]'s default,
    /// which assigns one lazily on first use.
    const RESERVED_ID: Option<u32> = None;

    /// The message's runtime-assigned numeric ID. Stable for the
    /// lifetime of the process, not across runs.
    fn id() -> u32 {
        if let Some(id) = Self::RESERVED_ID {
            return id;
        }
        let mut map = registry().lock();
        *map.entry(TypeId::of::<Self>())
            .or_insert_with(|| NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Published once at the start of each frame, before any node's
/// `execute` runs.
#[derive(Copy, Clone, Debug)]
pub struct FrameStart {
    pub frame_index: u64,
}

impl Message for FrameStart {
    const RESERVED_ID: Option<u32> = Some(1);
}

/// Published once at the end of each frame, after every node has run.
#[derive(Copy, Clone, Debug)]
pub struct FrameEnd {
    pub frame_index: u64,
}

impl Message for FrameEnd {
    const RESERVED_ID: Option<u32> = Some(2);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Foo;
    impl Message for Foo {}

    struct Bar;
    impl Message for Bar {}

    #[test]
    fn auto_assigned_ids_are_stable_and_distinct_and_above_reserved() {
        let a = Foo::id();
        let b = Bar::id();
        assert_ne!(a, b);
        assert!(a >= RESERVED_ID_CEILING);
        assert!(b >= RESERVED_ID_CEILING);
        assert_eq!(Foo::id(), a);
    }
}
