//! Per-frame slot storage: typed read/write access gated by the
//! permissions the scheduler computed at compile time.

use hashbrown::HashMap;

use super::descriptor::{SlotError, SlotFlags, SlotLabel};
use super::variant::{self, Registered, Variant};

/// The live values for one frame's execution of the graph, plus the
/// permission table the compiler produced for the node currently
/// running.
pub struct SlotTable {
    values: HashMap<SlotLabel, Variant>,
}

impl SlotTable {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn contains(&self, label: SlotLabel) -> bool {
        self.values.contains_key(&label)
    }

    pub(crate) fn values_mut(&mut self) -> &mut HashMap<SlotLabel, Variant> {
        &mut self.values
    }
}

impl Default for SlotTable {
    fn default() -> Self {
        Self::new()
    }
}

/// A view over [`SlotTable`] scoped to one node's granted permissions,
/// handed to [`crate::graph::node::RenderContext`].
pub struct SlotView<'a> {
    permissions: &'a HashMap<SlotLabel, SlotFlags>,
    values: &'a mut HashMap<SlotLabel, Variant>,
}

impl<'a> SlotView<'a> {
    pub(crate) fn new(
        permissions: &'a HashMap<SlotLabel, SlotFlags>,
        values: &'a mut HashMap<SlotLabel, Variant>,
    ) -> Self {
        Self {
            permissions,
            values,
        }
    }

    pub fn read<T: Registered>(&self, label: SlotLabel) -> Result<&T, SlotError> {
        let flags = self
            .permissions
            .get(&label)
            .copied()
            .ok_or(SlotError::NotRegistered)?;
        if !flags.contains(SlotFlags::READ) {
            return Err(SlotError::NotRegistered);
        }
        let value = self.values.get(&label).ok_or(SlotError::MissingRequired)?;
        variant::downcast(value).ok_or(SlotError::InvalidType)
    }

    pub fn write<T: Registered>(&mut self, label: SlotLabel, value: T) -> Result<(), SlotError> {
        let flags = self
            .permissions
            .get(&label)
            .copied()
            .ok_or(SlotError::NotRegistered)?;
        if !flags.contains(SlotFlags::WRITE) {
            return Err(SlotError::NotRegistered);
        }
        self.values.insert(label, variant::upcast(value));
        Ok(())
    }

    pub fn write_in_place<T: Registered>(
        &mut self,
        label: SlotLabel,
        f: impl FnOnce(&mut T),
    ) -> Result<(), SlotError> {
        let flags = self
            .permissions
            .get(&label)
            .copied()
            .ok_or(SlotError::NotRegistered)?;
        if !flags.contains(SlotFlags::WRITE) {
            return Err(SlotError::NotRegistered);
        }
        let value = self.values.get_mut(&label).ok_or(SlotError::MissingRequired)?;
        let typed = variant::downcast_mut(value).ok_or(SlotError::InvalidType)?;
        f(typed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Buffer;

    #[test]
    fn write_then_read_round_trips() {
        let mut values = HashMap::new();
        let mut permissions = HashMap::new();
        permissions.insert(SlotLabel::new("a"), SlotFlags::READ | SlotFlags::WRITE);

        let mut view = SlotView::new(&permissions, &mut values);
        view.write(SlotLabel::new("a"), Buffer::null()).unwrap();
        assert!(view.read::<Buffer>(SlotLabel::new("a")).is_ok());
    }

    #[test]
    fn read_without_permission_is_rejected() {
        let mut values = HashMap::new();
        let permissions = HashMap::new();
        let view = SlotView::new(&permissions, &mut values);
        assert_eq!(
            view.read::<Buffer>(SlotLabel::new("a")),
            Err(SlotError::NotRegistered)
        );
    }
}
