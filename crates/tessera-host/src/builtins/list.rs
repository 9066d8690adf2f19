//! Ordered value container.

use std::any::Any;
use std::collections::VecDeque;

use tessera_core::component::{CapabilitySet, Component, ComponentBox, ComponentHeader};
use tessera_core::host::HostApi;
use tessera_core::ids::CLID_LIST;
use tessera_core::stream::{Stream, StreamError};
use tessera_core::value::Value;

/// Ordered list of values with cheap insertion at both ends.
///
/// Stored values are owned by the list: pushing transfers ownership,
/// and popping hands it back. Indexed reads through the array group
/// hand out non-owning references, and finalization releases whatever
/// owned payloads remain.
pub struct ListObj {
    header: ComponentHeader,
    entries: VecDeque<Value>,
}

impl ListObj {
    /// Creates an empty list.
    pub fn new() -> Self {
        ListObj {
            header: ComponentHeader::new(CLID_LIST),
            entries: VecDeque::new(),
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the list has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends a value at the tail, taking ownership.
    pub fn push_back(&mut self, value: Value) {
        self.entries.push_back(value);
    }

    /// Inserts a value at the head, taking ownership.
    pub fn push_front(&mut self, value: Value) {
        self.entries.push_front(value);
    }

    /// Removes and returns the tail value, ownership included.
    pub fn pop_back(&mut self) -> Option<Value> {
        self.entries.pop_back()
    }

    /// Removes and returns the head value, ownership included.
    pub fn pop_front(&mut self) -> Option<Value> {
        self.entries.pop_front()
    }
}

impl Default for ListObj {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for ListObj {
    fn header(&self) -> &ComponentHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut ComponentHeader {
        &mut self.header
    }

    fn class_name(&self) -> &str {
        "List"
    }

    fn parent_class_name(&self) -> Option<&str> {
        Some("Object")
    }

    fn spawn(&self) -> ComponentBox {
        let mut obj = ListObj::new();
        obj.header.set_class_id(self.header.class_id());
        Box::new(obj)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::ARRAY | CapabilitySet::ITERATOR | CapabilitySet::SERIALIZATION
    }

    fn equals(&self, other: &dyn Component) -> bool {
        let Some(other) = other.as_any().downcast_ref::<ListObj>() else {
            return false;
        };
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(&other.entries)
                .all(|(mine, theirs)| mine.eq_value(theirs))
    }

    fn finalize(&mut self, host: &dyn HostApi) {
        for mut value in self.entries.drain(..) {
            value.unset(host);
        }
    }

    fn serialize_fields(&self, stream: &mut dyn Stream) -> Result<(), StreamError> {
        stream.write_u32(self.entries.len() as u32)?;
        for value in &self.entries {
            value.serialize_into(stream)?;
        }
        Ok(())
    }

    fn deserialize_fields(
        &mut self,
        stream: &mut dyn Stream,
        host: &dyn HostApi,
    ) -> Result<(), StreamError> {
        let count = stream.read_u32()?;
        for _ in 0..count {
            self.entries.push_back(Value::deserialize_from(stream, host)?);
        }
        Ok(())
    }

    fn value_iter(&self) -> Option<Box<dyn Iterator<Item = Value> + '_>> {
        Some(Box::new(self.entries.iter().map(Value::clone_ref)))
    }

    fn array_len(&self) -> Option<usize> {
        Some(self.entries.len())
    }

    fn array_get(&self, index: usize, out: &mut Value) -> bool {
        match self.entries.get(index) {
            Some(value) => {
                *out = value.clone_ref();
                true
            }
            None => {
                *out = Value::Void;
                false
            }
        }
    }

    fn array_set(&mut self, index: usize, value: Value, host: &dyn HostApi) -> bool {
        match self.entries.get_mut(index) {
            Some(slot) => {
                let mut old = std::mem::replace(slot, value);
                old.unset(host);
                true
            }
            None => {
                let mut value = value;
                value.unset(host);
                false
            }
        }
    }
}
