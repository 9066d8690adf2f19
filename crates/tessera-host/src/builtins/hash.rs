//! String-keyed hash table of values.

use std::any::Any;

use rustc_hash::FxHashMap;

use tessera_core::component::{CapabilitySet, Component, ComponentBox, ComponentHeader};
use tessera_core::host::HostApi;
use tessera_core::ids::CLID_HASHTABLE;
use tessera_core::stream::{Stream, StreamError};
use tessera_core::value::Value;

/// Hash table mapping strings to values.
///
/// Stored values are owned by the table: inserting transfers ownership,
/// and removal or finalization releases owned object payloads through
/// the host. Lookup hands out non-owning references.
pub struct HashTableObj {
    header: ComponentHeader,
    map: FxHashMap<String, Value>,
}

impl HashTableObj {
    /// Creates an empty table.
    pub fn new() -> Self {
        HashTableObj {
            header: ComponentHeader::new(CLID_HASHTABLE),
            map: FxHashMap::default(),
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True when the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterates the stored keys.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }
}

impl Default for HashTableObj {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for HashTableObj {
    fn header(&self) -> &ComponentHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut ComponentHeader {
        &mut self.header
    }

    fn class_name(&self) -> &str {
        "HashTable"
    }

    fn parent_class_name(&self) -> Option<&str> {
        Some("Object")
    }

    fn spawn(&self) -> ComponentBox {
        let mut obj = HashTableObj::new();
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
        CapabilitySet::HASH | CapabilitySet::ITERATOR | CapabilitySet::SERIALIZATION
    }

    fn equals(&self, other: &dyn Component) -> bool {
        let Some(other) = other.as_any().downcast_ref::<HashTableObj>() else {
            return false;
        };
        self.map.len() == other.map.len()
            && self.map.iter().all(|(key, value)| {
                other
                    .map
                    .get(key)
                    .is_some_and(|theirs| value.eq_value(theirs))
            })
    }

    fn finalize(&mut self, host: &dyn HostApi) {
        for (_, mut value) in self.map.drain() {
            value.unset(host);
        }
    }

    fn serialize_fields(&self, stream: &mut dyn Stream) -> Result<(), StreamError> {
        stream.write_u32(self.map.len() as u32)?;
        for (key, value) in &self.map {
            stream.write_len_string(key)?;
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
            let key = stream.read_len_string(u32::MAX as usize)?;
            let value = Value::deserialize_from(stream, host)?;
            if let Some(mut old) = self.map.insert(key, value) {
                old.unset(host);
            }
        }
        Ok(())
    }

    fn value_iter(&self) -> Option<Box<dyn Iterator<Item = Value> + '_>> {
        Some(Box::new(self.map.values().map(Value::clone_ref)))
    }

    fn hash_get(&self, key: &str, out: &mut Value) -> bool {
        match self.map.get(key) {
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

    fn hash_set(&mut self, key: &str, value: Value, host: &dyn HostApi) -> bool {
        if let Some(mut old) = self.map.insert(key.to_string(), value) {
            old.unset(host);
        }
        true
    }

    fn hash_remove(&mut self, key: &str, host: &dyn HostApi) -> bool {
        match self.map.remove(key) {
            Some(mut value) => {
                value.unset(host);
                true
            }
            None => false,
        }
    }
}
