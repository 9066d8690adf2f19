//! Named callback slots.
//!
//! A slot is created by name and bound to a function separately, so the
//! plugin that calls a callback and the plugin that provides it can load
//! in either order. Calling through an unbound slot is a no-op.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use tessera_core::host::CallbackFn;
use tessera_core::ids::CallbackId;

struct Slot {
    name: String,
    fun: Option<CallbackFn>,
}

struct Inner {
    by_name: FxHashMap<String, CallbackId>,
    slots: Vec<Slot>,
}

/// Thread-safe callback slot table.
pub struct CallbackRegistry {
    inner: Mutex<Inner>,
}

impl CallbackRegistry {
    /// Creates an empty table.
    pub fn new() -> Self {
        CallbackRegistry {
            inner: Mutex::new(Inner {
                by_name: FxHashMap::default(),
                slots: Vec::new(),
            }),
        }
    }

    /// Finds or creates the slot named `name`.
    pub fn create(&self, name: &str) -> CallbackId {
        let mut inner = self.inner.lock();
        if let Some(&id) = inner.by_name.get(name) {
            return id;
        }
        let id = CallbackId(inner.slots.len() as u32);
        inner.slots.push(Slot {
            name: name.to_string(),
            fun: None,
        });
        inner.by_name.insert(name.to_string(), id);
        id
    }

    /// Resolves a slot id by name.
    pub fn id_by_name(&self, name: &str) -> Option<CallbackId> {
        self.inner.lock().by_name.get(name).copied()
    }

    /// Binds `fun` into the slot, or clears it with `None`. Returns
    /// false for an unknown slot.
    pub fn bind(&self, id: CallbackId, fun: Option<CallbackFn>) -> bool {
        let mut inner = self.inner.lock();
        match inner.slots.get_mut(id.0 as usize) {
            Some(slot) => {
                if slot.fun.is_some() && fun.is_some() {
                    log::debug!("callback `{}` rebound", slot.name);
                }
                slot.fun = fun;
                true
            }
            None => false,
        }
    }

    /// Current binding of the slot, if any.
    pub fn get(&self, id: CallbackId) -> Option<CallbackFn> {
        self.inner
            .lock()
            .slots
            .get(id.0 as usize)
            .and_then(|s| s.fun)
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}
