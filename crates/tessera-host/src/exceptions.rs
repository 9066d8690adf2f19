//! Exception class registry.
//!
//! Exception classes form a name-keyed single-inheritance hierarchy
//! separate from the component class table. Ids are host-local;
//! plugins resolve names at load time. Registration is idempotent so
//! plugin load order cannot change which id a name resolves to.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use tessera_core::ids::ExceptionId;

/// Core exception names every host registers at startup, in id order.
/// The first entry is the hierarchy root.
pub const CORE_EXCEPTIONS: &[(&str, Option<&str>)] = &[
    ("Error", None),
    ("CriticalError", Some("Error")),
    ("InvalidPointer", Some("CriticalError")),
    ("TypeMismatch", Some("CriticalError")),
    ("ClassTypeMismatch", Some("TypeMismatch")),
    ("NativeClassTypeMismatch", Some("ClassTypeMismatch")),
    ("ClassLimitExceeded", Some("CriticalError")),
    ("ArrayOutOfBounds", Some("CriticalError")),
    ("ReadArrayOutOfBounds", Some("ArrayOutOfBounds")),
    ("WriteArrayOutOfBounds", Some("ArrayOutOfBounds")),
    ("ConstraintViolation", Some("CriticalError")),
    ("NotFound", Some("Error")),
];

struct Entry {
    name: String,
    base: Option<ExceptionId>,
}

struct Inner {
    by_name: FxHashMap<String, ExceptionId>,
    entries: Vec<Entry>,
}

/// Thread-safe exception class table.
pub struct ExceptionRegistry {
    inner: Mutex<Inner>,
}

impl ExceptionRegistry {
    /// Creates a registry pre-seeded with the core hierarchy.
    pub fn new() -> Self {
        let registry = ExceptionRegistry {
            inner: Mutex::new(Inner {
                by_name: FxHashMap::default(),
                entries: Vec::new(),
            }),
        };
        for (name, base) in CORE_EXCEPTIONS {
            let base_id = base.and_then(|b| registry.id_by_name(b));
            registry.register(name, base_id);
        }
        registry
    }

    /// Registers `name` derived from `base`, or returns the existing id
    /// when the name is already registered with the same base. A
    /// conflicting re-registration (same name, different base) returns
    /// `None`.
    pub fn register(&self, name: &str, base: Option<ExceptionId>) -> Option<ExceptionId> {
        let mut inner = self.inner.lock();
        if let Some(&id) = inner.by_name.get(name) {
            let existing = &inner.entries[id.0 as usize];
            if existing.base == base {
                return Some(id);
            }
            log::warn!(
                "exception `{name}` re-registered with a different base; keeping the original"
            );
            return None;
        }
        if let Some(base) = base {
            if inner.entries.get(base.0 as usize).is_none() {
                return None;
            }
        }
        let id = ExceptionId(inner.entries.len() as u32);
        inner.entries.push(Entry {
            name: name.to_string(),
            base,
        });
        inner.by_name.insert(name.to_string(), id);
        Some(id)
    }

    /// Resolves an exception id by name.
    pub fn id_by_name(&self, name: &str) -> Option<ExceptionId> {
        self.inner.lock().by_name.get(name).copied()
    }

    /// Name of a registered exception.
    pub fn name_by_id(&self, id: ExceptionId) -> Option<String> {
        self.inner
            .lock()
            .entries
            .get(id.0 as usize)
            .map(|e| e.name.clone())
    }

    /// True when `id` is `base` or derives from it.
    pub fn is_a(&self, id: ExceptionId, base: ExceptionId) -> bool {
        let inner = self.inner.lock();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == base {
                return true;
            }
            cursor = inner.entries.get(current.0 as usize).and_then(|e| e.base);
        }
        false
    }
}

impl Default for ExceptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
