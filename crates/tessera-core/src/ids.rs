//! Identifier newtypes shared between hosts and plugins.
//!
//! Class identifiers form a dense `0..MAX_CLASSES` space. The low end of
//! the space is reserved for the built-in classes the host registers at
//! startup, so their numeric ids are stable across every host build and
//! can be baked into compiled plugins.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Upper bound on the number of registered classes (builtin + dynamic).
pub const MAX_CLASSES: u16 = 256;

/// First class id handed out to dynamically registered classes.
///
/// Ids below this mark are reserved for builtins, including slots for
/// builtins a given host build does not ship.
pub const NUM_RESERVED_CLASSES: u16 = 64;

/// Identifier of a registered class, dense in `0..MAX_CLASSES`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub u16);

impl ClassId {
    /// Returns the raw index into the class table.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class#{}", self.0)
    }
}

// ============================================================================
// Reserved builtin class ids
// ============================================================================

/// Generic base class, root of every registered class hierarchy.
pub const CLID_OBJECT: ClassId = ClassId(0);
/// Boxed boolean.
pub const CLID_BOOLEAN: ClassId = ClassId(1);
/// Boxed 32-bit integer.
pub const CLID_INTEGER: ClassId = ClassId(2);
/// Boxed 64-bit integer.
pub const CLID_LONG: ClassId = ClassId(3);
/// Boxed 32-bit float.
pub const CLID_FLOAT: ClassId = ClassId(4);
/// Boxed 64-bit float.
pub const CLID_DOUBLE: ClassId = ClassId(5);
/// Owned character string.
pub const CLID_STRING: ClassId = ClassId(6);
/// Growable in-memory byte buffer with a stream interface.
pub const CLID_BUFFER: ClassId = ClassId(7);
/// Local file with a stream interface.
pub const CLID_FILE: ClassId = ClassId(8);
/// String-keyed hash table of values.
pub const CLID_HASHTABLE: ClassId = ClassId(9);
/// Dense array of 32-bit integers.
pub const CLID_INTARRAY: ClassId = ClassId(10);
/// Dense array of 32-bit floats.
pub const CLID_FLOATARRAY: ClassId = ClassId(11);
/// Array of owned strings.
pub const CLID_STRINGARRAY: ClassId = ClassId(12);
/// Ordered container of values with cheap insertion at both ends.
pub const CLID_LIST: ClassId = ClassId(13);
/// Named binary tree node carrying a value payload.
pub const CLID_TREENODE: ClassId = ClassId(14);

/// Identifier of a registered exception class.
///
/// Exception ids are host-local; plugins must resolve them by name at
/// load time rather than persisting them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExceptionId(pub u32);

impl fmt::Display for ExceptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exception#{}", self.0)
    }
}

/// Identifier of a named callback slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(pub u32);

/// Identifier of a host-managed mutex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MutexId(pub u64);

/// Identifier of an execution context (thread or script context).
///
/// Contexts are minted by the host; `ContextId::next` hands out
/// process-unique values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(pub u64);

impl ContextId {
    /// Mints a fresh, process-unique context id.
    pub fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        ContextId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "context#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_ids_are_unique() {
        let a = ContextId::next();
        let b = ContextId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn test_reserved_ids_below_dynamic_floor() {
        for clid in [
            CLID_OBJECT,
            CLID_BOOLEAN,
            CLID_INTEGER,
            CLID_LONG,
            CLID_FLOAT,
            CLID_DOUBLE,
            CLID_STRING,
            CLID_BUFFER,
            CLID_FILE,
            CLID_HASHTABLE,
            CLID_INTARRAY,
            CLID_FLOATARRAY,
            CLID_STRINGARRAY,
            CLID_LIST,
            CLID_TREENODE,
        ] {
            assert!(clid.0 < NUM_RESERVED_CLASSES);
        }
        assert!(NUM_RESERVED_CLASSES < MAX_CLASSES);
    }
}
