//! Builtin component classes registered by every host at startup.
//!
//! Builtins occupy the reserved low end of the class id space so their
//! ids are identical across hosts and can be baked into plugins.

mod array;
mod buffer;
mod file;
mod hash;
mod list;
mod number;
mod object;
mod string;
mod tree;

pub use array::{FloatArrayObj, IntArrayObj, StringArrayObj};
pub use buffer::BufferObj;
pub use file::FileObj;
pub use hash::HashTableObj;
pub use list::ListObj;
pub use number::{BooleanObj, DoubleObj, FloatObj, IntegerObj, LongObj};
pub use object::BaseObject;
pub use string::StrObj;
pub use tree::TreeNodeObj;

use tessera_core::host::{InstantiationPolicy, RegistryError};
use tessera_core::ids::{
    CLID_BOOLEAN, CLID_BUFFER, CLID_DOUBLE, CLID_FILE, CLID_FLOAT, CLID_FLOATARRAY,
    CLID_HASHTABLE, CLID_INTARRAY, CLID_INTEGER, CLID_LIST, CLID_LONG, CLID_OBJECT, CLID_STRING,
    CLID_STRINGARRAY, CLID_TREENODE,
};

use crate::registry::ClassRegistry;

/// Installs every builtin class at its reserved id. The generic base
/// registers first so the other builtins can name it as their parent.
pub fn register_all(registry: &mut ClassRegistry) -> Result<(), RegistryError> {
    registry.register_builtin(
        CLID_OBJECT,
        Box::new(BaseObject::new()),
        InstantiationPolicy::Normal,
    )?;
    registry.register_builtin(
        CLID_BOOLEAN,
        Box::new(BooleanObj::new()),
        InstantiationPolicy::Normal,
    )?;
    registry.register_builtin(
        CLID_INTEGER,
        Box::new(IntegerObj::new()),
        InstantiationPolicy::Normal,
    )?;
    registry.register_builtin(
        CLID_LONG,
        Box::new(LongObj::new()),
        InstantiationPolicy::Normal,
    )?;
    registry.register_builtin(
        CLID_FLOAT,
        Box::new(FloatObj::new()),
        InstantiationPolicy::Normal,
    )?;
    registry.register_builtin(
        CLID_DOUBLE,
        Box::new(DoubleObj::new()),
        InstantiationPolicy::Normal,
    )?;
    registry.register_builtin(
        CLID_STRING,
        Box::new(StrObj::new()),
        InstantiationPolicy::Normal,
    )?;
    registry.register_builtin(
        CLID_BUFFER,
        Box::new(BufferObj::new()),
        InstantiationPolicy::Normal,
    )?;
    registry.register_builtin(
        CLID_FILE,
        Box::new(FileObj::new()),
        InstantiationPolicy::Normal,
    )?;
    registry.register_builtin(
        CLID_HASHTABLE,
        Box::new(HashTableObj::new()),
        InstantiationPolicy::Normal,
    )?;
    registry.register_builtin(
        CLID_INTARRAY,
        Box::new(IntArrayObj::new()),
        InstantiationPolicy::Normal,
    )?;
    registry.register_builtin(
        CLID_FLOATARRAY,
        Box::new(FloatArrayObj::new()),
        InstantiationPolicy::Normal,
    )?;
    registry.register_builtin(
        CLID_STRINGARRAY,
        Box::new(StringArrayObj::new()),
        InstantiationPolicy::Normal,
    )?;
    registry.register_builtin(
        CLID_LIST,
        Box::new(ListObj::new()),
        InstantiationPolicy::Normal,
    )?;
    registry.register_builtin(
        CLID_TREENODE,
        Box::new(TreeNodeObj::new()),
        InstantiationPolicy::Normal,
    )?;
    Ok(())
}
