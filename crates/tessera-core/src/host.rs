//! The host interface seen by plugins and components.
//!
//! [`HostApi`] is the append-only service surface a host hands to
//! plugins: class registration and instantiation, pooled allocation,
//! exception and callback registries, and named mutexes. Every method
//! takes `&self` so the one host instance can be shared by reference
//! among all loaded plugins. Components carry no `Send` bound, so a
//! host and the objects it allocates belong to a single thread.

use thiserror::Error;

use crate::component::{Component, ComponentBox, PoolHint};
use crate::ids::{CallbackId, ClassId, ContextId, ExceptionId, MutexId};
use crate::value::Value;

/// How instances of a registered class may be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstantiationPolicy {
    /// Freely instantiable through the host.
    Normal,
    /// Instantiable by native code only; scripted `new` is refused.
    NativeOnly,
    /// Never instantiated; the class only contributes static surface.
    Static,
}

/// Bitset of optional host-side facilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostCapabilitySet(pub u8);

impl HostCapabilitySet {
    /// Exception registry and raising.
    pub const EXCEPTIONS: HostCapabilitySet = HostCapabilitySet(1 << 0);
    /// Named callback slots.
    pub const CALLBACKS: HostCapabilitySet = HostCapabilitySet(1 << 1);
    /// Host-managed mutexes.
    pub const MUTEXES: HostCapabilitySet = HostCapabilitySet(1 << 2);
    /// Object pooling behind `new_pooled_by_class_id`.
    pub const POOLING: HostCapabilitySet = HostCapabilitySet(1 << 3);

    /// Returns true when every flag in `other` is present in `self`.
    pub fn contains(self, other: HostCapabilitySet) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for HostCapabilitySet {
    type Output = HostCapabilitySet;

    fn bitor(self, rhs: HostCapabilitySet) -> HostCapabilitySet {
        HostCapabilitySet(self.0 | rhs.0)
    }
}

/// Function bound into a named callback slot.
pub type CallbackFn = fn(&dyn HostApi, &mut [Value]);

/// Class registration failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The dense class id space is exhausted.
    #[error("class id space exhausted ({0} classes)")]
    CeilingExceeded(u16),

    /// Another class already registered under this name.
    #[error("class `{0}` is already registered")]
    DuplicateName(String),

    /// The declared parent class has not been registered yet.
    #[error("parent class `{0}` is not registered")]
    UnknownParent(String),

    /// Builtin slot registration targeted an occupied id.
    #[error("class id {0} is already occupied")]
    SlotOccupied(ClassId),
}

/// Host service failures.
#[derive(Debug, Error)]
pub enum HostError {
    /// No class registered under the given id.
    #[error("no class registered under {0}")]
    UnknownClass(ClassId),

    /// The class's instantiation policy refuses host construction.
    #[error("class `{0}` is not instantiable")]
    NotInstantiable(String),

    /// The object was already released; its validation tag is stale.
    #[error("object released twice (stale validation tag)")]
    DoubleRelease,

    /// A pooled release named a pool or slot the pool layer does not
    /// recognize.
    #[error("pool handle does not match any live pooled object")]
    BadPoolHandle,

    /// No mutex registered under the given id.
    #[error("no mutex registered under id {}", (.0).0)]
    UnknownMutex(MutexId),

    /// Unlock of a mutex that is not currently locked.
    #[error("mutex {} is not locked", (.0).0)]
    MutexNotLocked(MutexId),

    /// The plugin was built against an incompatible host interface
    /// major version.
    #[error("plugin `{name}` was built for host interface {version:#010x}")]
    IncompatibleInterface {
        /// Plugin name.
        name: String,
        /// Packed interface version the plugin was built against.
        version: u32,
    },

    /// A plugin with this name is already loaded.
    #[error("plugin `{0}` is already loaded")]
    PluginAlreadyLoaded(String),

    /// Unload of a plugin that is not loaded.
    #[error("plugin `{0}` is not loaded")]
    PluginNotLoaded(String),

    /// Registration failure, forwarded from the class registry.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Services a host provides to components and plugins.
///
/// This trait only ever grows by appending defaulted methods, so
/// components written against an older host surface keep working under
/// newer hosts.
pub trait HostApi {
    /// Optional facilities this host implements.
    fn host_capabilities(&self) -> HostCapabilitySet;

    // ------------------------------------------------------------------
    // Class registry
    // ------------------------------------------------------------------

    /// Registers a class from a template instance and returns its
    /// freshly assigned id.
    fn register_class(
        &self,
        template: ComponentBox,
        policy: InstantiationPolicy,
    ) -> Result<ClassId, RegistryError>;

    /// Looks up a class id by name.
    fn class_id_by_name(&self, name: &str) -> Option<ClassId>;

    /// Looks up a class name by id.
    fn class_name_by_id(&self, id: ClassId) -> Option<String>;

    // ------------------------------------------------------------------
    // Allocation
    // ------------------------------------------------------------------

    /// Heap-allocates a fresh instance of the class.
    fn new_by_class_id(&self, id: ClassId) -> Result<ComponentBox, HostError>;

    /// Allocates an instance through the class's object pool, falling
    /// back to the heap when the class opts out of pooling or its pool
    /// is exhausted.
    fn new_pooled_by_class_id(&self, id: ClassId, hint: PoolHint)
        -> Result<ComponentBox, HostError>;

    /// Allocates a fresh instance of `template`'s class and deep-copies
    /// the template into it.
    fn clone_component(&self, template: &dyn Component) -> Result<ComponentBox, HostError>;

    /// Releases an instance: finalizes it, invalidates its tag, and
    /// either parks it in its pool slot or frees it.
    fn delete_component(&self, component: ComponentBox) -> Result<(), HostError>;

    /// Ancestry test against the registry's typecast matrix. Returns
    /// false, never fails, for missing or invalidated objects.
    fn is_instance(&self, component: Option<&dyn Component>, base: ClassId) -> bool;

    /// Number of live heap allocations the host has handed out. Pooled
    /// recycling does not move this counter.
    fn allocation_count(&self) -> i64;

    // ------------------------------------------------------------------
    // Exceptions
    // ------------------------------------------------------------------

    /// Registers an exception class under `name`, optionally derived
    /// from `base`. Returns the existing id when the name is already
    /// registered with the same base.
    fn exception_register(&self, name: &str, base: Option<ExceptionId>) -> Option<ExceptionId>;

    /// Resolves an exception id by name.
    fn exception_id_by_name(&self, name: &str) -> Option<ExceptionId>;

    /// True when `id` is `base` or derives from it.
    fn exception_is_a(&self, id: ExceptionId, base: ExceptionId) -> bool;

    /// Records a raised exception against `context`.
    fn exception_raise(
        &self,
        context: ContextId,
        id: ExceptionId,
        message: &str,
        file: &str,
        line: u32,
    );

    // ------------------------------------------------------------------
    // Callbacks
    // ------------------------------------------------------------------

    /// Finds or creates the callback slot named `name`.
    fn callback_create(&self, name: &str) -> CallbackId;

    /// Resolves a callback slot id by name.
    fn callback_id_by_name(&self, name: &str) -> Option<CallbackId>;

    /// Binds `fun` into the slot (or clears it with `None`). Returns
    /// false for an unknown slot.
    fn callback_bind(&self, id: CallbackId, fun: Option<CallbackFn>) -> bool;

    /// Current binding of the slot, if any.
    fn callback_by_id(&self, id: CallbackId) -> Option<CallbackFn>;

    // ------------------------------------------------------------------
    // Mutexes
    // ------------------------------------------------------------------

    /// Creates a host-managed mutex, optionally published under a name.
    fn mutex_create(&self, name: Option<&str>) -> MutexId;

    /// Destroys a mutex. The caller must ensure no thread still holds
    /// or waits on it.
    fn mutex_destroy(&self, id: MutexId) -> Result<(), HostError>;

    /// Finds a named mutex.
    fn mutex_find_by_name(&self, name: &str) -> Option<MutexId>;

    /// Blocks until the mutex is acquired.
    fn mutex_lock(&self, id: MutexId) -> Result<(), HostError>;

    /// Releases the mutex. The calling thread must be the holder.
    fn mutex_unlock(&self, id: MutexId) -> Result<(), HostError>;
}

/// Packs a plugin interface version as `0x00_maj_min_patch`.
pub const fn pack_version(major: u8, minor: u8, patch: u8) -> u32 {
    ((major as u32) << 16) | ((minor as u32) << 8) | patch as u32
}

/// Splits a packed interface version into (major, minor, patch).
pub const fn unpack_version(version: u32) -> (u8, u8, u8) {
    (
        ((version >> 16) & 0xFF) as u8,
        ((version >> 8) & 0xFF) as u8,
        (version & 0xFF) as u8,
    )
}

/// Interface version of this host surface.
pub const HOST_INTERFACE_VERSION: u32 = pack_version(1, 0, 0);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_packing() {
        let v = pack_version(1, 2, 3);
        assert_eq!(v, 0x0001_0203);
        assert_eq!(unpack_version(v), (1, 2, 3));
    }

    #[test]
    fn test_host_capability_set() {
        let caps = HostCapabilitySet::EXCEPTIONS | HostCapabilitySet::POOLING;
        assert!(caps.contains(HostCapabilitySet::POOLING));
        assert!(!caps.contains(HostCapabilitySet::MUTEXES));
    }
}
