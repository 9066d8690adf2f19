//! The reference host.
//!
//! One [`Host`] owns the class registry, the object pools, and the
//! exception/callback/mutex services, and hands all of them to plugins
//! behind the [`HostApi`] trait. Every entry point takes `&self`, so
//! the loaded plugins all drive the host through shared references.
//! Components carry no `Send` bound, so the host and every object it
//! allocates stay on the thread that created the host.

use std::sync::atomic::{AtomicI64, Ordering};

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;

use tessera_core::component::{Component, ComponentBox, PoolHint, ValidationTag};
use tessera_core::host::{
    CallbackFn, HostApi, HostCapabilitySet, HostError, InstantiationPolicy, RegistryError,
};
use tessera_core::ids::{CallbackId, ClassId, ContextId, ExceptionId, MutexId};

use crate::callbacks::CallbackRegistry;
use crate::exceptions::ExceptionRegistry;
use crate::plugin::LoadedPlugin;
use crate::pool::{ObjectPool, PoolAcquire, PoolStats};
use crate::registry::ClassRegistry;
use crate::{builtins, mutexes::MutexService};

/// A raised exception recorded against its context.
#[derive(Debug, Clone)]
pub struct RaisedException {
    /// Exception class id.
    pub id: ExceptionId,
    /// Exception class name at the time of raising.
    pub name: String,
    /// Message supplied by the raiser.
    pub message: String,
    /// Source file of the raise site.
    pub file: String,
    /// Source line of the raise site.
    pub line: u32,
}

/// The reference host implementation.
pub struct Host {
    registry: RwLock<ClassRegistry>,
    pool: Mutex<ObjectPool>,
    exceptions: ExceptionRegistry,
    callbacks: CallbackRegistry,
    mutexes: MutexService,
    raised: Mutex<FxHashMap<ContextId, Vec<RaisedException>>>,
    live_allocations: AtomicI64,
    pub(crate) plugins: Mutex<FxHashMap<String, LoadedPlugin>>,
}

impl Host {
    /// Creates a host with the builtin classes and core exception
    /// hierarchy registered.
    pub fn new() -> Result<Host, RegistryError> {
        let mut registry = ClassRegistry::new();
        builtins::register_all(&mut registry)?;
        Ok(Host {
            registry: RwLock::new(registry),
            pool: Mutex::new(ObjectPool::new()),
            exceptions: ExceptionRegistry::new(),
            callbacks: CallbackRegistry::new(),
            mutexes: MutexService::new(),
            raised: Mutex::new(FxHashMap::default()),
            live_allocations: AtomicI64::new(0),
            plugins: Mutex::new(FxHashMap::default()),
        })
    }

    fn instantiate(&self, id: ClassId) -> Result<ComponentBox, HostError> {
        let registry = self.registry.read();
        let desc = registry.get(id).ok_or(HostError::UnknownClass(id))?;
        if desc.policy() == InstantiationPolicy::Static {
            return Err(HostError::NotInstantiable(desc.name().to_string()));
        }
        Ok(desc.template().spawn())
    }

    /// Exceptions raised against `context` so far, draining the record.
    pub fn take_raised(&self, context: ContextId) -> Vec<RaisedException> {
        self.raised.lock().remove(&context).unwrap_or_default()
    }

    /// Aggregate pool counters.
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.lock().stats()
    }

    /// Parked instances in one (class, hint) pool.
    pub fn pool_free_slots(&self, id: ClassId, hint: PoolHint) -> usize {
        self.pool.lock().free_slot_count(id, hint)
    }
}

impl HostApi for Host {
    fn host_capabilities(&self) -> HostCapabilitySet {
        HostCapabilitySet::EXCEPTIONS
            | HostCapabilitySet::CALLBACKS
            | HostCapabilitySet::MUTEXES
            | HostCapabilitySet::POOLING
    }

    fn register_class(
        &self,
        template: ComponentBox,
        policy: InstantiationPolicy,
    ) -> Result<ClassId, RegistryError> {
        self.registry.write().register(template, policy)
    }

    fn class_id_by_name(&self, name: &str) -> Option<ClassId> {
        self.registry.read().id_by_name(name)
    }

    fn class_name_by_id(&self, id: ClassId) -> Option<String> {
        self.registry.read().get(id).map(|d| d.name().to_string())
    }

    fn new_by_class_id(&self, id: ClassId) -> Result<ComponentBox, HostError> {
        let obj = self.instantiate(id)?;
        self.live_allocations.fetch_add(1, Ordering::Relaxed);
        Ok(obj)
    }

    fn new_pooled_by_class_id(
        &self,
        id: ClassId,
        hint: PoolHint,
    ) -> Result<ComponentBox, HostError> {
        {
            let registry = self.registry.read();
            let desc = registry.get(id).ok_or(HostError::UnknownClass(id))?;
            if desc.policy() == InstantiationPolicy::Static {
                return Err(HostError::NotInstantiable(desc.name().to_string()));
            }
            if desc.pool_size() > 0 {
                // Lock order: registry before pool, everywhere.
                let mut pool = self.pool.lock();
                match pool.acquire(id, hint, desc.pool_priority(), desc.template()) {
                    PoolAcquire::Recycled(obj) => return Ok(obj),
                    PoolAcquire::Fresh(obj) => {
                        self.live_allocations.fetch_add(1, Ordering::Relaxed);
                        return Ok(obj);
                    }
                    PoolAcquire::Exhausted => {}
                }
            }
        }
        // Pool opt-out or exhaustion: plain heap allocation.
        self.new_by_class_id(id)
    }

    fn clone_component(&self, template: &dyn Component) -> Result<ComponentBox, HostError> {
        let mut obj = self.new_by_class_id(template.header().class_id())?;
        obj.init_from(template);
        Ok(obj)
    }

    fn delete_component(&self, mut component: ComponentBox) -> Result<(), HostError> {
        if !component.header().tag().is_valid() {
            log::error!(
                "double release of {} instance detected",
                component.class_name()
            );
            return Err(HostError::DoubleRelease);
        }
        component.finalize(self);
        component.header_mut().set_tag(ValidationTag::Invalid);
        match component.header().pool_handle() {
            Some(handle) => self.pool.lock().release(component, handle),
            None => {
                self.live_allocations.fetch_sub(1, Ordering::Relaxed);
                Ok(())
            }
        }
    }

    fn is_instance(&self, component: Option<&dyn Component>, base: ClassId) -> bool {
        match component {
            Some(obj) if obj.header().tag().is_valid() => self
                .registry
                .read()
                .is_ancestor(obj.header().class_id(), base),
            _ => false,
        }
    }

    fn allocation_count(&self) -> i64 {
        self.live_allocations.load(Ordering::Relaxed)
    }

    fn exception_register(&self, name: &str, base: Option<ExceptionId>) -> Option<ExceptionId> {
        self.exceptions.register(name, base)
    }

    fn exception_id_by_name(&self, name: &str) -> Option<ExceptionId> {
        self.exceptions.id_by_name(name)
    }

    fn exception_is_a(&self, id: ExceptionId, base: ExceptionId) -> bool {
        self.exceptions.is_a(id, base)
    }

    fn exception_raise(
        &self,
        context: ContextId,
        id: ExceptionId,
        message: &str,
        file: &str,
        line: u32,
    ) {
        let name = self
            .exceptions
            .name_by_id(id)
            .unwrap_or_else(|| "UnknownException".to_string());
        log::warn!("{name} raised in {context} at {file}:{line}: {message}");
        self.raised.lock().entry(context).or_default().push(
            RaisedException {
                id,
                name,
                message: message.to_string(),
                file: file.to_string(),
                line,
            },
        );
    }

    fn callback_create(&self, name: &str) -> CallbackId {
        self.callbacks.create(name)
    }

    fn callback_id_by_name(&self, name: &str) -> Option<CallbackId> {
        self.callbacks.id_by_name(name)
    }

    fn callback_bind(&self, id: CallbackId, fun: Option<CallbackFn>) -> bool {
        self.callbacks.bind(id, fun)
    }

    fn callback_by_id(&self, id: CallbackId) -> Option<CallbackFn> {
        self.callbacks.get(id)
    }

    fn mutex_create(&self, name: Option<&str>) -> MutexId {
        self.mutexes.create(name)
    }

    fn mutex_destroy(&self, id: MutexId) -> Result<(), HostError> {
        self.mutexes.destroy(id)
    }

    fn mutex_find_by_name(&self, name: &str) -> Option<MutexId> {
        self.mutexes.find_by_name(name)
    }

    fn mutex_lock(&self, id: MutexId) -> Result<(), HostError> {
        self.mutexes.lock(id)
    }

    fn mutex_unlock(&self, id: MutexId) -> Result<(), HostError> {
        self.mutexes.unlock(id)
    }
}
