//! Class registry and typecast matrix.
//!
//! Classes register from a template instance. The registry assigns
//! dense ids, records per-class metadata, and maintains the typecast
//! matrix: a precomputed ancestry table so `is_instance` checks are a
//! single bit probe regardless of hierarchy depth.

use rustc_hash::FxHashMap;

use tessera_core::component::{CapabilitySet, ComponentBox, PoolPriority};
use tessera_core::host::{InstantiationPolicy, RegistryError};
use tessera_core::ids::{ClassId, MAX_CLASSES, NUM_RESERVED_CLASSES};

/// Immutable metadata recorded when a class registers.
pub struct ClassDescriptor {
    id: ClassId,
    name: String,
    policy: InstantiationPolicy,
    capabilities: CapabilitySet,
    pool_size: usize,
    pool_priority: PoolPriority,
    parent: Option<ClassId>,
    template: ComponentBox,
}

impl ClassDescriptor {
    /// Assigned class id.
    pub fn id(&self) -> ClassId {
        self.id
    }

    /// Registered class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Instantiation policy declared at registration.
    pub fn policy(&self) -> InstantiationPolicy {
        self.policy
    }

    /// Capability groups the class implements.
    pub fn capabilities(&self) -> CapabilitySet {
        self.capabilities
    }

    /// Instance byte size for pool accounting; 0 opts out of pooling.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Pool budget tier.
    pub fn pool_priority(&self) -> PoolPriority {
        self.pool_priority
    }

    /// Parent class id, if any.
    pub fn parent(&self) -> Option<ClassId> {
        self.parent
    }

    /// Template instance new objects are spawned from.
    pub fn template(&self) -> &dyn tessera_core::component::Component {
        self.template.as_ref()
    }
}

/// Dense `derived x base` ancestry table.
struct TypecastMatrix {
    bits: Box<[bool]>,
}

impl TypecastMatrix {
    fn new() -> Self {
        TypecastMatrix {
            bits: vec![false; MAX_CLASSES as usize * MAX_CLASSES as usize].into_boxed_slice(),
        }
    }

    fn get(&self, derived: ClassId, base: ClassId) -> bool {
        self.bits[derived.index() * MAX_CLASSES as usize + base.index()]
    }

    fn set(&mut self, derived: ClassId, base: ClassId) {
        self.bits[derived.index() * MAX_CLASSES as usize + base.index()] = true;
    }

    /// Merges the parent's ancestry row into the derived row, making
    /// the table transitive without walking chains at query time.
    fn inherit(&mut self, derived: ClassId, parent: ClassId) {
        let n = MAX_CLASSES as usize;
        for base in 0..n {
            if self.bits[parent.index() * n + base] {
                self.bits[derived.index() * n + base] = true;
            }
        }
    }
}

/// The host's class table.
pub struct ClassRegistry {
    descriptors: Vec<Option<ClassDescriptor>>,
    by_name: FxHashMap<String, ClassId>,
    matrix: TypecastMatrix,
    next_dynamic: u16,
}

impl ClassRegistry {
    /// Creates an empty registry with the full reserved id space.
    pub fn new() -> Self {
        let mut descriptors = Vec::with_capacity(MAX_CLASSES as usize);
        descriptors.resize_with(MAX_CLASSES as usize, || None);
        ClassRegistry {
            descriptors,
            by_name: FxHashMap::default(),
            matrix: TypecastMatrix::new(),
            next_dynamic: NUM_RESERVED_CLASSES,
        }
    }

    /// Registers a class at the next free dynamic id.
    pub fn register(
        &mut self,
        template: ComponentBox,
        policy: InstantiationPolicy,
    ) -> Result<ClassId, RegistryError> {
        if self.next_dynamic >= MAX_CLASSES {
            return Err(RegistryError::CeilingExceeded(MAX_CLASSES));
        }
        let id = ClassId(self.next_dynamic);
        self.install(id, template, policy)?;
        self.next_dynamic += 1;
        Ok(id)
    }

    /// Registers a builtin class at its reserved id.
    pub fn register_builtin(
        &mut self,
        id: ClassId,
        template: ComponentBox,
        policy: InstantiationPolicy,
    ) -> Result<(), RegistryError> {
        debug_assert!(id.0 < NUM_RESERVED_CLASSES);
        self.install(id, template, policy)?;
        Ok(())
    }

    fn install(
        &mut self,
        id: ClassId,
        mut template: ComponentBox,
        policy: InstantiationPolicy,
    ) -> Result<(), RegistryError> {
        if self.descriptors[id.index()].is_some() {
            return Err(RegistryError::SlotOccupied(id));
        }
        let name = template.class_name().to_string();
        if self.by_name.contains_key(&name) {
            return Err(RegistryError::DuplicateName(name));
        }
        let parent = match template.parent_class_name() {
            Some(parent_name) => Some(
                self.by_name
                    .get(parent_name)
                    .copied()
                    .ok_or_else(|| RegistryError::UnknownParent(parent_name.to_string()))?,
            ),
            None => None,
        };

        template.header_mut().set_class_id(id);
        self.matrix.set(id, id);
        if let Some(parent) = parent {
            self.matrix.inherit(id, parent);
        }

        let descriptor = ClassDescriptor {
            id,
            name: name.clone(),
            policy,
            capabilities: template.capabilities(),
            pool_size: template.pool_size(),
            pool_priority: template.pool_priority(),
            parent,
            template,
        };
        self.by_name.insert(name, id);
        self.descriptors[id.index()] = Some(descriptor);
        Ok(())
    }

    /// Descriptor of a registered class.
    pub fn get(&self, id: ClassId) -> Option<&ClassDescriptor> {
        self.descriptors.get(id.index()).and_then(Option::as_ref)
    }

    /// Resolves a class id by name.
    pub fn id_by_name(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    /// True when `derived` is `base` or descends from it.
    pub fn is_ancestor(&self, derived: ClassId, base: ClassId) -> bool {
        if derived.0 >= MAX_CLASSES || base.0 >= MAX_CLASSES {
            return false;
        }
        self.matrix.get(derived, base)
    }

    /// Number of registered classes.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// True when no class is registered.
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;
    use tessera_core::component::{Component, ComponentHeader};

    struct Named {
        header: ComponentHeader,
        name: &'static str,
        parent: Option<&'static str>,
    }

    impl Named {
        fn boxed(name: &'static str, parent: Option<&'static str>) -> ComponentBox {
            Box::new(Named {
                header: ComponentHeader::new(ClassId(0)),
                name,
                parent,
            })
        }
    }

    impl Component for Named {
        fn header(&self) -> &ComponentHeader {
            &self.header
        }
        fn header_mut(&mut self) -> &mut ComponentHeader {
            &mut self.header
        }
        fn class_name(&self) -> &str {
            self.name
        }
        fn parent_class_name(&self) -> Option<&str> {
            self.parent
        }
        fn spawn(&self) -> ComponentBox {
            Named::boxed(self.name, self.parent)
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn test_dynamic_ids_start_after_reserved_space() {
        let mut reg = ClassRegistry::new();
        let id = reg
            .register(Named::boxed("Envelope", None), InstantiationPolicy::Normal)
            .unwrap();
        assert_eq!(id, ClassId(NUM_RESERVED_CLASSES));
        assert_eq!(reg.id_by_name("Envelope"), Some(id));
        assert_eq!(reg.get(id).unwrap().name(), "Envelope");
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut reg = ClassRegistry::new();
        reg.register(Named::boxed("Envelope", None), InstantiationPolicy::Normal)
            .unwrap();
        let err = reg
            .register(Named::boxed("Envelope", None), InstantiationPolicy::Normal)
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateName("Envelope".into()));
    }

    #[test]
    fn test_unknown_parent_rejected() {
        let mut reg = ClassRegistry::new();
        let err = reg
            .register(
                Named::boxed("Child", Some("Ghost")),
                InstantiationPolicy::Normal,
            )
            .unwrap_err();
        assert_eq!(err, RegistryError::UnknownParent("Ghost".into()));
    }

    #[test]
    fn test_ancestry_is_transitive() {
        let mut reg = ClassRegistry::new();
        let root = reg
            .register(Named::boxed("Root", None), InstantiationPolicy::Normal)
            .unwrap();
        let mid = reg
            .register(Named::boxed("Mid", Some("Root")), InstantiationPolicy::Normal)
            .unwrap();
        let leaf = reg
            .register(Named::boxed("Leaf", Some("Mid")), InstantiationPolicy::Normal)
            .unwrap();
        assert!(reg.is_ancestor(leaf, root));
        assert!(reg.is_ancestor(leaf, mid));
        assert!(reg.is_ancestor(leaf, leaf));
        assert!(!reg.is_ancestor(root, leaf));
        assert!(!reg.is_ancestor(mid, leaf));
    }

    #[test]
    fn test_ceiling_exceeded() {
        let mut reg = ClassRegistry::new();
        let room = (MAX_CLASSES - NUM_RESERVED_CLASSES) as usize;
        for i in 0..room {
            let name: &'static str = Box::leak(format!("Cls{i}").into_boxed_str());
            reg.register(Named::boxed(name, None), InstantiationPolicy::Normal)
                .unwrap();
        }
        let err = reg
            .register(Named::boxed("Overflow", None), InstantiationPolicy::Normal)
            .unwrap_err();
        assert_eq!(err, RegistryError::CeilingExceeded(MAX_CLASSES));
    }
}
