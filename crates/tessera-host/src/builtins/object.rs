//! The generic base class.

use std::any::Any;

use tessera_core::component::{
    CapabilitySet, Component, ComponentBox, ComponentHeader, PoolPriority,
};
use tessera_core::ids::CLID_OBJECT;

/// Root of every registered class hierarchy. Instances carry no state,
/// so any two of them compare equal.
pub struct BaseObject {
    header: ComponentHeader,
}

impl BaseObject {
    /// Creates a fresh instance.
    pub fn new() -> Self {
        BaseObject {
            header: ComponentHeader::new(CLID_OBJECT),
        }
    }
}

impl Default for BaseObject {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for BaseObject {
    fn header(&self) -> &ComponentHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut ComponentHeader {
        &mut self.header
    }

    fn class_name(&self) -> &str {
        "Object"
    }

    fn spawn(&self) -> ComponentBox {
        Box::new(BaseObject {
            header: ComponentHeader::new(self.header.class_id()),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::SERIALIZATION
    }

    fn copy_from(&mut self, _other: &dyn Component) -> bool {
        true
    }

    fn pool_size(&self) -> usize {
        std::mem::size_of::<Self>()
    }

    fn pool_priority(&self) -> PoolPriority {
        PoolPriority::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_instances_compare_equal() {
        let a = BaseObject::new();
        let b = BaseObject::new();
        assert!(a.equals(&b));
    }
}
