//! Dense typed arrays.
//!
//! Scalar arrays store their elements unboxed and expose them through
//! the array capability group; reads box elements into scalar values
//! and writes coerce whatever value arrives. The string array stores
//! owned strings and follows the same indexed protocol.

use std::any::Any;

use tessera_core::component::{
    CapabilitySet, Component, ComponentBox, ComponentHeader, PoolPriority,
};
use tessera_core::ids::{CLID_FLOATARRAY, CLID_INTARRAY, CLID_STRINGARRAY};
use tessera_core::stream::{Stream, StreamError};
use tessera_core::value::Value;

macro_rules! scalar_array_builtin {
    ($ty:ident, $class:literal, $clid:expr, $prim:ty, $zero:expr,
     $variant:ident, $coerce:ident, $write:ident, $read:ident) => {
        #[doc = concat!("Dense array of `", stringify!($prim), "` elements.")]
        pub struct $ty {
            header: ComponentHeader,
            elements: Vec<$prim>,
        }

        impl $ty {
            /// Creates an empty array.
            pub fn new() -> Self {
                $ty {
                    header: ComponentHeader::new($clid),
                    elements: Vec::new(),
                }
            }

            /// Element slice.
            pub fn elements(&self) -> &[$prim] {
                &self.elements
            }

            /// Replaces the contents.
            pub fn set_elements(&mut self, elements: Vec<$prim>) {
                self.elements = elements;
            }

            /// Appends an element.
            pub fn push(&mut self, value: $prim) {
                self.elements.push(value);
            }
        }

        impl Default for $ty {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Component for $ty {
            fn header(&self) -> &ComponentHeader {
                &self.header
            }

            fn header_mut(&mut self) -> &mut ComponentHeader {
                &mut self.header
            }

            fn class_name(&self) -> &str {
                $class
            }

            fn parent_class_name(&self) -> Option<&str> {
                Some("Object")
            }

            fn spawn(&self) -> ComponentBox {
                let mut obj = $ty::new();
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

            fn copy_from(&mut self, other: &dyn Component) -> bool {
                match other.as_any().downcast_ref::<$ty>() {
                    Some(src) => {
                        self.elements = src.elements.clone();
                        true
                    }
                    None => false,
                }
            }

            fn equals(&self, other: &dyn Component) -> bool {
                other
                    .as_any()
                    .downcast_ref::<$ty>()
                    .is_some_and(|o| o.elements == self.elements)
            }

            fn reinit(&mut self) {
                self.elements.clear();
            }

            fn pool_size(&self) -> usize {
                std::mem::size_of::<Self>()
            }

            fn pool_priority(&self) -> PoolPriority {
                PoolPriority::Medium
            }

            fn serialize_fields(&self, stream: &mut dyn Stream) -> Result<(), StreamError> {
                stream.write_u32(self.elements.len() as u32)?;
                for &element in &self.elements {
                    stream.$write(element)?;
                }
                Ok(())
            }

            fn deserialize_fields(
                &mut self,
                stream: &mut dyn Stream,
                _host: &dyn tessera_core::host::HostApi,
            ) -> Result<(), StreamError> {
                let count = stream.read_u32()? as usize;
                let mut elements = Vec::with_capacity(count.min(4096));
                for _ in 0..count {
                    elements.push(stream.$read()?);
                }
                self.elements = elements;
                Ok(())
            }

            fn value_iter(&self) -> Option<Box<dyn Iterator<Item = Value> + '_>> {
                Some(Box::new(self.elements.iter().map(|&e| Value::$variant(e))))
            }

            fn array_len(&self) -> Option<usize> {
                Some(self.elements.len())
            }

            fn array_capacity(&self) -> Option<usize> {
                Some(self.elements.capacity())
            }

            fn array_alloc(&mut self, len: usize) -> bool {
                self.elements.resize(len, $zero);
                true
            }

            fn element_byte_size(&self) -> usize {
                std::mem::size_of::<$prim>()
            }

            fn array_get(&self, index: usize, out: &mut Value) -> bool {
                match self.elements.get(index) {
                    Some(&e) => {
                        *out = Value::$variant(e);
                        true
                    }
                    None => {
                        *out = Value::Void;
                        false
                    }
                }
            }

            fn array_set(
                &mut self,
                index: usize,
                mut value: Value,
                host: &dyn tessera_core::host::HostApi,
            ) -> bool {
                let stored = match self.elements.get_mut(index) {
                    Some(slot) => {
                        *slot = value.$coerce();
                        true
                    }
                    None => false,
                };
                value.unset(host);
                stored
            }
        }
    };
}

scalar_array_builtin!(
    IntArrayObj,
    "IntArray",
    CLID_INTARRAY,
    i32,
    0,
    Int,
    get_i32,
    write_i32,
    read_i32
);
scalar_array_builtin!(
    FloatArrayObj,
    "FloatArray",
    CLID_FLOATARRAY,
    f32,
    0.0,
    Float,
    get_f32,
    write_f32,
    read_f32
);

/// Array of owned strings.
pub struct StringArrayObj {
    header: ComponentHeader,
    elements: Vec<String>,
}

impl StringArrayObj {
    /// Creates an empty array.
    pub fn new() -> Self {
        StringArrayObj {
            header: ComponentHeader::new(CLID_STRINGARRAY),
            elements: Vec::new(),
        }
    }

    /// Element slice.
    pub fn elements(&self) -> &[String] {
        &self.elements
    }

    /// Appends an element.
    pub fn push(&mut self, value: impl Into<String>) {
        self.elements.push(value.into());
    }
}

impl Default for StringArrayObj {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for StringArrayObj {
    fn header(&self) -> &ComponentHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut ComponentHeader {
        &mut self.header
    }

    fn class_name(&self) -> &str {
        "StringArray"
    }

    fn parent_class_name(&self) -> Option<&str> {
        Some("Object")
    }

    fn spawn(&self) -> ComponentBox {
        let mut obj = StringArrayObj::new();
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

    fn copy_from(&mut self, other: &dyn Component) -> bool {
        match other.as_any().downcast_ref::<StringArrayObj>() {
            Some(src) => {
                self.elements = src.elements.clone();
                true
            }
            None => false,
        }
    }

    fn equals(&self, other: &dyn Component) -> bool {
        other
            .as_any()
            .downcast_ref::<StringArrayObj>()
            .is_some_and(|o| o.elements == self.elements)
    }

    fn reinit(&mut self) {
        self.elements.clear();
    }

    fn pool_size(&self) -> usize {
        std::mem::size_of::<Self>()
    }

    fn pool_priority(&self) -> PoolPriority {
        PoolPriority::Medium
    }

    fn serialize_fields(&self, stream: &mut dyn Stream) -> Result<(), StreamError> {
        stream.write_u32(self.elements.len() as u32)?;
        for element in &self.elements {
            stream.write_len_string(element)?;
        }
        Ok(())
    }

    fn deserialize_fields(
        &mut self,
        stream: &mut dyn Stream,
        _host: &dyn tessera_core::host::HostApi,
    ) -> Result<(), StreamError> {
        let count = stream.read_u32()? as usize;
        let mut elements = Vec::with_capacity(count.min(4096));
        for _ in 0..count {
            elements.push(stream.read_len_string(u32::MAX as usize)?);
        }
        self.elements = elements;
        Ok(())
    }

    fn value_iter(&self) -> Option<Box<dyn Iterator<Item = Value> + '_>> {
        Some(Box::new(self.elements.iter().map(|e| Value::Str(e.clone()))))
    }

    fn array_len(&self) -> Option<usize> {
        Some(self.elements.len())
    }

    fn array_capacity(&self) -> Option<usize> {
        Some(self.elements.capacity())
    }

    fn array_alloc(&mut self, len: usize) -> bool {
        self.elements.resize(len, String::new());
        true
    }

    fn array_get(&self, index: usize, out: &mut Value) -> bool {
        match self.elements.get(index) {
            Some(e) => {
                *out = Value::Str(e.clone());
                true
            }
            None => {
                *out = Value::Void;
                false
            }
        }
    }

    fn array_set(
        &mut self,
        index: usize,
        mut value: Value,
        host: &dyn tessera_core::host::HostApi,
    ) -> bool {
        let stored = match self.elements.get_mut(index) {
            Some(slot) => {
                *slot = value.to_string_lossy();
                true
            }
            None => false,
        };
        value.unset(host);
        stored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_array_indexed_access() {
        let mut arr = IntArrayObj::new();
        assert!(arr.array_alloc(3));
        assert_eq!(arr.array_len(), Some(3));
        assert_eq!(arr.element_byte_size(), 4);

        let mut out = Value::Void;
        assert!(arr.array_get(1, &mut out));
        assert_eq!(out.get_i32(), 0);
        assert!(!arr.array_get(3, &mut out));
        assert!(matches!(out, Value::Void));
    }

    #[test]
    fn test_array_iteration_boxes_elements() {
        let mut arr = FloatArrayObj::new();
        arr.set_elements(vec![0.5, 1.5]);
        let collected: Vec<f32> = arr
            .value_iter()
            .into_iter()
            .flatten()
            .map(|v| v.get_f32())
            .collect();
        assert_eq!(collected, vec![0.5, 1.5]);
    }

    #[test]
    fn test_string_array_copy_and_equals() {
        let mut a = StringArrayObj::new();
        a.push("kick");
        a.push("snare");
        let mut b = StringArrayObj::new();
        assert!(b.copy_from(&a));
        assert!(a.equals(&b));
        b.push("hat");
        assert!(!a.equals(&b));
    }
}
