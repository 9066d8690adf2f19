//! The builtin string class.

use std::any::Any;

use tessera_core::component::{
    CapabilitySet, Component, ComponentBox, ComponentHeader, Opcode, PoolPriority,
};
use tessera_core::ids::CLID_STRING;
use tessera_core::stream::{Stream, StreamError};
use tessera_core::value::Value;

/// Owned character string with concatenation, lexicographic comparison,
/// and read-only byte indexing.
pub struct StrObj {
    header: ComponentHeader,
    /// Wrapped string.
    pub value: String,
}

impl StrObj {
    /// Creates an empty string instance.
    pub fn new() -> Self {
        StrObj {
            header: ComponentHeader::new(CLID_STRING),
            value: String::new(),
        }
    }

    fn rhs_text(other: Option<&dyn Component>) -> Option<String> {
        other.and_then(|o| o.to_string_value())
    }

    fn apply_text(&mut self, op: Opcode, text: &str, out: &mut Value) {
        match op {
            Opcode::Assign | Opcode::Init => self.value = text.to_string(),
            Opcode::Add => self.value.push_str(text),
            Opcode::CmpEq | Opcode::CmpNe | Opcode::CmpLe | Opcode::CmpLt | Opcode::CmpGe
            | Opcode::CmpGt => {
                let ord = self.value.as_str().cmp(text);
                let result = match op {
                    Opcode::CmpEq => ord.is_eq(),
                    Opcode::CmpNe => ord.is_ne(),
                    Opcode::CmpLe => ord.is_le(),
                    Opcode::CmpLt => ord.is_lt(),
                    Opcode::CmpGe => ord.is_ge(),
                    _ => ord.is_gt(),
                };
                out.set_i32(result as i32);
            }
            _ => {}
        }
    }
}

impl Default for StrObj {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for StrObj {
    fn header(&self) -> &ComponentHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut ComponentHeader {
        &mut self.header
    }

    fn class_name(&self) -> &str {
        "String"
    }

    fn parent_class_name(&self) -> Option<&str> {
        Some("Object")
    }

    fn spawn(&self) -> ComponentBox {
        Box::new(StrObj {
            header: ComponentHeader::new(self.header.class_id()),
            value: String::new(),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::REFLECTION
            | CapabilitySet::OPERATOR
            | CapabilitySet::SERIALIZATION
            | CapabilitySet::ARRAY
            | CapabilitySet::ITERATOR
    }

    fn copy_from(&mut self, other: &dyn Component) -> bool {
        match other.to_string_value() {
            Some(s) => {
                self.value = s;
                true
            }
            None => false,
        }
    }

    fn equals(&self, other: &dyn Component) -> bool {
        other.to_string_value().as_deref() == Some(self.value.as_str())
    }

    fn to_string_value(&self) -> Option<String> {
        Some(self.value.clone())
    }

    fn reinit(&mut self) {
        self.value.clear();
    }

    fn pool_size(&self) -> usize {
        std::mem::size_of::<Self>()
    }

    fn pool_priority(&self) -> PoolPriority {
        PoolPriority::High
    }

    fn operate(&mut self, op: Opcode, other: Option<&dyn Component>, out: &mut Value) {
        if let Some(s) = Self::rhs_text(other) {
            self.apply_text(op, &s, out);
        }
    }

    fn operate_i32(&mut self, op: Opcode, value: i32, out: &mut Value) {
        self.apply_text(op, &value.to_string(), out);
    }

    fn operate_i64(&mut self, op: Opcode, value: i64, out: &mut Value) {
        self.apply_text(op, &value.to_string(), out);
    }

    fn operate_f32(&mut self, op: Opcode, value: f32, out: &mut Value) {
        self.apply_text(op, &value.to_string(), out);
    }

    fn operate_f64(&mut self, op: Opcode, value: f64, out: &mut Value) {
        self.apply_text(op, &value.to_string(), out);
    }

    fn scan_i32(&self) -> Option<i32> {
        self.value.trim().parse().ok()
    }

    fn scan_i64(&self) -> Option<i64> {
        self.value.trim().parse().ok()
    }

    fn scan_f32(&self) -> Option<f32> {
        self.value.trim().parse().ok()
    }

    fn scan_f64(&self) -> Option<f64> {
        self.value.trim().parse().ok()
    }

    fn set_i32(&mut self, v: i32) -> bool {
        self.value = v.to_string();
        true
    }

    fn set_i64(&mut self, v: i64) -> bool {
        self.value = v.to_string();
        true
    }

    fn set_f32(&mut self, v: f32) -> bool {
        self.value = v.to_string();
        true
    }

    fn set_f64(&mut self, v: f64) -> bool {
        self.value = v.to_string();
        true
    }

    fn set_str(&mut self, v: &str) -> bool {
        self.value = v.to_string();
        true
    }

    fn serialize_fields(&self, stream: &mut dyn Stream) -> Result<(), StreamError> {
        stream.write_len_string(&self.value)
    }

    fn deserialize_fields(
        &mut self,
        stream: &mut dyn Stream,
        _host: &dyn tessera_core::host::HostApi,
    ) -> Result<(), StreamError> {
        self.value = stream.read_len_string(u32::MAX as usize)?;
        Ok(())
    }

    fn value_iter(&self) -> Option<Box<dyn Iterator<Item = Value> + '_>> {
        Some(Box::new(
            self.value.bytes().map(|b| Value::Int(b as i32)),
        ))
    }

    fn array_len(&self) -> Option<usize> {
        Some(self.value.len())
    }

    fn array_capacity(&self) -> Option<usize> {
        Some(self.value.capacity())
    }

    fn element_byte_size(&self) -> usize {
        1
    }

    fn array_get(&self, index: usize, out: &mut Value) -> bool {
        match self.value.as_bytes().get(index) {
            Some(&b) => {
                out.set_i32(b as i32);
                true
            }
            None => {
                *out = Value::Void;
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concat_and_compare() {
        let mut a = StrObj::new();
        a.value = "fox".into();
        let mut b = StrObj::new();
        b.value = "trot".into();
        let mut out = Value::Void;
        a.operate(Opcode::Add, Some(&b), &mut out);
        assert_eq!(a.value, "foxtrot");

        a.operate(Opcode::CmpLt, Some(&b), &mut out);
        assert_eq!(out.get_i32(), 1);
    }

    #[test]
    fn test_numeric_scan_parses() {
        let mut s = StrObj::new();
        s.value = " 42 ".into();
        assert_eq!(s.scan_i32(), Some(42));
        s.value = "not a number".into();
        assert_eq!(s.scan_i32(), None);
    }

    #[test]
    fn test_byte_indexing() {
        let mut s = StrObj::new();
        s.value = "ab".into();
        let mut out = Value::Void;
        assert!(s.array_get(1, &mut out));
        assert_eq!(out.get_i32(), b'b' as i32);
        assert!(!s.array_get(2, &mut out));
        assert!(matches!(out, Value::Void));
    }

    #[test]
    fn test_concat_with_numeric_rhs() {
        let mut s = StrObj::new();
        s.value = "v".into();
        let mut n = crate::builtins::IntegerObj::new();
        n.value = 2;
        let mut out = Value::Void;
        s.operate(Opcode::Add, Some(&n), &mut out);
        assert_eq!(s.value, "v2");
    }
}
