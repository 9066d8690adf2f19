//! Boxed numeric classes.
//!
//! These are the wrapper objects scalar values are boxed into when a
//! plugin asks for an object rendition, and the workhorses of operator
//! dispatch. Integral arithmetic wraps; integral division by zero
//! leaves the receiver unchanged; float arithmetic follows IEEE.

use std::any::Any;

use tessera_core::component::{
    CapabilitySet, Component, ComponentBox, ComponentHeader, Opcode, PoolPriority,
};
use tessera_core::ids::{CLID_BOOLEAN, CLID_DOUBLE, CLID_FLOAT, CLID_INTEGER, CLID_LONG};
use tessera_core::stream::{Stream, StreamError};
use tessera_core::value::Value;

macro_rules! integer_builtin {
    ($ty:ident, $class:literal, $clid:expr, $prim:ty, $write:ident, $read:ident) => {
        #[doc = concat!("Boxed `", stringify!($prim), "`.")]
        pub struct $ty {
            header: ComponentHeader,
            /// Wrapped value.
            pub value: $prim,
        }

        impl $ty {
            /// Creates a zero-valued instance.
            pub fn new() -> Self {
                $ty {
                    header: ComponentHeader::new($clid),
                    value: 0,
                }
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
                Box::new($ty {
                    header: ComponentHeader::new(self.header.class_id()),
                    value: 0,
                })
            }

            fn as_any(&self) -> &dyn Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn Any {
                self
            }

            fn capabilities(&self) -> CapabilitySet {
                CapabilitySet::REFLECTION | CapabilitySet::OPERATOR | CapabilitySet::SERIALIZATION
            }

            fn copy_from(&mut self, other: &dyn Component) -> bool {
                match other.scan_i64() {
                    Some(v) => {
                        self.value = v as $prim;
                        true
                    }
                    None => false,
                }
            }

            fn equals(&self, other: &dyn Component) -> bool {
                other.scan_f64() == Some(self.value as f64)
            }

            fn to_string_value(&self) -> Option<String> {
                Some(self.value.to_string())
            }

            fn reinit(&mut self) {
                self.value = 0;
            }

            fn pool_size(&self) -> usize {
                std::mem::size_of::<Self>()
            }

            fn pool_priority(&self) -> PoolPriority {
                PoolPriority::High
            }

            fn operate(&mut self, op: Opcode, other: Option<&dyn Component>, out: &mut Value) {
                if let Some(v) = other.and_then(|o| o.scan_i64()) {
                    self.operate_i64(op, v, out);
                } else if matches!(op, Opcode::Neg) {
                    self.value = self.value.wrapping_neg();
                }
            }

            fn operate_i32(&mut self, op: Opcode, value: i32, out: &mut Value) {
                self.operate_i64(op, value as i64, out);
            }

            fn operate_i64(&mut self, op: Opcode, v: i64, out: &mut Value) {
                match op {
                    Opcode::Assign | Opcode::Init => self.value = v as $prim,
                    Opcode::Add => self.value = self.value.wrapping_add(v as $prim),
                    Opcode::Sub => self.value = self.value.wrapping_sub(v as $prim),
                    Opcode::Mul => self.value = self.value.wrapping_mul(v as $prim),
                    Opcode::Div if v != 0 => {
                        self.value = self.value.wrapping_div(v as $prim)
                    }
                    Opcode::Mod if v != 0 => {
                        self.value = self.value.wrapping_rem(v as $prim)
                    }
                    Opcode::Shl => self.value = self.value.wrapping_shl(v as u32),
                    Opcode::Shr => self.value = self.value.wrapping_shr(v as u32),
                    Opcode::BitAnd => self.value &= v as $prim,
                    Opcode::BitOr => self.value |= v as $prim,
                    Opcode::BitXor => self.value ^= v as $prim,
                    Opcode::Not => self.value = (v == 0) as $prim,
                    Opcode::BitNot => self.value = !(v as $prim),
                    Opcode::CmpEq => out.set_i32((self.value as i64 == v) as i32),
                    Opcode::CmpNe => out.set_i32((self.value as i64 != v) as i32),
                    Opcode::CmpLe => out.set_i32((self.value as i64 <= v) as i32),
                    Opcode::CmpLt => out.set_i32(((self.value as i64) < v) as i32),
                    Opcode::CmpGe => out.set_i32((self.value as i64 >= v) as i32),
                    Opcode::CmpGt => out.set_i32((self.value as i64 > v) as i32),
                    Opcode::LogicAnd => {
                        out.set_i32((self.value != 0 && v != 0) as i32)
                    }
                    Opcode::LogicOr => {
                        out.set_i32((self.value != 0 || v != 0) as i32)
                    }
                    Opcode::LogicXor => {
                        out.set_i32(((self.value != 0) != (v != 0)) as i32)
                    }
                    Opcode::Neg => self.value = self.value.wrapping_neg(),
                    _ => {}
                }
            }

            fn operate_f32(&mut self, op: Opcode, value: f32, out: &mut Value) {
                self.operate_i64(op, value as i64, out);
            }

            fn operate_f64(&mut self, op: Opcode, value: f64, out: &mut Value) {
                self.operate_i64(op, value as i64, out);
            }

            fn scan_i32(&self) -> Option<i32> {
                Some(self.value as i32)
            }

            fn scan_i64(&self) -> Option<i64> {
                Some(self.value as i64)
            }

            fn scan_f32(&self) -> Option<f32> {
                Some(self.value as f32)
            }

            fn scan_f64(&self) -> Option<f64> {
                Some(self.value as f64)
            }

            fn set_i32(&mut self, v: i32) -> bool {
                self.value = v as $prim;
                true
            }

            fn set_i64(&mut self, v: i64) -> bool {
                self.value = v as $prim;
                true
            }

            fn set_f32(&mut self, v: f32) -> bool {
                self.value = v as $prim;
                true
            }

            fn set_f64(&mut self, v: f64) -> bool {
                self.value = v as $prim;
                true
            }

            fn serialize_fields(&self, stream: &mut dyn Stream) -> Result<(), StreamError> {
                stream.$write(self.value)
            }

            fn deserialize_fields(
                &mut self,
                stream: &mut dyn Stream,
                _host: &dyn tessera_core::host::HostApi,
            ) -> Result<(), StreamError> {
                self.value = stream.$read()?;
                Ok(())
            }
        }
    };
}

macro_rules! float_builtin {
    ($ty:ident, $class:literal, $clid:expr, $prim:ty, $write:ident, $read:ident) => {
        #[doc = concat!("Boxed `", stringify!($prim), "`.")]
        pub struct $ty {
            header: ComponentHeader,
            /// Wrapped value.
            pub value: $prim,
        }

        impl $ty {
            /// Creates a zero-valued instance.
            pub fn new() -> Self {
                $ty {
                    header: ComponentHeader::new($clid),
                    value: 0.0,
                }
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
                Box::new($ty {
                    header: ComponentHeader::new(self.header.class_id()),
                    value: 0.0,
                })
            }

            fn as_any(&self) -> &dyn Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn Any {
                self
            }

            fn capabilities(&self) -> CapabilitySet {
                CapabilitySet::REFLECTION | CapabilitySet::OPERATOR | CapabilitySet::SERIALIZATION
            }

            fn copy_from(&mut self, other: &dyn Component) -> bool {
                match other.scan_f64() {
                    Some(v) => {
                        self.value = v as $prim;
                        true
                    }
                    None => false,
                }
            }

            fn equals(&self, other: &dyn Component) -> bool {
                other.scan_f64() == Some(self.value as f64)
            }

            fn to_string_value(&self) -> Option<String> {
                Some(self.value.to_string())
            }

            fn reinit(&mut self) {
                self.value = 0.0;
            }

            fn pool_size(&self) -> usize {
                std::mem::size_of::<Self>()
            }

            fn pool_priority(&self) -> PoolPriority {
                PoolPriority::High
            }

            fn operate(&mut self, op: Opcode, other: Option<&dyn Component>, out: &mut Value) {
                if let Some(v) = other.and_then(|o| o.scan_f64()) {
                    self.operate_f64(op, v, out);
                } else if matches!(op, Opcode::Neg) {
                    self.value = -self.value;
                }
            }

            fn operate_i32(&mut self, op: Opcode, value: i32, out: &mut Value) {
                self.operate_f64(op, value as f64, out);
            }

            fn operate_i64(&mut self, op: Opcode, value: i64, out: &mut Value) {
                self.operate_f64(op, value as f64, out);
            }

            fn operate_f32(&mut self, op: Opcode, value: f32, out: &mut Value) {
                self.operate_f64(op, value as f64, out);
            }

            fn operate_f64(&mut self, op: Opcode, v: f64, out: &mut Value) {
                match op {
                    Opcode::Assign | Opcode::Init => self.value = v as $prim,
                    Opcode::Add => self.value += v as $prim,
                    Opcode::Sub => self.value -= v as $prim,
                    Opcode::Mul => self.value *= v as $prim,
                    Opcode::Div => self.value /= v as $prim,
                    Opcode::Mod => self.value %= v as $prim,
                    Opcode::Not => self.value = if v == 0.0 { 1.0 } else { 0.0 },
                    Opcode::CmpEq => out.set_i32((self.value as f64 == v) as i32),
                    Opcode::CmpNe => out.set_i32((self.value as f64 != v) as i32),
                    Opcode::CmpLe => out.set_i32((self.value as f64 <= v) as i32),
                    Opcode::CmpLt => out.set_i32(((self.value as f64) < v) as i32),
                    Opcode::CmpGe => out.set_i32((self.value as f64 >= v) as i32),
                    Opcode::CmpGt => out.set_i32((self.value as f64 > v) as i32),
                    Opcode::LogicAnd => {
                        out.set_i32((self.value != 0.0 && v != 0.0) as i32)
                    }
                    Opcode::LogicOr => {
                        out.set_i32((self.value != 0.0 || v != 0.0) as i32)
                    }
                    Opcode::LogicXor => {
                        out.set_i32(((self.value != 0.0) != (v != 0.0)) as i32)
                    }
                    Opcode::Neg => self.value = -self.value,
                    _ => {}
                }
            }

            fn scan_i32(&self) -> Option<i32> {
                Some(self.value as i32)
            }

            fn scan_i64(&self) -> Option<i64> {
                Some(self.value as i64)
            }

            fn scan_f32(&self) -> Option<f32> {
                Some(self.value as f32)
            }

            fn scan_f64(&self) -> Option<f64> {
                Some(self.value as f64)
            }

            fn set_i32(&mut self, v: i32) -> bool {
                self.value = v as $prim;
                true
            }

            fn set_i64(&mut self, v: i64) -> bool {
                self.value = v as $prim;
                true
            }

            fn set_f32(&mut self, v: f32) -> bool {
                self.value = v as $prim;
                true
            }

            fn set_f64(&mut self, v: f64) -> bool {
                self.value = v as $prim;
                true
            }

            fn serialize_fields(&self, stream: &mut dyn Stream) -> Result<(), StreamError> {
                stream.$write(self.value)
            }

            fn deserialize_fields(
                &mut self,
                stream: &mut dyn Stream,
                _host: &dyn tessera_core::host::HostApi,
            ) -> Result<(), StreamError> {
                self.value = stream.$read()?;
                Ok(())
            }
        }
    };
}

integer_builtin!(IntegerObj, "Integer", CLID_INTEGER, i32, write_i32, read_i32);
integer_builtin!(LongObj, "Long", CLID_LONG, i64, write_i64, read_i64);
float_builtin!(FloatObj, "Float", CLID_FLOAT, f32, write_f32, read_f32);
float_builtin!(DoubleObj, "Double", CLID_DOUBLE, f64, write_f64, read_f64);

/// Boxed boolean.
pub struct BooleanObj {
    header: ComponentHeader,
    /// Wrapped value.
    pub value: bool,
}

impl BooleanObj {
    /// Creates a false-valued instance.
    pub fn new() -> Self {
        BooleanObj {
            header: ComponentHeader::new(CLID_BOOLEAN),
            value: false,
        }
    }
}

impl Default for BooleanObj {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for BooleanObj {
    fn header(&self) -> &ComponentHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut ComponentHeader {
        &mut self.header
    }

    fn class_name(&self) -> &str {
        "Boolean"
    }

    fn parent_class_name(&self) -> Option<&str> {
        Some("Object")
    }

    fn spawn(&self) -> ComponentBox {
        Box::new(BooleanObj {
            header: ComponentHeader::new(self.header.class_id()),
            value: false,
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::REFLECTION | CapabilitySet::OPERATOR | CapabilitySet::SERIALIZATION
    }

    fn copy_from(&mut self, other: &dyn Component) -> bool {
        match other.scan_i64() {
            Some(v) => {
                self.value = v != 0;
                true
            }
            None => false,
        }
    }

    fn equals(&self, other: &dyn Component) -> bool {
        other.scan_i64().map(|v| v != 0) == Some(self.value)
    }

    fn to_string_value(&self) -> Option<String> {
        Some(if self.value { "true" } else { "false" }.to_string())
    }

    fn reinit(&mut self) {
        self.value = false;
    }

    fn pool_size(&self) -> usize {
        std::mem::size_of::<Self>()
    }

    fn pool_priority(&self) -> PoolPriority {
        PoolPriority::Medium
    }

    fn operate(&mut self, op: Opcode, other: Option<&dyn Component>, out: &mut Value) {
        let rhs = other.and_then(|o| o.scan_i64()).map(|v| v != 0);
        match (op, rhs) {
            (Opcode::Assign | Opcode::Init, Some(v)) => self.value = v,
            (Opcode::Not, Some(v)) => self.value = !v,
            (Opcode::CmpEq, Some(v)) => out.set_i32((self.value == v) as i32),
            (Opcode::CmpNe, Some(v)) => out.set_i32((self.value != v) as i32),
            (Opcode::LogicAnd, Some(v)) => out.set_i32((self.value && v) as i32),
            (Opcode::LogicOr, Some(v)) => out.set_i32((self.value || v) as i32),
            (Opcode::LogicXor, Some(v)) => out.set_i32((self.value != v) as i32),
            (Opcode::Neg, _) => self.value = !self.value,
            _ => {}
        }
    }

    fn scan_i32(&self) -> Option<i32> {
        Some(self.value as i32)
    }

    fn scan_i64(&self) -> Option<i64> {
        Some(self.value as i64)
    }

    fn scan_f32(&self) -> Option<f32> {
        Some(self.value as i32 as f32)
    }

    fn scan_f64(&self) -> Option<f64> {
        Some(self.value as i32 as f64)
    }

    fn set_i32(&mut self, v: i32) -> bool {
        self.value = v != 0;
        true
    }

    fn set_i64(&mut self, v: i64) -> bool {
        self.value = v != 0;
        true
    }

    fn set_f32(&mut self, v: f32) -> bool {
        self.value = v != 0.0;
        true
    }

    fn set_f64(&mut self, v: f64) -> bool {
        self.value = v != 0.0;
        true
    }

    fn serialize_fields(&self, stream: &mut dyn Stream) -> Result<(), StreamError> {
        stream.write_u8(self.value as u8)
    }

    fn deserialize_fields(
        &mut self,
        stream: &mut dyn Stream,
        _host: &dyn tessera_core::host::HostApi,
    ) -> Result<(), StreamError> {
        self.value = stream.read_u8()? != 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_arithmetic_wraps() {
        let mut a = IntegerObj::new();
        a.value = i32::MAX;
        let mut b = IntegerObj::new();
        b.value = 1;
        let mut out = Value::Void;
        a.operate(Opcode::Add, Some(&b), &mut out);
        assert_eq!(a.value, i32::MIN);
    }

    #[test]
    fn test_scalar_overloads_match_operate() {
        let mut a = IntegerObj::new();
        a.value = 7;
        let mut out = Value::Void;
        a.operate_i32(Opcode::Mul, 3, &mut out);
        assert_eq!(a.value, 21);
        a.operate_f64(Opcode::Assign, 2.9, &mut out);
        assert_eq!(a.value, 2);

        let mut f = DoubleObj::new();
        f.operate_i64(Opcode::Assign, 4, &mut out);
        f.operate_f32(Opcode::Div, 8.0, &mut out);
        assert_eq!(f.value, 0.5);
        f.operate_f64(Opcode::CmpLt, 1.0, &mut out);
        assert_eq!(out.get_i32(), 1);
    }

    #[test]
    fn test_integer_division_by_zero_is_inert() {
        let mut a = IntegerObj::new();
        a.value = 10;
        let zero = IntegerObj::new();
        let mut out = Value::Void;
        a.operate(Opcode::Div, Some(&zero), &mut out);
        assert_eq!(a.value, 10);
        a.operate(Opcode::Mod, Some(&zero), &mut out);
        assert_eq!(a.value, 10);
    }

    #[test]
    fn test_comparison_writes_result_without_mutating() {
        let mut a = IntegerObj::new();
        a.value = 3;
        let mut b = FloatObj::new();
        b.value = 3.0;
        let mut out = Value::Void;
        a.operate(Opcode::CmpEq, Some(&b), &mut out);
        assert_eq!(out.get_i32(), 1);
        assert_eq!(a.value, 3);

        b.operate(Opcode::CmpLt, Some(&a), &mut out);
        assert_eq!(out.get_i32(), 0);
    }

    #[test]
    fn test_cross_type_equality() {
        let mut int = IntegerObj::new();
        int.value = 7;
        let mut long = LongObj::new();
        long.value = 7;
        let mut dbl = DoubleObj::new();
        dbl.value = 7.0;
        assert!(int.equals(&long));
        assert!(int.equals(&dbl));
        dbl.value = 7.5;
        assert!(!int.equals(&dbl));
    }

    #[test]
    fn test_float_division_by_zero_is_ieee() {
        let mut a = FloatObj::new();
        a.value = 1.0;
        let zero = FloatObj::new();
        let mut out = Value::Void;
        a.operate(Opcode::Div, Some(&zero), &mut out);
        assert!(a.value.is_infinite());
    }

    #[test]
    fn test_boolean_logic() {
        let mut a = BooleanObj::new();
        a.value = true;
        let b = BooleanObj::new();
        let mut out = Value::Void;
        a.operate(Opcode::LogicAnd, Some(&b), &mut out);
        assert_eq!(out.get_i32(), 0);
        a.operate(Opcode::LogicOr, Some(&b), &mut out);
        assert_eq!(out.get_i32(), 1);
        assert!(a.value);
    }
}
