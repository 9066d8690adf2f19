//! The tagged value that carries arguments and results across the
//! host/plugin boundary.
//!
//! A [`Value`] is void, a scalar, a string, or an object reference. An
//! object payload is either owned (released through the host exactly
//! once, by whoever holds it last) or borrowed (never released by the
//! holder). Move-assignment transfers ownership so that an owned payload
//! always has exactly one owner.

use std::fmt;
use std::ptr::NonNull;

use crate::component::{Component, ComponentBox};
use crate::host::HostApi;
use crate::ids::{CLID_FLOAT, CLID_INTEGER, CLID_STRING};
use crate::stream::{Stream, StreamError};

/// Numeric type tag of a [`Value`]. The discriminants are part of the
/// serialized format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TypeTag {
    /// No payload.
    Void = 0,
    /// 32-bit signed integer.
    Int = 1,
    /// 32-bit float.
    Float = 2,
    /// Object reference.
    Object = 3,
    /// Character string.
    String = 4,
}

impl TypeTag {
    fn from_u8(raw: u8) -> Option<TypeTag> {
        match raw {
            0 => Some(TypeTag::Void),
            1 => Some(TypeTag::Int),
            2 => Some(TypeTag::Float),
            3 => Some(TypeTag::Object),
            4 => Some(TypeTag::String),
            _ => None,
        }
    }
}

/// Object payload of a [`Value`]: owned box or non-owning pointer.
pub enum ObjectRef {
    /// The value owns the object and must release it through the host.
    Owned(ComponentBox),
    /// Non-owning reference; some other holder releases the object.
    Borrowed(NonNull<dyn Component>),
}

/// A dynamically typed boundary value.
#[derive(Default)]
pub enum Value {
    /// No payload.
    #[default]
    Void,
    /// 32-bit signed integer.
    Int(i32),
    /// 32-bit float.
    Float(f32),
    /// Owned character string.
    Str(String),
    /// Object reference, owned or borrowed.
    Object(ObjectRef),
}

impl Value {
    /// Wraps an owned object. The value becomes responsible for
    /// releasing it through the host.
    pub fn owned(object: ComponentBox) -> Value {
        Value::Object(ObjectRef::Owned(object))
    }

    /// Wraps a non-owning object reference.
    ///
    /// # Safety
    ///
    /// `object` must point to a live component that outlives every use
    /// of the returned value (including values derived from it via
    /// [`clone_ref`](Value::clone_ref)).
    pub unsafe fn borrowed(object: NonNull<dyn Component>) -> Value {
        Value::Object(ObjectRef::Borrowed(object))
    }

    /// Non-owning reference to `object`, tied to the caller's borrow.
    pub fn borrowed_from(object: &dyn Component) -> Value {
        // Safe per the caller's borrow at construction; the usual
        // non-owning lifetime rules apply from here on.
        unsafe { Value::borrowed(NonNull::from(object)) }
    }

    /// The value's type tag.
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Value::Void => TypeTag::Void,
            Value::Int(_) => TypeTag::Int,
            Value::Float(_) => TypeTag::Float,
            Value::Str(_) => TypeTag::String,
            Value::Object(_) => TypeTag::Object,
        }
    }

    /// True when the value holds an owned object payload.
    pub fn is_owning(&self) -> bool {
        matches!(self, Value::Object(ObjectRef::Owned(_)))
    }

    // ------------------------------------------------------------------
    // Scalar access
    // ------------------------------------------------------------------

    /// Reads the value as an `i32`, converting scalars and strings and
    /// scanning object payloads. Unconvertible values read as 0.
    pub fn get_i32(&self) -> i32 {
        match self {
            Value::Void => 0,
            Value::Int(v) => *v,
            Value::Float(v) => *v as i32,
            Value::Str(s) => s.trim().parse().unwrap_or(0),
            Value::Object(_) => self.as_object().and_then(|o| o.scan_i32()).unwrap_or(0),
        }
    }

    /// Reads the value as an `f32`; see [`get_i32`](Value::get_i32).
    pub fn get_f32(&self) -> f32 {
        match self {
            Value::Void => 0.0,
            Value::Int(v) => *v as f32,
            Value::Float(v) => *v,
            Value::Str(s) => s.trim().parse().unwrap_or(0.0),
            Value::Object(_) => self.as_object().and_then(|o| o.scan_f32()).unwrap_or(0.0),
        }
    }

    /// Renders the value as a string. Objects use their string
    /// conversion when available, otherwise their class name.
    pub fn to_string_lossy(&self) -> String {
        match self {
            Value::Void => String::new(),
            Value::Int(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Str(s) => s.clone(),
            Value::Object(_) => match self.as_object() {
                Some(obj) => obj
                    .to_string_value()
                    .unwrap_or_else(|| obj.class_name().to_string()),
                None => String::new(),
            },
        }
    }

    /// Overwrites the value with an integer.
    ///
    /// Any previous payload is dropped in place, outside host
    /// accounting; release owned object payloads with
    /// [`unset`](Value::unset) first.
    pub fn set_i32(&mut self, value: i32) {
        *self = Value::Int(value);
    }

    /// Overwrites the value with a float; see [`set_i32`](Value::set_i32).
    pub fn set_f32(&mut self, value: f32) {
        *self = Value::Float(value);
    }

    /// Overwrites the value with a string; see [`set_i32`](Value::set_i32).
    pub fn set_string(&mut self, value: impl Into<String>) {
        *self = Value::Str(value.into());
    }

    // ------------------------------------------------------------------
    // Object access
    // ------------------------------------------------------------------

    /// Borrows the object payload, owned or not.
    pub fn as_object(&self) -> Option<&dyn Component> {
        match self {
            Value::Object(ObjectRef::Owned(b)) => Some(b.as_ref()),
            // Live per the `borrowed` construction contract.
            Value::Object(ObjectRef::Borrowed(p)) => Some(unsafe { p.as_ref() }),
            _ => None,
        }
    }

    /// Mutably borrows the object payload.
    pub fn as_object_mut(&mut self) -> Option<&mut dyn Component> {
        match self {
            Value::Object(ObjectRef::Owned(b)) => Some(b.as_mut()),
            Value::Object(ObjectRef::Borrowed(p)) => Some(unsafe { p.as_mut() }),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Ownership management
    // ------------------------------------------------------------------

    /// Releases the payload and leaves the value void.
    ///
    /// An owned object payload is returned to the host; borrowed
    /// references and scalars are simply discarded.
    pub fn unset(&mut self, host: &dyn HostApi) {
        if let Value::Object(ObjectRef::Owned(obj)) = std::mem::take(self) {
            if let Err(err) = host.delete_component(obj) {
                log::warn!("releasing value payload failed: {err}");
            }
        }
    }

    /// Move-assignment: takes the payload out of this value, ownership
    /// included.
    ///
    /// After the call an owned object payload belongs to the returned
    /// value alone; this value keeps a non-owning reference to the same
    /// object, so releasing both values releases the object exactly
    /// once.
    pub fn take(&mut self) -> Value {
        match std::mem::take(self) {
            Value::Object(ObjectRef::Owned(obj)) => {
                let ptr = NonNull::from(obj.as_ref());
                // The box's pointee does not move with the box, so the
                // demoted reference stays valid while the new owner
                // holds it.
                *self = unsafe { Value::borrowed(ptr) };
                Value::Object(ObjectRef::Owned(obj))
            }
            Value::Object(ObjectRef::Borrowed(p)) => {
                *self = Value::Object(ObjectRef::Borrowed(p));
                Value::Object(ObjectRef::Borrowed(p))
            }
            Value::Int(v) => {
                *self = Value::Int(v);
                Value::Int(v)
            }
            Value::Float(v) => {
                *self = Value::Float(v);
                Value::Float(v)
            }
            // Strings have no non-owning form; the source is left void.
            Value::Str(s) => Value::Str(s),
            Value::Void => Value::Void,
        }
    }

    /// Releases this value's payload, then moves `other`'s payload in
    /// via [`take`](Value::take).
    pub fn assign_from(&mut self, other: &mut Value, host: &dyn HostApi) {
        self.unset(host);
        *self = other.take();
    }

    /// Non-owning copy: scalars and strings are copied, object payloads
    /// become borrowed references.
    pub fn clone_ref(&self) -> Value {
        match self {
            Value::Void => Value::Void,
            Value::Int(v) => Value::Int(*v),
            Value::Float(v) => Value::Float(*v),
            Value::Str(s) => Value::Str(s.clone()),
            Value::Object(ObjectRef::Owned(b)) => {
                unsafe { Value::borrowed(NonNull::from(b.as_ref())) }
            }
            Value::Object(ObjectRef::Borrowed(p)) => Value::Object(ObjectRef::Borrowed(*p)),
        }
    }

    // ------------------------------------------------------------------
    // Comparison
    // ------------------------------------------------------------------

    /// Structural equality across values: numeric values compare by
    /// magnitude, strings by contents, objects by their own equality.
    pub fn eq_value(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Void, Value::Void) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                (self.get_f32() as f64 - other.get_f32() as f64).abs() == 0.0
            }
            (Value::Object(_), Value::Object(_)) => match (self.as_object(), other.as_object()) {
                (Some(a), Some(b)) => a.equals(b),
                _ => false,
            },
            _ => false,
        }
    }

    // ------------------------------------------------------------------
    // Typecast
    // ------------------------------------------------------------------

    /// Converts the value in place to `target`, boxing scalars into
    /// host-pooled wrapper objects for object targets and releasing any
    /// owned payload the conversion consumes.
    pub fn typecast(
        &mut self,
        target: TypeTag,
        host: &dyn HostApi,
    ) -> Result<(), crate::host::HostError> {
        match target {
            TypeTag::Void => {
                self.unset(host);
            }
            TypeTag::Int => {
                let v = self.get_i32();
                self.unset(host);
                *self = Value::Int(v);
            }
            TypeTag::Float => {
                let v = self.get_f32();
                self.unset(host);
                *self = Value::Float(v);
            }
            TypeTag::String => {
                let s = self.to_string_lossy();
                self.unset(host);
                *self = Value::Str(s);
            }
            TypeTag::Object => match self {
                Value::Object(_) | Value::Void => {}
                Value::Int(v) => {
                    let v = *v;
                    let mut obj = host
                        .new_pooled_by_class_id(CLID_INTEGER, crate::component::PoolHint::Temporary)?;
                    obj.set_i32(v);
                    *self = Value::owned(obj);
                }
                Value::Float(v) => {
                    let v = *v;
                    let mut obj = host
                        .new_pooled_by_class_id(CLID_FLOAT, crate::component::PoolHint::Temporary)?;
                    obj.set_f32(v);
                    *self = Value::owned(obj);
                }
                Value::Str(s) => {
                    let s = std::mem::take(s);
                    let mut obj = host
                        .new_pooled_by_class_id(CLID_STRING, crate::component::PoolHint::Temporary)?;
                    obj.set_str(&s);
                    *self = Value::owned(obj);
                }
            },
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------

    /// Writes the value as a type tag followed by its payload. Object
    /// payloads are written with their type-name prefix.
    pub fn serialize_into(&self, stream: &mut dyn Stream) -> Result<(), StreamError> {
        stream.write_u8(self.type_tag() as u8)?;
        match self {
            Value::Void => Ok(()),
            Value::Int(v) => stream.write_i32(*v),
            Value::Float(v) => stream.write_f32(*v),
            Value::Str(s) => stream.write_len_string(s),
            Value::Object(_) => match self.as_object() {
                Some(obj) => obj.serialize(stream, true),
                None => Ok(()),
            },
        }
    }

    /// Reads a value previously written by
    /// [`serialize_into`](Value::serialize_into). Object payloads are
    /// instantiated through `host` by their serialized class name.
    pub fn deserialize_from(
        stream: &mut dyn Stream,
        host: &dyn HostApi,
    ) -> Result<Value, StreamError> {
        let raw = stream.read_u8()?;
        let tag = TypeTag::from_u8(raw)
            .ok_or_else(|| StreamError::Malformed(format!("unknown value tag {raw}")))?;
        match tag {
            TypeTag::Void => Ok(Value::Void),
            TypeTag::Int => Ok(Value::Int(stream.read_i32()?)),
            TypeTag::Float => Ok(Value::Float(stream.read_f32()?)),
            TypeTag::String => Ok(Value::Str(stream.read_len_string(u32::MAX as usize)?)),
            TypeTag::Object => Ok(Value::owned(crate::serial::read_component(stream, host)?)),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void => write!(f, "void"),
            Value::Int(v) => write!(f, "int({v})"),
            Value::Float(v) => write!(f, "float({v})"),
            Value::Str(s) => write!(f, "string({s:?})"),
            Value::Object(ObjectRef::Owned(b)) => write!(f, "object(owned {})", b.class_name()),
            Value::Object(ObjectRef::Borrowed(_)) => write!(f, "object(borrowed)"),
        }
    }
}
