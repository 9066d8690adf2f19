//! The component trait and its per-instance header.
//!
//! Every object that crosses the host/plugin boundary implements
//! [`Component`]. The trait is one flat surface organized into capability
//! groups (reflection, operators, streams, serialization, iteration,
//! array/hash access, metaclass, signals); every group method has a
//! conservative default, so a minimal component only provides the
//! reflection core. New methods are only ever appended with defaults,
//! which keeps previously compiled plugins source-compatible with newer
//! hosts.

use std::any::Any;
use std::fmt;

use crate::ids::{ClassId, CLID_OBJECT};
use crate::stream::{Stream, StreamError};
use crate::value::Value;

/// A heap-allocated, dynamically typed component instance.
pub type ComponentBox = Box<dyn Component>;

// ============================================================================
// Validation tag
// ============================================================================

/// Liveness marker stamped into every component header.
///
/// Allocation paths stamp [`ValidationTag::Valid`]; deallocation paths
/// stamp [`ValidationTag::Invalid`] before the memory (or pool slot) is
/// surrendered, so use-after-free and double-release show up as a tag
/// mismatch instead of silent corruption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ValidationTag {
    /// The object is live.
    Valid = 0x900D_F00D,
    /// The object has been released.
    Invalid = 0xD34D_BEEF,
}

impl ValidationTag {
    /// Returns true for [`ValidationTag::Valid`].
    pub fn is_valid(self) -> bool {
        matches!(self, ValidationTag::Valid)
    }
}

// ============================================================================
// Pooling metadata
// ============================================================================

/// Caller intent passed to pooled allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolHint {
    /// Ordinary lifetime; the object is released explicitly.
    Default,
    /// Short-lived scratch object, typically an operator temporary.
    Temporary,
}

/// Relative pool capacity a class requests for its instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PoolPriority {
    /// Rarely recycled; smallest slot budget.
    Low,
    /// Default budget.
    Medium,
    /// Hot allocation path; largest slot budget.
    High,
}

/// Location of a pooled object inside the host's object pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolHandle {
    /// Index of the owning pool.
    pub pool_id: u16,
    /// Slot index within the pool.
    pub slot: u32,
}

// ============================================================================
// Capability flags
// ============================================================================

/// Bitset describing which optional method groups a class implements.
///
/// Callers probe the set before invoking a group so that unimplemented
/// defaults are never mistaken for real behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilitySet(pub u16);

impl CapabilitySet {
    /// No optional groups.
    pub const NONE: CapabilitySet = CapabilitySet(0);
    /// Reflection helpers beyond the mandatory core (string conversion,
    /// member lookup).
    pub const REFLECTION: CapabilitySet = CapabilitySet(1 << 0);
    /// Binary/unary operator dispatch and scalar scan/store.
    pub const OPERATOR: CapabilitySet = CapabilitySet(1 << 1);
    /// The instance exposes a byte stream view.
    pub const STREAM: CapabilitySet = CapabilitySet(1 << 2);
    /// Self-describing serialization.
    pub const SERIALIZATION: CapabilitySet = CapabilitySet(1 << 3);
    /// Value iteration.
    pub const ITERATOR: CapabilitySet = CapabilitySet(1 << 4);
    /// Indexed element access.
    pub const ARRAY: CapabilitySet = CapabilitySet(1 << 5);
    /// Keyed element access.
    pub const HASH: CapabilitySet = CapabilitySet(1 << 6);
    /// The class serializes under a metaclass name.
    pub const METACLASS: CapabilitySet = CapabilitySet(1 << 7);
    /// Named signals bindable to host callbacks.
    pub const SIGNALS: CapabilitySet = CapabilitySet(1 << 8);

    /// Returns true when every flag in `other` is present in `self`.
    pub fn contains(self, other: CapabilitySet) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for CapabilitySet {
    type Output = CapabilitySet;

    fn bitor(self, rhs: CapabilitySet) -> CapabilitySet {
        CapabilitySet(self.0 | rhs.0)
    }
}

// ============================================================================
// Operator opcodes
// ============================================================================

/// Operator selector for [`Component::operate`].
///
/// The numeric values are part of the binary contract between hosts and
/// plugins and never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    /// `a = b`
    Assign = 0,
    /// `a += b`
    Add = 1,
    /// `a -= b`
    Sub = 2,
    /// `a *= b`
    Mul = 3,
    /// `a /= b`
    Div = 4,
    /// `a %= b`
    Mod = 5,
    /// `a <<= b`
    Shl = 6,
    /// `a >>= b`
    Shr = 7,
    /// `a == b`
    CmpEq = 8,
    /// `a != b`
    CmpNe = 9,
    /// `a <= b`
    CmpLe = 10,
    /// `a < b`
    CmpLt = 11,
    /// `a >= b`
    CmpGe = 12,
    /// `a > b`
    CmpGt = 13,
    /// `a &= b`
    BitAnd = 14,
    /// `a |= b`
    BitOr = 15,
    /// `a ^= b`
    BitXor = 16,
    /// logical not of `b`, stored into `a`
    Not = 17,
    /// bitwise not of `b`, stored into `a`
    BitNot = 18,
    /// `a && b`
    LogicAnd = 19,
    /// `a || b`
    LogicOr = 20,
    /// logical xor
    LogicXor = 21,
    /// arithmetic negation
    Neg = 22,
    /// initialize from a template instance
    Init = 23,
}

impl Opcode {
    /// Returns true for the six comparison opcodes, which write a boolean
    /// result value instead of mutating the receiver.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Opcode::CmpEq
                | Opcode::CmpNe
                | Opcode::CmpLe
                | Opcode::CmpLt
                | Opcode::CmpGe
                | Opcode::CmpGt
        )
    }
}

// ============================================================================
// Component header
// ============================================================================

/// Per-instance bookkeeping embedded in every component.
///
/// The host's allocation and deallocation paths are the only legitimate
/// mutators of the tag and pool handle; component code treats both as
/// read-only.
#[derive(Debug)]
pub struct ComponentHeader {
    class_id: ClassId,
    tag: ValidationTag,
    pool: Option<PoolHandle>,
}

impl ComponentHeader {
    /// Creates a header for a fresh, live, unpooled instance.
    pub fn new(class_id: ClassId) -> Self {
        ComponentHeader {
            class_id,
            tag: ValidationTag::Valid,
            pool: None,
        }
    }

    /// Class id of the instance.
    pub fn class_id(&self) -> ClassId {
        self.class_id
    }

    /// Current liveness tag.
    pub fn tag(&self) -> ValidationTag {
        self.tag
    }

    /// Pool location, if the instance is pool-managed.
    pub fn pool_handle(&self) -> Option<PoolHandle> {
        self.pool
    }

    /// Stamps the class id. Host registration path only.
    pub fn set_class_id(&mut self, id: ClassId) {
        self.class_id = id;
    }

    /// Stamps the liveness tag. Host allocation/deallocation paths only.
    pub fn set_tag(&mut self, tag: ValidationTag) {
        self.tag = tag;
    }

    /// Stamps the pool handle. Host pool paths only.
    pub fn set_pool_handle(&mut self, handle: Option<PoolHandle>) {
        self.pool = handle;
    }
}

impl Drop for ComponentHeader {
    fn drop(&mut self) {
        // A pooled object that is still tagged live is being torn down
        // outside the pool release path; its slot can never be recycled.
        if self.pool.is_some() && self.tag.is_valid() {
            log::error!(
                "pooled instance of {} dropped while still live; slot leaked",
                self.class_id
            );
        }
    }
}

// ============================================================================
// The component trait
// ============================================================================

/// A dynamically typed object managed through the host.
///
/// Only [`header`](Component::header), [`header_mut`](Component::header_mut),
/// [`class_name`](Component::class_name), [`spawn`](Component::spawn) and the
/// `as_any` pair are mandatory; everything else defaults to a conservative
/// no-op that callers can detect (via [`capabilities`](Component::capabilities)
/// or the `Option`/`bool` return).
pub trait Component: Any {
    // ------------------------------------------------------------------
    // Mandatory core
    // ------------------------------------------------------------------

    /// Shared per-instance header.
    fn header(&self) -> &ComponentHeader;

    /// Mutable access to the header. Host paths only.
    fn header_mut(&mut self) -> &mut ComponentHeader;

    /// Class name, unique per registered class.
    fn class_name(&self) -> &str;

    /// Creates a fresh default-initialized instance of the same class.
    ///
    /// The new instance carries this instance's class id; all other
    /// state is default.
    fn spawn(&self) -> ComponentBox;

    /// Upcast for concrete-type downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for concrete-type downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    // ------------------------------------------------------------------
    // Reflection
    // ------------------------------------------------------------------

    /// Optional method groups this class implements.
    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::NONE
    }

    /// Name of the parent class, or `None` for root classes.
    ///
    /// The parent must already be registered when this class registers.
    fn parent_class_name(&self) -> Option<&str> {
        None
    }

    /// Dynamic script-visible class name, when it differs from
    /// [`class_name`](Component::class_name) (metaclass instances).
    fn meta_class_name(&self) -> Option<&str> {
        None
    }

    /// Names of the class's script-visible members, when the class
    /// exposes any.
    fn member_names(&self) -> &[&str] {
        &[]
    }

    /// Initializes a fresh instance from a template of the same class.
    fn init_from(&mut self, template: &dyn Component) {
        let _ = self.copy_from(template);
    }

    /// Deep-copies state from `other`. Returns false when the source
    /// type is not understood.
    fn copy_from(&mut self, other: &dyn Component) -> bool {
        let _ = other;
        false
    }

    /// Structural equality.
    ///
    /// The default compares identity, except that two plain instances of
    /// the generic base class always compare equal (they carry no state).
    fn equals(&self, other: &dyn Component) -> bool {
        if self.header().class_id() == CLID_OBJECT && other.header().class_id() == CLID_OBJECT {
            return true;
        }
        std::ptr::eq(
            self.as_any() as *const dyn Any as *const (),
            other.as_any() as *const dyn Any as *const (),
        )
    }

    /// Human-readable rendition of the instance, if the class has one.
    fn to_string_value(&self) -> Option<String> {
        None
    }

    /// Releases resources held by the instance before its memory is
    /// surrendered or its pool slot parked. Owned child values must be
    /// released through `host`.
    fn finalize(&mut self, host: &dyn crate::host::HostApi) {
        let _ = host;
    }

    /// Resets a recycled pool slot to fresh-construction state.
    ///
    /// Pooled acquisition always runs this before handing the instance
    /// out, so callers never observe state from the slot's previous
    /// occupant.
    fn reinit(&mut self) {}

    // ------------------------------------------------------------------
    // Pooling
    // ------------------------------------------------------------------

    /// Instance byte size for pool accounting, or 0 to opt out of
    /// pooling entirely.
    fn pool_size(&self) -> usize {
        0
    }

    /// Slot budget tier for this class's pools.
    fn pool_priority(&self) -> PoolPriority {
        PoolPriority::Medium
    }

    // ------------------------------------------------------------------
    // Operators
    // ------------------------------------------------------------------

    /// Applies `op` to the receiver with optional right operand `other`.
    ///
    /// Arithmetic and assignment opcodes mutate the receiver; comparison
    /// opcodes leave it untouched and write a boolean integer into `out`.
    /// The default routes `Init` to [`init_from`](Component::init_from),
    /// handles `CmpEq`/`CmpNe` via [`equals`](Component::equals), and
    /// ignores everything else.
    fn operate(&mut self, op: Opcode, other: Option<&dyn Component>, out: &mut Value) {
        match (op, other) {
            (Opcode::Init, Some(rhs)) => self.init_from(rhs),
            (Opcode::CmpEq, Some(rhs)) => out.set_i32(self.equals(rhs) as i32),
            (Opcode::CmpNe, Some(rhs)) => out.set_i32(!self.equals(rhs) as i32),
            _ => {}
        }
    }

    /// Applies `op` with an `i32` right operand.
    ///
    /// Numeric classes override the scalar overloads to match their
    /// [`operate`](Component::operate) semantics exactly; the default
    /// only routes `Assign`/`Init` to the scalar store.
    fn operate_i32(&mut self, op: Opcode, value: i32, out: &mut Value) {
        let _ = out;
        if matches!(op, Opcode::Assign | Opcode::Init) {
            let _ = self.set_i32(value);
        }
    }

    /// Applies `op` with an `i64` right operand; see
    /// [`operate_i32`](Component::operate_i32).
    fn operate_i64(&mut self, op: Opcode, value: i64, out: &mut Value) {
        let _ = out;
        if matches!(op, Opcode::Assign | Opcode::Init) {
            let _ = self.set_i64(value);
        }
    }

    /// Applies `op` with an `f32` right operand; see
    /// [`operate_i32`](Component::operate_i32).
    fn operate_f32(&mut self, op: Opcode, value: f32, out: &mut Value) {
        let _ = out;
        if matches!(op, Opcode::Assign | Opcode::Init) {
            let _ = self.set_f32(value);
        }
    }

    /// Applies `op` with an `f64` right operand; see
    /// [`operate_i32`](Component::operate_i32).
    fn operate_f64(&mut self, op: Opcode, value: f64, out: &mut Value) {
        let _ = out;
        if matches!(op, Opcode::Assign | Opcode::Init) {
            let _ = self.set_f64(value);
        }
    }

    /// Reads the instance as an `i32`, if the class has a numeric view.
    fn scan_i32(&self) -> Option<i32> {
        None
    }

    /// Reads the instance as an `i64`.
    fn scan_i64(&self) -> Option<i64> {
        None
    }

    /// Reads the instance as an `f32`.
    fn scan_f32(&self) -> Option<f32> {
        None
    }

    /// Reads the instance as an `f64`.
    fn scan_f64(&self) -> Option<f64> {
        None
    }

    /// Stores an `i32` into the instance. Returns false when the class
    /// has no numeric store.
    fn set_i32(&mut self, value: i32) -> bool {
        let _ = value;
        false
    }

    /// Stores an `i64`.
    fn set_i64(&mut self, value: i64) -> bool {
        let _ = value;
        false
    }

    /// Stores an `f32`.
    fn set_f32(&mut self, value: f32) -> bool {
        let _ = value;
        false
    }

    /// Stores an `f64`.
    fn set_f64(&mut self, value: f64) -> bool {
        let _ = value;
        false
    }

    /// Stores a string.
    fn set_str(&mut self, value: &str) -> bool {
        let _ = value;
        false
    }

    // ------------------------------------------------------------------
    // Streams
    // ------------------------------------------------------------------

    /// Byte-stream view of the instance, when the class has one.
    fn as_stream(&mut self) -> Option<&mut dyn Stream> {
        None
    }

    // ------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------

    /// Writes the instance to `stream`.
    ///
    /// With `type_info` set, the payload is prefixed with the class name
    /// (or metaclass name) so a reader can verify the type before
    /// consuming fields.
    fn serialize(&self, stream: &mut dyn Stream, type_info: bool) -> Result<(), StreamError> {
        if type_info {
            stream.write_len_string(self.serial_name())?;
        }
        self.serialize_fields(stream)
    }

    /// Reads the instance from `stream`, the inverse of
    /// [`serialize`](Component::serialize). Composite classes
    /// instantiate embedded objects through `host`.
    fn deserialize(
        &mut self,
        stream: &mut dyn Stream,
        host: &dyn crate::host::HostApi,
        type_info: bool,
    ) -> Result<(), StreamError> {
        if type_info && !self.can_deserialize(stream) {
            return Err(StreamError::ClassMismatch {
                expected: self.serial_name().to_string(),
            });
        }
        self.deserialize_fields(stream, host)
    }

    /// Writes the class's fields, without any type prefix.
    fn serialize_fields(&self, stream: &mut dyn Stream) -> Result<(), StreamError> {
        let _ = stream;
        Ok(())
    }

    /// Reads the class's fields, without any type prefix.
    fn deserialize_fields(
        &mut self,
        stream: &mut dyn Stream,
        host: &dyn crate::host::HostApi,
    ) -> Result<(), StreamError> {
        let _ = (stream, host);
        Ok(())
    }

    /// Name written as the serialized type prefix: the metaclass name
    /// when present, otherwise the class name.
    fn serial_name(&self) -> &str {
        match self.meta_class_name() {
            Some(name) => name,
            None => self.class_name(),
        }
    }

    /// Checks whether the stream's next serialized object is an instance
    /// of this class, by peeking a bounded-length type-name prefix.
    ///
    /// On a match the prefix is consumed; on any mismatch or read error
    /// the stream is rewound to its prior offset.
    fn can_deserialize(&self, stream: &mut dyn Stream) -> bool {
        let start = stream.offset();
        let name = match stream.read_len_string(crate::serial::MAX_SERIAL_NAME_LEN) {
            Ok(name) => name,
            Err(_) => {
                let _ = stream.set_offset(start);
                return false;
            }
        };
        if name == self.class_name() || self.meta_class_name() == Some(name.as_str()) {
            true
        } else {
            let _ = stream.set_offset(start);
            false
        }
    }

    // ------------------------------------------------------------------
    // Iteration
    // ------------------------------------------------------------------

    /// Iterates the instance's values, when the class is iterable.
    ///
    /// Yielded values are those of [`Value::clone_ref`]: scalar copies
    /// and non-owning object references.
    fn value_iter(&self) -> Option<Box<dyn Iterator<Item = Value> + '_>> {
        None
    }

    // ------------------------------------------------------------------
    // Array / hash access
    // ------------------------------------------------------------------

    /// Number of indexable elements, when the class is array-like.
    fn array_len(&self) -> Option<usize> {
        None
    }

    /// Elements the instance can hold before growing, when the class is
    /// array-like.
    fn array_capacity(&self) -> Option<usize> {
        None
    }

    /// Resizes the instance to `len` elements. Returns false when the
    /// class does not support explicit sizing.
    fn array_alloc(&mut self, len: usize) -> bool {
        let _ = len;
        false
    }

    /// Byte size of one element, or 0 when the class has no fixed
    /// element layout.
    fn element_byte_size(&self) -> usize {
        0
    }

    /// Reads element `index` into `out`. Out-of-range reads leave `out`
    /// void and return false.
    fn array_get(&self, index: usize, out: &mut Value) -> bool {
        let _ = (index, out);
        false
    }

    /// Writes element `index`. Returns false when unsupported or out of
    /// range.
    fn array_set(&mut self, index: usize, value: Value, host: &dyn crate::host::HostApi) -> bool {
        let _ = (index, value, host);
        false
    }

    /// Reads the value stored under `key` into `out`. Missing keys leave
    /// `out` void and return false.
    fn hash_get(&self, key: &str, out: &mut Value) -> bool {
        let _ = (key, out);
        false
    }

    /// Stores `value` under `key`, taking ownership of the value.
    fn hash_set(&mut self, key: &str, value: Value, host: &dyn crate::host::HostApi) -> bool {
        let _ = (key, value, host);
        false
    }

    /// Removes `key`, releasing any owned value stored under it.
    fn hash_remove(&mut self, key: &str, host: &dyn crate::host::HostApi) -> bool {
        let _ = (key, host);
        false
    }

    // ------------------------------------------------------------------
    // Signals
    // ------------------------------------------------------------------

    /// Names of the signals the class can emit, indexed by position.
    fn signal_names(&self) -> &[&str] {
        &[]
    }

    /// Binds signal `index` to a host callback slot, or unbinds it with
    /// `None`. Returns false when the class has no such signal.
    fn bind_signal(&mut self, index: usize, callback: Option<crate::ids::CallbackId>) -> bool {
        let _ = (index, callback);
        false
    }
}

impl fmt::Debug for dyn Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} {}>", self.class_name(), self.header().class_id())
    }
}
