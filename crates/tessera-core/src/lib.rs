//! Shared types of the tessera component model.
//!
//! This crate defines everything that crosses the host/plugin boundary:
//! the [`Component`] trait and its capability groups, the boundary
//! [`Value`] with its ownership discipline, the abstract [`Stream`]
//! interface, the self-describing serialization helpers, and the
//! [`HostApi`] service surface. The `tessera-host` crate provides the
//! reference host implementation on top of these types.
//!
//! Compatibility is append-only: trait methods, opcode values, type
//! tags, and reserved class ids are only ever added, never renumbered or
//! removed, so plugins compiled against an older surface keep working
//! under newer hosts.

#![warn(missing_docs)]

pub mod component;
pub mod host;
pub mod ids;
pub mod serial;
pub mod stream;
pub mod value;

pub use component::{
    CapabilitySet, Component, ComponentBox, ComponentHeader, Opcode, PoolHandle, PoolHint,
    PoolPriority, ValidationTag,
};
pub use host::{
    CallbackFn, HostApi, HostCapabilitySet, HostError, InstantiationPolicy, RegistryError,
};
pub use ids::{CallbackId, ClassId, ContextId, ExceptionId, MutexId};
pub use stream::{ByteOrder, SeekMode, Stream, StreamError};
pub use value::{ObjectRef, TypeTag, Value};
