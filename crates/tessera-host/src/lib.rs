//! Reference host of the tessera component model.
//!
//! Builds the service surface `tessera-core` defines: a class registry
//! with a precomputed typecast matrix, per-class object pools, the
//! builtin classes, exception/callback/mutex registries, and plugin
//! loading. See [`Host`] for the entry point.

#![warn(missing_docs)]

pub mod builtins;
pub mod callbacks;
pub mod exceptions;
pub mod host;
pub mod mutexes;
pub mod plugin;
pub mod pool;
pub mod registry;

pub use callbacks::CallbackRegistry;
pub use exceptions::ExceptionRegistry;
pub use host::{Host, RaisedException};
pub use mutexes::MutexService;
pub use plugin::{PluginDescriptor, PluginExitFn, PluginInitFn};
pub use pool::{ObjectPool, PoolStats};
pub use registry::{ClassDescriptor, ClassRegistry};
