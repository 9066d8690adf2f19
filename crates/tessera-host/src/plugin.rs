//! Plugin loading.
//!
//! A plugin hands the host a static descriptor: its name, its packed
//! version, the host interface version it was built against, and its
//! entry points. The host gates on the interface major version, runs
//! the entry point with itself as the service surface, and keeps the
//! exit hook for unload.

use tessera_core::host::{unpack_version, HostApi, HostError, HOST_INTERFACE_VERSION};

use crate::host::Host;

/// Plugin entry point, run once at load. Classes, exceptions, and
/// callbacks registered here stay live for the host's lifetime; the
/// registries are append-only.
pub type PluginInitFn = fn(&dyn HostApi) -> Result<(), HostError>;

/// Plugin exit hook, run once at unload.
pub type PluginExitFn = fn(&dyn HostApi);

/// Static description a plugin exports to the host.
pub struct PluginDescriptor {
    /// Unique plugin name.
    pub name: &'static str,
    /// Plugin's own packed version, see
    /// [`pack_version`](tessera_core::host::pack_version).
    pub version: u32,
    /// Host interface version the plugin was built against.
    pub interface_version: u32,
    /// Entry point.
    pub init: PluginInitFn,
    /// Exit hook.
    pub exit: PluginExitFn,
}

pub(crate) struct LoadedPlugin {
    pub version: u32,
    pub exit: PluginExitFn,
}

impl Host {
    /// Loads a plugin: gates on the interface major version, records
    /// it, and runs its entry point. A failed entry point leaves the
    /// plugin unloaded.
    pub fn load_plugin(&self, descriptor: &PluginDescriptor) -> Result<(), HostError> {
        let (host_major, _, _) = unpack_version(HOST_INTERFACE_VERSION);
        let (plugin_major, _, _) = unpack_version(descriptor.interface_version);
        if plugin_major != host_major {
            return Err(HostError::IncompatibleInterface {
                name: descriptor.name.to_string(),
                version: descriptor.interface_version,
            });
        }

        {
            let mut plugins = self.plugins.lock();
            if plugins.contains_key(descriptor.name) {
                return Err(HostError::PluginAlreadyLoaded(descriptor.name.to_string()));
            }
            plugins.insert(
                descriptor.name.to_string(),
                LoadedPlugin {
                    version: descriptor.version,
                    exit: descriptor.exit,
                },
            );
        }

        if let Err(err) = (descriptor.init)(self) {
            self.plugins.lock().remove(descriptor.name);
            return Err(err);
        }
        let (major, minor, patch) = unpack_version(descriptor.version);
        log::info!("plugin `{}` v{major}.{minor}.{patch} loaded", descriptor.name);
        Ok(())
    }

    /// Unloads a plugin, running its exit hook.
    pub fn unload_plugin(&self, name: &str) -> Result<(), HostError> {
        let entry = self
            .plugins
            .lock()
            .remove(name)
            .ok_or_else(|| HostError::PluginNotLoaded(name.to_string()))?;
        (entry.exit)(self);
        log::info!("plugin `{name}` unloaded");
        Ok(())
    }

    /// Packed version of a loaded plugin.
    pub fn plugin_version(&self, name: &str) -> Option<u32> {
        self.plugins.lock().get(name).map(|p| p.version)
    }
}
