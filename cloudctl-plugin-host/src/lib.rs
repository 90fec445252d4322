//! cloudctl-plugin-host: Host runtime for cloudctl plugins
//!
//! Finds plugin executables on the search path, spawns them on first use,
//! performs the handshake and dispense, and hands out typed service handles.
//! The [`LifecycleHook`] stops every spawned plugin when the host exits.

pub mod connection;
pub mod discovery;
pub mod error;
pub mod handle;
pub mod launcher;
pub mod lifecycle;
pub mod manager;
pub mod registry;

pub use connection::PluginConnection;
pub use discovery::{discover, PluginStatus, SearchPath, PLUGIN_PATH_ENV};
pub use error::{LaunchError, RegistryError};
pub use handle::{DispensedService, PluginProcess, ServiceHandle};
pub use launcher::{LauncherConfig, PluginLauncher, DEFAULT_HANDSHAKE_TIMEOUT};
pub use lifecycle::{shutdown_all, LifecycleHook, DEFAULT_SHUTDOWN_GRACE};
pub use manager::PluginManager;
pub use registry::{builtin_entries, ClientFactory, PluginEntry, PluginRegistry, RegistryBuilder};
