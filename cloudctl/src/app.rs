//! Application state shared by every command handler

use crate::config::HostSettings;
use crate::PluginState;
use cloudctl_plugin_api::CallContext;
use cloudctl_plugin_host::{LifecycleHook, PluginLauncher, PluginManager, PluginRegistry};
use std::sync::Arc;

pub struct AppState {
    pub settings: HostSettings,
    plugins: Arc<PluginManager>,
}

impl AppState {
    /// State over the builtin plugin set
    pub fn new(settings: HostSettings) -> Self {
        Self::with_registry(settings, PluginRegistry::builtin())
    }

    pub fn with_registry(settings: HostSettings, registry: PluginRegistry) -> Self {
        let launcher = PluginLauncher::new(settings.launcher_config());
        Self {
            plugins: Arc::new(PluginManager::new(registry, launcher)),
            settings,
        }
    }

    /// Context for one plugin call, bounded by the configured call timeout
    pub fn call_context(&self) -> CallContext {
        CallContext::with_timeout(self.settings.call_timeout)
    }

    /// Hook that stops every plugin this state has launched
    pub fn lifecycle_hook(&self) -> LifecycleHook {
        LifecycleHook::new(self.plugins.clone(), self.settings.shutdown_grace)
    }
}

impl PluginState for AppState {
    fn plugins(&self) -> &PluginManager {
        &self.plugins
    }
}
