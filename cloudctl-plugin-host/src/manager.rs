//! Lazy Loader: launch a plugin on first use, then reuse its handle
//!
//! Each plugin name owns one `OnceCell` slot. Concurrent first callers for the
//! same name wait on the same in-flight launch. A launch that fails leaves the
//! slot empty, so the next caller tries again.

use crate::error::LaunchError;
use crate::handle::ServiceHandle;
use crate::launcher::PluginLauncher;
use crate::registry::PluginRegistry;
use cloudctl_plugin_api::PluginDescriptor;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

type Slot = Arc<OnceCell<ServiceHandle>>;

pub struct PluginManager {
    registry: PluginRegistry,
    launcher: PluginLauncher,
    slots: Mutex<HashMap<&'static str, Slot>>,
}

impl PluginManager {
    pub fn new(registry: PluginRegistry, launcher: PluginLauncher) -> Self {
        Self {
            registry,
            launcher,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Return the cached handle for `descriptor`, launching it on first use
    pub async fn get_or_launch(
        &self,
        descriptor: &PluginDescriptor,
    ) -> Result<ServiceHandle, LaunchError> {
        self.get_or_launch_named(descriptor.name).await
    }

    /// Same as [`get_or_launch`](Self::get_or_launch), keyed by plugin name
    pub async fn get_or_launch_named(&self, name: &str) -> Result<ServiceHandle, LaunchError> {
        let entry = *self.registry.lookup(name)?;
        let slot = self.slot(entry.descriptor.name);

        let handle = slot
            .get_or_try_init(|| async {
                tracing::debug!(plugin = entry.descriptor.name, "First use; launching");
                self.launcher.launch(&entry).await
            })
            .await?;

        Ok(handle.clone())
    }

    /// Handle for `name` if it has already been launched
    pub fn cached(&self, name: &str) -> Option<ServiceHandle> {
        self.lock_slots()
            .get(name)
            .and_then(|slot| slot.get().cloned())
    }

    /// Every handle launched so far
    pub fn live_handles(&self) -> Vec<ServiceHandle> {
        self.lock_slots()
            .values()
            .filter_map(|slot| slot.get().cloned())
            .collect()
    }

    fn slot(&self, name: &'static str) -> Slot {
        self.lock_slots().entry(name).or_default().clone()
    }

    fn lock_slots(&self) -> std::sync::MutexGuard<'_, HashMap<&'static str, Slot>> {
        self.slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginManager")
            .field("registry", &self.registry)
            .field("live", &self.live_handles().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::SearchPath;
    use crate::launcher::LauncherConfig;
    use tempfile::TempDir;

    fn manager_with_empty_path(dir: &TempDir) -> PluginManager {
        let config = LauncherConfig::default().with_search_path(SearchPath::new([dir.path()]));
        PluginManager::new(PluginRegistry::builtin(), PluginLauncher::new(config))
    }

    #[tokio::test]
    async fn test_missing_plugin_is_not_cached() {
        let dir = TempDir::new().unwrap();
        let manager = manager_with_empty_path(&dir);

        for _ in 0..2 {
            let err = manager.get_or_launch_named("apiKey").await.unwrap_err();
            assert!(err.is_not_installed());
        }
        assert!(manager.cached("apiKey").is_none());
        assert!(manager.live_handles().is_empty());
    }

    #[tokio::test]
    async fn test_unregistered_name() {
        let dir = TempDir::new().unwrap();
        let manager = manager_with_empty_path(&dir);

        let err = manager.get_or_launch_named("billing").await.unwrap_err();
        assert!(matches!(err, LaunchError::Registry(_)));
    }
}
