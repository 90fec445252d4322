//! Launch and registry errors

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while turning a descriptor into a live handle
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The plugin binary is not on the search path. Expected; not fatal.
    #[error("Plugin '{plugin}' is not installed ({binary} not found on the search path)")]
    NotInstalled { plugin: String, binary: String },

    #[error("Failed to start plugin '{plugin}' from {}: {source}", path.display())]
    SpawnFailed {
        plugin: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Plugin '{plugin}' is incompatible: {reason}")]
    HandshakeFailed { plugin: String, reason: String },

    #[error("Plugin '{plugin}' did not provide service '{service}': {reason}")]
    DispenseFailed {
        plugin: String,
        service: String,
        reason: String,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl LaunchError {
    /// Whether this is the soft "feature unavailable" case
    pub fn is_not_installed(&self) -> bool {
        matches!(self, LaunchError::NotInstalled { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Plugin '{0}' registered twice")]
    Duplicate(String),

    #[error("No plugin registered under '{0}'")]
    NotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_installed_message() {
        let err = LaunchError::NotInstalled {
            plugin: "apiKey".to_string(),
            binary: "cloudctl-apikey-plugin".to_string(),
        };
        assert!(err.is_not_installed());
        assert_eq!(
            err.to_string(),
            "Plugin 'apiKey' is not installed (cloudctl-apikey-plugin not found on the search path)"
        );
    }

    #[test]
    fn test_registry_error_converts() {
        let err: LaunchError = RegistryError::NotFound("ghost".to_string()).into();
        assert!(!err.is_not_installed());
        assert_eq!(err.to_string(), "No plugin registered under 'ghost'");
    }
}
