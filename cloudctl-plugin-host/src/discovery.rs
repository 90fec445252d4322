//! Plugin discovery on the executable search path
//!
//! Plugin binaries are located the way a shell finds commands: directory by
//! directory, first executable match wins. Directories listed in
//! `CLOUDCTL_PLUGIN_PATH` and in the configuration file are searched before
//! the regular `PATH`.

use crate::registry::PluginRegistry;
use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Environment variable holding extra plugin directories (path-list syntax)
pub const PLUGIN_PATH_ENV: &str = "CLOUDCTL_PLUGIN_PATH";

/// Ordered list of directories searched for plugin binaries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPath {
    dirs: Vec<PathBuf>,
}

impl SearchPath {
    /// Search exactly the given directories, in order
    pub fn new(dirs: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            dirs: dirs.into_iter().map(Into::into).collect(),
        }
    }

    /// `CLOUDCTL_PLUGIN_PATH`, then `extra`, then `PATH`
    pub fn from_env(extra: &[PathBuf]) -> Self {
        Self::from_parts(
            std::env::var_os(PLUGIN_PATH_ENV),
            extra,
            std::env::var_os("PATH"),
        )
    }

    fn from_parts(
        plugin_path: Option<OsString>,
        extra: &[PathBuf],
        path: Option<OsString>,
    ) -> Self {
        let mut dirs: Vec<PathBuf> = Vec::new();
        if let Some(value) = plugin_path {
            dirs.extend(std::env::split_paths(&value));
        }
        dirs.extend(extra.iter().cloned());
        if let Some(value) = path {
            dirs.extend(std::env::split_paths(&value));
        }

        // Empty entries mean "current directory" to a shell; never search it implicitly
        dirs.retain(|d| !d.as_os_str().is_empty());

        let mut seen = std::collections::HashSet::new();
        dirs.retain(|d| seen.insert(d.clone()));

        Self { dirs }
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Locate `binary` on this search path
    pub fn resolve(&self, binary: &str) -> Option<PathBuf> {
        let file_name = format!("{}{}", binary, std::env::consts::EXE_SUFFIX);
        self.dirs
            .iter()
            .map(|dir| dir.join(&file_name))
            .find(|candidate| is_executable(candidate))
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    match std::fs::metadata(path) {
        Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Installation status of one registered plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginStatus {
    pub name: String,
    pub binary: String,
    /// Resolved executable, if installed
    pub path: Option<PathBuf>,
}

impl PluginStatus {
    pub fn is_installed(&self) -> bool {
        self.path.is_some()
    }
}

/// Report where each registered plugin resolves, without spawning anything
pub fn discover(registry: &PluginRegistry, search: &SearchPath) -> Vec<PluginStatus> {
    registry
        .descriptors()
        .map(|descriptor| PluginStatus {
            name: descriptor.name.to_string(),
            binary: descriptor.binary_name.to_string(),
            path: search.resolve(descriptor.binary_name),
        })
        .collect()
}
