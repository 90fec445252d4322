//! Launcher behaviour against ordinary system binaries that do not speak
//! the plugin protocol.

#![cfg(unix)]

use cloudctl_plugin_api::PluginDescriptor;
use cloudctl_plugin_host::{
    builtin_entries, LaunchError, LauncherConfig, PluginEntry, PluginLauncher, PluginManager,
    PluginRegistry, SearchPath,
};
use std::time::Duration;

fn system_path() -> SearchPath {
    SearchPath::new(["/bin", "/usr/bin"])
}

/// An "apiKey" entry whose binary is some unrelated program
fn impostor(binary: &'static str) -> PluginEntry {
    let [apikey, ..] = builtin_entries();
    PluginEntry::new(PluginDescriptor::new("apiKey", binary), apikey.factory)
}

fn launcher() -> PluginLauncher {
    PluginLauncher::new(
        LauncherConfig::default()
            .with_search_path(system_path())
            .with_handshake_timeout(Duration::from_secs(5)),
    )
}

#[tokio::test]
async fn test_missing_binary_is_reported_not_installed() {
    let entry = impostor("cloudctl-definitely-not-installed");
    let err = launcher().launch(&entry).await.unwrap_err();

    match err {
        LaunchError::NotInstalled { plugin, binary } => {
            assert_eq!(plugin, "apiKey");
            assert_eq!(binary, "cloudctl-definitely-not-installed");
        }
        other => panic!("Expected NotInstalled, got {:?}", other),
    }
}

#[tokio::test]
async fn test_program_that_exits_fails_handshake() {
    let err = launcher().launch(&impostor("true")).await.unwrap_err();
    assert!(
        matches!(err, LaunchError::HandshakeFailed { .. }),
        "got {:?}",
        err
    );
}

#[tokio::test]
async fn test_echoing_program_fails_handshake() {
    // cat sends our own Hello back, which is not a plugin frame
    let err = launcher().launch(&impostor("cat")).await.unwrap_err();
    match err {
        LaunchError::HandshakeFailed { plugin, reason } => {
            assert_eq!(plugin, "apiKey");
            assert!(reason.contains("unreadable reply"), "reason: {}", reason);
        }
        other => panic!("Expected HandshakeFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_host_keeps_working_after_missing_plugin() {
    let registry = PluginRegistry::new([impostor("cloudctl-definitely-not-installed")])
        .expect("registry");
    let manager = PluginManager::new(registry, launcher());

    let first = manager.get_or_launch_named("apiKey").await;
    assert!(first.unwrap_err().is_not_installed());

    // Still usable: other lookups run normally
    let unknown = manager.get_or_launch_named("user").await.unwrap_err();
    assert!(matches!(unknown, LaunchError::Registry(_)));
    assert!(manager.live_handles().is_empty());
}
