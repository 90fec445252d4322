//! Host and plugin processes talking for real: launch, calls, shutdown.

#![cfg(unix)]

use cloudctl_plugin_host::{
    builtin_entries, LaunchError, LauncherConfig, LifecycleHook, PluginEntry, PluginLauncher,
    PluginManager, PluginRegistry, SearchPath,
};
use cloudctl_plugin_sdk::service::apikey::{ApiKey, CreateApiKeyRequest, ListApiKeysRequest};
use cloudctl_plugin_sdk::{
    BusinessError, CallContext, CallFailure, ErrorCode, PluginDescriptor, ServiceError, HANDSHAKE,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const STUB: PluginDescriptor = PluginDescriptor::new("apiKey", "cloudctl-stub-plugin");

fn bin_dir() -> PathBuf {
    Path::new(env!("CARGO_BIN_EXE_cloudctl-stub-plugin"))
        .parent()
        .unwrap()
        .to_path_buf()
}

fn stub_entry() -> PluginEntry {
    let [apikey, ..] = builtin_entries();
    PluginEntry::new(STUB, apikey.factory)
}

fn alive(pid: u32) -> bool {
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}

fn create_req() -> CreateApiKeyRequest {
    CreateApiKeyRequest {
        resource_id: "lkc-123".to_string(),
        description: "test".to_string(),
        owner_id: "sa-1".to_string(),
    }
}

/// A stub plugin setup with its own config home and pid log
struct Stub {
    home: TempDir,
    config: LauncherConfig,
}

impl Stub {
    fn new(mode: &str) -> Self {
        let home = TempDir::new().unwrap();
        let config = LauncherConfig::default()
            .with_search_path(SearchPath::new([bin_dir()]))
            .with_handshake_timeout(Duration::from_secs(10))
            .with_env("CLOUDCTL_HOME", home.path().to_string_lossy())
            .with_env("STUB_PID_FILE", home.path().join("pids").to_string_lossy())
            .with_env("STUB_MODE", mode);
        Self { home, config }
    }

    fn with_env(mut self, key: &str, value: &str) -> Self {
        self.config = self.config.with_env(key, value);
        self
    }

    fn manager(&self) -> Arc<PluginManager> {
        let registry = PluginRegistry::new([stub_entry()]).unwrap();
        Arc::new(PluginManager::new(
            registry,
            PluginLauncher::new(self.config.clone()),
        ))
    }

    /// Pids of every stub process started so far
    fn spawned(&self) -> Vec<u32> {
        match std::fs::read_to_string(self.home.path().join("pids")) {
            Ok(text) => text.lines().map(|l| l.trim().parse().unwrap()).collect(),
            Err(_) => Vec::new(),
        }
    }
}

#[tokio::test]
async fn test_fixed_key_scenario() {
    let stub = Stub::new("fixed");
    let manager = stub.manager();

    let handle = manager.get_or_launch(&STUB).await.unwrap();
    let api_keys = handle.api_key().unwrap();
    let key = api_keys
        .create(&CallContext::new(), create_req())
        .await
        .unwrap();

    assert_eq!(
        key,
        ApiKey {
            key: "AKIAFAKE".to_string(),
            secret: "shh".to_string(),
            ..Default::default()
        }
    );
    assert_eq!(stub.spawned().len(), 1);

    LifecycleHook::new(manager, Duration::from_secs(2)).run().await;
}

#[tokio::test]
async fn test_sequential_get_or_launch_spawns_once() {
    let stub = Stub::new("fixed");
    let manager = stub.manager();

    let first = manager.get_or_launch(&STUB).await.unwrap();
    for _ in 0..4 {
        let again = manager.get_or_launch(&STUB).await.unwrap();
        assert!(again.ptr_eq(&first));
    }

    assert_eq!(stub.spawned().len(), 1);
    assert_eq!(manager.live_handles().len(), 1);
    LifecycleHook::new(manager, Duration::from_secs(2)).run().await;
}

#[tokio::test]
async fn test_concurrent_get_or_launch_spawns_once() {
    let stub = Stub::new("fixed");
    let manager = stub.manager();

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..8 {
        let manager = manager.clone();
        tasks.spawn(async move { manager.get_or_launch(&STUB).await.unwrap() });
    }
    let mut handles = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        handles.push(joined.unwrap());
    }

    assert!(handles.iter().all(|h| h.ptr_eq(&handles[0])));
    assert_eq!(stub.spawned().len(), 1);
    LifecycleHook::new(manager, Duration::from_secs(2)).run().await;
}

#[tokio::test]
async fn test_version_mismatch_fails_and_leaves_no_child() {
    let version = (HANDSHAKE.protocol_version + 1).to_string();
    let stub = Stub::new("fixed").with_env("STUB_PROTOCOL_VERSION", &version);
    let manager = stub.manager();

    let err = manager.get_or_launch(&STUB).await.unwrap_err();
    match err {
        LaunchError::HandshakeFailed { plugin, reason } => {
            assert_eq!(plugin, "apiKey");
            assert!(reason.contains("protocol version mismatch"), "reason: {}", reason);
        }
        other => panic!("Expected HandshakeFailed, got {:?}", other),
    }

    let pids = stub.spawned();
    assert_eq!(pids.len(), 1);
    assert!(!alive(pids[0]));
    assert!(manager.cached("apiKey").is_none());
}

#[tokio::test]
async fn test_missing_binary_does_not_stop_other_plugins() {
    let stub = Stub::new("fixed");
    let [_, _, user, _] = builtin_entries();
    let missing = PluginEntry::new(
        PluginDescriptor::new(user.descriptor.name, "cloudctl-not-installed"),
        user.factory,
    );
    let registry = PluginRegistry::new([stub_entry(), missing]).unwrap();
    let manager = Arc::new(PluginManager::new(
        registry,
        PluginLauncher::new(stub.config.clone()),
    ));

    let err = manager.get_or_launch_named("user").await.unwrap_err();
    assert!(err.is_not_installed(), "got {:?}", err);

    let handle = manager.get_or_launch(&STUB).await.unwrap();
    let key = handle
        .api_key()
        .unwrap()
        .create(&CallContext::new(), create_req())
        .await
        .unwrap();
    assert_eq!(key.key, "AKIAFAKE");

    LifecycleHook::new(manager, Duration::from_secs(2)).run().await;
}

#[tokio::test]
async fn test_business_error_crosses_boundary_unchanged() {
    let stub = Stub::new("notfound");
    let manager = stub.manager();

    let handle = manager.get_or_launch(&STUB).await.unwrap();
    let err = handle
        .api_key()
        .unwrap()
        .create(&CallContext::new(), create_req())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ServiceError::Business(BusinessError::new(
            ErrorCode::NotFound,
            "stub create: no such key"
        ))
    );
    LifecycleHook::new(manager, Duration::from_secs(2)).run().await;
}

#[tokio::test]
async fn test_deadline_abandons_slow_call() {
    let stub = Stub::new("slow");
    let manager = stub.manager();

    let handle = manager.get_or_launch(&STUB).await.unwrap();
    let ctx = CallContext::with_timeout(Duration::from_millis(200));
    let err = handle
        .api_key()
        .unwrap()
        .create(&ctx, create_req())
        .await
        .unwrap_err();

    assert!(
        matches!(
            err,
            ServiceError::RemoteCallFailed {
                kind: CallFailure::DeadlineExceeded,
                ..
            }
        ),
        "got {:?}",
        err
    );
    LifecycleHook::new(manager, Duration::from_secs(2)).run().await;
}

#[tokio::test]
async fn test_crashed_plugin_fails_call_without_respawn() {
    let stub = Stub::new("crash");
    let manager = stub.manager();

    let handle = manager.get_or_launch(&STUB).await.unwrap();
    let api_keys = handle.api_key().unwrap();
    let err = api_keys
        .create(&CallContext::new(), create_req())
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            ServiceError::RemoteCallFailed {
                kind: CallFailure::ConnectionClosed,
                ..
            }
        ),
        "got {:?}",
        err
    );

    // The dead handle stays cached; nothing is relaunched
    let again = manager.get_or_launch(&STUB).await.unwrap();
    assert!(again.ptr_eq(&handle));
    let err = api_keys
        .list(&CallContext::new(), ListApiKeysRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::RemoteCallFailed { .. }));
    assert_eq!(stub.spawned().len(), 1);

    LifecycleHook::new(manager, Duration::from_secs(2)).run().await;
}

#[tokio::test]
async fn test_lifecycle_hook_stops_plugins() {
    let stub = Stub::new("fixed");
    let manager = stub.manager();

    let handle = manager.get_or_launch(&STUB).await.unwrap();
    let pid = handle.pid().unwrap();
    assert!(alive(pid));
    drop(handle);

    let stopped = LifecycleHook::new(manager, Duration::from_secs(2)).run().await;
    assert_eq!(stopped, 1);
    assert!(!alive(pid));
}

#[tokio::test]
async fn test_lifecycle_hook_kills_stubborn_plugin() {
    let stub = Stub::new("stubborn");
    let manager = stub.manager();

    let handle = manager.get_or_launch(&STUB).await.unwrap();
    let pid = handle.pid().unwrap();

    let started = std::time::Instant::now();
    LifecycleHook::new(manager, Duration::from_millis(300)).run().await;

    assert!(!alive(pid));
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[test]
fn test_plugin_refuses_to_run_by_hand() {
    let output = std::process::Command::new(env!("CARGO_BIN_EXE_cloudctl-stub-plugin"))
        .env_remove(HANDSHAKE.cookie_key)
        .env_remove("STUB_PID_FILE")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not meant to be executed directly"), "stderr: {}", stderr);
}
