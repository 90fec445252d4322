//! The bundled apiKey plugin, driven through the builtin registry

#![cfg(unix)]

use cloudctl_plugin_host::{
    LauncherConfig, LifecycleHook, PluginLauncher, PluginManager, PluginRegistry, SearchPath,
};
use cloudctl_plugin_sdk::service::apikey::{CreateApiKeyRequest, ListApiKeysRequest, DESCRIPTOR};
use cloudctl_plugin_sdk::{CallContext, CliConfig, ContextConfig, Credentials, ErrorCode};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn manager(home: &Path) -> Arc<PluginManager> {
    let bin_dir = Path::new(env!("CARGO_BIN_EXE_cloudctl-apikey-plugin"))
        .parent()
        .unwrap()
        .to_path_buf();
    let config = LauncherConfig::default()
        .with_search_path(SearchPath::new([bin_dir]))
        .with_env("CLOUDCTL_HOME", home.to_string_lossy());
    Arc::new(PluginManager::new(
        PluginRegistry::builtin(),
        PluginLauncher::new(config),
    ))
}

fn logged_in(home: &Path) {
    let config = CliConfig {
        context: Some(ContextConfig {
            name: "test".to_string(),
            endpoint: "https://api.example.cloud".to_string(),
            credentials: Some(Credentials {
                api_key: "OWNERKEY".to_string(),
                api_secret: "owner-secret".to_string(),
                expires_at: None,
            }),
        }),
        ..Default::default()
    };
    config.save_to(&home.join("config.json")).unwrap();
}

#[tokio::test]
async fn test_create_then_list_across_process_boundary() {
    let home = TempDir::new().unwrap();
    logged_in(home.path());
    let manager = manager(home.path());

    let handle = manager.get_or_launch(&DESCRIPTOR).await.unwrap();
    let api_keys = handle.api_key().unwrap();
    let ctx = CallContext::with_timeout(Duration::from_secs(10));

    let created = api_keys
        .create(
            &ctx,
            CreateApiKeyRequest {
                resource_id: "lkc-42".to_string(),
                description: "ci pipeline".to_string(),
                owner_id: String::new(),
            },
        )
        .await
        .unwrap();
    assert_eq!(created.owner_id, "OWNERKEY");
    assert!(!created.secret.is_empty());

    let listed = api_keys
        .list(&ctx, ListApiKeysRequest::default())
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].key, created.key);
    assert!(listed[0].secret.is_empty());

    LifecycleHook::new(manager, Duration::from_secs(2)).run().await;
}

#[tokio::test]
async fn test_without_credentials_calls_are_unauthorized() {
    let home = TempDir::new().unwrap();
    let manager = manager(home.path());

    let handle = manager.get_or_launch(&DESCRIPTOR).await.unwrap();
    let err = handle
        .api_key()
        .unwrap()
        .list(&CallContext::new(), ListApiKeysRequest::default())
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::Unauthorized));

    LifecycleHook::new(manager, Duration::from_secs(2)).run().await;
}
