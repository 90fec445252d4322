//! Scriptable "apiKey" plugin used by the process-level tests.
//!
//! Behaviour comes from the environment:
//! - `STUB_MODE`: `fixed` (default), `notfound`, `slow`, `crash` or `stubborn`
//! - `STUB_PROTOCOL_VERSION`: protocol version to claim in the handshake
//! - `STUB_PID_FILE`: file the process appends its pid to on startup

use async_trait::async_trait;
use cloudctl_plugin_sdk::prelude::*;
use cloudctl_plugin_sdk::service::apikey::{
    ApiKey, CreateApiKeyRequest, DeleteApiKeyRequest, ListApiKeysRequest, UpdateApiKeyRequest,
    DESCRIPTOR,
};
use cloudctl_plugin_sdk::{run_plugin_with, HandshakeConfig, HANDSHAKE};
use std::io::Write;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Every create returns AKIAFAKE/shh
    Fixed,
    /// Every call fails with NotFound
    NotFound,
    /// Every call sleeps before answering
    Slow,
    /// The process dies on the first call
    Crash,
    /// Ignores SIGTERM and lingers after the host hangs up
    Stubborn,
}

impl Mode {
    fn from_env() -> Self {
        match std::env::var("STUB_MODE").as_deref() {
            Ok("notfound") => Mode::NotFound,
            Ok("slow") => Mode::Slow,
            Ok("crash") => Mode::Crash,
            Ok("stubborn") => Mode::Stubborn,
            _ => Mode::Fixed,
        }
    }
}

struct StubKeys {
    mode: Mode,
}

impl StubKeys {
    async fn answer(&self, op: &str) -> Result<(), ServiceError> {
        match self.mode {
            Mode::NotFound => Err(ServiceError::not_found(format!("stub {}: no such key", op))),
            Mode::Slow => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            }
            Mode::Crash => std::process::exit(3),
            Mode::Fixed | Mode::Stubborn => Ok(()),
        }
    }

    fn fixed() -> ApiKey {
        ApiKey {
            key: "AKIAFAKE".to_string(),
            secret: "shh".to_string(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ApiKeyService for StubKeys {
    async fn create(
        &self,
        _ctx: &CallContext,
        _req: CreateApiKeyRequest,
    ) -> Result<ApiKey, ServiceError> {
        self.answer("create").await?;
        Ok(Self::fixed())
    }

    async fn delete(
        &self,
        _ctx: &CallContext,
        _req: DeleteApiKeyRequest,
    ) -> Result<(), ServiceError> {
        self.answer("delete").await
    }

    async fn list(
        &self,
        _ctx: &CallContext,
        _req: ListApiKeysRequest,
    ) -> Result<Vec<ApiKey>, ServiceError> {
        self.answer("list").await?;
        Ok(vec![Self::fixed()])
    }

    async fn update(
        &self,
        _ctx: &CallContext,
        req: UpdateApiKeyRequest,
    ) -> Result<ApiKey, ServiceError> {
        self.answer("update").await?;
        Ok(ApiKey {
            description: req.description,
            ..Self::fixed()
        })
    }
}

fn record_pid() -> anyhow::Result<()> {
    if let Some(path) = std::env::var_os("STUB_PID_FILE") {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        writeln!(file, "{}", std::process::id())?;
    }
    Ok(())
}

fn handshake() -> anyhow::Result<HandshakeConfig> {
    let protocol_version = match std::env::var("STUB_PROTOCOL_VERSION") {
        Ok(v) => v.parse()?,
        Err(_) => HANDSHAKE.protocol_version,
    };
    Ok(HandshakeConfig {
        protocol_version,
        ..HANDSHAKE
    })
}

#[cfg(unix)]
fn ignore_sigterm() -> anyhow::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = signal(SignalKind::terminate())?;
    tokio::spawn(async move {
        while term.recv().await.is_some() {
            tracing::info!("Ignoring SIGTERM");
        }
    });
    Ok(())
}

#[cfg(not(unix))]
fn ignore_sigterm() -> anyhow::Result<()> {
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    record_pid()?;
    let mode = Mode::from_env();
    let handshake = handshake()?;

    if mode == Mode::Stubborn {
        ignore_sigterm()?;
    }

    run_plugin_with(DESCRIPTOR, handshake, |_client| {
        Arc::new(ApiKeyServer::new(Arc::new(StubKeys { mode })))
    })
    .await?;

    if mode == Mode::Stubborn {
        tokio::time::sleep(Duration::from_secs(60)).await;
    }
    Ok(())
}
