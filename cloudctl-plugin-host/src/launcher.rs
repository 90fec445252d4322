//! Plugin Launcher: locate, spawn, handshake, dispense
//!
//! A launch produces exactly one child process and one connection. Any
//! failure after spawn kills and reaps the child before the error is
//! returned, so a failed launch never leaves a process behind.

use crate::connection::PluginConnection;
use crate::discovery::SearchPath;
use crate::error::LaunchError;
use crate::handle::{PluginProcess, ServiceHandle};
use crate::registry::PluginEntry;
use cloudctl_plugin_api::{
    read_frame, write_frame, HandshakeConfig, HostFrame, HostMessage, PluginFrame, PluginMessage,
    HANDSHAKE,
};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio::process::{Child, ChildStderr, Command};

pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

const HELLO_ID: u64 = 0;
const DISPENSE_ID: u64 = 1;

/// Launcher settings
#[derive(Debug, Clone)]
pub struct LauncherConfig {
    pub search_path: SearchPath,
    pub handshake: HandshakeConfig,
    /// Bound on each of the handshake and dispense round trips
    pub handshake_timeout: Duration,
    /// Extra environment passed to every plugin
    pub envs: Vec<(String, String)>,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            search_path: SearchPath::from_env(&[]),
            handshake: HANDSHAKE,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            envs: Vec::new(),
        }
    }
}

impl LauncherConfig {
    pub fn with_search_path(mut self, search_path: SearchPath) -> Self {
        self.search_path = search_path;
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct PluginLauncher {
    config: LauncherConfig,
}

impl PluginLauncher {
    pub fn new(config: LauncherConfig) -> Self {
        Self { config }
    }

    /// Spawn the plugin behind `entry` and dispense its service
    pub async fn launch(&self, entry: &PluginEntry) -> Result<ServiceHandle, LaunchError> {
        let descriptor = entry.descriptor;
        let plugin = descriptor.name;

        let path = self
            .config
            .search_path
            .resolve(descriptor.binary_name)
            .ok_or_else(|| LaunchError::NotInstalled {
                plugin: plugin.to_string(),
                binary: descriptor.binary_name.to_string(),
            })?;

        tracing::debug!(plugin, path = %path.display(), "Spawning plugin");
        let mut child = Command::new(&path)
            .env(self.config.handshake.cookie_key, self.config.handshake.cookie_value)
            .envs(self.config.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| LaunchError::SpawnFailed {
                plugin: plugin.to_string(),
                path: path.clone(),
                source,
            })?;

        if let Some(stderr) = child.stderr.take() {
            forward_stderr(plugin, stderr);
        }

        let (mut stdin, mut stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                kill_and_reap(plugin, &mut child).await;
                return Err(LaunchError::SpawnFailed {
                    plugin: plugin.to_string(),
                    path,
                    source: std::io::Error::other("plugin stdio was not captured"),
                });
            }
        };

        let timeout = self.config.handshake_timeout;
        let handshake = bounded(timeout, self.handshake(&mut stdin, &mut stdout)).await;
        if let Err(reason) = handshake {
            tracing::warn!(plugin, %reason, "Plugin handshake failed");
            kill_and_reap(plugin, &mut child).await;
            return Err(LaunchError::HandshakeFailed {
                plugin: plugin.to_string(),
                reason,
            });
        }

        let dispensed = bounded(timeout, dispense(plugin, &mut stdin, &mut stdout)).await;
        if let Err(reason) = dispensed {
            tracing::warn!(plugin, %reason, "Plugin dispense failed");
            kill_and_reap(plugin, &mut child).await;
            return Err(LaunchError::DispenseFailed {
                plugin: plugin.to_string(),
                service: plugin.to_string(),
                reason,
            });
        }

        let connection = Arc::new(PluginConnection::start(plugin, stdin, stdout));
        let service = (entry.factory)(connection.clone());
        let process = PluginProcess::new(descriptor, child, connection);
        tracing::info!(plugin, pid = ?process.pid(), "Plugin ready");

        Ok(ServiceHandle::new(service, process))
    }

    async fn handshake<W, R>(&self, stdin: &mut W, stdout: &mut R) -> Result<(), String>
    where
        W: AsyncWrite + Unpin,
        R: AsyncRead + Unpin,
    {
        let hello = HostFrame {
            id: HELLO_ID,
            message: self.config.handshake.hello(),
        };
        let reply = round_trip(stdin, stdout, &hello).await?;

        match reply {
            PluginMessage::HelloOk { protocol_version }
                if protocol_version == self.config.handshake.protocol_version =>
            {
                Ok(())
            }
            PluginMessage::HelloOk { protocol_version } => Err(format!(
                "protocol version mismatch: host={}, plugin={}",
                self.config.handshake.protocol_version, protocol_version
            )),
            PluginMessage::Rejected { reason } => Err(reason),
            other => Err(format!("unexpected handshake reply: {:?}", other)),
        }
    }
}

async fn dispense<W, R>(service: &str, stdin: &mut W, stdout: &mut R) -> Result<(), String>
where
    W: AsyncWrite + Unpin,
    R: AsyncRead + Unpin,
{
    let request = HostFrame {
        id: DISPENSE_ID,
        message: HostMessage::Dispense {
            service: service.to_string(),
        },
    };

    match round_trip(stdin, stdout, &request).await? {
        PluginMessage::Dispensed { service: got } if got == service => Ok(()),
        PluginMessage::Dispensed { service: got } => {
            Err(format!("asked for '{}', plugin serves '{}'", service, got))
        }
        PluginMessage::Rejected { reason } => Err(reason),
        other => Err(format!("unexpected dispense reply: {:?}", other)),
    }
}

async fn round_trip<W, R>(
    stdin: &mut W,
    stdout: &mut R,
    frame: &HostFrame,
) -> Result<PluginMessage, String>
where
    W: AsyncWrite + Unpin,
    R: AsyncRead + Unpin,
{
    write_frame(stdin, frame)
        .await
        .map_err(|e| format!("plugin did not accept input: {}", e))?;

    let reply: PluginFrame = read_frame(stdout).await.map_err(|e| {
        if e.is_disconnect() {
            "plugin exited before replying".to_string()
        } else {
            format!("unreadable reply: {}", e)
        }
    })?;

    if reply.id != frame.id {
        return Err(format!("reply id {} does not match request {}", reply.id, frame.id));
    }
    Ok(reply.message)
}

async fn bounded<F>(timeout: Duration, fut: F) -> Result<(), String>
where
    F: std::future::Future<Output = Result<(), String>>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .unwrap_or_else(|_| Err(format!("no reply within {:?}", timeout)))
}

async fn kill_and_reap(plugin: &str, child: &mut Child) {
    if let Err(e) = child.start_kill() {
        tracing::debug!(plugin, error = %e, "Kill failed");
    }
    if let Err(e) = child.wait().await {
        tracing::debug!(plugin, error = %e, "Reap failed");
    }
}

/// Forward the plugin's diagnostic stream into the host log, one event per line
fn forward_stderr(plugin: &'static str, stderr: ChildStderr) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let trimmed = line.trim_end();
                    if !trimmed.is_empty() {
                        tracing::debug!(target: "cloudctl::plugin", plugin, "{}", trimmed);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!(
                        target: "cloudctl::plugin",
                        plugin,
                        error = %e,
                        "stderr closed"
                    );
                    break;
                }
            }
        }
    });
}
