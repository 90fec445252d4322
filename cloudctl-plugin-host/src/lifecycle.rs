//! Lifecycle Hook: stop every plugin child when the host exits
//!
//! Termination is best effort. Each child gets `Goodbye` and EOF on stdin,
//! then SIGTERM, then SIGKILL once the grace period runs out. Errors are
//! logged and never block host shutdown.

use crate::handle::ServiceHandle;
use crate::manager::PluginManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Child;
use tokio::task::JoinSet;

pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Registered once at host startup, run on the root command's exit path
#[derive(Debug, Clone)]
pub struct LifecycleHook {
    manager: Arc<PluginManager>,
    grace: Duration,
}

impl LifecycleHook {
    pub fn new(manager: Arc<PluginManager>, grace: Duration) -> Self {
        Self { manager, grace }
    }

    /// Terminate every plugin the manager has launched; returns how many
    pub async fn run(&self) -> usize {
        let handles = self.manager.live_handles();
        let count = handles.len();
        if count > 0 {
            tracing::debug!(count, grace = ?self.grace, "Stopping plugins");
        }
        shutdown_all(handles, self.grace).await;
        count
    }
}

/// Stop the given plugins concurrently and wait for all of them
pub async fn shutdown_all(handles: Vec<ServiceHandle>, grace: Duration) {
    let mut tasks = JoinSet::new();
    for handle in handles {
        tasks.spawn(async move {
            let plugin = handle.descriptor().name;
            if let Err(e) = handle.process().terminate(grace).await {
                tracing::warn!(plugin, error = %e, "Failed to stop plugin");
            }
        });
    }
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            tracing::warn!(error = %e, "Plugin shutdown task failed");
        }
    }
}

pub(crate) async fn terminate_child(
    plugin: &str,
    child: &mut Child,
    grace: Duration,
) -> std::io::Result<()> {
    if let Some(status) = child.try_wait()? {
        tracing::debug!(plugin, %status, "Plugin already exited");
        return Ok(());
    }

    request_exit(child);

    match tokio::time::timeout(grace, child.wait()).await {
        Ok(status) => {
            let status = status?;
            tracing::debug!(plugin, %status, "Plugin exited");
        }
        Err(_) => {
            tracing::warn!(plugin, grace = ?grace, "Plugin ignored termination; killing");
            child.start_kill()?;
            child.wait().await?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn request_exit(child: &mut Child) {
    if let Some(pid) = child.id() {
        // SAFETY: pid belongs to a child we have not reaped yet
        let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
        if rc != 0 {
            tracing::debug!(pid, error = %std::io::Error::last_os_error(), "SIGTERM failed");
        }
    }
}

#[cfg(not(unix))]
fn request_exit(child: &mut Child) {
    let _ = child.start_kill();
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::Stdio;
    use tokio::process::Command;

    fn alive(pid: u32) -> bool {
        unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
    }

    #[tokio::test]
    async fn test_sigterm_stops_cooperative_child() {
        let mut child = Command::new("sleep")
            .arg("30")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .unwrap();
        let pid = child.id().unwrap();

        terminate_child("sleep", &mut child, Duration::from_secs(5))
            .await
            .unwrap();
        assert!(!alive(pid));
    }

    #[tokio::test]
    async fn test_kill_after_grace() {
        let mut child = Command::new("sh")
            .args(["-c", "trap '' TERM; exec sleep 30"])
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .unwrap();
        let pid = child.id().unwrap();
        // Let the shell install its trap
        tokio::time::sleep(Duration::from_millis(100)).await;

        terminate_child("stubborn", &mut child, Duration::from_millis(200))
            .await
            .unwrap();
        assert!(!alive(pid));
    }

    #[tokio::test]
    async fn test_exited_child_is_left_alone() {
        let mut child = Command::new("true").spawn().unwrap();
        child.wait().await.unwrap();
        terminate_child("true", &mut child, Duration::from_millis(10))
            .await
            .unwrap();
    }
}
