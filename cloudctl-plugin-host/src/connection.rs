//! Request/reply transport over a plugin's stdio
//!
//! Calls are written to the child's stdin under a single writer lock, so
//! frames reach the plugin in issue order. A background task reads the
//! child's stdout and hands each reply to the caller waiting on its
//! correlation id. A caller that gives up (deadline or cancellation) removes
//! its waiter; the reply, if it ever arrives, is discarded.

use async_trait::async_trait;
use cloudctl_plugin_api::{
    read_frame, write_frame, CallContext, CallOutcome, HostFrame, HostMessage, PluginFrame,
    PluginMessage, Transport, TransportError,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// First id used for calls; lower ids belong to the handshake
pub(crate) const FIRST_CALL_ID: u64 = 2;

type Writer = Box<dyn AsyncWrite + Send + Unpin>;

#[derive(Default)]
struct Waiters {
    pending: HashMap<u64, oneshot::Sender<CallOutcome>>,
    closed: bool,
}

/// Live connection to one dispensed plugin service
pub struct PluginConnection {
    plugin: &'static str,
    writer: tokio::sync::Mutex<Option<Writer>>,
    waiters: Arc<Mutex<Waiters>>,
    next_id: AtomicU64,
    reader: JoinHandle<()>,
}

impl PluginConnection {
    /// Take over a handshaken stream pair and start the reply reader
    pub fn start<W, R>(plugin: &'static str, writer: W, reader: R) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
        R: AsyncRead + Send + Unpin + 'static,
    {
        let waiters = Arc::new(Mutex::new(Waiters::default()));
        let reader = tokio::spawn(read_replies(plugin, reader, waiters.clone()));

        Self {
            plugin,
            writer: tokio::sync::Mutex::new(Some(Box::new(writer))),
            waiters,
            next_id: AtomicU64::new(FIRST_CALL_ID),
            reader,
        }
    }

    /// Whether the plugin side of the stream has gone away
    pub fn is_closed(&self) -> bool {
        lock(&self.waiters).closed
    }

    /// Send `Goodbye` and close the plugin's stdin. Idempotent.
    pub async fn close(&self) {
        let mut guard = self.writer.lock().await;
        if let Some(mut writer) = guard.take() {
            let goodbye = HostFrame {
                id: 0,
                message: HostMessage::Goodbye,
            };
            if let Err(e) = write_frame(&mut writer, &goodbye).await {
                tracing::debug!(plugin = self.plugin, error = %e, "Goodbye not delivered");
            }
        }
    }

    fn register(&self, id: u64) -> Result<oneshot::Receiver<CallOutcome>, TransportError> {
        let (tx, rx) = oneshot::channel();
        let mut waiters = lock(&self.waiters);
        if waiters.closed {
            return Err(TransportError::ConnectionClosed);
        }
        waiters.pending.insert(id, tx);
        Ok(rx)
    }

    fn forget(&self, id: u64) {
        lock(&self.waiters).pending.remove(&id);
    }

    async fn send(&self, frame: &HostFrame) -> Result<(), TransportError> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(TransportError::ConnectionClosed)?;
        write_frame(writer, frame).await?;
        Ok(())
    }
}

impl Drop for PluginConnection {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

#[async_trait]
impl Transport for PluginConnection {
    async fn call(
        &self,
        ctx: &CallContext,
        method: &str,
        payload: Vec<u8>,
    ) -> Result<CallOutcome, TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let rx = self.register(id)?;

        let frame = HostFrame {
            id,
            message: HostMessage::Call {
                method: method.to_string(),
                payload,
                timeout_ms: ctx.remaining().map(|d| d.as_millis() as u64),
            },
        };

        tracing::debug!(plugin = self.plugin, id, method, "Sending call");
        // Not bounded by the context: a half-written frame would corrupt the stream
        if let Err(e) = self.send(&frame).await {
            self.forget(id);
            return Err(e);
        }

        match ctx.run(rx).await {
            Ok(Ok(outcome)) => Ok(outcome),
            // Sender dropped: the reader saw the stream end
            Ok(Err(_)) => Err(TransportError::ConnectionClosed),
            Err(e) => {
                self.forget(id);
                tracing::debug!(plugin = self.plugin, id, method, error = %e, "Call abandoned");
                Err(e)
            }
        }
    }
}

async fn read_replies<R>(plugin: &'static str, mut reader: R, waiters: Arc<Mutex<Waiters>>)
where
    R: AsyncRead + Unpin,
{
    loop {
        let frame: PluginFrame = match read_frame(&mut reader).await {
            Ok(frame) => frame,
            Err(e) if e.is_disconnect() => {
                tracing::debug!(plugin, "Plugin closed its output");
                break;
            }
            Err(e) => {
                tracing::warn!(
                    plugin,
                    error = %e,
                    "Unreadable frame from plugin; dropping connection"
                );
                break;
            }
        };

        match frame.message {
            PluginMessage::Reply { outcome } => {
                let waiter = lock(&waiters).pending.remove(&frame.id);
                match waiter {
                    Some(tx) => {
                        let _ = tx.send(outcome);
                    }
                    None => tracing::debug!(plugin, id = frame.id, "Discarding late reply"),
                }
            }
            other => {
                tracing::warn!(
                    plugin,
                    id = frame.id,
                    message = ?other,
                    "Unexpected message from plugin"
                );
            }
        }
    }

    // Dropping the senders wakes every waiter with ConnectionClosed
    let mut waiters = lock(&waiters);
    waiters.closed = true;
    waiters.pending.clear();
}

fn lock(waiters: &Mutex<Waiters>) -> std::sync::MutexGuard<'_, Waiters> {
    // A poisoned map is still structurally valid
    waiters.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
