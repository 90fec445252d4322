//! Transport seams between Client and Server adapters

use crate::context::CallContext;
use crate::error::TransportError;
use crate::protocol::{
    read_frame, write_frame, CallOutcome, HostFrame, HostMessage, PluginFrame, PluginMessage,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Host-side channel able to issue one remote method call
#[async_trait]
pub trait Transport: Send + Sync {
    async fn call(
        &self,
        ctx: &CallContext,
        method: &str,
        payload: Vec<u8>,
    ) -> Result<CallOutcome, TransportError>;
}

/// Plugin-side receiver of remote method calls (implemented by Server adapters)
#[async_trait]
pub trait Dispatch: Send + Sync {
    /// Service name this dispatcher answers to on dispense
    fn service_name(&self) -> &'static str;

    async fn dispatch(&self, ctx: &CallContext, method: &str, payload: &[u8]) -> CallOutcome;
}

/// Rebuild the plugin-side context from the timeout the host sent along
pub fn context_from_timeout(timeout_ms: Option<u64>) -> CallContext {
    match timeout_ms {
        Some(ms) => CallContext::with_timeout(Duration::from_millis(ms)),
        None => CallContext::new(),
    }
}

/// In-process transport wired straight to a [`Dispatch`].
///
/// Requests and replies are still pushed through the frame codec, so the
/// bytes a Server adapter sees are the bytes a real plugin would see.
pub struct LoopbackTransport {
    server: Arc<dyn Dispatch>,
    next_id: AtomicU64,
}

impl LoopbackTransport {
    pub fn new(server: Arc<dyn Dispatch>) -> Self {
        Self {
            server,
            next_id: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn call(
        &self,
        ctx: &CallContext,
        method: &str,
        payload: Vec<u8>,
    ) -> Result<CallOutcome, TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let frame = HostFrame {
            id,
            message: HostMessage::Call {
                method: method.to_string(),
                payload,
                timeout_ms: ctx.remaining().map(|d| d.as_millis() as u64),
            },
        };

        let mut wire = Vec::new();
        write_frame(&mut wire, &frame).await?;
        let received: HostFrame = read_frame(&mut wire.as_slice()).await?;

        let HostMessage::Call {
            method,
            payload,
            timeout_ms,
        } = received.message
        else {
            return Err(TransportError::UnexpectedMessage(format!(
                "{:?}",
                received.message
            )));
        };

        let server_ctx = context_from_timeout(timeout_ms);
        let outcome = ctx
            .run(self.server.dispatch(&server_ctx, &method, &payload))
            .await?;

        let mut wire = Vec::new();
        write_frame(
            &mut wire,
            &PluginFrame {
                id: received.id,
                message: PluginMessage::Reply { outcome },
            },
        )
        .await?;
        let reply: PluginFrame = read_frame(&mut wire.as_slice()).await?;

        match reply.message {
            PluginMessage::Reply { outcome } if reply.id == id => Ok(outcome),
            other => Err(TransportError::UnexpectedMessage(format!("{:?}", other))),
        }
    }
}
