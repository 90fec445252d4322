//! Plugin Server: the plugin side of the stdio session
//!
//! One session per process: `Hello`, then `Dispense`, then calls until the
//! host sends `Goodbye` or closes stdin. Calls are served one at a time, in
//! the order they arrive.

use cloudctl_plugin_api::transport::context_from_timeout;
use cloudctl_plugin_api::{
    read_frame, write_frame, CallOutcome, ConfigError, Dispatch, HandshakeConfig, HostFrame,
    HostMessage, PluginFrame, PluginMessage, ProtoError,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};

#[derive(Debug, Error)]
pub enum ServeError {
    #[error("Handshake rejected: {0}")]
    Handshake(String),

    #[error("Dispense rejected: {0}")]
    Dispense(String),

    #[error("Plugin '{plugin}' was built around the '{serves}' service")]
    Descriptor {
        plugin: &'static str,
        serves: &'static str,
    },

    #[error(transparent)]
    Proto(#[from] ProtoError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Serve `dispatch` over this process's stdin/stdout
pub async fn serve(
    dispatch: Arc<dyn Dispatch>,
    handshake: HandshakeConfig,
) -> Result<(), ServeError> {
    serve_on(dispatch, handshake, tokio::io::stdin(), tokio::io::stdout()).await
}

/// Serve `dispatch` over an arbitrary stream pair
pub async fn serve_on<R, W>(
    dispatch: Arc<dyn Dispatch>,
    handshake: HandshakeConfig,
    mut reader: R,
    mut writer: W,
) -> Result<(), ServeError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let service = dispatch.service_name();

    let Some(hello) = next_frame(&mut reader).await? else {
        return Ok(());
    };
    let verdict = match hello.message {
        HostMessage::Hello {
            protocol_version,
            cookie_key,
            cookie_value,
        } => handshake.verify(protocol_version, &cookie_key, &cookie_value),
        other => Err(format!("expected Hello, got {:?}", other)),
    };
    if let Err(reason) = verdict {
        tracing::warn!(service, %reason, "Rejecting host");
        reply(&mut writer, hello.id, PluginMessage::Rejected { reason: reason.clone() }).await?;
        return Err(ServeError::Handshake(reason));
    }
    let ok = PluginMessage::HelloOk {
        protocol_version: handshake.protocol_version,
    };
    reply(&mut writer, hello.id, ok).await?;

    let Some(request) = next_frame(&mut reader).await? else {
        return Ok(());
    };
    let verdict = match request.message {
        HostMessage::Dispense { service: requested } if requested == service => Ok(()),
        HostMessage::Dispense { service: requested } => Err(format!(
            "this plugin serves '{}', not '{}'",
            service, requested
        )),
        other => Err(format!("expected Dispense, got {:?}", other)),
    };
    if let Err(reason) = verdict {
        tracing::warn!(service, %reason, "Rejecting dispense");
        reply(&mut writer, request.id, PluginMessage::Rejected { reason: reason.clone() }).await?;
        return Err(ServeError::Dispense(reason));
    }
    let dispensed = PluginMessage::Dispensed {
        service: service.to_string(),
    };
    reply(&mut writer, request.id, dispensed).await?;
    tracing::debug!(service, "Session established");

    while let Some(frame) = next_frame(&mut reader).await? {
        match frame.message {
            HostMessage::Call {
                method,
                payload,
                timeout_ms,
            } => {
                let ctx = context_from_timeout(timeout_ms);
                match ctx.run(dispatch.dispatch(&ctx, &method, &payload)).await {
                    Ok(outcome) => reply_to_call(&mut writer, frame.id, outcome).await?,
                    Err(e) => {
                        tracing::debug!(service, method, error = %e, "Host stopped waiting");
                    }
                }
            }
            HostMessage::Goodbye => {
                tracing::debug!(service, "Host said goodbye");
                return Ok(());
            }
            other => {
                let reason = format!("unexpected {:?} after dispense", other);
                reply(&mut writer, frame.id, PluginMessage::Rejected { reason }).await?;
            }
        }
    }

    tracing::debug!(service, "Host closed the channel");
    Ok(())
}

/// Next host frame, or `None` once the host has hung up
async fn next_frame<R>(reader: &mut R) -> Result<Option<HostFrame>, ServeError>
where
    R: AsyncRead + Unpin,
{
    match read_frame(reader).await {
        Ok(frame) => Ok(Some(frame)),
        Err(e) if e.is_disconnect() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Send a call's outcome. A reply that cannot be framed fails that call only;
/// nothing has been written yet, so the session stays usable.
async fn reply_to_call<W>(writer: &mut W, id: u64, outcome: CallOutcome) -> Result<(), ServeError>
where
    W: AsyncWrite + Unpin,
{
    match reply(writer, id, PluginMessage::Reply { outcome }).await {
        Err(ServeError::Proto(e @ (ProtoError::FrameTooLarge(_) | ProtoError::Encode(_)))) => {
            tracing::warn!(id, error = %e, "Reply not sendable");
            let outcome = CallOutcome::Malformed(format!("reply not sendable: {}", e));
            reply(writer, id, PluginMessage::Reply { outcome }).await
        }
        other => other,
    }
}

async fn reply<W>(writer: &mut W, id: u64, message: PluginMessage) -> Result<(), ServeError>
where
    W: AsyncWrite + Unpin,
{
    write_frame(writer, &PluginFrame { id, message }).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cloudctl_plugin_api::protocol::MAX_FRAME_LEN;
    use cloudctl_plugin_api::{CallContext, HANDSHAKE, PROTOCOL_VERSION};
    use std::time::Duration;
    use tokio::io::{duplex, DuplexStream};
    use tokio::task::JoinHandle;

    struct Upper;

    #[async_trait]
    impl Dispatch for Upper {
        fn service_name(&self) -> &'static str {
            "upper"
        }

        async fn dispatch(&self, _ctx: &CallContext, method: &str, payload: &[u8]) -> CallOutcome {
            if method == "sleep" {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            if method == "huge" {
                return CallOutcome::Ok(vec![b'x'; MAX_FRAME_LEN + 1]);
            }
            CallOutcome::Ok(payload.to_ascii_uppercase())
        }
    }

    struct Host {
        to_plugin: DuplexStream,
        from_plugin: DuplexStream,
        task: JoinHandle<Result<(), ServeError>>,
    }

    impl Host {
        fn start() -> Self {
            let (to_plugin, plugin_in) = duplex(64 * 1024);
            let (plugin_out, from_plugin) = duplex(64 * 1024);
            let task = tokio::spawn(serve_on(Arc::new(Upper), HANDSHAKE, plugin_in, plugin_out));
            Self {
                to_plugin,
                from_plugin,
                task,
            }
        }

        async fn send(&mut self, id: u64, message: HostMessage) -> PluginMessage {
            write_frame(&mut self.to_plugin, &HostFrame { id, message })
                .await
                .unwrap();
            let frame: PluginFrame = read_frame(&mut self.from_plugin).await.unwrap();
            assert_eq!(frame.id, id);
            frame.message
        }

        async fn establish(&mut self) {
            let hello = self.send(0, HANDSHAKE.hello()).await;
            assert_eq!(
                hello,
                PluginMessage::HelloOk {
                    protocol_version: PROTOCOL_VERSION
                }
            );
            let dispensed = self
                .send(
                    1,
                    HostMessage::Dispense {
                        service: "upper".to_string(),
                    },
                )
                .await;
            assert_eq!(
                dispensed,
                PluginMessage::Dispensed {
                    service: "upper".to_string()
                }
            );
        }
    }

    fn call(method: &str, payload: &[u8], timeout_ms: Option<u64>) -> HostMessage {
        HostMessage::Call {
            method: method.to_string(),
            payload: payload.to_vec(),
            timeout_ms,
        }
    }

    #[tokio::test]
    async fn test_session_serves_calls_until_eof() {
        let mut host = Host::start();
        host.establish().await;

        let reply = host.send(2, call("up", b"abc", None)).await;
        assert_eq!(
            reply,
            PluginMessage::Reply {
                outcome: CallOutcome::Ok(b"ABC".to_vec())
            }
        );

        drop(host.to_plugin);
        host.task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_goodbye_ends_session() {
        let mut host = Host::start();
        host.establish().await;

        write_frame(
            &mut host.to_plugin,
            &HostFrame {
                id: 0,
                message: HostMessage::Goodbye,
            },
        )
        .await
        .unwrap();
        host.task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_wrong_version_is_rejected() {
        let mut host = Host::start();
        let hello = HostMessage::Hello {
            protocol_version: PROTOCOL_VERSION + 1,
            cookie_key: HANDSHAKE.cookie_key.to_string(),
            cookie_value: HANDSHAKE.cookie_value.to_string(),
        };

        match host.send(0, hello).await {
            PluginMessage::Rejected { reason } => {
                assert!(reason.contains("protocol version mismatch"))
            }
            other => panic!("Expected Rejected, got {:?}", other),
        }
        assert!(matches!(
            host.task.await.unwrap(),
            Err(ServeError::Handshake(_))
        ));
    }

    #[tokio::test]
    async fn test_wrong_service_is_rejected() {
        let mut host = Host::start();
        host.send(0, HANDSHAKE.hello()).await;

        let reply = host
            .send(
                1,
                HostMessage::Dispense {
                    service: "apiKey".to_string(),
                },
            )
            .await;
        assert!(matches!(reply, PluginMessage::Rejected { .. }));
        assert!(matches!(
            host.task.await.unwrap(),
            Err(ServeError::Dispense(_))
        ));
    }

    #[tokio::test]
    async fn test_hangup_before_hello_is_clean() {
        let host = Host::start();
        drop(host.to_plugin);
        host.task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_expired_call_gets_no_reply() {
        let mut host = Host::start();
        host.establish().await;

        write_frame(
            &mut host.to_plugin,
            &HostFrame {
                id: 2,
                message: call("sleep", b"zzz", Some(20)),
            },
        )
        .await
        .unwrap();

        // The next reply on the wire belongs to the following call
        let reply = host.send(3, call("up", b"next", None)).await;
        assert_eq!(
            reply,
            PluginMessage::Reply {
                outcome: CallOutcome::Ok(b"NEXT".to_vec())
            }
        );
    }

    #[tokio::test]
    async fn test_oversized_reply_fails_only_that_call() {
        let mut host = Host::start();
        host.establish().await;

        match host.send(2, call("huge", b"", None)).await {
            PluginMessage::Reply {
                outcome: CallOutcome::Malformed(reason),
            } => assert!(reason.contains("frame too large")),
            other => panic!("Expected Malformed reply, got {:?}", other),
        }

        let reply = host.send(3, call("up", b"still here", None)).await;
        assert_eq!(
            reply,
            PluginMessage::Reply {
                outcome: CallOutcome::Ok(b"STILL HERE".to_vec())
            }
        );

        drop(host.to_plugin);
        host.task.await.unwrap().unwrap();
    }
}
