//! Wire frames and framing codec
//!
//! Each frame is a 4-byte little-endian length followed by a MessagePack
//! payload. Every frame carries a correlation id so the host can match
//! replies to waiting callers.

use crate::error::BusinessError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound on a single frame payload
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Frame sent from the host to a plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostFrame {
    pub id: u64,
    pub message: HostMessage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostMessage {
    Hello {
        protocol_version: u32,
        cookie_key: String,
        cookie_value: String,
    },
    Dispense {
        service: String,
    },
    Call {
        method: String,
        payload: Vec<u8>,
        /// Time the host is still willing to wait, if bounded
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
    /// Orderly shutdown; the plugin exits after reading it.
    Goodbye,
}

/// Frame sent from a plugin back to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginFrame {
    pub id: u64,
    pub message: PluginMessage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PluginMessage {
    HelloOk { protocol_version: u32 },
    Rejected { reason: String },
    Dispensed { service: String },
    Reply { outcome: CallOutcome },
}

/// Result of one remote method call as seen on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallOutcome {
    /// Encoded reply struct
    Ok(Vec<u8>),

    /// Error returned by the concrete service implementation
    Business(BusinessError),

    /// Request could not be decoded or the method is unknown
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("encode: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("decode: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error("frame too large: {0} bytes")]
    FrameTooLarge(usize),

    /// Peer closed the stream at a frame boundary
    #[error("stream closed")]
    Closed,
}

impl ProtoError {
    /// Returns true if the peer went away rather than sent garbage
    pub fn is_disconnect(&self) -> bool {
        match self {
            ProtoError::Closed => true,
            ProtoError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::ConnectionReset
            ),
            _ => false,
        }
    }
}

/// Encode a value as a MessagePack payload (struct fields by name)
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, ProtoError> {
    Ok(rmp_serde::to_vec_named(value)?)
}

/// Decode a MessagePack payload
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtoError> {
    Ok(rmp_serde::from_slice(bytes)?)
}

pub async fn write_frame<W, T>(w: &mut W, msg: &T) -> Result<(), ProtoError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let payload = encode(msg)?;
    if payload.len() > MAX_FRAME_LEN {
        return Err(ProtoError::FrameTooLarge(payload.len()));
    }
    let len = payload.len() as u32;
    w.write_all(&len.to_le_bytes()).await?;
    w.write_all(&payload).await?;
    w.flush().await?;
    Ok(())
}

pub async fn read_frame<R, T>(r: &mut R) -> Result<T, ProtoError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut len_bytes = [0u8; 4];
    match r.read_exact(&mut len_bytes).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Err(ProtoError::Closed),
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_le_bytes(len_bytes) as usize;
    if len > MAX_FRAME_LEN {
        return Err(ProtoError::FrameTooLarge(len));
    }
    let mut payload = vec![0u8; len];
    r.read_exact(&mut payload).await?;
    decode(&payload)
}
