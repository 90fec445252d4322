//! Error envelope for calls that cross the process boundary
//!
//! Transport failures are folded into [`ServiceError::RemoteCallFailed`] by
//! [`map_transport_error`]; errors produced by the concrete service travel as
//! [`BusinessError`] and come out the other side unchanged.

use crate::protocol::ProtoError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned by every Service Interface method
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The call did not complete at the transport level
    #[error("remote call failed ({kind}): {message}")]
    RemoteCallFailed { kind: CallFailure, message: String },

    /// The plugin's implementation returned a domain error
    #[error(transparent)]
    Business(#[from] BusinessError),
}

impl ServiceError {
    pub fn remote(kind: CallFailure, message: impl Into<String>) -> Self {
        Self::RemoteCallFailed {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::Business(BusinessError::new(ErrorCode::NotFound, message))
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Business(BusinessError::new(ErrorCode::Unauthorized, message))
    }

    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::Business(BusinessError::new(ErrorCode::AlreadyExists, message))
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::Business(BusinessError::new(ErrorCode::InvalidArgument, message))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Business(BusinessError::new(ErrorCode::Internal, message))
    }

    /// Business error code, if this is a business error
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Business(err) => Some(err.code),
            Self::RemoteCallFailed { .. } => None,
        }
    }
}

/// Transport-level failure kinds visible to command logic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallFailure {
    ConnectionClosed,
    Malformed,
    DeadlineExceeded,
    Cancelled,
    Io,
}

impl std::fmt::Display for CallFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CallFailure::ConnectionClosed => "connection closed",
            CallFailure::Malformed => "malformed message",
            CallFailure::DeadlineExceeded => "deadline exceeded",
            CallFailure::Cancelled => "cancelled",
            CallFailure::Io => "i/o error",
        };
        f.write_str(s)
    }
}

/// Domain error produced by a concrete service implementation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{code}: {message}")]
pub struct BusinessError {
    pub code: ErrorCode,
    pub message: String,
}

impl BusinessError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    NotFound,
    Unauthorized,
    AlreadyExists,
    InvalidArgument,
    Internal,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorCode::NotFound => "not found",
            ErrorCode::Unauthorized => "unauthorized",
            ErrorCode::AlreadyExists => "already exists",
            ErrorCode::InvalidArgument => "invalid argument",
            ErrorCode::Internal => "internal error",
        };
        f.write_str(s)
    }
}

/// Failure raised by a [`Transport`](crate::Transport) implementation
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("plugin connection closed")]
    ConnectionClosed,

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("call cancelled")]
    Cancelled,

    #[error("unexpected message: {0}")]
    UnexpectedMessage(String),

    #[error(transparent)]
    Proto(#[from] ProtoError),
}

/// Canonical translation of transport failures into the service error envelope
pub fn map_transport_error(err: TransportError) -> ServiceError {
    match err {
        TransportError::ConnectionClosed => {
            ServiceError::remote(CallFailure::ConnectionClosed, "plugin connection closed")
        }
        TransportError::DeadlineExceeded => {
            ServiceError::remote(CallFailure::DeadlineExceeded, "deadline exceeded")
        }
        TransportError::Cancelled => ServiceError::remote(CallFailure::Cancelled, "call cancelled"),
        TransportError::UnexpectedMessage(msg) => ServiceError::remote(CallFailure::Malformed, msg),
        TransportError::Proto(e) if e.is_disconnect() => {
            ServiceError::remote(CallFailure::ConnectionClosed, e.to_string())
        }
        TransportError::Proto(e @ ProtoError::Io(_)) => {
            ServiceError::remote(CallFailure::Io, e.to_string())
        }
        TransportError::Proto(e) => ServiceError::remote(CallFailure::Malformed, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnect_maps_to_connection_closed() {
        let err = map_transport_error(TransportError::Proto(ProtoError::Closed));
        assert_eq!(
            err,
            ServiceError::remote(CallFailure::ConnectionClosed, "stream closed")
        );
    }

    #[test]
    fn test_io_error_maps_to_io() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = map_transport_error(TransportError::Proto(ProtoError::Io(io)));
        assert!(matches!(
            err,
            ServiceError::RemoteCallFailed {
                kind: CallFailure::Io,
                ..
            }
        ));
    }

    #[test]
    fn test_frame_too_large_maps_to_malformed() {
        let err = map_transport_error(TransportError::Proto(ProtoError::FrameTooLarge(1 << 30)));
        assert!(matches!(
            err,
            ServiceError::RemoteCallFailed {
                kind: CallFailure::Malformed,
                ..
            }
        ));
    }

    #[test]
    fn test_business_error_display() {
        let err = ServiceError::not_found("api key AK1");
        assert_eq!(err.to_string(), "not found: api key AK1");
        assert_eq!(err.code(), Some(ErrorCode::NotFound));
    }
}
