//! Service Interfaces and their wire adapters
//!
//! Every domain module follows the same shape:
//! - plain request/response structs (`*Request` in, `*Reply` envelope out)
//! - the Service Interface trait
//! - a Client adapter implementing the trait over a [`Transport`]
//! - a Server adapter implementing [`Dispatch`](crate::Dispatch) over a trait object

pub mod apikey;
pub mod connect;
pub mod kafka;
pub mod user;

use crate::context::CallContext;
use crate::error::{map_transport_error, CallFailure, ServiceError};
use crate::protocol::{decode, encode, CallOutcome};
use crate::transport::Transport;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Client-side half of a remote call: encode, send, unwrap the outcome.
pub(crate) async fn invoke<Req, Rep>(
    transport: &dyn Transport,
    ctx: &CallContext,
    method: &str,
    request: &Req,
) -> Result<Rep, ServiceError>
where
    Req: Serialize,
    Rep: DeserializeOwned,
{
    let payload = encode(request)
        .map_err(|e| ServiceError::remote(CallFailure::Malformed, e.to_string()))?;

    tracing::trace!(method, bytes = payload.len(), "Issuing remote call");
    let outcome = transport
        .call(ctx, method, payload)
        .await
        .map_err(map_transport_error)?;

    match outcome {
        CallOutcome::Ok(bytes) => decode(&bytes).map_err(|e| {
            ServiceError::remote(
                CallFailure::Malformed,
                format!("{} reply: {}", method, e),
            )
        }),
        CallOutcome::Business(err) => Err(ServiceError::Business(err)),
        CallOutcome::Malformed(msg) => Err(ServiceError::remote(CallFailure::Malformed, msg)),
    }
}

/// Server-side request decoding; failure becomes the outcome sent back.
pub(crate) fn decode_request<T: DeserializeOwned>(
    method: &str,
    payload: &[u8],
) -> Result<T, CallOutcome> {
    decode(payload).map_err(|e| CallOutcome::Malformed(format!("{} request: {}", method, e)))
}

/// Server-side reply wrapping. Business errors pass through unchanged; a
/// transport failure raised inside the implementation is reported as internal.
pub(crate) fn encode_reply<T: Serialize>(
    result: Result<T, ServiceError>,
) -> Result<Vec<u8>, CallOutcome> {
    match result {
        Ok(reply) => encode(&reply).map_err(|e| CallOutcome::Malformed(e.to_string())),
        Err(ServiceError::Business(err)) => Err(CallOutcome::Business(err)),
        Err(err @ ServiceError::RemoteCallFailed { .. }) => Err(CallOutcome::Business(
            crate::error::BusinessError::new(crate::error::ErrorCode::Internal, err.to_string()),
        )),
    }
}

pub(crate) fn unknown_method(service: &str, method: &str) -> CallOutcome {
    CallOutcome::Malformed(format!("service {} has no method {}", service, method))
}

/// Collapse the routing result of a Server adapter into a wire outcome
pub(crate) fn into_outcome(result: Result<Vec<u8>, CallOutcome>) -> CallOutcome {
    match result {
        Ok(bytes) => CallOutcome::Ok(bytes),
        Err(outcome) => outcome,
    }
}
