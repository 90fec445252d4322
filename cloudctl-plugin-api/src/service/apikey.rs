//! API key management

use super::{decode_request, encode_reply, into_outcome, invoke, unknown_method};
use crate::context::CallContext;
use crate::error::ServiceError;
use crate::handshake::PluginDescriptor;
use crate::protocol::CallOutcome;
use crate::transport::{Dispatch, Transport};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const DESCRIPTOR: PluginDescriptor = PluginDescriptor::new("apiKey", "cloudctl-apikey-plugin");

pub mod method {
    pub const CREATE: &str = "ApiKey.Create";
    pub const DELETE: &str = "ApiKey.Delete";
    pub const LIST: &str = "ApiKey.List";
    pub const UPDATE: &str = "ApiKey.Update";
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKey {
    pub key: String,
    /// Only populated on create
    pub secret: String,
    pub resource_id: String,
    pub description: String,
    pub owner_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateApiKeyRequest {
    /// Cluster or resource the key is scoped to
    pub resource_id: String,
    pub description: String,
    /// Service account or user owning the key
    pub owner_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateApiKeyReply {
    pub api_key: ApiKey,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteApiKeyRequest {
    pub key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteApiKeyReply {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListApiKeysRequest {
    #[serde(default)]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListApiKeysReply {
    pub api_keys: Vec<ApiKey>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateApiKeyRequest {
    pub key: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateApiKeyReply {
    pub api_key: ApiKey,
}

#[async_trait]
pub trait ApiKeyService: Send + Sync {
    async fn create(
        &self,
        ctx: &CallContext,
        req: CreateApiKeyRequest,
    ) -> Result<ApiKey, ServiceError>;

    async fn delete(&self, ctx: &CallContext, req: DeleteApiKeyRequest)
        -> Result<(), ServiceError>;

    async fn list(
        &self,
        ctx: &CallContext,
        req: ListApiKeysRequest,
    ) -> Result<Vec<ApiKey>, ServiceError>;

    async fn update(
        &self,
        ctx: &CallContext,
        req: UpdateApiKeyRequest,
    ) -> Result<ApiKey, ServiceError>;
}

/// Host-side adapter: issues each call over a [`Transport`]
#[derive(Clone)]
pub struct ApiKeyClient {
    transport: Arc<dyn Transport>,
}

impl ApiKeyClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl ApiKeyService for ApiKeyClient {
    async fn create(
        &self,
        ctx: &CallContext,
        req: CreateApiKeyRequest,
    ) -> Result<ApiKey, ServiceError> {
        let reply: CreateApiKeyReply =
            invoke(self.transport.as_ref(), ctx, method::CREATE, &req).await?;
        Ok(reply.api_key)
    }

    async fn delete(
        &self,
        ctx: &CallContext,
        req: DeleteApiKeyRequest,
    ) -> Result<(), ServiceError> {
        let _: DeleteApiKeyReply =
            invoke(self.transport.as_ref(), ctx, method::DELETE, &req).await?;
        Ok(())
    }

    async fn list(
        &self,
        ctx: &CallContext,
        req: ListApiKeysRequest,
    ) -> Result<Vec<ApiKey>, ServiceError> {
        let reply: ListApiKeysReply =
            invoke(self.transport.as_ref(), ctx, method::LIST, &req).await?;
        Ok(reply.api_keys)
    }

    async fn update(
        &self,
        ctx: &CallContext,
        req: UpdateApiKeyRequest,
    ) -> Result<ApiKey, ServiceError> {
        let reply: UpdateApiKeyReply =
            invoke(self.transport.as_ref(), ctx, method::UPDATE, &req).await?;
        Ok(reply.api_key)
    }
}

/// Plugin-side adapter: routes decoded calls to a concrete implementation
pub struct ApiKeyServer {
    service: Arc<dyn ApiKeyService>,
}

impl ApiKeyServer {
    pub fn new(service: Arc<dyn ApiKeyService>) -> Self {
        Self { service }
    }

    async fn route(
        &self,
        ctx: &CallContext,
        method: &str,
        payload: &[u8],
    ) -> Result<Vec<u8>, CallOutcome> {
        match method {
            method::CREATE => {
                let req = decode_request(method, payload)?;
                let result = self.service.create(ctx, req).await;
                encode_reply(result.map(|api_key| CreateApiKeyReply { api_key }))
            }
            method::DELETE => {
                let req = decode_request(method, payload)?;
                let result = self.service.delete(ctx, req).await;
                encode_reply(result.map(|()| DeleteApiKeyReply {}))
            }
            method::LIST => {
                let req = decode_request(method, payload)?;
                let result = self.service.list(ctx, req).await;
                encode_reply(result.map(|api_keys| ListApiKeysReply { api_keys }))
            }
            method::UPDATE => {
                let req = decode_request(method, payload)?;
                let result = self.service.update(ctx, req).await;
                encode_reply(result.map(|api_key| UpdateApiKeyReply { api_key }))
            }
            other => Err(unknown_method(DESCRIPTOR.name, other)),
        }
    }
}

#[async_trait]
impl Dispatch for ApiKeyServer {
    fn service_name(&self) -> &'static str {
        DESCRIPTOR.name
    }

    async fn dispatch(&self, ctx: &CallContext, method: &str, payload: &[u8]) -> CallOutcome {
        into_outcome(self.route(ctx, method, payload).await)
    }
}
