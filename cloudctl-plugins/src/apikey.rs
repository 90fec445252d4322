//! API keys, served by `cloudctl-apikey-plugin`

use crate::{ids, require};
use async_trait::async_trait;
use cloudctl_plugin_sdk::service::apikey::{
    ApiKey, CreateApiKeyRequest, DeleteApiKeyRequest, ListApiKeysRequest, UpdateApiKeyRequest,
};
use cloudctl_plugin_sdk::{ApiClient, ApiKeyService, CallContext, ServiceError};
use std::collections::BTreeMap;
use tokio::sync::Mutex;

const KEY_LEN: usize = 16;
const SECRET_LEN: usize = 64;

pub struct ApiKeys {
    client: ApiClient,
    keys: Mutex<BTreeMap<String, ApiKey>>,
}

impl ApiKeys {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            keys: Mutex::new(BTreeMap::new()),
        }
    }
}

/// The secret is shown once, on create
fn redacted(key: &ApiKey) -> ApiKey {
    ApiKey {
        secret: String::new(),
        ..key.clone()
    }
}

#[async_trait]
impl ApiKeyService for ApiKeys {
    async fn create(
        &self,
        _ctx: &CallContext,
        req: CreateApiKeyRequest,
    ) -> Result<ApiKey, ServiceError> {
        let principal = self.client.principal()?;
        require("resource id", &req.resource_id)?;

        let owner_id = if req.owner_id.is_empty() {
            principal
        } else {
            req.owner_id
        };
        let api_key = ApiKey {
            key: ids::token(KEY_LEN),
            secret: ids::token(SECRET_LEN),
            resource_id: req.resource_id,
            description: req.description,
            owner_id,
        };

        tracing::debug!(key = %api_key.key, resource = %api_key.resource_id, "Created API key");
        self.keys
            .lock()
            .await
            .insert(api_key.key.clone(), api_key.clone());
        Ok(api_key)
    }

    async fn delete(
        &self,
        _ctx: &CallContext,
        req: DeleteApiKeyRequest,
    ) -> Result<(), ServiceError> {
        self.client.authorize()?;
        require("key", &req.key)?;

        match self.keys.lock().await.remove(&req.key) {
            Some(_) => Ok(()),
            None => Err(ServiceError::not_found(format!("API key {} not found", req.key))),
        }
    }

    async fn list(
        &self,
        _ctx: &CallContext,
        req: ListApiKeysRequest,
    ) -> Result<Vec<ApiKey>, ServiceError> {
        self.client.authorize()?;

        let keys = self.keys.lock().await;
        Ok(keys
            .values()
            .filter(|k| req.resource_id.as_ref().map_or(true, |r| &k.resource_id == r))
            .filter(|k| req.owner_id.as_ref().map_or(true, |o| &k.owner_id == o))
            .map(redacted)
            .collect())
    }

    async fn update(
        &self,
        _ctx: &CallContext,
        req: UpdateApiKeyRequest,
    ) -> Result<ApiKey, ServiceError> {
        self.client.authorize()?;
        require("key", &req.key)?;

        let mut keys = self.keys.lock().await;
        let key = keys
            .get_mut(&req.key)
            .ok_or_else(|| ServiceError::not_found(format!("API key {} not found", req.key)))?;
        key.description = req.description;
        Ok(redacted(key))
    }
}
