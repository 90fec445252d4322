//! Managed connectors, served by `cloudctl-connect-plugin`

use crate::require;
use async_trait::async_trait;
use cloudctl_plugin_sdk::service::connect::{
    Connector, ConnectorStatus, CreateConnectorRequest, DeleteConnectorRequest,
    DescribeConnectorRequest, ListConnectorsRequest,
};
use cloudctl_plugin_sdk::{ApiClient, CallContext, ConnectService, ServiceError};
use std::collections::BTreeMap;
use tokio::sync::Mutex;

/// Config key every connector must set
pub const CONNECTOR_CLASS: &str = "connector.class";

/// (environment, cluster, name)
type ConnectorKey = (String, String, String);

pub struct Connectors {
    client: ApiClient,
    connectors: Mutex<BTreeMap<ConnectorKey, Connector>>,
}

impl Connectors {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            connectors: Mutex::new(BTreeMap::new()),
        }
    }
}

fn key(environment_id: &str, cluster_id: &str, name: &str) -> ConnectorKey {
    (
        environment_id.to_string(),
        cluster_id.to_string(),
        name.to_string(),
    )
}

fn not_found(cluster_id: &str, name: &str) -> ServiceError {
    ServiceError::not_found(format!("connector '{}' not found on cluster {}", name, cluster_id))
}

#[async_trait]
impl ConnectService for Connectors {
    async fn list(
        &self,
        _ctx: &CallContext,
        req: ListConnectorsRequest,
    ) -> Result<Vec<Connector>, ServiceError> {
        self.client.authorize()?;
        require("cluster id", &req.cluster_id)?;

        let connectors = self.connectors.lock().await;
        Ok(connectors
            .values()
            .filter(|c| c.environment_id == req.environment_id && c.cluster_id == req.cluster_id)
            .cloned()
            .collect())
    }

    async fn describe(
        &self,
        _ctx: &CallContext,
        req: DescribeConnectorRequest,
    ) -> Result<Connector, ServiceError> {
        self.client.authorize()?;

        let connectors = self.connectors.lock().await;
        connectors
            .get(&key(&req.environment_id, &req.cluster_id, &req.name))
            .cloned()
            .ok_or_else(|| not_found(&req.cluster_id, &req.name))
    }

    async fn create(
        &self,
        _ctx: &CallContext,
        req: CreateConnectorRequest,
    ) -> Result<Connector, ServiceError> {
        self.client.authorize()?;
        require("cluster id", &req.cluster_id)?;
        require("connector name", &req.name)?;
        if !req.config.contains_key(CONNECTOR_CLASS) {
            return Err(ServiceError::invalid_argument(format!(
                "connector config must set '{}'",
                CONNECTOR_CLASS
            )));
        }

        let mut connectors = self.connectors.lock().await;
        let slot = key(&req.environment_id, &req.cluster_id, &req.name);
        if connectors.contains_key(&slot) {
            return Err(ServiceError::already_exists(format!(
                "connector '{}' already exists on cluster {}",
                req.name, req.cluster_id
            )));
        }

        let connector = Connector {
            name: req.name,
            cluster_id: req.cluster_id,
            environment_id: req.environment_id,
            config: req.config,
            status: ConnectorStatus::Running,
        };
        connectors.insert(slot, connector.clone());
        Ok(connector)
    }

    async fn delete(
        &self,
        _ctx: &CallContext,
        req: DeleteConnectorRequest,
    ) -> Result<(), ServiceError> {
        self.client.authorize()?;

        let mut connectors = self.connectors.lock().await;
        match connectors.remove(&key(&req.environment_id, &req.cluster_id, &req.name)) {
            Some(_) => Ok(()),
            None => Err(not_found(&req.cluster_id, &req.name)),
        }
    }
}
