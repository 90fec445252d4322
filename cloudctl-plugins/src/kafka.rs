//! Kafka clusters, served by `cloudctl-kafka-plugin`

use crate::{ids, require};
use async_trait::async_trait;
use cloudctl_plugin_sdk::service::kafka::{
    Availability, ClusterStatus, CreateKafkaClusterRequest, DeleteKafkaClusterRequest,
    DescribeKafkaClusterRequest, KafkaCluster, ListKafkaClustersRequest,
};
use cloudctl_plugin_sdk::{ApiClient, CallContext, KafkaService, ServiceError};
use std::collections::BTreeMap;
use tokio::sync::Mutex;

const CLOUDS: [&str; 3] = ["aws", "azure", "gcp"];

/// Smallest dedicated capacity that can span zones
const MIN_MULTI_ZONE_CKU: u32 = 2;

pub struct KafkaClusters {
    client: ApiClient,
    clusters: Mutex<BTreeMap<String, KafkaCluster>>,
}

impl KafkaClusters {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            clusters: Mutex::new(BTreeMap::new()),
        }
    }
}

fn validate(req: &CreateKafkaClusterRequest) -> Result<(), ServiceError> {
    require("environment id", &req.environment_id)?;
    require("cluster name", &req.name)?;
    require("region", &req.region)?;

    if !CLOUDS.contains(&req.cloud.as_str()) {
        return Err(ServiceError::invalid_argument(format!(
            "unknown cloud '{}'; expected one of {}",
            req.cloud,
            CLOUDS.join(", ")
        )));
    }
    if req.availability == Availability::MultiZone && req.cku < MIN_MULTI_ZONE_CKU {
        return Err(ServiceError::invalid_argument(format!(
            "multi-zone clusters need at least {} CKU",
            MIN_MULTI_ZONE_CKU
        )));
    }
    Ok(())
}

fn not_found(environment_id: &str, cluster_id: &str) -> ServiceError {
    ServiceError::not_found(format!(
        "Kafka cluster {} not found in environment {}",
        cluster_id, environment_id
    ))
}

#[async_trait]
impl KafkaService for KafkaClusters {
    async fn list(
        &self,
        _ctx: &CallContext,
        req: ListKafkaClustersRequest,
    ) -> Result<Vec<KafkaCluster>, ServiceError> {
        self.client.authorize()?;
        require("environment id", &req.environment_id)?;

        let clusters = self.clusters.lock().await;
        Ok(clusters
            .values()
            .filter(|c| c.environment_id == req.environment_id)
            .cloned()
            .collect())
    }

    async fn describe(
        &self,
        _ctx: &CallContext,
        req: DescribeKafkaClusterRequest,
    ) -> Result<KafkaCluster, ServiceError> {
        self.client.authorize()?;

        let clusters = self.clusters.lock().await;
        clusters
            .get(&req.cluster_id)
            .filter(|c| c.environment_id == req.environment_id)
            .cloned()
            .ok_or_else(|| not_found(&req.environment_id, &req.cluster_id))
    }

    async fn create(
        &self,
        _ctx: &CallContext,
        req: CreateKafkaClusterRequest,
    ) -> Result<KafkaCluster, ServiceError> {
        self.client.authorize()?;
        validate(&req)?;

        let mut clusters = self.clusters.lock().await;
        let taken = clusters
            .values()
            .any(|c| c.environment_id == req.environment_id && c.name == req.name);
        if taken {
            return Err(ServiceError::already_exists(format!(
                "a cluster named '{}' already exists in environment {}",
                req.name, req.environment_id
            )));
        }

        let id = ids::resource_id("lkc");
        let cluster = KafkaCluster {
            endpoint: format!("SASL_SSL://{}.{}.{}.example.cloud:9092", id, req.region, req.cloud),
            id,
            name: req.name,
            environment_id: req.environment_id,
            cloud: req.cloud,
            region: req.region,
            availability: req.availability,
            cku: req.cku,
            status: ClusterStatus::Up,
        };

        tracing::debug!(cluster = %cluster.id, "Created Kafka cluster");
        clusters.insert(cluster.id.clone(), cluster.clone());
        Ok(cluster)
    }

    async fn delete(
        &self,
        _ctx: &CallContext,
        req: DeleteKafkaClusterRequest,
    ) -> Result<(), ServiceError> {
        self.client.authorize()?;

        let mut clusters = self.clusters.lock().await;
        let owned = clusters
            .get(&req.cluster_id)
            .is_some_and(|c| c.environment_id == req.environment_id);
        if !owned {
            return Err(not_found(&req.environment_id, &req.cluster_id));
        }
        clusters.remove(&req.cluster_id);
        Ok(())
    }
}
