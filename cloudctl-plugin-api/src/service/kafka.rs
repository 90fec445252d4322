//! Kafka cluster administration

use super::{decode_request, encode_reply, into_outcome, invoke, unknown_method};
use crate::context::CallContext;
use crate::error::ServiceError;
use crate::handshake::PluginDescriptor;
use crate::protocol::CallOutcome;
use crate::transport::{Dispatch, Transport};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const DESCRIPTOR: PluginDescriptor =
    PluginDescriptor::new("confluent-kafka-plugin", "cloudctl-kafka-plugin");

pub mod method {
    pub const LIST: &str = "Kafka.List";
    pub const DESCRIBE: &str = "Kafka.Describe";
    pub const CREATE: &str = "Kafka.Create";
    pub const DELETE: &str = "Kafka.Delete";
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Availability {
    #[default]
    SingleZone,
    MultiZone,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClusterStatus {
    #[default]
    Provisioning,
    Up,
    Deleting,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KafkaCluster {
    pub id: String,
    pub name: String,
    pub environment_id: String,
    pub cloud: String,
    pub region: String,
    pub availability: Availability,
    /// Confluent units of capacity; 0 for shared clusters
    pub cku: u32,
    pub endpoint: String,
    pub status: ClusterStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListKafkaClustersRequest {
    pub environment_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListKafkaClustersReply {
    pub clusters: Vec<KafkaCluster>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescribeKafkaClusterRequest {
    pub environment_id: String,
    pub cluster_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescribeKafkaClusterReply {
    pub cluster: KafkaCluster,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateKafkaClusterRequest {
    pub environment_id: String,
    pub name: String,
    pub cloud: String,
    pub region: String,
    pub availability: Availability,
    pub cku: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateKafkaClusterReply {
    pub cluster: KafkaCluster,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteKafkaClusterRequest {
    pub environment_id: String,
    pub cluster_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteKafkaClusterReply {}

#[async_trait]
pub trait KafkaService: Send + Sync {
    async fn list(
        &self,
        ctx: &CallContext,
        req: ListKafkaClustersRequest,
    ) -> Result<Vec<KafkaCluster>, ServiceError>;

    async fn describe(
        &self,
        ctx: &CallContext,
        req: DescribeKafkaClusterRequest,
    ) -> Result<KafkaCluster, ServiceError>;

    async fn create(
        &self,
        ctx: &CallContext,
        req: CreateKafkaClusterRequest,
    ) -> Result<KafkaCluster, ServiceError>;

    async fn delete(
        &self,
        ctx: &CallContext,
        req: DeleteKafkaClusterRequest,
    ) -> Result<(), ServiceError>;
}

#[derive(Clone)]
pub struct KafkaClient {
    transport: Arc<dyn Transport>,
}

impl KafkaClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl KafkaService for KafkaClient {
    async fn list(
        &self,
        ctx: &CallContext,
        req: ListKafkaClustersRequest,
    ) -> Result<Vec<KafkaCluster>, ServiceError> {
        let reply: ListKafkaClustersReply =
            invoke(self.transport.as_ref(), ctx, method::LIST, &req).await?;
        Ok(reply.clusters)
    }

    async fn describe(
        &self,
        ctx: &CallContext,
        req: DescribeKafkaClusterRequest,
    ) -> Result<KafkaCluster, ServiceError> {
        let reply: DescribeKafkaClusterReply =
            invoke(self.transport.as_ref(), ctx, method::DESCRIBE, &req).await?;
        Ok(reply.cluster)
    }

    async fn create(
        &self,
        ctx: &CallContext,
        req: CreateKafkaClusterRequest,
    ) -> Result<KafkaCluster, ServiceError> {
        let reply: CreateKafkaClusterReply =
            invoke(self.transport.as_ref(), ctx, method::CREATE, &req).await?;
        Ok(reply.cluster)
    }

    async fn delete(
        &self,
        ctx: &CallContext,
        req: DeleteKafkaClusterRequest,
    ) -> Result<(), ServiceError> {
        let _: DeleteKafkaClusterReply =
            invoke(self.transport.as_ref(), ctx, method::DELETE, &req).await?;
        Ok(())
    }
}

pub struct KafkaServer {
    service: Arc<dyn KafkaService>,
}

impl KafkaServer {
    pub fn new(service: Arc<dyn KafkaService>) -> Self {
        Self { service }
    }

    async fn route(
        &self,
        ctx: &CallContext,
        method: &str,
        payload: &[u8],
    ) -> Result<Vec<u8>, CallOutcome> {
        match method {
            method::LIST => {
                let req = decode_request(method, payload)?;
                let result = self.service.list(ctx, req).await;
                encode_reply(result.map(|clusters| ListKafkaClustersReply { clusters }))
            }
            method::DESCRIBE => {
                let req = decode_request(method, payload)?;
                let result = self.service.describe(ctx, req).await;
                encode_reply(result.map(|cluster| DescribeKafkaClusterReply { cluster }))
            }
            method::CREATE => {
                let req = decode_request(method, payload)?;
                let result = self.service.create(ctx, req).await;
                encode_reply(result.map(|cluster| CreateKafkaClusterReply { cluster }))
            }
            method::DELETE => {
                let req = decode_request(method, payload)?;
                let result = self.service.delete(ctx, req).await;
                encode_reply(result.map(|()| DeleteKafkaClusterReply {}))
            }
            other => Err(unknown_method(DESCRIPTOR.name, other)),
        }
    }
}

#[async_trait]
impl Dispatch for KafkaServer {
    fn service_name(&self) -> &'static str {
        DESCRIPTOR.name
    }

    async fn dispatch(&self, ctx: &CallContext, method: &str, payload: &[u8]) -> CallOutcome {
        into_outcome(self.route(ctx, method, payload).await)
    }
}
