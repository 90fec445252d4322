//! Managed connector administration

use super::{decode_request, encode_reply, into_outcome, invoke, unknown_method};
use crate::context::CallContext;
use crate::error::ServiceError;
use crate::handshake::PluginDescriptor;
use crate::protocol::CallOutcome;
use crate::transport::{Dispatch, Transport};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const DESCRIPTOR: PluginDescriptor =
    PluginDescriptor::new("confluent-connect-plugin", "cloudctl-connect-plugin");

pub mod method {
    pub const LIST: &str = "Connect.List";
    pub const DESCRIBE: &str = "Connect.Describe";
    pub const CREATE: &str = "Connect.Create";
    pub const DELETE: &str = "Connect.Delete";
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectorStatus {
    #[default]
    Provisioning,
    Running,
    Paused,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connector {
    pub name: String,
    pub cluster_id: String,
    pub environment_id: String,
    /// Connector configuration, sensitive values included as submitted
    pub config: BTreeMap<String, String>,
    pub status: ConnectorStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListConnectorsRequest {
    pub environment_id: String,
    pub cluster_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListConnectorsReply {
    pub connectors: Vec<Connector>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescribeConnectorRequest {
    pub environment_id: String,
    pub cluster_id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescribeConnectorReply {
    pub connector: Connector,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateConnectorRequest {
    pub environment_id: String,
    pub cluster_id: String,
    pub name: String,
    pub config: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateConnectorReply {
    pub connector: Connector,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteConnectorRequest {
    pub environment_id: String,
    pub cluster_id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteConnectorReply {}

#[async_trait]
pub trait ConnectService: Send + Sync {
    async fn list(
        &self,
        ctx: &CallContext,
        req: ListConnectorsRequest,
    ) -> Result<Vec<Connector>, ServiceError>;

    async fn describe(
        &self,
        ctx: &CallContext,
        req: DescribeConnectorRequest,
    ) -> Result<Connector, ServiceError>;

    async fn create(
        &self,
        ctx: &CallContext,
        req: CreateConnectorRequest,
    ) -> Result<Connector, ServiceError>;

    async fn delete(
        &self,
        ctx: &CallContext,
        req: DeleteConnectorRequest,
    ) -> Result<(), ServiceError>;
}

#[derive(Clone)]
pub struct ConnectClient {
    transport: Arc<dyn Transport>,
}

impl ConnectClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl ConnectService for ConnectClient {
    async fn list(
        &self,
        ctx: &CallContext,
        req: ListConnectorsRequest,
    ) -> Result<Vec<Connector>, ServiceError> {
        let reply: ListConnectorsReply =
            invoke(self.transport.as_ref(), ctx, method::LIST, &req).await?;
        Ok(reply.connectors)
    }

    async fn describe(
        &self,
        ctx: &CallContext,
        req: DescribeConnectorRequest,
    ) -> Result<Connector, ServiceError> {
        let reply: DescribeConnectorReply =
            invoke(self.transport.as_ref(), ctx, method::DESCRIBE, &req).await?;
        Ok(reply.connector)
    }

    async fn create(
        &self,
        ctx: &CallContext,
        req: CreateConnectorRequest,
    ) -> Result<Connector, ServiceError> {
        let reply: CreateConnectorReply =
            invoke(self.transport.as_ref(), ctx, method::CREATE, &req).await?;
        Ok(reply.connector)
    }

    async fn delete(
        &self,
        ctx: &CallContext,
        req: DeleteConnectorRequest,
    ) -> Result<(), ServiceError> {
        let _: DeleteConnectorReply =
            invoke(self.transport.as_ref(), ctx, method::DELETE, &req).await?;
        Ok(())
    }
}

pub struct ConnectServer {
    service: Arc<dyn ConnectService>,
}

impl ConnectServer {
    pub fn new(service: Arc<dyn ConnectService>) -> Self {
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
                encode_reply(result.map(|connectors| ListConnectorsReply { connectors }))
            }
            method::DESCRIBE => {
                let req = decode_request(method, payload)?;
                let result = self.service.describe(ctx, req).await;
                encode_reply(result.map(|connector| DescribeConnectorReply { connector }))
            }
            method::CREATE => {
                let req = decode_request(method, payload)?;
                let result = self.service.create(ctx, req).await;
                encode_reply(result.map(|connector| CreateConnectorReply { connector }))
            }
            method::DELETE => {
                let req = decode_request(method, payload)?;
                let result = self.service.delete(ctx, req).await;
                encode_reply(result.map(|()| DeleteConnectorReply {}))
            }
            other => Err(unknown_method(DESCRIPTOR.name, other)),
        }
    }
}

#[async_trait]
impl Dispatch for ConnectServer {
    fn service_name(&self) -> &'static str {
        DESCRIPTOR.name
    }

    async fn dispatch(&self, ctx: &CallContext, method: &str, payload: &[u8]) -> CallOutcome {
        into_outcome(self.route(ctx, method, payload).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CallFailure, ErrorCode};
    use crate::transport::LoopbackTransport;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Environment whose listing is slow enough for any short deadline to win
    const SLOW_ENV: &str = "env-slow";

    /// Records every request that crossed the boundary
    #[derive(Default)]
    struct Recorder {
        listed: Mutex<Vec<ListConnectorsRequest>>,
        described: Mutex<Vec<DescribeConnectorRequest>>,
        created: Mutex<Vec<CreateConnectorRequest>>,
        deleted: Mutex<Vec<DeleteConnectorRequest>>,
    }

    #[async_trait]
    impl ConnectService for Recorder {
        async fn list(
            &self,
            _ctx: &CallContext,
            req: ListConnectorsRequest,
        ) -> Result<Vec<Connector>, ServiceError> {
            if req.environment_id == SLOW_ENV {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            self.listed.lock().unwrap().push(req);
            Ok(Vec::new())
        }

        async fn describe(
            &self,
            _ctx: &CallContext,
            req: DescribeConnectorRequest,
        ) -> Result<Connector, ServiceError> {
            self.described.lock().unwrap().push(req.clone());
            Err(ServiceError::already_exists(req.name))
        }

        async fn create(
            &self,
            _ctx: &CallContext,
            req: CreateConnectorRequest,
        ) -> Result<Connector, ServiceError> {
            self.created.lock().unwrap().push(req.clone());
            Ok(Connector {
                name: req.name,
                cluster_id: req.cluster_id,
                environment_id: req.environment_id,
                config: req.config,
                status: ConnectorStatus::Running,
            })
        }

        async fn delete(
            &self,
            _ctx: &CallContext,
            req: DeleteConnectorRequest,
        ) -> Result<(), ServiceError> {
            self.deleted.lock().unwrap().push(req);
            Ok(())
        }
    }

    fn client_for(service: Arc<dyn ConnectService>) -> ConnectClient {
        let server = Arc::new(ConnectServer::new(service));
        ConnectClient::new(Arc::new(LoopbackTransport::new(server)))
    }

    #[tokio::test]
    async fn test_config_map_survives_boundary() {
        let recorder = Arc::new(Recorder::default());
        let client = client_for(recorder.clone());
        let ctx = CallContext::new();

        let mut config = BTreeMap::new();
        config.insert("connector.class".to_string(), "S3_SINK".to_string());
        config.insert("topics".to_string(), "orders,payments".to_string());
        config.insert("aws.secret.access.key".to_string(), String::new());

        let req = CreateConnectorRequest {
            environment_id: "env-1".to_string(),
            cluster_id: "lkc-1".to_string(),
            name: "s3-sink".to_string(),
            config,
        };
        let connector = client.create(&ctx, req.clone()).await.unwrap();
        let empty = client
            .create(&ctx, CreateConnectorRequest::default())
            .await
            .unwrap();

        assert_eq!(
            *recorder.created.lock().unwrap(),
            vec![req.clone(), CreateConnectorRequest::default()]
        );
        assert_eq!(connector.config, req.config);
        assert_eq!(connector.status, ConnectorStatus::Running);
        assert!(empty.config.is_empty());
    }

    #[tokio::test]
    async fn test_requests_arrive_unchanged() {
        let recorder = Arc::new(Recorder::default());
        let client = client_for(recorder.clone());
        let ctx = CallContext::new();

        let list = ListConnectorsRequest {
            environment_id: "env-1".to_string(),
            cluster_id: "lkc-1".to_string(),
        };
        client.list(&ctx, list.clone()).await.unwrap();
        client.list(&ctx, ListConnectorsRequest::default()).await.unwrap();

        let describe = DescribeConnectorRequest {
            environment_id: "env-1".to_string(),
            cluster_id: "lkc-1".to_string(),
            name: "s3-sink".to_string(),
        };
        client.describe(&ctx, describe.clone()).await.unwrap_err();
        client
            .describe(&ctx, DescribeConnectorRequest::default())
            .await
            .unwrap_err();

        let delete = DeleteConnectorRequest {
            environment_id: "env-1".to_string(),
            cluster_id: "lkc-1".to_string(),
            name: "s3-sink".to_string(),
        };
        client.delete(&ctx, delete.clone()).await.unwrap();
        client
            .delete(&ctx, DeleteConnectorRequest::default())
            .await
            .unwrap();

        assert_eq!(
            *recorder.listed.lock().unwrap(),
            vec![list, ListConnectorsRequest::default()]
        );
        assert_eq!(
            *recorder.described.lock().unwrap(),
            vec![describe, DescribeConnectorRequest::default()]
        );
        assert_eq!(
            *recorder.deleted.lock().unwrap(),
            vec![delete, DeleteConnectorRequest::default()]
        );
    }

    #[tokio::test]
    async fn test_deadline_surfaces_as_remote_call_failure() {
        let client = client_for(Arc::new(Recorder::default()));
        let ctx = CallContext::with_timeout(Duration::from_millis(20));

        let slow = ListConnectorsRequest {
            environment_id: SLOW_ENV.to_string(),
            ..Default::default()
        };
        let err = client.list(&ctx, slow).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::RemoteCallFailed {
                kind: CallFailure::DeadlineExceeded,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_already_exists_passes_through() {
        let client = client_for(Arc::new(Recorder::default()));
        let err = client
            .describe(
                &CallContext::new(),
                DescribeConnectorRequest {
                    name: "dup".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::AlreadyExists));
    }
}
