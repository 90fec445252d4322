//! User and service-account management

use super::{decode_request, encode_reply, into_outcome, invoke, unknown_method};
use crate::context::CallContext;
use crate::error::ServiceError;
use crate::handshake::PluginDescriptor;
use crate::protocol::CallOutcome;
use crate::transport::{Dispatch, Transport};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const DESCRIPTOR: PluginDescriptor = PluginDescriptor::new("user", "cloudctl-user-plugin");

pub mod method {
    pub const CREATE: &str = "User.CreateServiceAccount";
    pub const UPDATE: &str = "User.UpdateServiceAccount";
    pub const DEACTIVATE: &str = "User.DeactivateServiceAccount";
    pub const LIST: &str = "User.ListServiceAccounts";
    pub const DESCRIBE_USER: &str = "User.Describe";
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAccount {
    pub id: String,
    pub name: String,
    pub description: String,
    pub active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub full_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateServiceAccountRequest {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateServiceAccountReply {
    pub service_account: ServiceAccount,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateServiceAccountRequest {
    pub id: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateServiceAccountReply {
    pub service_account: ServiceAccount,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeactivateServiceAccountRequest {
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeactivateServiceAccountReply {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListServiceAccountsRequest {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListServiceAccountsReply {
    pub service_accounts: Vec<ServiceAccount>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescribeUserRequest {
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescribeUserReply {
    pub user: User,
}

#[async_trait]
pub trait UserService: Send + Sync {
    async fn create_service_account(
        &self,
        ctx: &CallContext,
        req: CreateServiceAccountRequest,
    ) -> Result<ServiceAccount, ServiceError>;

    async fn update_service_account(
        &self,
        ctx: &CallContext,
        req: UpdateServiceAccountRequest,
    ) -> Result<ServiceAccount, ServiceError>;

    async fn deactivate_service_account(
        &self,
        ctx: &CallContext,
        req: DeactivateServiceAccountRequest,
    ) -> Result<(), ServiceError>;

    async fn list_service_accounts(
        &self,
        ctx: &CallContext,
        req: ListServiceAccountsRequest,
    ) -> Result<Vec<ServiceAccount>, ServiceError>;

    async fn describe_user(
        &self,
        ctx: &CallContext,
        req: DescribeUserRequest,
    ) -> Result<User, ServiceError>;
}

#[derive(Clone)]
pub struct UserClient {
    transport: Arc<dyn Transport>,
}

impl UserClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl UserService for UserClient {
    async fn create_service_account(
        &self,
        ctx: &CallContext,
        req: CreateServiceAccountRequest,
    ) -> Result<ServiceAccount, ServiceError> {
        let reply: CreateServiceAccountReply =
            invoke(self.transport.as_ref(), ctx, method::CREATE, &req).await?;
        Ok(reply.service_account)
    }

    async fn update_service_account(
        &self,
        ctx: &CallContext,
        req: UpdateServiceAccountRequest,
    ) -> Result<ServiceAccount, ServiceError> {
        let reply: UpdateServiceAccountReply =
            invoke(self.transport.as_ref(), ctx, method::UPDATE, &req).await?;
        Ok(reply.service_account)
    }

    async fn deactivate_service_account(
        &self,
        ctx: &CallContext,
        req: DeactivateServiceAccountRequest,
    ) -> Result<(), ServiceError> {
        let _: DeactivateServiceAccountReply =
            invoke(self.transport.as_ref(), ctx, method::DEACTIVATE, &req).await?;
        Ok(())
    }

    async fn list_service_accounts(
        &self,
        ctx: &CallContext,
        req: ListServiceAccountsRequest,
    ) -> Result<Vec<ServiceAccount>, ServiceError> {
        let reply: ListServiceAccountsReply =
            invoke(self.transport.as_ref(), ctx, method::LIST, &req).await?;
        Ok(reply.service_accounts)
    }

    async fn describe_user(
        &self,
        ctx: &CallContext,
        req: DescribeUserRequest,
    ) -> Result<User, ServiceError> {
        let reply: DescribeUserReply =
            invoke(self.transport.as_ref(), ctx, method::DESCRIBE_USER, &req).await?;
        Ok(reply.user)
    }
}

pub struct UserServer {
    service: Arc<dyn UserService>,
}

impl UserServer {
    pub fn new(service: Arc<dyn UserService>) -> Self {
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
                let result = self.service.create_service_account(ctx, req).await;
                encode_reply(
                    result.map(|service_account| CreateServiceAccountReply { service_account }),
                )
            }
            method::UPDATE => {
                let req = decode_request(method, payload)?;
                let result = self.service.update_service_account(ctx, req).await;
                encode_reply(
                    result.map(|service_account| UpdateServiceAccountReply { service_account }),
                )
            }
            method::DEACTIVATE => {
                let req = decode_request(method, payload)?;
                let result = self.service.deactivate_service_account(ctx, req).await;
                encode_reply(result.map(|()| DeactivateServiceAccountReply {}))
            }
            method::LIST => {
                let req = decode_request(method, payload)?;
                let result = self.service.list_service_accounts(ctx, req).await;
                encode_reply(
                    result.map(|service_accounts| ListServiceAccountsReply { service_accounts }),
                )
            }
            method::DESCRIBE_USER => {
                let req = decode_request(method, payload)?;
                let result = self.service.describe_user(ctx, req).await;
                encode_reply(result.map(|user| DescribeUserReply { user }))
            }
            other => Err(unknown_method(DESCRIPTOR.name, other)),
        }
    }
}

#[async_trait]
impl Dispatch for UserServer {
    fn service_name(&self) -> &'static str {
        DESCRIPTOR.name
    }

    async fn dispatch(&self, ctx: &CallContext, method: &str, payload: &[u8]) -> CallOutcome {
        into_outcome(self.route(ctx, method, payload).await)
    }
}
