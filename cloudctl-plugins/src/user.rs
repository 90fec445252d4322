//! Service accounts and user lookup, served by `cloudctl-user-plugin`

use crate::{ids, require};
use async_trait::async_trait;
use cloudctl_plugin_sdk::service::user::{
    CreateServiceAccountRequest, DeactivateServiceAccountRequest, DescribeUserRequest,
    ListServiceAccountsRequest, ServiceAccount, UpdateServiceAccountRequest, User,
};
use cloudctl_plugin_sdk::{ApiClient, CallContext, ServiceError, UserService};
use std::collections::BTreeMap;
use tokio::sync::Mutex;

pub struct ServiceAccounts {
    client: ApiClient,
    accounts: Mutex<BTreeMap<String, ServiceAccount>>,
}

impl ServiceAccounts {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            accounts: Mutex::new(BTreeMap::new()),
        }
    }
}

fn not_found(id: &str) -> ServiceError {
    ServiceError::not_found(format!("service account {} not found", id))
}

#[async_trait]
impl UserService for ServiceAccounts {
    async fn create_service_account(
        &self,
        _ctx: &CallContext,
        req: CreateServiceAccountRequest,
    ) -> Result<ServiceAccount, ServiceError> {
        self.client.authorize()?;
        require("service account name", &req.name)?;

        let mut accounts = self.accounts.lock().await;
        if accounts.values().any(|a| a.name == req.name) {
            return Err(ServiceError::already_exists(format!(
                "service account '{}' already exists",
                req.name
            )));
        }

        let account = ServiceAccount {
            id: ids::resource_id("sa"),
            name: req.name,
            description: req.description,
            active: true,
        };
        accounts.insert(account.id.clone(), account.clone());
        Ok(account)
    }

    async fn update_service_account(
        &self,
        _ctx: &CallContext,
        req: UpdateServiceAccountRequest,
    ) -> Result<ServiceAccount, ServiceError> {
        self.client.authorize()?;

        let mut accounts = self.accounts.lock().await;
        let account = accounts.get_mut(&req.id).ok_or_else(|| not_found(&req.id))?;
        if !account.active {
            return Err(ServiceError::invalid_argument(format!(
                "service account {} is deactivated",
                req.id
            )));
        }
        account.description = req.description;
        Ok(account.clone())
    }

    async fn deactivate_service_account(
        &self,
        _ctx: &CallContext,
        req: DeactivateServiceAccountRequest,
    ) -> Result<(), ServiceError> {
        self.client.authorize()?;

        let mut accounts = self.accounts.lock().await;
        let account = accounts.get_mut(&req.id).ok_or_else(|| not_found(&req.id))?;
        account.active = false;
        Ok(())
    }

    async fn list_service_accounts(
        &self,
        _ctx: &CallContext,
        _req: ListServiceAccountsRequest,
    ) -> Result<Vec<ServiceAccount>, ServiceError> {
        self.client.authorize()?;
        Ok(self.accounts.lock().await.values().cloned().collect())
    }

    /// An empty id describes the caller; service accounts resolve by id.
    async fn describe_user(
        &self,
        _ctx: &CallContext,
        req: DescribeUserRequest,
    ) -> Result<User, ServiceError> {
        let principal = self.client.principal()?;

        if req.id.is_empty() || req.id == principal {
            return Ok(User {
                id: principal,
                email: String::new(),
                full_name: String::new(),
            });
        }

        let accounts = self.accounts.lock().await;
        let account = accounts
            .get(&req.id)
            .ok_or_else(|| ServiceError::not_found(format!("user {} not found", req.id)))?;
        Ok(User {
            id: account.id.clone(),
            email: String::new(),
            full_name: account.name.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudctl_plugin_sdk::{Credentials, ErrorCode};

    fn service() -> ServiceAccounts {
        ServiceAccounts::new(ApiClient::new(
            "https://api.example.cloud",
            Credentials {
                api_key: "ME".to_string(),
                api_secret: "secret".to_string(),
                expires_at: None,
            },
        ))
    }

    fn create_req(name: &str) -> CreateServiceAccountRequest {
        CreateServiceAccountRequest {
            name: name.to_string(),
            description: "deploys".to_string(),
        }
    }

    #[tokio::test]
    async fn test_account_lifecycle() {
        let svc = service();
        let ctx = CallContext::new();

        let account = svc.create_service_account(&ctx, create_req("ci")).await.unwrap();
        assert!(account.active);

        let updated = svc
            .update_service_account(
                &ctx,
                UpdateServiceAccountRequest {
                    id: account.id.clone(),
                    description: "builds".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.description, "builds");

        svc.deactivate_service_account(
            &ctx,
            DeactivateServiceAccountRequest {
                id: account.id.clone(),
            },
        )
        .await
        .unwrap();

        let listed = svc
            .list_service_accounts(&ctx, ListServiceAccountsRequest {})
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert!(!listed[0].active);

        let err = svc
            .update_service_account(
                &ctx,
                UpdateServiceAccountRequest {
                    id: account.id,
                    description: "again".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::InvalidArgument));
    }

    #[tokio::test]
    async fn test_duplicate_name() {
        let svc = service();
        let ctx = CallContext::new();
        svc.create_service_account(&ctx, create_req("ci")).await.unwrap();
        let err = svc
            .create_service_account(&ctx, create_req("ci"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::AlreadyExists));
    }

    #[tokio::test]
    async fn test_describe_user() {
        let svc = service();
        let ctx = CallContext::new();

        let me = svc
            .describe_user(&ctx, DescribeUserRequest { id: String::new() })
            .await
            .unwrap();
        assert_eq!(me.id, "ME");

        let account = svc.create_service_account(&ctx, create_req("ci")).await.unwrap();
        let user = svc
            .describe_user(&ctx, DescribeUserRequest { id: account.id })
            .await
            .unwrap();
        assert_eq!(user.full_name, "ci");

        let err = svc
            .describe_user(&ctx, DescribeUserRequest { id: "u-0".to_string() })
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::NotFound));
    }
}
