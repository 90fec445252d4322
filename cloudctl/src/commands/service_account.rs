use super::dispensed;
use crate::{AppState, CliResult, IntoResponse, Json, Response, State};
use clap::{Args, Subcommand};
use cloudctl_plugin_api::service::user::{
    CreateServiceAccountRequest, DeactivateServiceAccountRequest, DescribeUserRequest,
    ListServiceAccountsRequest, UpdateServiceAccountRequest,
};
use cloudctl_plugin_host::ServiceHandle;

#[derive(Args, Debug)]
pub struct ServiceAccountArgs {
    #[command(subcommand)]
    pub action: ServiceAccountAction,
}

#[derive(Subcommand, Debug)]
pub enum ServiceAccountAction {
    /// Create a service account
    Create {
        name: String,

        #[arg(long, default_value = "")]
        description: String,
    },

    /// Change the description of a service account
    Update {
        #[arg(value_name = "ID")]
        id: String,

        #[arg(long)]
        description: String,
    },

    /// Deactivate a service account
    Deactivate {
        #[arg(value_name = "ID")]
        id: String,
    },

    /// List service accounts
    List,

    /// Show a user, or the logged-in user when no id is given
    DescribeUser {
        #[arg(value_name = "ID")]
        id: Option<String>,
    },
}

pub async fn run(
    state: State<AppState>,
    plugin: ServiceHandle,
    args: ServiceAccountArgs,
) -> CliResult<Response> {
    let users = dispensed(plugin.user(), &plugin)?;
    let ctx = state.get().call_context();

    let response = match args.action {
        ServiceAccountAction::Create { name, description } => {
            let req = CreateServiceAccountRequest { name, description };
            Json(users.create_service_account(&ctx, req).await?).into_response()
        }
        ServiceAccountAction::Update { id, description } => {
            let req = UpdateServiceAccountRequest { id, description };
            Json(users.update_service_account(&ctx, req).await?).into_response()
        }
        ServiceAccountAction::Deactivate { id } => {
            let req = DeactivateServiceAccountRequest { id: id.clone() };
            users.deactivate_service_account(&ctx, req).await?;
            format!("Deactivated service account \"{}\".", id).into_response()
        }
        ServiceAccountAction::List => {
            let accounts = users
                .list_service_accounts(&ctx, ListServiceAccountsRequest {})
                .await?;
            Json(accounts).into_response()
        }
        ServiceAccountAction::DescribeUser { id } => {
            let req = DescribeUserRequest {
                id: id.unwrap_or_default(),
            };
            Json(users.describe_user(&ctx, req).await?).into_response()
        }
    };

    Ok(response)
}
