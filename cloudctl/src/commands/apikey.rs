use super::dispensed;
use crate::{AppState, CliResult, IntoResponse, Json, Response, State};
use clap::{Args, Subcommand};
use cloudctl_plugin_api::service::apikey::{
    CreateApiKeyRequest, DeleteApiKeyRequest, ListApiKeysRequest, UpdateApiKeyRequest,
};
use cloudctl_plugin_host::ServiceHandle;

#[derive(Args, Debug)]
pub struct ApiKeyArgs {
    #[command(subcommand)]
    pub action: ApiKeyAction,
}

#[derive(Subcommand, Debug)]
pub enum ApiKeyAction {
    /// Create an API key for a resource
    Create {
        /// Resource the key grants access to (cluster id, "cloud", ...)
        #[arg(long, value_name = "ID")]
        resource: String,

        #[arg(long, default_value = "")]
        description: String,

        /// Owning service account; defaults to the logged-in user
        #[arg(long, value_name = "ID", default_value = "")]
        service_account: String,
    },

    /// Delete an API key
    Delete {
        #[arg(value_name = "KEY")]
        key: String,
    },

    /// List API keys
    List {
        #[arg(long, value_name = "ID")]
        resource: Option<String>,

        #[arg(long, value_name = "ID")]
        service_account: Option<String>,
    },

    /// Change the description of an API key
    Update {
        #[arg(value_name = "KEY")]
        key: String,

        #[arg(long)]
        description: String,
    },
}

pub async fn run(
    state: State<AppState>,
    plugin: ServiceHandle,
    args: ApiKeyArgs,
) -> CliResult<Response> {
    let api_keys = dispensed(plugin.api_key(), &plugin)?;
    let ctx = state.get().call_context();

    let response = match args.action {
        ApiKeyAction::Create {
            resource,
            description,
            service_account,
        } => {
            let req = CreateApiKeyRequest {
                resource_id: resource,
                description,
                owner_id: service_account,
            };
            let key = api_keys.create(&ctx, req).await?;
            tracing::info!(key = %key.key, "API key created");
            Json(key).into_response()
        }
        ApiKeyAction::Delete { key } => {
            api_keys
                .delete(&ctx, DeleteApiKeyRequest { key: key.clone() })
                .await?;
            format!("Deleted API key \"{}\".", key).into_response()
        }
        ApiKeyAction::List {
            resource,
            service_account,
        } => {
            let req = ListApiKeysRequest {
                resource_id: resource,
                owner_id: service_account,
            };
            Json(api_keys.list(&ctx, req).await?).into_response()
        }
        ApiKeyAction::Update { key, description } => {
            let req = UpdateApiKeyRequest { key, description };
            Json(api_keys.update(&ctx, req).await?).into_response()
        }
    };

    Ok(response)
}
