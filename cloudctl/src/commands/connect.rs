use super::dispensed;
use crate::{AppState, CliResult, IntoResponse, Json, Response, State};
use clap::{Args, Subcommand};
use cloudctl_plugin_api::service::connect::{
    CreateConnectorRequest, DeleteConnectorRequest, DescribeConnectorRequest,
    ListConnectorsRequest,
};
use cloudctl_plugin_host::ServiceHandle;

#[derive(Args, Debug)]
pub struct ConnectArgs {
    /// Environment of the Kafka cluster
    #[arg(long, global = true, value_name = "ID", default_value = "")]
    pub environment: String,

    /// Kafka cluster the connectors run against
    #[arg(long, global = true, value_name = "ID", default_value = "")]
    pub cluster: String,

    #[command(subcommand)]
    pub action: ConnectAction,
}

#[derive(Subcommand, Debug)]
pub enum ConnectAction {
    /// List connectors
    List,

    /// Describe one connector
    Describe { name: String },

    /// Create a connector
    Create {
        name: String,

        /// Connector setting, repeatable (`--config connector.class=S3Sink`)
        #[arg(long = "config", value_name = "KEY=VALUE", value_parser = parse_setting)]
        settings: Vec<(String, String)>,
    },

    /// Delete a connector
    Delete { name: String },
}

fn parse_setting(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}

pub async fn run(
    state: State<AppState>,
    plugin: ServiceHandle,
    args: ConnectArgs,
) -> CliResult<Response> {
    let connect = dispensed(plugin.connect(), &plugin)?;
    let ctx = state.get().call_context();
    let ConnectArgs {
        environment,
        cluster,
        action,
    } = args;

    let response = match action {
        ConnectAction::List => {
            let req = ListConnectorsRequest {
                environment_id: environment,
                cluster_id: cluster,
            };
            Json(connect.list(&ctx, req).await?).into_response()
        }
        ConnectAction::Describe { name } => {
            let req = DescribeConnectorRequest {
                environment_id: environment,
                cluster_id: cluster,
                name,
            };
            Json(connect.describe(&ctx, req).await?).into_response()
        }
        ConnectAction::Create { name, settings } => {
            let req = CreateConnectorRequest {
                environment_id: environment,
                cluster_id: cluster,
                name,
                config: settings.into_iter().collect(),
            };
            Json(connect.create(&ctx, req).await?).into_response()
        }
        ConnectAction::Delete { name } => {
            let req = DeleteConnectorRequest {
                environment_id: environment,
                cluster_id: cluster,
                name: name.clone(),
            };
            connect.delete(&ctx, req).await?;
            format!("Deleted connector \"{}\".", name).into_response()
        }
    };

    Ok(response)
}
