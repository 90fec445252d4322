use super::dispensed;
use crate::{AppState, CliResult, IntoResponse, Json, Response, State};
use clap::{Args, Subcommand, ValueEnum};
use cloudctl_plugin_api::service::kafka::{
    Availability, CreateKafkaClusterRequest, DeleteKafkaClusterRequest,
    DescribeKafkaClusterRequest, ListKafkaClustersRequest,
};
use cloudctl_plugin_host::ServiceHandle;

#[derive(Args, Debug)]
pub struct KafkaArgs {
    #[command(subcommand)]
    pub command: KafkaCommand,
}

#[derive(Subcommand, Debug)]
pub enum KafkaCommand {
    /// Manage Kafka clusters
    Cluster {
        #[command(subcommand)]
        action: ClusterAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ClusterAction {
    /// List clusters in an environment
    List {
        #[arg(long, value_name = "ID")]
        environment: String,
    },

    /// Describe one cluster
    Describe {
        #[arg(value_name = "CLUSTER")]
        id: String,

        #[arg(long, value_name = "ID")]
        environment: String,
    },

    /// Create a cluster
    Create {
        name: String,

        #[arg(long, value_name = "ID")]
        environment: String,

        /// aws, azure or gcp
        #[arg(long)]
        cloud: String,

        #[arg(long)]
        region: String,

        #[arg(long, value_enum, default_value_t = Zones::SingleZone)]
        availability: Zones,

        /// Capacity units for dedicated clusters
        #[arg(long, default_value_t = 0)]
        cku: u32,
    },

    /// Delete a cluster
    Delete {
        #[arg(value_name = "CLUSTER")]
        id: String,

        #[arg(long, value_name = "ID")]
        environment: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Zones {
    SingleZone,
    MultiZone,
}

impl From<Zones> for Availability {
    fn from(zones: Zones) -> Self {
        match zones {
            Zones::SingleZone => Availability::SingleZone,
            Zones::MultiZone => Availability::MultiZone,
        }
    }
}

pub async fn run(
    state: State<AppState>,
    plugin: ServiceHandle,
    args: KafkaArgs,
) -> CliResult<Response> {
    let kafka = dispensed(plugin.kafka(), &plugin)?;
    let ctx = state.get().call_context();
    let KafkaCommand::Cluster { action } = args.command;

    let response = match action {
        ClusterAction::List { environment } => {
            let req = ListKafkaClustersRequest {
                environment_id: environment,
            };
            Json(kafka.list(&ctx, req).await?).into_response()
        }
        ClusterAction::Describe { id, environment } => {
            let req = DescribeKafkaClusterRequest {
                environment_id: environment,
                cluster_id: id,
            };
            Json(kafka.describe(&ctx, req).await?).into_response()
        }
        ClusterAction::Create {
            name,
            environment,
            cloud,
            region,
            availability,
            cku,
        } => {
            let req = CreateKafkaClusterRequest {
                environment_id: environment,
                name,
                cloud,
                region,
                availability: availability.into(),
                cku,
            };
            let cluster = kafka.create(&ctx, req).await?;
            tracing::info!(cluster = %cluster.id, "Kafka cluster created");
            Json(cluster).into_response()
        }
        ClusterAction::Delete { id, environment } => {
            let req = DeleteKafkaClusterRequest {
                environment_id: environment,
                cluster_id: id.clone(),
            };
            kafka.delete(&ctx, req).await?;
            format!("Deleted Kafka cluster \"{}\".", id).into_response()
        }
    };

    Ok(response)
}
