//! Kafka cluster plugin for cloudctl

use cloudctl_plugin_sdk::prelude::*;
use cloudctl_plugin_sdk::service::kafka::DESCRIPTOR;
use cloudctl_plugins::KafkaClusters;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    run_plugin(DESCRIPTOR, |client| {
        Arc::new(KafkaServer::new(Arc::new(KafkaClusters::new(client))))
    })
    .await?;
    Ok(())
}
