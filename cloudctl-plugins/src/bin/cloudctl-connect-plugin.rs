//! Connector plugin for cloudctl

use cloudctl_plugin_sdk::prelude::*;
use cloudctl_plugin_sdk::service::connect::DESCRIPTOR;
use cloudctl_plugins::Connectors;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    run_plugin(DESCRIPTOR, |client| {
        Arc::new(ConnectServer::new(Arc::new(Connectors::new(client))))
    })
    .await?;
    Ok(())
}
