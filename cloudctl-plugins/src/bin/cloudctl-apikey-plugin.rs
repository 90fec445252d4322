//! API key plugin for cloudctl

use cloudctl_plugin_sdk::prelude::*;
use cloudctl_plugin_sdk::service::apikey::DESCRIPTOR;
use cloudctl_plugins::ApiKeys;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    run_plugin(DESCRIPTOR, |client| {
        Arc::new(ApiKeyServer::new(Arc::new(ApiKeys::new(client))))
    })
    .await?;
    Ok(())
}
