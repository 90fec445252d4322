//! Service account plugin for cloudctl

use cloudctl_plugin_sdk::prelude::*;
use cloudctl_plugin_sdk::service::user::DESCRIPTOR;
use cloudctl_plugins::ServiceAccounts;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    run_plugin(DESCRIPTOR, |client| {
        Arc::new(UserServer::new(Arc::new(ServiceAccounts::new(client))))
    })
    .await?;
    Ok(())
}
