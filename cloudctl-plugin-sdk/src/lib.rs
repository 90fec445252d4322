//! cloudctl-plugin-sdk: SDK for writing cloudctl plugin executables
//!
//! A plugin binary implements one Service Interface and hands it to
//! [`run_plugin`], which performs the whole bootstrap: refuse to run outside
//! the host, set up logging on stderr, load the shared configuration, build
//! the authenticated [`ApiClient`], and serve over stdio until the host hangs up.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cloudctl_plugin_sdk::prelude::*;
//! use cloudctl_plugin_sdk::service::apikey::DESCRIPTOR;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     run_plugin(DESCRIPTOR, |client| {
//!         Arc::new(ApiKeyServer::new(Arc::new(MyApiKeys::new(client))))
//!     })
//!     .await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod logging;
pub mod server;

pub use client::ApiClient;
pub use logging::{init_logging, LOG_ENV};
pub use server::{serve, serve_on, ServeError};

// Re-export everything from cloudctl-plugin-api
pub use cloudctl_plugin_api::*;

use std::sync::Arc;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{run_plugin, ApiClient, ServeError};
    pub use cloudctl_plugin_api::{
        ApiKeyServer, ApiKeyService, CallContext, ConnectServer, ConnectService, Dispatch,
        KafkaServer, KafkaService, ServiceError, UserServer, UserService,
    };
    pub use std::sync::Arc;
}

/// Exit unless the host's magic cookie is present.
///
/// Plugins are started by cloudctl, never by hand; a user who runs one
/// directly gets a short notice instead of a binary protocol on their terminal.
pub fn ensure_launched_by_host(handshake: &HandshakeConfig) {
    if !handshake.cookie_present() {
        eprintln!(
            "This binary is a cloudctl plugin and is not meant to be executed directly.\n\
             Run the cloudctl command that uses it instead."
        );
        std::process::exit(1);
    }
}

/// Bootstrap a plugin process with the standard handshake
pub async fn run_plugin<F>(descriptor: PluginDescriptor, build: F) -> Result<(), ServeError>
where
    F: FnOnce(ApiClient) -> Arc<dyn Dispatch>,
{
    run_plugin_with(descriptor, HANDSHAKE, build).await
}

/// Bootstrap a plugin process with an explicit handshake configuration
pub async fn run_plugin_with<F>(
    descriptor: PluginDescriptor,
    handshake: HandshakeConfig,
    build: F,
) -> Result<(), ServeError>
where
    F: FnOnce(ApiClient) -> Arc<dyn Dispatch>,
{
    ensure_launched_by_host(&handshake);
    init_logging();

    let config = CliConfig::load()?;
    let client = ApiClient::from_config(&config);
    let dispatch = build(client);
    check_descriptor(&descriptor, dispatch.as_ref())?;

    tracing::debug!(
        plugin = descriptor.name,
        pid = std::process::id(),
        endpoint = config.context.as_ref().map(|c| c.endpoint.as_str()),
        "Plugin starting"
    );
    serve(dispatch, handshake).await
}

/// The dispatcher must serve the service the host will ask this binary for
fn check_descriptor(
    descriptor: &PluginDescriptor,
    dispatch: &dyn Dispatch,
) -> Result<(), ServeError> {
    if dispatch.service_name() == descriptor.name {
        return Ok(());
    }
    Err(ServeError::Descriptor {
        plugin: descriptor.name,
        serves: dispatch.service_name(),
    })
}
