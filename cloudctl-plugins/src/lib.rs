//! cloudctl-plugins: the service implementations behind the bundled plugins
//!
//! Each binary under `src/bin/` serves exactly one of these over stdio.
//! Resource state lives in the plugin process for the lifetime of the
//! session; every operation first checks the caller's credentials through
//! [`ApiClient`](cloudctl_plugin_sdk::ApiClient).

pub mod apikey;
pub mod connect;
mod ids;
pub mod kafka;
pub mod user;

pub use apikey::ApiKeys;
pub use connect::Connectors;
pub use kafka::KafkaClusters;
pub use user::ServiceAccounts;

use cloudctl_plugin_sdk::ServiceError;

/// Reject empty identifiers and names before touching any state
pub(crate) fn require(field: &str, value: &str) -> Result<(), ServiceError> {
    if value.trim().is_empty() {
        return Err(ServiceError::invalid_argument(format!("{} is required", field)));
    }
    Ok(())
}
