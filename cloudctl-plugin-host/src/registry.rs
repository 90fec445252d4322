//! Plugin registry
//!
//! Maps a plugin name to the factory that wraps a plugin connection in the
//! domain's Client adapter. The registry is assembled once from a static list
//! of entries and is immutable afterwards; there is no global table.

use crate::error::RegistryError;
use crate::handle::DispensedService;
use cloudctl_plugin_api::service::{apikey, connect, kafka, user};
use cloudctl_plugin_api::{
    ApiKeyClient, ConnectClient, KafkaClient, PluginDescriptor, Transport, UserClient,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Builds the host-side Client adapter on top of a live transport
pub type ClientFactory = fn(Arc<dyn Transport>) -> DispensedService;

/// One registered plugin-backed domain
#[derive(Clone, Copy)]
pub struct PluginEntry {
    pub descriptor: PluginDescriptor,
    pub factory: ClientFactory,
}

impl PluginEntry {
    pub const fn new(descriptor: PluginDescriptor, factory: ClientFactory) -> Self {
        Self {
            descriptor,
            factory,
        }
    }
}

impl std::fmt::Debug for PluginEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginEntry")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// The four domains shipped with cloudctl
pub fn builtin_entries() -> [PluginEntry; 4] {
    [
        PluginEntry::new(apikey::DESCRIPTOR, |t| {
            DispensedService::ApiKey(Arc::new(ApiKeyClient::new(t)))
        }),
        PluginEntry::new(kafka::DESCRIPTOR, |t| {
            DispensedService::Kafka(Arc::new(KafkaClient::new(t)))
        }),
        PluginEntry::new(user::DESCRIPTOR, |t| {
            DispensedService::User(Arc::new(UserClient::new(t)))
        }),
        PluginEntry::new(connect::DESCRIPTOR, |t| {
            DispensedService::Connect(Arc::new(ConnectClient::new(t)))
        }),
    ]
}

/// Immutable name-keyed table of plugin entries
#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
    entries: Vec<PluginEntry>,
    index: HashMap<&'static str, usize>,
}

impl PluginRegistry {
    /// Build a registry; a name registered twice is rejected
    pub fn new(entries: impl IntoIterator<Item = PluginEntry>) -> Result<Self, RegistryError> {
        let mut builder = RegistryBuilder::default();
        for entry in entries {
            builder.register(entry)?;
        }
        Ok(builder.build())
    }

    /// Registry holding the built-in domains
    pub fn builtin() -> Self {
        let entries = builtin_entries();
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.descriptor.name, i))
            .collect();
        Self {
            entries: entries.to_vec(),
            index,
        }
    }

    pub fn lookup(&self, name: &str) -> Result<&PluginEntry, RegistryError> {
        self.index
            .get(name)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    /// Descriptors in registration order
    pub fn descriptors(&self) -> impl Iterator<Item = &PluginDescriptor> {
        self.entries.iter().map(|e| &e.descriptor)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Staging area used while the registry is assembled at startup
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    entries: Vec<PluginEntry>,
    index: HashMap<&'static str, usize>,
}

impl RegistryBuilder {
    pub fn register(&mut self, entry: PluginEntry) -> Result<&mut Self, RegistryError> {
        let name = entry.descriptor.name;
        if self.index.contains_key(name) {
            return Err(RegistryError::Duplicate(name.to_string()));
        }
        self.index.insert(name, self.entries.len());
        self.entries.push(entry);
        tracing::trace!(plugin = name, "Plugin registered");
        Ok(self)
    }

    pub fn build(self) -> PluginRegistry {
        PluginRegistry {
            entries: self.entries,
            index: self.index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudctl_plugin_api::{
        CallContext, LoopbackTransport, ServiceError, UserServer, UserService,
    };

    #[test]
    fn test_builtin_names() {
        let registry = PluginRegistry::builtin();
        let names: Vec<_> = registry.descriptors().map(|d| d.name).collect();
        assert_eq!(
            names,
            vec!["apiKey", "confluent-kafka-plugin", "user", "confluent-connect-plugin"]
        );
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_lookup_unknown() {
        let registry = PluginRegistry::builtin();
        assert_eq!(
            registry.lookup("billing").unwrap_err(),
            RegistryError::NotFound("billing".to_string())
        );
    }

    #[test]
    fn test_duplicate_rejected() {
        let [apikey, ..] = builtin_entries();
        let err = PluginRegistry::new([apikey, apikey]).unwrap_err();
        assert_eq!(err, RegistryError::Duplicate("apiKey".to_string()));
    }

    #[test]
    fn test_factory_builds_matching_client() {
        let registry = PluginRegistry::builtin();
        let entry = registry.lookup("user").unwrap();

        let server = Arc::new(UserServer::new(Arc::new(NoUsers)));
        let dispensed = (entry.factory)(Arc::new(LoopbackTransport::new(server)));
        assert!(dispensed.user().is_some());
        assert!(dispensed.api_key().is_none());
    }

    struct NoUsers;

    #[async_trait::async_trait]
    impl UserService for NoUsers {
        async fn create_service_account(
            &self,
            _ctx: &CallContext,
            _req: user::CreateServiceAccountRequest,
        ) -> Result<user::ServiceAccount, ServiceError> {
            Err(ServiceError::internal("unused"))
        }

        async fn update_service_account(
            &self,
            _ctx: &CallContext,
            _req: user::UpdateServiceAccountRequest,
        ) -> Result<user::ServiceAccount, ServiceError> {
            Err(ServiceError::internal("unused"))
        }

        async fn deactivate_service_account(
            &self,
            _ctx: &CallContext,
            _req: user::DeactivateServiceAccountRequest,
        ) -> Result<(), ServiceError> {
            Err(ServiceError::internal("unused"))
        }

        async fn list_service_accounts(
            &self,
            _ctx: &CallContext,
            _req: user::ListServiceAccountsRequest,
        ) -> Result<Vec<user::ServiceAccount>, ServiceError> {
            Ok(Vec::new())
        }

        async fn describe_user(
            &self,
            _ctx: &CallContext,
            _req: user::DescribeUserRequest,
        ) -> Result<user::User, ServiceError> {
            Err(ServiceError::internal("unused"))
        }
    }
}
