//! Service handles: a dispensed Client adapter bound to its child process

use crate::connection::PluginConnection;
use cloudctl_plugin_api::{
    ApiKeyService, ConnectService, KafkaService, PluginDescriptor, UserService,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Child;

/// Client adapter produced by a registry factory
#[derive(Clone)]
pub enum DispensedService {
    ApiKey(Arc<dyn ApiKeyService>),
    Kafka(Arc<dyn KafkaService>),
    User(Arc<dyn UserService>),
    Connect(Arc<dyn ConnectService>),
}

impl DispensedService {
    pub fn api_key(&self) -> Option<Arc<dyn ApiKeyService>> {
        match self {
            DispensedService::ApiKey(s) => Some(s.clone()),
            _ => None,
        }
    }

    pub fn kafka(&self) -> Option<Arc<dyn KafkaService>> {
        match self {
            DispensedService::Kafka(s) => Some(s.clone()),
            _ => None,
        }
    }

    pub fn user(&self) -> Option<Arc<dyn UserService>> {
        match self {
            DispensedService::User(s) => Some(s.clone()),
            _ => None,
        }
    }

    pub fn connect(&self) -> Option<Arc<dyn ConnectService>> {
        match self {
            DispensedService::Connect(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl std::fmt::Debug for DispensedService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            DispensedService::ApiKey(_) => "ApiKey",
            DispensedService::Kafka(_) => "Kafka",
            DispensedService::User(_) => "User",
            DispensedService::Connect(_) => "Connect",
        };
        f.write_str(kind)
    }
}

/// A spawned plugin child and the connection to it
pub struct PluginProcess {
    descriptor: PluginDescriptor,
    pid: Option<u32>,
    child: tokio::sync::Mutex<Child>,
    connection: Arc<PluginConnection>,
}

impl PluginProcess {
    pub(crate) fn new(
        descriptor: PluginDescriptor,
        child: Child,
        connection: Arc<PluginConnection>,
    ) -> Self {
        Self {
            descriptor,
            pid: child.id(),
            child: tokio::sync::Mutex::new(child),
            connection,
        }
    }

    pub fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    /// OS process id, as recorded at spawn
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn connection(&self) -> &Arc<PluginConnection> {
        &self.connection
    }

    /// Stop the child: close its input, ask it to terminate, and force it
    /// after `grace`. Returns once the process has been reaped.
    pub async fn terminate(&self, grace: Duration) -> std::io::Result<()> {
        self.connection.close().await;
        let mut child = self.child.lock().await;
        crate::lifecycle::terminate_child(self.descriptor.name, &mut child, grace).await
    }
}

/// Host-side live reference to a dispensed plugin service.
///
/// Clones share one child process; equality is identity.
#[derive(Clone)]
pub struct ServiceHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    service: DispensedService,
    process: PluginProcess,
}

impl ServiceHandle {
    pub(crate) fn new(service: DispensedService, process: PluginProcess) -> Self {
        Self {
            inner: Arc::new(HandleInner { service, process }),
        }
    }

    pub fn descriptor(&self) -> &PluginDescriptor {
        self.inner.process.descriptor()
    }

    pub fn service(&self) -> &DispensedService {
        &self.inner.service
    }

    pub fn process(&self) -> &PluginProcess {
        &self.inner.process
    }

    pub fn pid(&self) -> Option<u32> {
        self.inner.process.pid()
    }

    /// Whether both handles refer to the same spawned plugin
    pub fn ptr_eq(&self, other: &ServiceHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn api_key(&self) -> Option<Arc<dyn ApiKeyService>> {
        self.inner.service.api_key()
    }

    pub fn kafka(&self) -> Option<Arc<dyn KafkaService>> {
        self.inner.service.kafka()
    }

    pub fn user(&self) -> Option<Arc<dyn UserService>> {
        self.inner.service.user()
    }

    pub fn connect(&self) -> Option<Arc<dyn ConnectService>> {
        self.inner.service.connect()
    }
}

impl PartialEq for ServiceHandle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ServiceHandle {}

impl std::fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("plugin", &self.descriptor().name)
            .field("pid", &self.pid())
            .field("service", &self.inner.service)
            .finish()
    }
}
