//! cloudctl-plugin-api: Shared contract for the cloudctl plugin bridge
//!
//! This crate defines everything the host and a plugin executable must agree on:
//! the handshake constants, the wire frames exchanged over the plugin's stdio,
//! the four domain Service Interfaces, and the Client/Server adapter pairs that
//! carry those interfaces across the process boundary. It also owns the
//! schema of the configuration file both sides read.
//! Communication uses length-prefixed MessagePack frames.

pub mod config;
pub mod context;
pub mod error;
pub mod handshake;
pub mod protocol;
pub mod service;
pub mod transport;

pub use config::{CliConfig, ConfigError, ContextConfig, Credentials};
pub use context::CallContext;
pub use error::{
    map_transport_error, BusinessError, CallFailure, ErrorCode, ServiceError, TransportError,
};
pub use handshake::{HandshakeConfig, PluginDescriptor, HANDSHAKE, PROTOCOL_VERSION};
pub use protocol::{
    read_frame, write_frame, CallOutcome, HostFrame, HostMessage, PluginFrame, PluginMessage,
    ProtoError,
};
pub use service::apikey::{ApiKeyClient, ApiKeyServer, ApiKeyService};
pub use service::connect::{ConnectClient, ConnectServer, ConnectService};
pub use service::kafka::{KafkaClient, KafkaServer, KafkaService};
pub use service::user::{UserClient, UserServer, UserService};
pub use transport::{Dispatch, LoopbackTransport, Transport};
