//! Handshake constants and plugin descriptors
//!
//! Both sides compile against the same [`HANDSHAKE`] value. A plugin built
//! against a different protocol version or cookie is rejected outright.

use crate::protocol::HostMessage;

/// Wire protocol version for compatibility checking
pub const PROTOCOL_VERSION: u32 = 1;

/// Handshake configuration shared by the host and every plugin binary
pub const HANDSHAKE: HandshakeConfig = HandshakeConfig {
    protocol_version: PROTOCOL_VERSION,
    cookie_key: "CLOUDCTL_PLUGIN_MAGIC_COOKIE",
    cookie_value: "4b1c9e7d2f0a43c6b8e5d1a7c3f9e260",
};

/// Values exchanged before any domain call is attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeConfig {
    /// Protocol version both sides must speak
    pub protocol_version: u32,

    /// Environment variable the host sets on the child process
    pub cookie_key: &'static str,

    /// Expected value of `cookie_key`
    pub cookie_value: &'static str,
}

impl HandshakeConfig {
    /// Build the `Hello` message the host opens a session with
    pub fn hello(&self) -> HostMessage {
        HostMessage::Hello {
            protocol_version: self.protocol_version,
            cookie_key: self.cookie_key.to_string(),
            cookie_value: self.cookie_value.to_string(),
        }
    }

    /// Check the host's `Hello` against the plugin's own configuration.
    ///
    /// Returns the rejection reason on mismatch. Nothing is negotiated.
    pub fn verify(
        &self,
        protocol_version: u32,
        cookie_key: &str,
        cookie_value: &str,
    ) -> Result<(), String> {
        if cookie_key != self.cookie_key || cookie_value != self.cookie_value {
            return Err("magic cookie mismatch".to_string());
        }
        if protocol_version != self.protocol_version {
            return Err(format!(
                "protocol version mismatch: host={}, plugin={}",
                protocol_version, self.protocol_version
            ));
        }
        Ok(())
    }

    /// Whether the cookie environment variable of the current process matches
    pub fn cookie_present(&self) -> bool {
        std::env::var(self.cookie_key)
            .map(|v| v == self.cookie_value)
            .unwrap_or(false)
    }
}

/// Identity of one plugin-backed domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PluginDescriptor {
    /// Unique name, also the service name requested on dispense
    pub name: &'static str,

    /// Executable looked up on the search path
    pub binary_name: &'static str,
}

impl PluginDescriptor {
    pub const fn new(name: &'static str, binary_name: &'static str) -> Self {
        Self { name, binary_name }
    }
}

impl std::fmt::Display for PluginDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.binary_name)
    }
}
