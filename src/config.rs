/// Configuration module - sender settings loaded from TOML
///
/// ```toml
/// address = "127.0.0.1"
/// port = "9000"            # text or integer
/// bind_address = "0.0.0.0:0"
/// address_policy = "strict" # or "lenient"
/// queue_depth = 64
/// tick_interval_ms = 1000
/// ```
///
/// Destination text is deliberately kept as text here; it is interpreted by
/// the `AddressPolicy` when the sender opens.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::errors::{Result, SenderError};
use crate::socket::AddressPolicy;

/// Default channel depth for the sender task
pub const DEFAULT_QUEUE_DEPTH: usize = 64;

/// Default telemetry period in milliseconds
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;

/// Sender configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SenderConfig {
    /// Destination IPv4 address text
    pub address: String,

    /// Destination port text
    #[serde(deserialize_with = "port_text")]
    pub port: String,

    /// Local address the socket is bound to
    pub bind_address: String,

    /// How `address` and `port` are interpreted
    pub address_policy: AddressPolicy,

    /// Capacity of the sender task's command channel
    pub queue_depth: usize,

    /// Telemetry period used by the ticker
    pub tick_interval_ms: u64,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: "9000".to_string(),
            bind_address: "0.0.0.0:0".to_string(),
            address_policy: AddressPolicy::Strict,
            queue_depth: DEFAULT_QUEUE_DEPTH,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
        }
    }
}

/// Accept `port = "9000"` as well as `port = 9000`
fn port_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PortText {
        Text(String),
        Number(i64),
    }

    Ok(match PortText::deserialize(deserializer)? {
        PortText::Text(text) => text,
        PortText::Number(number) => number.to_string(),
    })
}

impl SenderConfig {
    /// Parse and validate a TOML document
    ///
    /// # Errors
    /// `Config` if the document is malformed or fails validation
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| SenderError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    /// `Config` if the file cannot be read, is malformed or fails validation
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            SenderError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Check the settings that do not depend on the address policy
    pub fn validate(&self) -> Result<()> {
        self.bind_socket_addr()?;

        if self.queue_depth == 0 {
            return Err(SenderError::Config("queue_depth must be at least 1".to_string()));
        }

        if self.tick_interval_ms == 0 {
            return Err(SenderError::Config(
                "tick_interval_ms must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn bind_socket_addr(&self) -> Result<SocketAddr> {
        self.bind_address.parse().map_err(|_| {
            SenderError::Config(format!("invalid bind_address: {:?}", self.bind_address))
        })
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}
