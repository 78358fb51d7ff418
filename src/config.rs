//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::Error;

type Result<T> = std::result::Result<T, Error>;

/// Settings shared by every operation of a [`crate::Client`].
///
/// Deserializes from camelCase JSON; omitted keys take their defaults.
///
/// ```
/// use wiz_roomctl::ClientConfig;
///
/// let config = ClientConfig::from_json(r#"{"broadcastAddress": "192.168.87.255"}"#).unwrap();
/// assert_eq!(config.broadcast_address(), "192.168.87.255");
/// assert_eq!(config.port(), 38899);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
    broadcast_address: String,
    port: u16,
    discovery_timeout_ms: u64,
    command_timeout_ms: u64,
    buffer_size: usize,
    unknown_label: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            broadcast_address: Self::BROADCAST_ADDRESS.to_string(),
            port: Self::PORT,
            discovery_timeout_ms: Self::DISCOVERY_TIMEOUT_MS,
            command_timeout_ms: Self::COMMAND_TIMEOUT_MS,
            buffer_size: Self::BUFFER_SIZE,
            unknown_label: Self::UNKNOWN_LABEL.to_string(),
        }
    }
}

impl ClientConfig {
    pub const BROADCAST_ADDRESS: &'static str = "255.255.255.255";
    pub const PORT: u16 = 38899;
    pub const DISCOVERY_TIMEOUT_MS: u64 = 5000;
    pub const COMMAND_TIMEOUT_MS: u64 = 2000;
    pub const BUFFER_SIZE: usize = 1024;
    /// Sentinel for rooms and module names a device did not report.
    pub const UNKNOWN_LABEL: &'static str = "Unknown";

    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ClientConfig = serde_json::from_str(json).map_err(Error::JsonLoad)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.broadcast_address.trim().is_empty() {
            return Err(Error::invalid_config("broadcast address is empty"));
        }
        if self.port == 0 {
            return Err(Error::invalid_config("port must be non-zero"));
        }
        if self.discovery_timeout_ms == 0 || self.command_timeout_ms == 0 {
            return Err(Error::invalid_config("timeouts must be non-zero"));
        }
        if self.buffer_size == 0 {
            return Err(Error::invalid_config("buffer size must be non-zero"));
        }
        if self.unknown_label.is_empty() {
            return Err(Error::invalid_config("unknown label is empty"));
        }
        Ok(())
    }

    pub fn broadcast_address(&self) -> &str {
        &self.broadcast_address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    /// Receive buffer size; longer datagrams are truncated and fail to decode.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    pub fn unknown_label(&self) -> &str {
        &self.unknown_label
    }

    pub fn with_broadcast_address(mut self, address: &str) -> Self {
        self.broadcast_address = address.to_string();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Stored in whole milliseconds, rounded up to at least 1ms.
    pub fn with_discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout_ms = whole_millis(timeout);
        self
    }

    /// Stored in whole milliseconds, rounded up to at least 1ms.
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout_ms = whole_millis(timeout);
        self
    }

    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    pub fn with_unknown_label(mut self, label: &str) -> Self {
        self.unknown_label = label.to_string();
        self
    }
}

fn whole_millis(timeout: Duration) -> u64 {
    let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
    if timeout.subsec_nanos() % 1_000_000 != 0 {
        millis.saturating_add(1)
    } else {
        millis.max(1)
    }
}
