//! Per-device control handle.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::client::Client;
use crate::codec::Method;
use crate::response::{DeviceResponse, SystemConfig};

/// Power state as last reported by a device.
///
/// `Unknown` is a first-class outcome: the device did not answer, or
/// answered without a boolean state. It is never the same as `Off`.
///
/// ```
/// use wiz_roomctl::PowerState;
///
/// assert_eq!(PowerState::from(Some(true)), PowerState::On);
/// assert_eq!(PowerState::from(None), PowerState::Unknown);
/// assert_eq!(PowerState::Unknown.to_string(), "unknown");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    On,
    Off,
    Unknown,
}

impl PowerState {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PowerState::On => Some(true),
            PowerState::Off => Some(false),
            PowerState::Unknown => None,
        }
    }
}

impl From<Option<bool>> for PowerState {
    fn from(state: Option<bool>) -> Self {
        match state {
            Some(true) => PowerState::On,
            Some(false) => PowerState::Off,
            None => PowerState::Unknown,
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            PowerState::On => "on",
            PowerState::Off => "off",
            PowerState::Unknown => "unknown",
        };
        f.write_str(text)
    }
}

/// A single device reachable at a fixed address.
///
/// Every method is one independent exchange through the owning [`Client`]
/// and uses the client's command timeout. Methods return `None` when the
/// device gave no usable answer.
///
/// # Example
///
/// ```
/// use wiz_roomctl::{Client, Device};
///
/// let device = Device::new(Client::default(), "192.168.1.100");
/// assert_eq!(device.address(), "192.168.1.100");
/// ```
#[derive(Debug, Clone)]
pub struct Device {
    client: Client,
    address: String,
}

impl Device {
    pub fn new(client: Client, address: &str) -> Self {
        Device {
            client,
            address: address.to_string(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Send any method with the client's command timeout.
    pub async fn send(&self, method: &str, params: &Value) -> Option<DeviceResponse> {
        self.client
            .send_command(
                &self.address,
                method,
                params,
                self.client.config().command_timeout(),
            )
            .await
    }

    /// Raw `getPilot` reply.
    pub async fn pilot(&self) -> Option<DeviceResponse> {
        self.send(Method::GetPilot.as_str(), &json!({})).await
    }

    pub async fn state(&self) -> Option<bool> {
        self.client
            .get_state(&self.address, self.client.config().command_timeout())
            .await
    }

    pub async fn power(&self) -> PowerState {
        PowerState::from(self.state().await)
    }

    pub async fn turn_on(&self) -> Option<DeviceResponse> {
        self.client.set_state(&self.address, true).await
    }

    pub async fn turn_off(&self) -> Option<DeviceResponse> {
        self.client.set_state(&self.address, false).await
    }

    /// Flip the power state.
    ///
    /// Does nothing and returns `None` when the current state is unknown.
    pub async fn toggle(&self) -> Option<DeviceResponse> {
        match self.state().await? {
            true => self.turn_off().await,
            false => self.turn_on().await,
        }
    }

    pub async fn reboot(&self) -> Option<DeviceResponse> {
        self.send(Method::Reboot.as_str(), &json!({})).await
    }

    pub async fn system_config(&self) -> Option<SystemConfig> {
        self.send(Method::GetSystemConfig.as_str(), &json!({}))
            .await
            .and_then(|response| response.system_config())
    }
}
