//! Device discovery via UDP broadcast.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;

use serde::Serialize;
use serde_json::json;

use crate::client::Client;
use crate::codec::{self, Method};
use crate::config::ClientConfig;
use crate::device::Device;
use crate::errors::Error;
use crate::observer::EventKind;
use crate::response::DeviceResponse;
use crate::runtime::{self, AsyncUdpSocket, Instant, UdpSocket};

type Result<T> = std::result::Result<T, Error>;

/// A device that answered a discovery broadcast.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveredDevice {
    /// Source address of the reply
    pub address: IpAddr,
    /// The last reply received from that address
    pub response: DeviceResponse,
}

impl DiscoveredDevice {
    /// Turn this discovery result into a [`Device`] handle for further commands.
    ///
    /// ```ignore
    /// let client = Client::default();
    /// for found in client.discover().await? {
    ///     let device = found.into_device(&client);
    ///     device.turn_on().await;
    /// }
    /// ```
    pub fn into_device(self, client: &Client) -> Device {
        Device::new(client.clone(), &self.address.to_string())
    }
}

/// Replies gathered during one collection window, one per source address.
///
/// A later reply from an address replaces the earlier one in place, so the
/// result keeps the order in which addresses were first heard.
#[derive(Default)]
struct Collected {
    devices: Vec<DiscoveredDevice>,
    index: HashMap<IpAddr, usize>,
}

impl Collected {
    fn insert(&mut self, address: IpAddr, response: DeviceResponse) {
        match self.index.get(&address) {
            Some(&i) => self.devices[i].response = response,
            None => {
                self.index.insert(address, self.devices.len());
                self.devices.push(DiscoveredDevice { address, response });
            }
        }
    }
}

impl Client {
    /// Broadcast a discovery query using the configured address, port and timeout.
    pub async fn discover(&self) -> Result<Vec<DiscoveredDevice>> {
        let config = self.config();
        self.discover_on(
            config.broadcast_address(),
            config.port(),
            config.discovery_timeout(),
        )
        .await
    }

    /// Broadcast a `getSystemConfig` query and collect replies until `timeout`.
    ///
    /// The window starts once the broadcast has been sent and is not extended
    /// by incoming replies. Running out of time is the normal way this call
    /// ends, and zero replies is a valid empty result. Malformed replies are
    /// reported to the observer and skipped.
    ///
    /// Any socket error other than the timeout aborts the call and drops what
    /// was collected so far.
    pub async fn discover_on(
        &self,
        broadcast_address: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<Vec<DiscoveredDevice>> {
        let msg = codec::encode(Method::GetSystemConfig.as_str(), &json!({}))?;
        let target = self.endpoint(broadcast_address, port);

        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|e| self.socket_error("bind", e))?;

        socket
            .set_broadcast(true)
            .map_err(|e| self.socket_error("set_broadcast", e))?;

        socket
            .send_to(&msg, &target)
            .await
            .map_err(|e| self.socket_error("send_to", e))?;
        self.emit(
            EventKind::RequestSent,
            format!("{} broadcast to {target}", Method::GetSystemConfig),
        );

        let start = Instant::now();
        let mut collected = Collected::default();
        let mut buffer = vec![0u8; self.config().buffer_size()];

        while let Some(left) = start.remaining(timeout) {
            let (size, addr) = match runtime::timeout(left, socket.recv_from(&mut buffer)).await {
                Ok(Ok(received)) => received,
                Ok(Err(e)) => return Err(self.socket_error("recv_from", e)),
                Err(_) => break,
            };

            match codec::decode(&buffer[..size]) {
                Ok(response) => {
                    self.emit(EventKind::ReplyReceived, format!("discovery reply from {addr}"));
                    collected.insert(addr.ip(), response);
                }
                Err(e) => self.emit(EventKind::DecodeFailed, e.with_source(addr).to_string()),
            }
        }

        self.emit(
            EventKind::TimedOut,
            format!(
                "discovery window of {timeout:?} closed with {} device(s)",
                collected.devices.len()
            ),
        );
        Ok(collected.devices)
    }
}

/// Discover devices with the default broadcast address and port.
///
/// # Examples
///
/// ```ignore
/// use std::time::Duration;
/// use wiz_roomctl::discover_devices;
///
/// let devices = discover_devices(Duration::from_secs(5)).await?;
/// println!("Found {} devices", devices.len());
/// for device in devices {
///     println!("  {} - {}", device.address, device.response.module_name("Unknown"));
/// }
/// ```
pub async fn discover_devices(timeout: Duration) -> Result<Vec<DiscoveredDevice>> {
    Client::new(ClientConfig::default())
        .discover_on(ClientConfig::BROADCAST_ADDRESS, ClientConfig::PORT, timeout)
        .await
}
