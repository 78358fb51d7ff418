//! Unicast command dispatch.

use std::io;
use std::net::IpAddr;
use std::time::Duration;

use futures::future::join_all;
use log::debug;
use serde::Serialize;
use serde_json::{Value, json};

use crate::client::Client;
use crate::codec::{self, Method};
use crate::device::PowerState;
use crate::errors::Error;
use crate::observer::EventKind;
use crate::response::DeviceResponse;
use crate::runtime::{self, AsyncUdpSocket, Instant, UdpSocket};

/// The result of one command in a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandOutcome {
    pub address: String,
    /// `None` when the device did not answer usefully
    pub response: Option<DeviceResponse>,
}

impl CommandOutcome {
    pub fn answered(&self) -> bool {
        self.response.is_some()
    }
}

/// Errors an unconnected socket can still report for a peer that is not
/// listening (Windows surfaces them as `ConnectionReset`).
fn is_unreachable(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionRefused | io::ErrorKind::ConnectionReset
    )
}

impl Client {
    /// Send one request to one device and wait for a single reply.
    ///
    /// Every failure (timeout, malformed reply, socket error) yields `None`;
    /// the cause is only visible to the observer. Each call binds its own
    /// socket, so concurrent calls never share transport state.
    ///
    /// The wait always runs to `timeout` unless a reply from `address`
    /// arrives first. Datagrams from other hosts and "port unreachable"
    /// notices are skipped without ending the wait.
    pub async fn send_command(
        &self,
        address: &str,
        method: &str,
        params: &Value,
        timeout: Duration,
    ) -> Option<DeviceResponse> {
        // Socket failures are reported by socket_error before they get here.
        self.exchange(address, method, params, timeout)
            .await
            .unwrap_or(None)
    }

    async fn exchange(
        &self,
        address: &str,
        method: &str,
        params: &Value,
        timeout: Duration,
    ) -> Result<Option<DeviceResponse>, Error> {
        let msg = codec::encode(method, params)?;
        let target = self.endpoint(address, self.config().port());

        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|e| self.socket_error("bind", e))?;

        socket
            .send_to(&msg, &target)
            .await
            .map_err(|e| self.socket_error("send_to", e))?;
        self.emit(EventKind::RequestSent, format!("{method} to {target}"));

        // Only a literal IP can be matched against reply sources.
        let expected = address.parse::<IpAddr>().ok();
        let start = Instant::now();
        let mut buffer = vec![0u8; self.config().buffer_size()];

        let (size, addr) = loop {
            let Some(left) = start.remaining(timeout) else {
                self.emit(
                    EventKind::TimedOut,
                    format!("no reply to {method} from {target} within {timeout:?}"),
                );
                return Ok(None);
            };
            match runtime::timeout(left, socket.recv_from(&mut buffer)).await {
                Ok(Ok((size, addr))) if expected.is_none_or(|ip| ip == addr.ip()) => {
                    break (size, addr);
                }
                Ok(Ok((_, addr))) => {
                    debug!("ignoring datagram from {addr} while waiting on {target}");
                }
                // An ICMP unreachable from an earlier send; the device may still answer.
                Ok(Err(e)) if is_unreachable(&e) => {
                    debug!("{target} reported unreachable: {e}");
                }
                Ok(Err(e)) => return Err(self.socket_error("recv_from", e)),
                Err(_) => continue,
            }
        };

        match codec::decode(&buffer[..size]) {
            Ok(response) => {
                self.emit(EventKind::ReplyReceived, format!("{method} reply from {addr}"));
                Ok(Some(response))
            }
            Err(e) => {
                self.emit(EventKind::DecodeFailed, e.with_source(addr).to_string());
                Ok(None)
            }
        }
    }

    /// Query the power state of a device with `getPilot`.
    ///
    /// `None` means unknown: either no usable reply or a reply without a
    /// boolean `result.state`. It must not be read as "off".
    pub async fn get_state(&self, address: &str, timeout: Duration) -> Option<bool> {
        self.send_command(address, Method::GetPilot.as_str(), &json!({}), timeout)
            .await
            .and_then(|response| response.state())
    }

    /// Switch a device on or off with `setState`.
    pub async fn set_state(&self, address: &str, on: bool) -> Option<DeviceResponse> {
        self.send_command(
            address,
            Method::SetState.as_str(),
            &json!({"state": on}),
            self.config().command_timeout(),
        )
        .await
    }

    /// Switch many devices concurrently.
    ///
    /// Returns one outcome per address, in input order. A device that does
    /// not answer never delays or cancels the others, so the whole batch takes
    /// about one command timeout.
    pub async fn set_states<S: AsRef<str>>(&self, addresses: &[S], on: bool) -> Vec<CommandOutcome> {
        join_all(addresses.iter().map(|address| async move {
            let address = address.as_ref();
            CommandOutcome {
                address: address.to_string(),
                response: self.set_state(address, on).await,
            }
        }))
        .await
    }

    /// Query many devices concurrently, one [`PowerState`] per address.
    pub async fn get_states<S: AsRef<str>>(&self, addresses: &[S]) -> Vec<(String, PowerState)> {
        let timeout = self.config().command_timeout();
        join_all(addresses.iter().map(|address| async move {
            let address = address.as_ref();
            let state = PowerState::from(self.get_state(address, timeout).await);
            (address.to_string(), state)
        }))
        .await
    }
}

#[cfg(all(test, feature = "runtime-tokio"))]
mod tests {
    use std::sync::Arc;
    use std::time::Instant;

    use super::*;
    use crate::config::ClientConfig;
    use crate::history::EventHistory;
    use crate::observer::NoopObserver;
    use crate::test_support::{FakeDevice, Reply};

    fn client_for(port: u16) -> (Client, Arc<EventHistory>) {
        let history = Arc::new(EventHistory::new());
        let config = ClientConfig::default()
            .with_port(port)
            .with_command_timeout(Duration::from_millis(300));
        (Client::new(config).with_observer(history.clone()), history)
    }

    #[tokio::test]
    async fn test_send_command_returns_reply_unmodified() {
        let reply = json!({"method": "setState", "env": "pro", "result": {"success": true}});
        let device = FakeDevice::replying("127.0.0.1:0", reply.clone());
        let (client, history) = client_for(device.port());

        let response = client
            .send_command(
                "127.0.0.1",
                "setState",
                &json!({"state": true}),
                Duration::from_secs(2),
            )
            .await
            .unwrap();

        assert_eq!(response.raw(), &reply);
        assert_eq!(
            device.requests(),
            [json!({"method": "setState", "params": {"state": true}})]
        );
        assert_eq!(history.count(EventKind::ReplyReceived), 1);
    }

    #[tokio::test]
    async fn test_send_command_times_out_to_none() {
        let device = FakeDevice::silent("127.0.0.1:0");
        let (client, history) = client_for(device.port());
        let timeout = Duration::from_millis(200);

        let start = Instant::now();
        let response = client
            .send_command("127.0.0.1", "getPilot", &json!({}), timeout)
            .await;

        assert!(response.is_none());
        assert!(start.elapsed() >= timeout);
        assert_eq!(history.count(EventKind::TimedOut), 1);
    }

    #[tokio::test]
    async fn test_send_command_without_listener_waits_out_timeout() {
        let port = {
            let released = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
            released.local_addr().unwrap().port()
        };
        let (client, history) = client_for(port);
        let timeout = Duration::from_millis(200);

        let start = Instant::now();
        let response = client
            .send_command("127.0.0.1", "getPilot", &json!({}), timeout)
            .await;

        assert!(response.is_none());
        assert!(
            start.elapsed() >= timeout,
            "returned after {:?}",
            start.elapsed()
        );
        assert_eq!(history.count(EventKind::TimedOut), 1);
        assert_eq!(history.count(EventKind::TransportFailed), 0);
    }

    #[tokio::test]
    async fn test_send_command_ignores_replies_from_other_hosts() {
        let device = FakeDevice::start("127.0.0.1:0", |_| {
            vec![Reply::json(json!({"result": {"state": true}})).from_ip("127.0.0.9")]
        });
        let (client, history) = client_for(device.port());
        let timeout = Duration::from_millis(200);

        let start = Instant::now();
        let response = client
            .send_command("127.0.0.1", "getPilot", &json!({}), timeout)
            .await;

        assert!(response.is_none());
        assert!(start.elapsed() >= timeout);
        assert_eq!(history.count(EventKind::ReplyReceived), 0);
        assert_eq!(history.count(EventKind::TimedOut), 1);
    }

    #[tokio::test]
    async fn test_send_command_malformed_reply_is_none() {
        let device = FakeDevice::start("127.0.0.1:0", |_| vec![Reply::raw(b"<html>")]);
        let (client, history) = client_for(device.port());

        let response = client
            .send_command("127.0.0.1", "getPilot", &json!({}), Duration::from_secs(1))
            .await;

        assert!(response.is_none());
        assert_eq!(history.count(EventKind::DecodeFailed), 1);
    }

    #[tokio::test]
    async fn test_send_command_transport_error_is_none() {
        let (client, history) = client_for(38899);

        let response = client
            .send_command(
                "no-such-host.invalid",
                "getPilot",
                &json!({}),
                Duration::from_millis(200),
            )
            .await;

        assert!(response.is_none());
        assert_eq!(history.count(EventKind::TransportFailed), 1);
    }

    #[tokio::test]
    async fn test_get_state_three_valued() {
        let on = FakeDevice::replying("127.0.0.1:0", json!({"result": {"state": true}}));
        let port = on.port();
        let off = FakeDevice::replying(
            &format!("127.0.0.2:{port}"),
            json!({"result": {"state": false}}),
        );
        let stateless = FakeDevice::replying(&format!("127.0.0.3:{port}"), json!({"result": {}}));
        let no_result = FakeDevice::replying(&format!("127.0.0.4:{port}"), json!({"env": "pro"}));
        let (client, _) = client_for(port);
        let timeout = Duration::from_millis(300);

        assert_eq!(client.get_state("127.0.0.1", timeout).await, Some(true));
        assert_eq!(client.get_state("127.0.0.2", timeout).await, Some(false));
        assert_eq!(client.get_state("127.0.0.3", timeout).await, None);
        assert_eq!(client.get_state("127.0.0.4", timeout).await, None);
        assert_eq!(
            on.requests(),
            [json!({"method": "getPilot", "params": {}})]
        );
        drop((off, stateless, no_result));
    }

    #[tokio::test]
    async fn test_set_states_isolates_failures() {
        let live = FakeDevice::replying("127.0.0.1:0", json!({"result": {"success": true}}));
        let port = live.port();
        let silent = FakeDevice::silent(&format!("127.0.0.2:{port}"));
        let (client, _) = client_for(port);

        let start = Instant::now();
        let outcomes = client
            .set_states(&["127.0.0.2", "127.0.0.1"], false)
            .await;

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].address, "127.0.0.2");
        assert!(!outcomes[0].answered());
        assert_eq!(outcomes[1].address, "127.0.0.1");
        assert!(outcomes[1].response.as_ref().unwrap().is_success());
        // Concurrent: about one timeout, not one per device.
        assert!(start.elapsed() < Duration::from_millis(600));
        assert_eq!(
            live.requests(),
            [json!({"method": "setState", "params": {"state": false}})]
        );
        drop(silent);
    }

    #[tokio::test]
    async fn test_get_states() {
        let on = FakeDevice::replying("127.0.0.1:0", json!({"result": {"state": true}}));
        let (client, _) = client_for(on.port());

        let states = client.get_states(&["127.0.0.1".to_string()]).await;
        assert_eq!(states, [("127.0.0.1".to_string(), PowerState::On)]);
    }

    #[tokio::test]
    async fn test_silent_observer_does_not_change_outcome() {
        let device = FakeDevice::replying("127.0.0.1:0", json!({"result": {"state": false}}));
        let config = ClientConfig::default().with_port(device.port());
        let client = Client::new(config).with_observer(Arc::new(NoopObserver));

        let state = client
            .get_state("127.0.0.1", Duration::from_millis(300))
            .await;
        assert_eq!(state, Some(false));
    }
}
