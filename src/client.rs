//! The protocol client shared by discovery, commands and room control.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use crate::config::ClientConfig;
use crate::errors::Error;
use crate::observer::{EventKind, LogObserver, Observer};

/// Entry point for every network operation.
///
/// A `Client` holds only read-only settings and an observer, so it is cheap
/// to clone into background tasks. It never owns a socket: each discovery
/// and each command binds its own and releases it when the call ends.
///
/// ```
/// use std::time::Duration;
/// use wiz_roomctl::{Client, ClientConfig};
///
/// let client = Client::new(
///     ClientConfig::default()
///         .with_broadcast_address("192.168.1.255")
///         .with_command_timeout(Duration::from_millis(500)),
/// );
/// assert_eq!(client.config().port(), 38899);
/// ```
#[derive(Clone)]
pub struct Client {
    config: ClientConfig,
    observer: Arc<dyn Observer>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        Client {
            config,
            observer: Arc::new(LogObserver),
        }
    }

    /// Replace the default [`LogObserver`].
    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn emit(&self, kind: EventKind, detail: impl AsRef<str>) {
        self.observer.on_event(kind, detail.as_ref());
    }

    /// Report a failed socket operation and wrap it as an [`Error`].
    pub(crate) fn socket_error(&self, action: &str, err: std::io::Error) -> Error {
        self.emit(EventKind::TransportFailed, format!("{action}: {err}"));
        Error::socket(action, err)
    }

    /// `host:port` for a device address, bracketing IPv6 literals.
    pub(crate) fn endpoint(&self, host: &str, port: u16) -> String {
        match host.parse::<IpAddr>() {
            Ok(ip) => SocketAddr::new(ip, port).to_string(),
            Err(_) => format!("{host}:{port}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::EventHistory;

    #[test]
    fn test_endpoint() {
        let client = Client::default();
        assert_eq!(client.endpoint("192.168.1.7", 38899), "192.168.1.7:38899");
        assert_eq!(client.endpoint("fe80::1", 38899), "[fe80::1]:38899");
        assert_eq!(client.endpoint("bulb.lan", 38899), "bulb.lan:38899");
    }

    #[test]
    fn test_emit_reaches_observer() {
        let history = Arc::new(EventHistory::new());
        let client = Client::default().with_observer(history.clone());
        client.emit(EventKind::TimedOut, "nothing heard");
        assert_eq!(history.count(EventKind::TimedOut), 1);
    }
}
