//! Protocol event hooks.
//!
//! The discovery engine and the command dispatcher never log directly;
//! they report what happens to an [`Observer`] handed to the [`crate::Client`].

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

/// Points in an exchange at which an [`Observer`] is notified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    /// A request datagram left the socket.
    RequestSent,
    /// A reply was received and decoded.
    ReplyReceived,
    /// A reply was received but could not be decoded.
    DecodeFailed,
    /// The wait for replies ran out.
    TimedOut,
    /// A socket operation failed.
    TransportFailed,
}

/// Receives protocol events.
///
/// Implementations must be cheap; they are called inline on the I/O path.
pub trait Observer: Send + Sync {
    fn on_event(&self, kind: EventKind, detail: &str);
}

/// Forwards events to the `log` facade. This is the default observer.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl Observer for LogObserver {
    fn on_event(&self, kind: EventKind, detail: &str) {
        match kind {
            EventKind::RequestSent | EventKind::ReplyReceived => debug!("{kind}: {detail}"),
            EventKind::TimedOut => info!("{kind}: {detail}"),
            EventKind::DecodeFailed | EventKind::TransportFailed => warn!("{kind}: {detail}"),
        }
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl Observer for NoopObserver {
    fn on_event(&self, _kind: EventKind, _detail: &str) {}
}
