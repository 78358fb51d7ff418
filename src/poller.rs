//! Periodic refresh of rooms and power states.

use std::collections::HashSet;
use std::time::Duration;

use futures::FutureExt;
use futures::channel::oneshot;
use futures::future::{Either, join_all, select};
use log::debug;
use serde::Serialize;

use crate::client::Client;
use crate::device::PowerState;
use crate::errors::Error;
use crate::room::Rooms;
use crate::runtime::{self, JoinHandle};

type Result<T> = std::result::Result<T, Error>;

/// A device seen in a refresh, with its power state at that time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceStatus {
    pub room_id: String,
    pub address: String,
    pub module_name: String,
    pub power: PowerState,
}

/// The outcome of one refresh cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Refresh {
    /// Online devices grouped by room.
    pub rooms: Rooms,
    /// One entry per online device, in room order.
    pub statuses: Vec<DeviceStatus>,
    /// Known addresses that did not answer the discovery of this cycle.
    pub offline: Vec<String>,
}

impl Client {
    /// Run one refresh cycle.
    ///
    /// Discovers once, groups by room, queries every online device's state
    /// concurrently, and lists which `known` addresses were not seen. The
    /// single discovery is the only source of truth for what is online.
    pub async fn refresh<S: AsRef<str>>(&self, known: &[S]) -> Result<Refresh> {
        let devices = self.discover().await?;
        let rooms = self.group_by_room(&devices);

        let online: HashSet<String> = devices.iter().map(|d| d.address.to_string()).collect();
        let mut seen = HashSet::new();
        let offline = known
            .iter()
            .map(|address| address.as_ref())
            .filter(|address| !online.contains(*address) && seen.insert(*address))
            .map(String::from)
            .collect();

        let timeout = self.config().command_timeout();
        let queries = rooms.iter().flat_map(|room| {
            room.devices().iter().map(move |device| async move {
                let address = device.address.to_string();
                let power = PowerState::from(self.get_state(&address, timeout).await);
                DeviceStatus {
                    room_id: room.id().to_string(),
                    address,
                    module_name: device.module_name.clone(),
                    power,
                }
            })
        });
        let statuses = join_all(queries).await;

        Ok(Refresh {
            rooms,
            statuses,
            offline,
        })
    }
}

/// Handle to a running [`Poller`].
///
/// Cancelling, or dropping the handle, stops the loop. A cycle in flight is
/// dropped at its next await point, which closes its sockets.
pub struct PollHandle {
    cancel: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            // Err only means the loop already exited.
            let _ = cancel.send(());
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_none()
    }

    /// Cancel and wait for the background task to exit.
    pub async fn stopped(mut self) {
        self.cancel();
        if let Some(task) = self.task.take() {
            task.await;
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Background refresh loop.
///
/// Replaces a thread polling a shared stop flag: the loop waits on either the
/// next tick or a one-shot cancellation signal, whichever comes first.
pub struct Poller;

impl Poller {
    /// Refresh immediately, then every `interval`, passing each result to
    /// `on_refresh`. A failed refresh is reported and polling continues.
    ///
    /// ```ignore
    /// let mut handle = Poller::start(client, known, Duration::from_secs(5), |refresh| {
    ///     if let Ok(refresh) = refresh {
    ///         println!("{} online, {} offline", refresh.statuses.len(), refresh.offline.len());
    ///     }
    /// });
    /// // ...
    /// handle.cancel();
    /// ```
    pub fn start<F>(client: Client, known: Vec<String>, interval: Duration, on_refresh: F) -> PollHandle
    where
        F: Fn(Result<Refresh>) + Send + 'static,
    {
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();

        let task = runtime::spawn(async move {
            let mut cancelled = cancel_rx.fuse();
            loop {
                let cycle = Box::pin(client.refresh(known.as_slice()));
                match select(cycle, &mut cancelled).await {
                    Either::Left((result, _)) => on_refresh(result),
                    Either::Right(_) => break,
                }

                let tick = Box::pin(runtime::sleep(interval));
                if let Either::Right(_) = select(tick, &mut cancelled).await {
                    break;
                }
            }
            debug!("poller stopped");
        });

        PollHandle {
            cancel: Some(cancel_tx),
            task: Some(task),
        }
    }
}
