//! # wiz_roomctl
//!
//! An async Rust library for finding Wiz smart lights on the local network,
//! grouping them by room and switching them on and off over UDP.
//!
//! This crate is **runtime-agnostic**: it works with tokio, async-std or smol.
//!
//! ## Quick Start
//!
//! ```ignore
//! use wiz_roomctl::{Client, ClientConfig};
//!
//! async fn lights_on() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new(ClientConfig::default().with_broadcast_address("192.168.1.255"));
//!
//!     // Broadcast a query and collect the replies
//!     let devices = client.discover().await?;
//!
//!     // Switch every room on, one concurrent command per device
//!     for room in &client.group_by_room(&devices) {
//!         for outcome in client.set_room_state(room, true).await {
//!             if !outcome.answered() {
//!                 eprintln!("{} did not answer", outcome.address);
//!             }
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Behavior
//!
//! - **Discovery** ([`Client::discover`]) sends one `getSystemConfig`
//!   broadcast and collects replies until a single deadline passes. Silence
//!   is an empty result, malformed replies are skipped, and only a socket
//!   failure is an error.
//! - **Commands** ([`Client::send_command`]) are one request and at most one
//!   reply on a socket owned by that call. Every failure collapses to `None`.
//! - **State** ([`Client::get_state`]) is three-valued; see [`PowerState`].
//! - **Rooms** ([`group_by_room`]) partition devices by reported `roomId`,
//!   falling back to a configurable sentinel.
//! - **Polling** ([`Poller`]) refreshes rooms and states on an interval until
//!   cancelled.
//!
//! Protocol events go to an [`Observer`]; the default forwards them to the
//! `log` facade.
//!
//! ## Communication
//!
//! Devices listen on UDP port 38899 and speak plaintext JSON. Discovery relies
//! on broadcast, so devices must be on the same network segment.
//!
//! ## Feature Flags
//!
//! - `runtime-tokio` (default): Use the tokio async runtime
//! - `runtime-async-std`: Use the async-std runtime
//! - `runtime-smol`: Use the smol runtime

mod client;
pub mod codec;
mod command;
mod config;
mod device;
mod discovery;
mod errors;
mod history;
mod observer;
mod poller;
mod response;
mod room;
pub mod runtime;

#[cfg(test)]
mod test_support;

// Re-export public API
pub use client::Client;
pub use codec::{DecodeError, DecodeErrorKind, Method};
pub use command::CommandOutcome;
pub use config::ClientConfig;
pub use device::{Device, PowerState};
pub use discovery::{DiscoveredDevice, discover_devices};
pub use errors::Error;
pub use history::{EventHistory, HistoryEntry, HistorySummary};
pub use observer::{EventKind, LogObserver, NoopObserver, Observer};
pub use poller::{DeviceStatus, PollHandle, Poller, Refresh};
pub use response::{DeviceResponse, SystemConfig};
pub use room::{DeviceSummary, RoomGroup, Rooms, group_by_room, group_by_room_with};
