//! Grouping discovered devices by room, and batch control per room.

use std::net::IpAddr;

use serde::Serialize;

use crate::client::Client;
use crate::command::CommandOutcome;
use crate::config::ClientConfig;
use crate::device::PowerState;
use crate::discovery::DiscoveredDevice;
use crate::response::DeviceResponse;

/// One device as listed inside a [`RoomGroup`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSummary {
    pub address: IpAddr,
    pub module_name: String,
    pub response: DeviceResponse,
}

/// The devices that reported the same room id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomGroup {
    id: String,
    devices: Vec<DeviceSummary>,
}

impl RoomGroup {
    /// The reported room id, or the unknown-room sentinel.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn devices(&self) -> &[DeviceSummary] {
        &self.devices
    }

    pub fn addresses(&self) -> Vec<String> {
        self.devices.iter().map(|d| d.address.to_string()).collect()
    }
}

/// Room groups in order of first appearance.
///
/// ```
/// use serde_json::json;
/// use wiz_roomctl::{DeviceResponse, DiscoveredDevice, group_by_room};
///
/// let devices = vec![
///     DiscoveredDevice {
///         address: "10.0.0.2".parse().unwrap(),
///         response: DeviceResponse::from(json!({"result": {"roomId": 1, "moduleName": "A"}})),
///     },
///     DiscoveredDevice {
///         address: "10.0.0.3".parse().unwrap(),
///         response: DeviceResponse::from(json!({})),
///     },
/// ];
///
/// let rooms = group_by_room(&devices);
/// assert_eq!(rooms.ids(), ["1", "Unknown"]);
/// assert_eq!(rooms.get("Unknown").unwrap().devices()[0].module_name, "Unknown");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Rooms(Vec<RoomGroup>);

impl Rooms {
    pub fn get(&self, id: &str) -> Option<&RoomGroup> {
        self.0.iter().find(|room| room.id == id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.0.iter().map(|room| room.id.as_str()).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RoomGroup> {
        self.0.iter()
    }

    /// Number of rooms.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of devices across all rooms.
    pub fn device_count(&self) -> usize {
        self.0.iter().map(|room| room.devices.len()).sum()
    }
}

impl<'a> IntoIterator for &'a Rooms {
    type Item = &'a RoomGroup;
    type IntoIter = std::slice::Iter<'a, RoomGroup>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Group devices by `result.roomId`, using
/// [`ClientConfig::UNKNOWN_LABEL`] for devices that report no room or name.
pub fn group_by_room(devices: &[DiscoveredDevice]) -> Rooms {
    group_by_room_with(devices, ClientConfig::UNKNOWN_LABEL)
}

/// Group devices by `result.roomId`, using `sentinel` for missing values.
///
/// Never fails and never drops a device: each input lands in exactly one group.
pub fn group_by_room_with(devices: &[DiscoveredDevice], sentinel: &str) -> Rooms {
    let mut rooms: Vec<RoomGroup> = Vec::new();

    for device in devices {
        let id = device.response.room_id(sentinel);
        let summary = DeviceSummary {
            address: device.address,
            module_name: device.response.module_name(sentinel),
            response: device.response.clone(),
        };

        match rooms.iter_mut().find(|room| room.id == id) {
            Some(room) => room.devices.push(summary),
            None => rooms.push(RoomGroup {
                id,
                devices: vec![summary],
            }),
        }
    }

    Rooms(rooms)
}

impl Client {
    /// Group devices using this client's configured unknown label.
    pub fn group_by_room(&self, devices: &[DiscoveredDevice]) -> Rooms {
        group_by_room_with(devices, self.config().unknown_label())
    }

    /// Switch every device in a room concurrently.
    pub async fn set_room_state(&self, room: &RoomGroup, on: bool) -> Vec<CommandOutcome> {
        self.set_states(&room.addresses(), on).await
    }

    /// Query every device in a room concurrently.
    pub async fn get_room_states(&self, room: &RoomGroup) -> Vec<(String, PowerState)> {
        self.get_states(&room.addresses()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn device(ip: &str, response: Value) -> DiscoveredDevice {
        DiscoveredDevice {
            address: ip.parse().unwrap(),
            response: DeviceResponse::from(response),
        }
    }

    #[test]
    fn test_two_devices_same_room() {
        let devices = [
            device("192.168.1.10", json!({"result": {"roomId": "1", "moduleName": "A"}})),
            device("192.168.1.11", json!({"result": {"roomId": "1", "moduleName": "B"}})),
        ];

        let rooms = group_by_room(&devices);

        assert_eq!(rooms.ids(), ["1"]);
        let room = rooms.get("1").unwrap();
        assert_eq!(room.addresses(), ["192.168.1.10", "192.168.1.11"]);
        assert_eq!(room.devices()[0].module_name, "A");
        assert_eq!(room.devices()[1].module_name, "B");
        assert_eq!(room.devices()[1].response, devices[1].response);
    }

    #[test]
    fn test_missing_room_uses_sentinel() {
        let devices = [
            device("10.0.0.1", json!({})),
            device("10.0.0.2", json!({"result": null})),
            device("10.0.0.3", json!({"result": {"roomId": null}})),
            device("10.0.0.4", json!({"result": {"moduleName": "X"}})),
            device("10.0.0.5", json!("garbage")),
        ];

        let rooms = group_by_room(&devices);

        assert_eq!(rooms.ids(), ["Unknown"]);
        assert_eq!(rooms.device_count(), 5);
        assert_eq!(rooms.get("Unknown").unwrap().devices()[3].module_name, "X");
    }

    #[test]
    fn test_grouping_is_lossless_and_ordered() {
        let devices: Vec<DiscoveredDevice> = (0..20)
            .map(|i| {
                let response = match i % 4 {
                    0 => json!({"result": {"roomId": 100}}),
                    1 => json!({"result": {"roomId": 200, "moduleName": "M"}}),
                    2 => json!({"result": {}}),
                    _ => json!({"result": {"roomId": 100}}),
                };
                device(&format!("10.0.1.{i}"), response)
            })
            .collect();

        let rooms = group_by_room(&devices);

        assert_eq!(rooms.device_count(), devices.len());
        assert_eq!(rooms.ids(), ["100", "200", "Unknown"]);
        assert_eq!(rooms.get("100").unwrap().devices().len(), 10);
        assert_eq!(rooms.get("100").unwrap().devices()[1].address.to_string(), "10.0.1.3");
    }

    #[test]
    fn test_custom_sentinel() {
        let devices = [device("10.0.0.1", json!({}))];
        let client = Client::new(ClientConfig::default().with_unknown_label("Ukendt"));

        let rooms = client.group_by_room(&devices);

        assert_eq!(rooms.ids(), ["Ukendt"]);
        assert_eq!(rooms.get("Ukendt").unwrap().devices()[0].module_name, "Ukendt");
    }

    #[test]
    fn test_empty_input() {
        let rooms = group_by_room(&[]);
        assert!(rooms.is_empty());
        assert_eq!(rooms.device_count(), 0);
    }

    #[test]
    fn test_serialize_summary() {
        let rooms = group_by_room(&[device("10.0.0.1", json!({"result": {"roomId": 3}}))]);
        let value = serde_json::to_value(&rooms).unwrap();
        assert_eq!(value[0]["id"], json!("3"));
        assert_eq!(value[0]["devices"][0]["moduleName"], json!("Unknown"));
        assert_eq!(value[0]["devices"][0]["address"], json!("10.0.0.1"));
    }
}

#[cfg(all(test, feature = "runtime-tokio"))]
mod network_tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::test_support::{FakeDevice, Reply};

    #[tokio::test]
    async fn test_discover_then_switch_room_on() {
        // One responder answers the broadcast from two addresses; each
        // address also has its own command listener on the same port.
        let first = FakeDevice::start("127.0.0.1:0", |request| match request["method"].as_str() {
            Some("getSystemConfig") => vec![
                Reply::json(json!({"result": {"roomId": "1", "moduleName": "A"}})),
                Reply::json(json!({"result": {"roomId": "1", "moduleName": "B"}}))
                    .from_ip("127.0.0.2"),
            ],
            _ => vec![Reply::json(json!({"result": {"success": true}}))],
        });
        let port = first.port();
        let second = FakeDevice::replying(
            &format!("127.0.0.2:{port}"),
            json!({"result": {"success": true}}),
        );
        let client = Client::new(
            ClientConfig::default()
                .with_broadcast_address("127.0.0.1")
                .with_port(port)
                .with_discovery_timeout(Duration::from_millis(300))
                .with_command_timeout(Duration::from_millis(300)),
        );

        let devices = client.discover().await.unwrap();
        let rooms = client.group_by_room(&devices);

        assert_eq!(rooms.ids(), ["1"]);
        let room = rooms.get("1").unwrap();
        assert_eq!(room.addresses(), ["127.0.0.1", "127.0.0.2"]);

        let outcomes = client.set_room_state(room, true).await;
        assert!(outcomes.iter().all(CommandOutcome::answered));
        assert_eq!(
            second.requests(),
            [json!({"method": "setState", "params": {"state": true}})]
        );
    }
}
