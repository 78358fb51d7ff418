//! Device reply types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A decoded reply from a device.
///
/// Replies are semi-structured: most carry a `result` object with
/// device-reported fields, but nothing is guaranteed. Every accessor
/// returns an `Option` or takes the fallback to use when the field is absent.
///
/// ```
/// use serde_json::json;
/// use wiz_roomctl::DeviceResponse;
///
/// let resp = DeviceResponse::from(json!({"result": {"roomId": 4, "state": true}}));
/// assert_eq!(resp.room_id("Unknown"), "4");
/// assert_eq!(resp.module_name("Unknown"), "Unknown");
/// assert_eq!(resp.state(), Some(true));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceResponse(Value);

impl DeviceResponse {
    /// The raw JSON reply.
    pub fn raw(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// The `result` object, if the reply has one.
    pub fn result(&self) -> Option<&serde_json::Map<String, Value>> {
        self.0.get("result").and_then(Value::as_object)
    }

    fn result_field(&self, key: &str) -> Option<&Value> {
        self.result().and_then(|r| r.get(key))
    }

    /// `result.roomId` as text, or `fallback` when missing or null.
    ///
    /// Devices report numeric room ids; strings are kept verbatim.
    pub fn room_id(&self, fallback: &str) -> String {
        match self.result_field("roomId") {
            None | Some(Value::Null) => fallback.to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    /// `result.moduleName`, or `fallback` when missing or not a string.
    pub fn module_name(&self, fallback: &str) -> String {
        self.result_field("moduleName")
            .and_then(Value::as_str)
            .unwrap_or(fallback)
            .to_string()
    }

    /// `result.state` when it is a boolean.
    pub fn state(&self) -> Option<bool> {
        self.result_field("state").and_then(Value::as_bool)
    }

    pub fn mac(&self) -> Option<&str> {
        self.result_field("mac").and_then(Value::as_str)
    }

    /// Whether the device acknowledged a command with `result.success = true`.
    pub fn is_success(&self) -> bool {
        self.result_field("success")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Typed view of a `getSystemConfig` result.
    pub fn system_config(&self) -> Option<SystemConfig> {
        let result = self.0.get("result")?;
        serde_json::from_value(result.clone()).ok()
    }
}

impl From<Value> for DeviceResponse {
    fn from(value: Value) -> Self {
        DeviceResponse(value)
    }
}

/// System configuration reported by a device in reply to `getSystemConfig`.
#[serde_with::skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SystemConfig {
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default)]
    pub home_id: Option<u64>,
    #[serde(default)]
    pub room_id: Option<u64>,
    #[serde(default)]
    pub module_name: Option<String>,
    #[serde(default)]
    pub fw_version: Option<String>,
    #[serde(default)]
    pub group_id: Option<u64>,
    #[serde(default)]
    pub type_id: Option<u32>,
}
