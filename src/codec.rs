//! JSON wire codec for the Wiz UDP protocol.

use std::net::SocketAddr;

use serde::Serialize;
use serde_json::Value;
use strum_macros::{Display, EnumIter, IntoStaticStr};

use crate::errors::Error;
use crate::response::DeviceResponse;

type Result<T> = std::result::Result<T, Error>;

/// Methods this crate sends on its own.
///
/// [`crate::Client::send_command`] accepts any method string; these are the
/// ones used by discovery, state queries and power control.
///
/// ```
/// use wiz_roomctl::Method;
///
/// assert_eq!(Method::GetSystemConfig.to_string(), "getSystemConfig");
/// assert_eq!(Method::SetState.as_str(), "setState");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "camelCase")]
pub enum Method {
    GetSystemConfig,
    GetPilot,
    SetState,
    Reboot,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// A `{method, params}` request as it goes on the wire.
#[derive(Debug, Clone, Serialize)]
pub struct Request<'a> {
    pub method: &'a str,
    pub params: &'a Value,
}

/// Serialize a request to UTF-8 JSON bytes.
///
/// A `null` params value is sent as an empty object, since devices expect
/// `params` to always be present.
///
/// ```
/// use serde_json::json;
/// use wiz_roomctl::codec::encode;
///
/// let bytes = encode("setState", &json!({"state": true})).unwrap();
/// assert_eq!(bytes, br#"{"method":"setState","params":{"state":true}}"#);
/// ```
pub fn encode(method: &str, params: &Value) -> Result<Vec<u8>> {
    let empty = Value::Object(Default::default());
    let params = if params.is_null() { &empty } else { params };
    serde_json::to_vec(&Request { method, params }).map_err(Error::JsonDump)
}

/// Parse a received datagram as a device response.
///
/// No schema is enforced; any JSON value is accepted.
pub fn decode(bytes: &[u8]) -> std::result::Result<DeviceResponse, DecodeError> {
    let text = std::str::from_utf8(bytes).map_err(|e| DecodeError::new(bytes, e.into()))?;
    let value: Value =
        serde_json::from_str(text).map_err(|e| DecodeError::new(bytes, e.into()))?;
    Ok(DeviceResponse::from(value))
}

/// Why a datagram could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum DecodeErrorKind {
    #[error("utf8 decoding error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
}

/// A malformed reply, kept together with the bytes that caused it.
#[derive(Debug, thiserror::Error)]
#[error("malformed reply from {} ({} bytes): {kind}", display_source(.source_addr), .bytes.len())]
pub struct DecodeError {
    bytes: Vec<u8>,
    source_addr: Option<SocketAddr>,
    kind: DecodeErrorKind,
}

impl DecodeError {
    fn new(bytes: &[u8], kind: DecodeErrorKind) -> Self {
        DecodeError {
            bytes: bytes.to_vec(),
            source_addr: None,
            kind,
        }
    }

    /// Attach the address the datagram came from.
    pub fn with_source(mut self, addr: SocketAddr) -> Self {
        self.source_addr = Some(addr);
        self
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn source_addr(&self) -> Option<SocketAddr> {
        self.source_addr
    }

    pub fn kind(&self) -> &DecodeErrorKind {
        &self.kind
    }
}

fn display_source(addr: &Option<SocketAddr>) -> String {
    addr.map_or_else(|| "unknown source".to_string(), |a| a.to_string())
}
