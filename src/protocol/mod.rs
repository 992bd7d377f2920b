// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wire protocol for communicating with Pit Boss appliances.
//!
//! Appliances are driven over a WebSocket session. Outbound messages are
//! JSON envelopes carrying a framed hex command; inbound messages are
//! either JSON (command acknowledgements and status reports) or raw binary
//! frames the controller occasionally emits. Binary frames are not
//! interpreted; they are retained for diagnostics.

pub mod command;
pub mod websocket;

pub use command::{
    Command, SetGrillTemperature, SetLight, SetPrimer, SetProbeTemperature, StatusRequest, TurnOff,
};
pub use websocket::WebSocketConnection;

use serde::{Deserialize, Serialize, Serializer};

use crate::error::ParseError;
use crate::state::RawStatus;

/// A raw binary frame received from the appliance.
///
/// Frames are opaque controller dumps. They are kept verbatim so
/// diagnostics can export them; the binary-tolerant encoder in
/// [`crate::encoding`] renders them as base64 text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RawFrame(Vec<u8>);

impl RawFrame {
    /// Creates a frame from raw bytes.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Returns the frame bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the frame length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the frame is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the frame as an uppercase hex string.
    #[must_use]
    pub fn hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02X}")).collect()
    }
}

impl Serialize for RawFrame {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0)
    }
}

/// Outbound command envelope.
#[derive(Debug, Clone, Serialize)]
pub struct CommandEnvelope {
    /// Unique message id, echoed back in the acknowledgement.
    pub id: String,
    /// Framed hex command payload.
    pub data: String,
    /// Appliance password, omitted when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
}

/// A message received from the appliance.
#[derive(Debug, Clone)]
pub enum Inbound {
    /// Acknowledgement of a previously sent command.
    Ack {
        /// Echo of the outbound message id.
        id: String,
        /// Controller verdict, when present.
        result: Option<serde_json::Value>,
    },
    /// Status report (solicited or pushed).
    Status(RawStatus),
    /// Opaque binary frame.
    Frame(RawFrame),
}

#[derive(Debug, Deserialize)]
struct StatusMessage {
    status: RawStatus,
}

#[derive(Debug, Deserialize)]
struct AckMessage {
    id: String,
    #[serde(default)]
    result: Option<serde_json::Value>,
}

/// Parses an inbound text message.
///
/// # Errors
///
/// Returns [`ParseError::UnexpectedFormat`] if the message is neither a
/// status report nor an acknowledgement.
pub fn parse_inbound(text: &str) -> Result<Inbound, ParseError> {
    if let Ok(message) = serde_json::from_str::<StatusMessage>(text) {
        return Ok(Inbound::Status(message.status));
    }
    if let Ok(message) = serde_json::from_str::<AckMessage>(text) {
        return Ok(Inbound::Ack {
            id: message.id,
            result: message.result,
        });
    }
    Err(ParseError::UnexpectedFormat(text.to_string()))
}
