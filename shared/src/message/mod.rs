//! WebSocket message types
//!
//! Inbound frames are JSON envelopes `{event, type, data, message}`;
//! which of `event`/`type` carries the routing tag varies by server
//! handler, so both are kept. Outbound frames are tagged by `type`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Heartbeat reply tag
pub const PONG_TAG: &str = "pong";

/// Inbound message envelope (server -> client)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Any other top-level fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ServerMessage {
    /// Decode a text frame. Fails for anything that is not a JSON object.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Candidate routing tags, `type` first
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.kind.as_deref().into_iter().chain(self.event.as_deref())
    }

    /// Heartbeat reply from the server
    pub fn is_pong(&self) -> bool {
        self.tags().any(|t| t == PONG_TAG)
    }

    /// Payload object.
    ///
    /// `data` when it is an object; a non-object `data` is wrapped under
    /// `"data"`; without `data` the remaining top-level fields are used.
    pub fn payload(&self) -> Map<String, Value> {
        match &self.data {
            Some(Value::Object(map)) => map.clone(),
            Some(Value::Null) | None => {
                let mut map = self.extra.clone();
                if let Some(message) = &self.message {
                    map.insert("message".into(), Value::String(message.clone()));
                }
                map
            }
            Some(other) => {
                let mut map = Map::new();
                map.insert("data".into(), other.clone());
                map
            }
        }
    }

    /// Serialize back to a text frame
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Outbound message (client -> server)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Heartbeat
    Ping {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
    },
    /// Join a broadcast channel
    Subscribe { channel: String },
    /// Leave a broadcast channel
    Unsubscribe { channel: String },
}

impl ClientMessage {
    pub fn ping() -> Self {
        Self::Ping {
            timestamp: Some(chrono::Utc::now().timestamp_millis()),
        }
    }

    pub fn subscribe(channel: impl Into<String>) -> Self {
        Self::Subscribe {
            channel: channel.into(),
        }
    }

    pub fn unsubscribe(channel: impl Into<String>) -> Self {
        Self::Unsubscribe {
            channel: channel.into(),
        }
    }

    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
