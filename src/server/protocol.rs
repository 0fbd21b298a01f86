//! Realtime wire protocol.
//!
//! Frames are JSON text messages `{"event": "<name>", "data": <payload>}`.
//! A text frame that is not such an object is taken as a plain chat message.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{RelayError, Result};

pub const MESSAGE_EVENT: &str = "message";

/// A decoded client frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// Chat text for the session.
    Message(String),
    /// Any other event name; ignored by the relay.
    Other(String),
}

#[derive(Deserialize)]
struct RawFrame {
    event: String,
    #[serde(default)]
    data: Value,
}

impl InboundFrame {
    pub fn parse(text: &str) -> Result<Self> {
        if !text.trim_start().starts_with('{') {
            return Ok(Self::Message(text.to_string()));
        }
        let raw = match serde_json::from_str::<RawFrame>(text) {
            Ok(raw) => raw,
            Err(_) => return Ok(Self::Message(text.to_string())),
        };
        if raw.event != MESSAGE_EVENT {
            return Ok(Self::Other(raw.event));
        }
        match raw.data {
            Value::String(body) => Ok(Self::Message(body)),
            other => Err(RelayError::InvalidArgument(format!(
                "message data must be a string, got {other}"
            ))),
        }
    }
}
