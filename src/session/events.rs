//! Events pushed to the realtime client.

use serde_json::Value;
use strum::{Display, IntoStaticStr};
use tokio::sync::mpsc;

/// Outbound client event. The variant name is the wire event name.
#[derive(Debug, Clone, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum ClientEvent {
    /// The assistant started a message.
    MessageStreamCreated,
    /// Incremental text, order-significant.
    MessageStreamDelta(String),
    /// The assistant finished a message; carries its id.
    MessageStreamEnd(String),
    /// The run failed; carries a short reason.
    MessageStreamError(String),
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        self.into()
    }

    pub fn payload(&self) -> Value {
        match self {
            Self::MessageStreamCreated => Value::Null,
            Self::MessageStreamDelta(text)
            | Self::MessageStreamEnd(text)
            | Self::MessageStreamError(text) => Value::String(text.clone()),
        }
    }

    /// JSON text frame sent over the socket.
    pub fn to_frame(&self) -> String {
        let mut frame = serde_json::json!({ "event": self.name() });
        if let Self::MessageStreamCreated = self {
            return frame.to_string();
        }
        frame["data"] = self.payload();
        frame.to_string()
    }
}

/// Where a session writes its client events.
pub type EventSink = mpsc::UnboundedSender<ClientEvent>;
