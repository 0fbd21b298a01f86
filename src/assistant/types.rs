//! Thread, message and tool-call shapes exchanged with the assistant service.

use serde::{Deserialize, Serialize};

/// Message author role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
}

/// One part of a message body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
}

/// A message appended to a thread.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ThreadMessage {
    pub role: Role,
    pub content: Vec<ContentPart>,
}

impl ThreadMessage {
    /// Create a single-part user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentPart::Text { text: text.into() }],
        }
    }

    /// Concatenated text of all parts.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .map(|part| match part {
                ContentPart::Text { text } => text.as_str(),
            })
            .collect()
    }
}

/// Identifies the run a tool-output submission belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunRef {
    pub thread_id: String,
    pub run_id: String,
}

/// A tool invocation requested by a paused run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// JSON-encoded argument object, as sent by the service.
    pub arguments: String,
}

/// Result of one tool call, matched back by `tool_call_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolOutput {
    pub tool_call_id: String,
    pub output: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_serializes_as_text_part() {
        let msg = ThreadMessage::user("hello");
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            serde_json::json!({
                "role": "user",
                "content": [{ "type": "text", "text": "hello" }],
            })
        );
        assert_eq!(msg.text(), "hello");
    }
}
