//! Run lifecycle events and their decoding from the service's SSE stream.

use serde::Deserialize;

use super::types::{RunRef, ToolCall};
use crate::error::Result;
use crate::http::SseFrame;

/// Normalised event emitted while a run advances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    /// The assistant started writing a message.
    Started { message_id: String },
    /// Incremental text, in arrival order.
    TextDelta { value: String },
    /// The assistant finished a message.
    TextDone { message_id: String, text: String },
    /// The run paused until tool outputs are submitted.
    RequiresAction { run: RunRef, tool_calls: Vec<ToolCall> },
    Completed { run_id: String },
    Failed { reason: String },
}

impl RunEvent {
    /// Whether no further events follow for this run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::RequiresAction { .. } | Self::Completed { .. } | Self::Failed { .. }
        )
    }
}

/// Outcome of decoding one SSE frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Events(Vec<RunEvent>),
    /// The service signalled the end of the stream.
    Done,
}

/// Map a raw SSE frame to zero or more [`RunEvent`]s.
pub fn decode_frame(frame: &SseFrame) -> Result<Decoded> {
    let events = match frame.event.as_str() {
        "done" => return Ok(Decoded::Done),
        "thread.message.created" => {
            let message: MessageObject = serde_json::from_str(&frame.data)?;
            vec![RunEvent::Started {
                message_id: message.id,
            }]
        }
        "thread.message.delta" => {
            let delta: MessageDeltaObject = serde_json::from_str(&frame.data)?;
            delta
                .delta
                .content
                .into_iter()
                .filter_map(|part| part.text.and_then(|t| t.value))
                .filter(|value| !value.is_empty())
                .map(|value| RunEvent::TextDelta { value })
                .collect()
        }
        "thread.message.completed" => {
            let message: MessageObject = serde_json::from_str(&frame.data)?;
            let text = message
                .content
                .into_iter()
                .filter_map(|part| part.text.and_then(|t| t.value))
                .collect();
            vec![RunEvent::TextDone {
                message_id: message.id,
                text,
            }]
        }
        "thread.run.requires_action" => {
            let run: RunObject = serde_json::from_str(&frame.data)?;
            let tool_calls = run
                .required_action
                .and_then(|action| action.submit_tool_outputs)
                .map(|submit| submit.tool_calls)
                .unwrap_or_default()
                .into_iter()
                .map(|call| ToolCall {
                    id: call.id,
                    name: call.function.name,
                    arguments: call.function.arguments,
                })
                .collect();
            vec![RunEvent::RequiresAction {
                run: RunRef {
                    thread_id: run.thread_id,
                    run_id: run.id,
                },
                tool_calls,
            }]
        }
        "thread.run.completed" => {
            let run: RunObject = serde_json::from_str(&frame.data)?;
            vec![RunEvent::Completed { run_id: run.id }]
        }
        "thread.run.failed" | "thread.run.cancelled" | "thread.run.expired"
        | "thread.run.incomplete" => {
            let run: RunObject = serde_json::from_str(&frame.data)?;
            let reason = run
                .last_error
                .map(|e| e.message)
                .unwrap_or_else(|| format!("run {} ended as {}", run.id, run.status));
            vec![RunEvent::Failed { reason }]
        }
        "error" => vec![RunEvent::Failed {
            reason: error_message(&frame.data),
        }],
        other => {
            tracing::trace!(event = other, "skipping assistant stream event");
            Vec::new()
        }
    };
    Ok(Decoded::Events(events))
}

fn error_message(data: &str) -> String {
    let value: serde_json::Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(_) => return data.to_string(),
    };
    value
        .get("error")
        .unwrap_or(&value)
        .get("message")
        .and_then(|m| m.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| data.to_string())
}

// Assistants API payloads (internal)

#[derive(Deserialize)]
struct MessageObject {
    id: String,
    #[serde(default)]
    content: Vec<ContentObject>,
}

#[derive(Deserialize)]
struct MessageDeltaObject {
    delta: MessageDelta,
}

#[derive(Deserialize)]
struct MessageDelta {
    #[serde(default)]
    content: Vec<ContentObject>,
}

#[derive(Deserialize)]
struct ContentObject {
    text: Option<TextObject>,
}

#[derive(Deserialize)]
struct TextObject {
    value: Option<String>,
}

#[derive(Deserialize)]
struct RunObject {
    id: String,
    #[serde(default)]
    thread_id: String,
    #[serde(default)]
    status: String,
    required_action: Option<RequiredAction>,
    last_error: Option<LastError>,
}

#[derive(Deserialize)]
struct RequiredAction {
    submit_tool_outputs: Option<SubmitToolOutputs>,
}

#[derive(Deserialize)]
struct SubmitToolOutputs {
    tool_calls: Vec<RunToolCall>,
}

#[derive(Deserialize)]
struct RunToolCall {
    id: String,
    function: RunFunction,
}

#[derive(Deserialize)]
struct RunFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Deserialize)]
struct LastError {
    message: String,
}
