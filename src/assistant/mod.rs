//! Assistant run streaming.
//!
//! Wraps the remote assistant service behind [`AssistantBackend`]: thread
//! creation, message append, streamed runs and tool-output submission. Runs
//! are consumed as a lazy, ordered, finite [`RunEventStream`]; a run paused
//! on [`RunEvent::RequiresAction`] continues on the stream returned by
//! [`AssistantBackend::submit_tool_outputs`].

pub mod events;
pub mod openai;
pub mod types;

pub use events::{decode_frame, Decoded, RunEvent};
pub use openai::OpenAiAssistants;
pub use types::{ContentPart, Role, RunRef, ThreadMessage, ToolCall, ToolOutput};

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;

/// Ordered run events. Transport failures arrive as [`RunEvent::Failed`].
pub type RunEventStream = BoxStream<'static, RunEvent>;

/// Remote assistant service operations used by a session.
#[async_trait]
pub trait AssistantBackend: Send + Sync {
    /// Create a thread seeded with its first message; returns the thread id.
    async fn create_thread(&self, message: &ThreadMessage) -> Result<String>;

    /// Append a message to an existing thread.
    async fn append_message(&self, thread_id: &str, message: &ThreadMessage) -> Result<()>;

    /// Start a run of `assistant_id` over the thread and stream its events.
    async fn stream_run(&self, thread_id: &str, assistant_id: &str) -> Result<RunEventStream>;

    /// Resume a paused run with one output per requested tool call.
    async fn submit_tool_outputs(
        &self,
        run: &RunRef,
        outputs: &[ToolOutput],
    ) -> Result<RunEventStream>;
}
