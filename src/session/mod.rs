//! Per-connection session state machine.
//!
//! A [`Session`] owns the conversation thread for one realtime connection.
//! Each inbound message is appended to the thread (creating it on first
//! use), a run is streamed and relayed to the client, and whenever the run
//! pauses for tool calls the batch is dispatched and the same run is resumed
//! with the results. Handling takes `&mut self`, so a session can never have
//! two runs in flight.

pub mod events;
pub mod state;

pub use events::{ClientEvent, EventSink};
pub use state::{SessionPhase, ThreadState};

use std::sync::Arc;

use bon::bon;
use futures::StreamExt;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::assistant::{
    AssistantBackend, RunEvent, RunEventStream, RunRef, ThreadMessage, ToolCall, ToolOutput,
};
use crate::config::ErrorReporting;
use crate::error::Result;
use crate::tools::ToolDispatcher;

/// Identity of the connection a session is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub id: Uuid,
    /// Client address with any IPv4-mapped IPv6 prefix removed.
    pub address: String,
    /// Backend server the client declared at handshake.
    pub server_id: Option<String>,
}

impl ConnectionInfo {
    pub fn new(address: impl AsRef<str>, server_id: Option<String>) -> Self {
        let address = address.as_ref();
        Self {
            id: Uuid::new_v4(),
            address: address.strip_prefix("::ffff:").unwrap_or(address).to_string(),
            server_id: server_id.filter(|id| !id.is_empty()),
        }
    }
}

/// How handling one message ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    /// The run or a call leading to it failed.
    Failed(String),
    /// Tool results could not be submitted; the run stays paused remotely.
    Abandoned(String),
}

/// Where a relayed stream stopped.
enum Settled {
    Completed,
    Failed(String),
    RequiresAction { run: RunRef, tool_calls: Vec<ToolCall> },
}

pub struct Session {
    connection: ConnectionInfo,
    backend: Arc<dyn AssistantBackend>,
    dispatcher: ToolDispatcher,
    assistant_id: String,
    sink: EventSink,
    error_reporting: ErrorReporting,
    thread: ThreadState,
    phase: SessionPhase,
}

#[bon]
impl Session {
    #[builder]
    pub fn new(
        connection: ConnectionInfo,
        backend: Arc<dyn AssistantBackend>,
        dispatcher: ToolDispatcher,
        #[builder(into)] assistant_id: String,
        sink: EventSink,
        #[builder(default)] error_reporting: ErrorReporting,
    ) -> Self {
        Self {
            connection,
            backend,
            dispatcher,
            assistant_id,
            sink,
            error_reporting,
            thread: ThreadState::NoThread,
            phase: SessionPhase::Idle,
        }
    }
}

impl Session {
    pub fn connection(&self) -> &ConnectionInfo {
        &self.connection
    }

    pub fn thread(&self) -> &ThreadState {
        &self.thread
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Whether the client side of the connection is gone.
    pub fn is_detached(&self) -> bool {
        self.sink.is_closed()
    }

    /// Submit one client message and relay the resulting run to completion.
    pub async fn handle_message(&mut self, text: impl Into<String>) -> RunOutcome {
        let text = text.into();
        info!(address = %self.connection.address, input = %text, "message received");

        let outcome = match self.drive(ThreadMessage::user(text)).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    address = %self.connection.address,
                    category = ?e.category(),
                    error = %e,
                    "run failed"
                );
                RunOutcome::Failed(e.to_string())
            }
        };

        self.phase = match self.thread {
            ThreadState::NoThread => SessionPhase::Idle,
            ThreadState::Thread { .. } => SessionPhase::ThreadReady,
        };

        match &outcome {
            RunOutcome::Completed => debug!(address = %self.connection.address, "run completed"),
            RunOutcome::Failed(reason) | RunOutcome::Abandoned(reason) => {
                if self.error_reporting == ErrorReporting::Notify {
                    self.emit(ClientEvent::MessageStreamError(reason.clone()));
                }
            }
        }
        outcome
    }

    async fn drive(&mut self, message: ThreadMessage) -> Result<RunOutcome> {
        let thread_id = self.ensure_thread(&message).await?;

        self.phase = SessionPhase::Running;
        let mut stream = self
            .backend
            .stream_run(&thread_id, &self.assistant_id)
            .await?;

        loop {
            let (run, tool_calls) = match self.relay(&mut stream).await {
                Settled::Completed => return Ok(RunOutcome::Completed),
                Settled::Failed(reason) => {
                    warn!(address = %self.connection.address, reason = %reason, "run failed");
                    return Ok(RunOutcome::Failed(reason));
                }
                Settled::RequiresAction { run, tool_calls } => (run, tool_calls),
            };

            let run = RunRef {
                thread_id: if run.thread_id.is_empty() {
                    thread_id.clone()
                } else {
                    run.thread_id
                },
                run_id: run.run_id,
            };

            self.phase = SessionPhase::AwaitingToolResults;
            info!(
                address = %self.connection.address,
                run_id = %run.run_id,
                calls = tool_calls.len(),
                "run requires action"
            );
            let outputs = self
                .dispatcher
                .dispatch(&tool_calls, self.connection.server_id.as_deref())
                .await;

            if !covers(&tool_calls, &outputs) {
                error!(run_id = %run.run_id, "tool outputs do not match the requested calls");
                return Ok(RunOutcome::Abandoned(format!(
                    "incomplete tool outputs for run {}",
                    run.run_id
                )));
            }

            stream = match self.backend.submit_tool_outputs(&run, &outputs).await {
                Ok(stream) => stream,
                Err(e) => {
                    error!(
                        run_id = %run.run_id,
                        category = ?e.category(),
                        error = %e,
                        "error submitting tool outputs"
                    );
                    return Ok(RunOutcome::Abandoned(e.to_string()));
                }
            };
            self.phase = SessionPhase::Running;
        }
    }

    /// Create the thread with `message`, or append `message` to it.
    async fn ensure_thread(&mut self, message: &ThreadMessage) -> Result<String> {
        match &self.thread {
            ThreadState::Thread { id } => {
                let id = id.clone();
                debug!(thread_id = %id, "message pushed to thread");
                self.backend.append_message(&id, message).await?;
                Ok(id)
            }
            ThreadState::NoThread => {
                let id = self.backend.create_thread(message).await?;
                info!(address = %self.connection.address, thread_id = %id, "thread created");
                Ok(self.thread.assign(id)?.to_string())
            }
        }
    }

    /// Relay events in order until the run settles or pauses.
    async fn relay(&self, stream: &mut RunEventStream) -> Settled {
        while let Some(event) = stream.next().await {
            match event {
                RunEvent::Started { message_id } => {
                    debug!(message_id = %message_id, "message stream created");
                    self.emit(ClientEvent::MessageStreamCreated);
                }
                RunEvent::TextDelta { value } => self.emit(ClientEvent::MessageStreamDelta(value)),
                RunEvent::TextDone { message_id, .. } => {
                    debug!(message_id = %message_id, "message stream completed");
                    self.emit(ClientEvent::MessageStreamEnd(message_id));
                }
                RunEvent::RequiresAction { run, tool_calls } => {
                    return Settled::RequiresAction { run, tool_calls }
                }
                RunEvent::Completed { run_id } => {
                    debug!(run_id = %run_id, "run completed");
                    return Settled::Completed;
                }
                RunEvent::Failed { reason } => return Settled::Failed(reason),
            }
        }
        Settled::Failed("run stream ended before the run settled".into())
    }

    fn emit(&self, event: ClientEvent) {
        // A closed sink means the client left; the run still goes on.
        let _ = self.sink.send(event);
    }
}

fn covers(calls: &[ToolCall], outputs: &[ToolOutput]) -> bool {
    calls.len() == outputs.len()
        && calls
            .iter()
            .all(|call| outputs.iter().any(|o| o.tool_call_id == call.id))
}
