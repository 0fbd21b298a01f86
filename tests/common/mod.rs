//! Shared test helpers: scripted assistant backend and recording gateway.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream;
use tokio::sync::mpsc;

use assistant_relay::assistant::{
    AssistantBackend, RunEvent, RunEventStream, RunRef, ThreadMessage, ToolCall, ToolOutput,
};
use assistant_relay::error::{RelayError, Result};
use assistant_relay::gateway::{Gateway, GatewayResponse};
use assistant_relay::session::{ClientEvent, ConnectionInfo, Session};
use assistant_relay::tools::{ToolDispatcher, ToolRegistry};

/// A call observed by [`ScriptedBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    CreateThread(String),
    AppendMessage { thread_id: String, text: String },
    StreamRun { thread_id: String, assistant_id: String },
    SubmitToolOutputs { run: RunRef, outputs: Vec<ToolOutput> },
}

/// Assistant backend replaying queued event scripts.
///
/// Each `stream_run` or `submit_tool_outputs` call pops the next script.
pub struct ScriptedBackend {
    thread_id: String,
    scripts: Mutex<VecDeque<Vec<RunEvent>>>,
    calls: Mutex<Vec<BackendCall>>,
    fail_create: Mutex<Option<RelayError>>,
    fail_submit: Mutex<Option<RelayError>>,
}

impl ScriptedBackend {
    pub fn new(thread_id: &str) -> Self {
        Self {
            thread_id: thread_id.to_string(),
            scripts: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            fail_create: Mutex::new(None),
            fail_submit: Mutex::new(None),
        }
    }

    /// Queue the events of the next stream.
    pub fn queue(&self, events: Vec<RunEvent>) {
        self.scripts.lock().unwrap().push_back(events);
    }

    pub fn fail_create_with(&self, error: RelayError) {
        *self.fail_create.lock().unwrap() = Some(error);
    }

    pub fn fail_submit_with(&self, error: RelayError) {
        *self.fail_submit.lock().unwrap() = Some(error);
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&BackendCall) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    fn next_stream(&self) -> RunEventStream {
        let events = self.scripts.lock().unwrap().pop_front().unwrap_or_default();
        Box::pin(stream::iter(events))
    }
}

#[async_trait]
impl AssistantBackend for ScriptedBackend {
    async fn create_thread(&self, message: &ThreadMessage) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push(BackendCall::CreateThread(message.text()));
        if let Some(err) = self.fail_create.lock().unwrap().take() {
            return Err(err);
        }
        Ok(self.thread_id.clone())
    }

    async fn append_message(&self, thread_id: &str, message: &ThreadMessage) -> Result<()> {
        self.calls.lock().unwrap().push(BackendCall::AppendMessage {
            thread_id: thread_id.to_string(),
            text: message.text(),
        });
        Ok(())
    }

    async fn stream_run(&self, thread_id: &str, assistant_id: &str) -> Result<RunEventStream> {
        self.calls.lock().unwrap().push(BackendCall::StreamRun {
            thread_id: thread_id.to_string(),
            assistant_id: assistant_id.to_string(),
        });
        Ok(self.next_stream())
    }

    async fn submit_tool_outputs(
        &self,
        run: &RunRef,
        outputs: &[ToolOutput],
    ) -> Result<RunEventStream> {
        self.calls.lock().unwrap().push(BackendCall::SubmitToolOutputs {
            run: run.clone(),
            outputs: outputs.to_vec(),
        });
        if let Some(err) = self.fail_submit.lock().unwrap().take() {
            return Err(err);
        }
        Ok(self.next_stream())
    }
}

/// Gateway that records posts and answers with a fixed response.
pub struct RecordingGateway {
    pub response: GatewayResponse,
    pub delay: Option<Duration>,
    pub posts: Mutex<Vec<(String, serde_json::Value)>>,
}

impl RecordingGateway {
    pub fn ok(body: &str) -> Self {
        Self {
            response: GatewayResponse {
                status: 200,
                body: body.to_string(),
            },
            delay: None,
            posts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn posts(&self) -> Vec<(String, serde_json::Value)> {
        self.posts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Gateway for RecordingGateway {
    async fn post(&self, path: &str, body: &serde_json::Value) -> Result<GatewayResponse> {
        self.posts
            .lock()
            .unwrap()
            .push((path.to_string(), body.clone()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.response.clone())
    }
}

pub fn started(id: &str) -> RunEvent {
    RunEvent::Started {
        message_id: id.to_string(),
    }
}

pub fn delta(value: &str) -> RunEvent {
    RunEvent::TextDelta {
        value: value.to_string(),
    }
}

pub fn done(id: &str, text: &str) -> RunEvent {
    RunEvent::TextDone {
        message_id: id.to_string(),
        text: text.to_string(),
    }
}

pub fn completed(run_id: &str) -> RunEvent {
    RunEvent::Completed {
        run_id: run_id.to_string(),
    }
}

pub fn requires_action(thread_id: &str, run_id: &str, calls: &[(&str, &str, &str)]) -> RunEvent {
    RunEvent::RequiresAction {
        run: RunRef {
            thread_id: thread_id.to_string(),
            run_id: run_id.to_string(),
        },
        tool_calls: calls
            .iter()
            .map(|(id, name, args)| tool_call(id, name, args))
            .collect(),
    }
}

pub fn tool_call(id: &str, name: &str, arguments: &str) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments: arguments.to_string(),
    }
}

/// A session over `backend` plus the receiving end of its event sink.
pub fn session_with(
    backend: Arc<ScriptedBackend>,
    gateway: Arc<RecordingGateway>,
    server_id: Option<&str>,
) -> (Session, mpsc::UnboundedReceiver<ClientEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let session = Session::builder()
        .connection(ConnectionInfo::new("127.0.0.1", server_id.map(str::to_string)))
        .backend(backend)
        .dispatcher(ToolDispatcher::new(ToolRegistry::builtin(gateway)))
        .assistant_id("asst_test")
        .sink(tx)
        .build();
    (session, rx)
}

/// Everything currently buffered on the event channel.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<ClientEvent>) -> Vec<ClientEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
