//! OpenAI Assistants v2 implementation of [`AssistantBackend`].

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde::Deserialize;
use tracing::debug;

use super::events::{decode_frame, Decoded, RunEvent};
use super::types::{RunRef, ThreadMessage, ToolOutput};
use super::{AssistantBackend, RunEventStream};
use crate::config::{AssistantConfig, ProxyConfig};
use crate::error::{RelayError, Result};
use crate::http::{bearer_headers, build_client, status_to_error, SseDecoder};

const BETA_HEADER: &str = "openai-beta";
const BETA_VALUE: &str = "assistants=v2";

pub struct OpenAiAssistants {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiAssistants {
    pub fn new(config: &AssistantConfig, proxy: Option<&ProxyConfig>) -> Result<Self> {
        Ok(Self::with_client(build_client(proxy)?, config))
    }

    pub fn with_client(client: reqwest::Client, config: &AssistantConfig) -> Self {
        Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = bearer_headers(&self.api_key);
        headers.insert(BETA_HEADER, HeaderValue::from_static(BETA_VALUE));
        headers
    }

    async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
        headers: HeaderMap,
    ) -> Result<reqwest::Response> {
        let resp = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .headers(headers)
            .json(body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body_text));
        }
        Ok(resp)
    }

    async fn post_json(&self, path: &str, body: &serde_json::Value) -> Result<reqwest::Response> {
        self.post(path, body, self.headers()).await
    }

    async fn open_stream(&self, path: &str, body: serde_json::Value) -> Result<RunEventStream> {
        let mut headers = self.headers();
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
        let resp = self.post(path, &body, headers).await?;
        Ok(run_event_stream(resp))
    }
}

/// Turn a streaming response into normalised run events.
///
/// The sequence ends after `done`, after any terminal event, or with a single
/// `Failed` when the transport breaks or a payload cannot be decoded.
fn run_event_stream(resp: reqwest::Response) -> RunEventStream {
    let byte_stream = resp.bytes_stream();

    let stream = async_stream::stream! {
        let mut decoder = SseDecoder::new();
        futures::pin_mut!(byte_stream);

        'read: loop {
            let (frames, ended) = match byte_stream.next().await {
                Some(Ok(chunk)) => (decoder.push(&chunk), false),
                Some(Err(e)) => {
                    yield RunEvent::Failed { reason: RelayError::Network(e).to_string() };
                    break 'read;
                }
                None => (decoder.finish().into_iter().collect::<Vec<_>>(), true),
            };

            for frame in frames {
                debug!(event = %frame.event, "assistant stream event");
                match decode_frame(&frame) {
                    Ok(Decoded::Done) => break 'read,
                    Ok(Decoded::Events(events)) => {
                        for event in events {
                            let terminal = event.is_terminal();
                            yield event;
                            if terminal {
                                break 'read;
                            }
                        }
                    }
                    Err(e) => {
                        let err = RelayError::Stream(format!(
                            "malformed {} event: {e}",
                            frame.event
                        ));
                        tracing::warn!(
                            category = ?err.category(),
                            error = %err,
                            "assistant stream broken"
                        );
                        yield RunEvent::Failed { reason: err.to_string() };
                        break 'read;
                    }
                }
            }

            if ended {
                break 'read;
            }
        }
    };

    Box::pin(stream)
}

#[async_trait]
impl AssistantBackend for OpenAiAssistants {
    async fn create_thread(&self, message: &ThreadMessage) -> Result<String> {
        debug!("creating assistant thread");
        let resp = self
            .post_json("/threads", &serde_json::json!({ "messages": [message] }))
            .await?;
        let thread: ThreadObject = resp.json().await?;
        Ok(thread.id)
    }

    async fn append_message(&self, thread_id: &str, message: &ThreadMessage) -> Result<()> {
        debug!(thread_id, "appending message to thread");
        self.post_json(
            &format!("/threads/{thread_id}/messages"),
            &serde_json::to_value(message)?,
        )
        .await?;
        Ok(())
    }

    async fn stream_run(&self, thread_id: &str, assistant_id: &str) -> Result<RunEventStream> {
        debug!(thread_id, assistant_id, "starting streamed run");
        self.open_stream(
            &format!("/threads/{thread_id}/runs"),
            serde_json::json!({ "assistant_id": assistant_id, "stream": true }),
        )
        .await
    }

    async fn submit_tool_outputs(
        &self,
        run: &RunRef,
        outputs: &[ToolOutput],
    ) -> Result<RunEventStream> {
        debug!(
            thread_id = %run.thread_id,
            run_id = %run.run_id,
            outputs = outputs.len(),
            "submitting tool outputs"
        );
        self.open_stream(
            &format!(
                "/threads/{}/runs/{}/submit_tool_outputs",
                run.thread_id, run.run_id
            ),
            serde_json::json!({ "tool_outputs": outputs, "stream": true }),
        )
        .await
    }
}

#[derive(Deserialize)]
struct ThreadObject {
    id: String,
}
