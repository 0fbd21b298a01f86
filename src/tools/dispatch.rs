//! Concurrent, best-effort execution of a batch of tool calls.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, error, warn};

use super::arguments::ToolArguments;
use super::registry::ToolRegistry;
use super::tool::{Tool, ToolContext};
use crate::assistant::{ToolCall, ToolOutput};
use crate::error::RelayError;

/// Resolves tool calls against a [`ToolRegistry`] and runs them.
#[derive(Debug, Clone)]
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
}

impl ToolDispatcher {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Run every call concurrently and wait for all of them.
    ///
    /// Returns exactly one [`ToolOutput`] per call, correlated by
    /// `tool_call_id`. An unknown tool yields an empty output; a failing or
    /// panicking tool yields `{"error": ...}`. Neither affects its siblings.
    pub async fn dispatch(&self, calls: &[ToolCall], server_id: Option<&str>) -> Vec<ToolOutput> {
        let tasks = calls.iter().map(|call| {
            let tool = self.registry.get(&call.name).cloned();
            let call = call.clone();
            let ctx = ToolContext {
                server_id: server_id.map(str::to_string),
                tool_call_id: Some(call.id.clone()),
            };
            async move {
                let output = match tool {
                    Some(tool) => run_isolated(tool, &call, ctx).await,
                    None => {
                        warn!(tool = %call.name, tool_call_id = %call.id, "unknown tool requested");
                        String::new()
                    }
                };
                ToolOutput {
                    tool_call_id: call.id,
                    output,
                }
            }
        });

        join_all(tasks).await
    }
}

async fn run_isolated(tool: Arc<dyn Tool>, call: &ToolCall, ctx: ToolContext) -> String {
    let raw = call.arguments.clone();
    let handle = tokio::spawn(async move {
        let args = ToolArguments::from_raw(&raw)?;
        tool.execute(&args, &ctx).await
    });

    let result = match handle.await {
        Ok(result) => result,
        Err(join_err) => Err(RelayError::tool(&call.name, join_err.to_string())),
    };

    match result {
        Ok(value) => {
            debug!(tool = %call.name, tool_call_id = %call.id, "tool call finished");
            value.to_string()
        }
        Err(e) => {
            error!(
                tool = %call.name,
                tool_call_id = %call.id,
                category = ?e.category(),
                error = %e,
                "tool call failed"
            );
            serde_json::json!({ "error": e.to_string() }).to_string()
        }
    }
}
