//! Built-in tools exposed to the assistant.
//!
//! `test_api` is a connectivity probe answered locally. `execute_command`
//! forwards a command to the backend gateway for the server the connection
//! is scoped to and returns the backend's JSON payload untouched.

use std::sync::Arc;

use crate::error::RelayError;
use crate::gateway::Gateway;
use crate::tools::tool::{AgentTool, Tool, ToolContext};

pub const TEST_API: &str = "test_api";
pub const EXECUTE_COMMAND: &str = "execute_command";

/// Create the `test_api` tool, which always reports success.
pub fn test_api_tool() -> Arc<dyn Tool> {
    Arc::new(AgentTool::new(TEST_API, |_args, _ctx: ToolContext| async move {
        Ok(serde_json::json!({ "success": "true" }))
    }))
}

/// Create the `execute_command` tool backed by `gateway`.
pub fn execute_command_tool(gateway: Arc<dyn Gateway>) -> Arc<dyn Tool> {
    Arc::new(AgentTool::new(EXECUTE_COMMAND, move |args, ctx: ToolContext| {
        let gateway = gateway.clone();
        async move {
            let command = args.get_str("command")?.to_string();
            let server_id = ctx.server_id.ok_or_else(|| {
                RelayError::tool(EXECUTE_COMMAND, "connection has no server id")
            })?;

            tracing::info!(
                server_id = %server_id,
                tool_call_id = ctx.tool_call_id.as_deref().unwrap_or("-"),
                command = %command,
                "executing command"
            );
            let response = gateway
                .post(
                    &format!("/servers/{server_id}/execute-command"),
                    &serde_json::json!({ "command": command }),
                )
                .await?;
            if !response.is_success() {
                tracing::warn!(
                    server_id = %server_id,
                    status = response.status,
                    "backend rejected command"
                );
            }
            response.json()
        }
    }))
}

/// Every built-in tool.
pub fn all_tools(gateway: Arc<dyn Gateway>) -> Vec<Arc<dyn Tool>> {
    vec![test_api_tool(), execute_command_tool(gateway)]
}
