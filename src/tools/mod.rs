//! Tool dispatch for runs paused on `requires_action`.

pub mod arguments;
pub mod builtin;
pub mod dispatch;
pub mod registry;
pub mod tool;

pub use arguments::ToolArguments;
pub use dispatch::ToolDispatcher;
pub use registry::ToolRegistry;
pub use tool::{AgentTool, Tool, ToolContext};
