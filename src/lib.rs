//! Realtime relay between chat clients and a tool-augmented assistant.
//!
//! Each WebSocket connection gets a [`session::Session`] that owns one
//! assistant thread. Client messages start streamed runs whose text is
//! relayed back as `message-stream-*` events; runs that pause for tool calls
//! are resumed with the outputs of the [`tools`] dispatched for them.

pub mod assistant;
pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod server;
pub mod session;
pub mod telemetry;
pub mod tools;
