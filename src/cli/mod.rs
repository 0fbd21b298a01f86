//! Command-line interface for the relay binary.

use std::path::PathBuf;

use clap::Parser;

/// Realtime assistant relay
#[derive(Parser, Debug)]
#[command(
    name = "assistant-relay",
    version,
    about = "Relay chat clients to a tool-augmented assistant over WebSocket"
)]
pub struct Cli {
    /// Address to listen on (overrides RELAY_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides HTTPS_PORT)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Environment file to load before reading configuration
    #[arg(long, value_name = "PATH")]
    pub env_file: Option<PathBuf>,
}

impl Cli {
    /// Value a flag supplies for configuration key `key`, if any.
    pub fn override_for(&self, key: &str) -> Option<String> {
        match key {
            "RELAY_HOST" => self.host.clone(),
            "HTTPS_PORT" => self.port.map(|p| p.to_string()),
            _ => None,
        }
    }
}
