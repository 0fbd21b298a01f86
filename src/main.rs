//! Relay binary entry point.

use assistant_relay::cli::Cli;
use assistant_relay::config::RelayConfig;
use assistant_relay::error::RelayError;
use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    assistant_relay::telemetry::init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), RelayError> {
    let config = RelayConfig::from_env(cli.env_file.as_deref(), |key| cli.override_for(key))?;
    tracing::debug!(?config, "configuration loaded");
    assistant_relay::server::serve(config).await
}
