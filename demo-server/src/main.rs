//! Demo server binary.
//!
//! ```bash
//! CRAFT_API_URL=https://connect.craft.do/links/<link>/api/v1 demo-server
//! curl -X POST localhost:8080/craft-hackathon -d '{"query":"buy milk"}'
//! ```

use std::process::ExitCode;

use craft_core::{BlockingClient, CraftClient, UreqTransport};
use demo_server::{Config, QUERY_PATH};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let transport = match config.timeout {
        Some(timeout) => UreqTransport::with_timeout(timeout),
        None => UreqTransport::new(),
    };
    let api = BlockingClient::new(CraftClient::new(&config.api_url), transport);

    let listener = match TcpListener::bind(&config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr = %config.bind_addr, error = %e, "failed to bind");
            return ExitCode::FAILURE;
        }
    };
    info!(addr = %config.bind_addr, path = QUERY_PATH, api = %config.api_url, "demo server listening");

    if let Err(e) = demo_server::run(listener, api).await {
        error!(error = %e, "server failed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
