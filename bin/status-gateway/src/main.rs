//! Status gateway binary

use std::{net::SocketAddr, time::Duration};

use clap::Parser;
use config::Opts;
use dotenvy::dotenv;
use monitoring::{ClientConfig, Ctx, Router, StatusClient};
use server::{GatewayState, ShutdownSignal};
use tracing::info;
use tracing_subscriber::filter::EnvFilter;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    if let Ok(custom_env_file) = std::env::var("ENV_FILE") {
        dotenvy::from_filename(custom_env_file)?;
    } else {
        // Try the default .env file, and ignore if it doesn't exist.
        dotenv().ok();
    }
    let opts = Opts::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let client = StatusClient::new(&ClientConfig {
        timeout: Duration::from_secs(opts.status.request_timeout_secs),
        max_idle_per_host: opts.status.max_idle_per_host,
        error_format: opts.status.remote_error_format,
    })?;
    info!(status_url = %opts.status.status_url, "forwarding to monitoring service");
    let state = GatewayState::new(Router::new(client), Ctx::new(opts.status.status_url));

    let addr: SocketAddr = format!("{}:{}", opts.api.host, opts.api.port).parse()?;
    server::run(addr, state, ShutdownSignal::new()?).await
}
