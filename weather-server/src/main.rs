//! Binary crate for the `weather-server` HTTP service.
//!
//! This crate focuses on:
//! - Parsing process arguments
//! - Logging setup
//! - Serving `GET /v1/weather` until shutdown

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use weather_server::cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "weather_server=info,weather_core=info,tower_http=info".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cmd = cli::Cli::parse();
    cmd.run().await
}
