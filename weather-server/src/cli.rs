use std::{net::SocketAddr, path::PathBuf};

use anyhow::Context;
use clap::Parser;
use tokio::{net::TcpListener, signal};
use tower_http::trace::TraceLayer;
use tracing::info;
use weather_core::Config;

use crate::{routes::create_router, state::AppState};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-server", version, about = "Weather proxy with provider failover")]
pub struct Cli {
    /// Address to listen on.
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8000")]
    pub bind: SocketAddr,

    /// Config file; defaults to the platform config directory.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config = Config::load(self.config.as_deref())?;
        info!(?config, "configuration loaded");

        let state = AppState::from_config(&config).await?;
        let app = create_router(state).layer(TraceLayer::new_for_http());

        let listener = TcpListener::bind(self.bind)
            .await
            .with_context(|| format!("Failed to bind {}", self.bind))?;
        info!("listening on http://{}", self.bind);

        axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

        info!("server stopped");
        Ok(())
    }
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl+C, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
    }
}
