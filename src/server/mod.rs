//! HTTP server module
//!
//! Serves the check output: every scrape of the metrics path runs all
//! configured checks once and renders the result.

pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{routing::get, Router};
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::check::CheckRunner;
use crate::config::Config;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Configured checks
    pub runner: Arc<CheckRunner>,
}

impl AppState {
    pub fn new(config: Config, runner: CheckRunner) -> Self {
        Self {
            config: Arc::new(config),
            runner: Arc::new(runner),
        }
    }
}

/// Build the router
pub fn router(state: AppState) -> Router {
    let metrics_path = state.config.server.path.clone();

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/checks", get(handlers::checks))
        .route(&metrics_path, get(handlers::metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Parse the bind address, handling "localhost" specially
pub fn bind_addr(bind_address: &str, port: u16) -> Result<SocketAddr> {
    let ip: std::net::IpAddr = if bind_address == "localhost" {
        std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST)
    } else {
        bind_address.parse().map_err(|e| {
            anyhow::anyhow!(
                "Invalid bind_address '{}': {}. Use an IP address (e.g., '0.0.0.0', '127.0.0.1') or 'localhost'.",
                bind_address,
                e
            )
        })?
    };
    Ok(SocketAddr::from((ip, port)))
}

/// Run the HTTP server
///
/// Every jmxterm session is terminated after the server stops.
///
/// # Errors
/// Returns an error if the checks cannot be built or the server fails to start
pub async fn run(config: Config) -> Result<()> {
    let addr = bind_addr(&config.server.bind_address, config.server.port)?;
    let runner = CheckRunner::from_config(&config)?;
    let state = AppState::new(config, runner);
    let runner = Arc::clone(&state.runner);

    info!(
        address = %addr,
        metrics_path = %state.config.server.path,
        checks = state.runner.checks().len(),
        instances = state.config.instance_count(),
        "Server listening"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    runner.kill_connectors().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        }
    }
}
