pub mod error;
pub mod handlers;
pub mod middleware;
pub mod rest;
pub mod state;
pub mod telemetry;

pub use error::{ApiError, ErrorResponse, JsonBody};
pub use rest::build_router;
pub use state::AppState;

use std::net::SocketAddr;

use datacat_core::{CoreError, CoreResult};
use datacat_service::Config;
use tokio::net::TcpListener;
use tracing::info;

/// Boots the datacat REST API.
pub async fn run_server(config: Config) -> CoreResult<()> {
    let state = AppState::from_config(&config)?;
    let app = build_router(state);

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        CoreError::internal(format!("Invalid bind address '{}': {}", bind_address, e))
    })?;

    info!("Starting datacat API server on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| CoreError::internal(format!("Failed to bind to {}: {}", addr, e)))?;

    info!("Server successfully bound to {}", addr);

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| CoreError::internal(format!("Server error: {}", e)))?;

    info!("datacat API server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received CTRL+C signal, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM signal, initiating graceful shutdown");
        }
    }
}
