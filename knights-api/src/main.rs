//! Knights API Server Entry Point
//!
//! Bootstraps configuration and telemetry, builds the stores, and starts the
//! Axum HTTP server.

use knights_api::telemetry::init_tracing;
use knights_api::{create_api_router, ApiConfig, ApiError, ApiResult, AppState};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let config = ApiConfig::from_env()?;
    init_tracing(config.log_format)?;

    let state = AppState::from_config(&config)?;
    let app = create_api_router(state, &config);

    let addr = config.bind_addr()?;
    tracing::info!(%addr, "Starting knights API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
