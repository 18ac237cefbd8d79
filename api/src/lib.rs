//! Todo API Server
//!
//! A small CRUD service for todo items, instrumented end to end: every request
//! and every store call produces a span, request and query latencies are
//! recorded as metrics, and application logs are exported with the trace
//! context they were emitted in.
//!
//! # Architecture
//!
//! - [`routes`]: the CRUD handlers plus `/` and `/health`
//! - [`middleware`]: per-request server spans and HTTP metrics
//! - [`store`]: the storage trait, its backends and the instrumented wrapper
//! - [`db`]: backend selection and schema initialization at startup
//!
//! # Example
//!
//! ```no_run
//! use telemetry::config::TelemetryConfig;
//! use telemetry::Telemetry;
//!
//! fn main() -> anyhow::Result<()> {
//!     let telemetry = Telemetry::from_config(&TelemetryConfig::from_env()?)?;
//!     telemetry.init_subscriber()?;
//!
//!     let runtime = tokio::runtime::Runtime::new()?;
//!     let served = runtime.block_on(todo_api::run_server(telemetry.clone()));
//!     telemetry.shutdown();
//!     served
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod config;
pub mod db;
mod error;
pub mod middleware;
pub mod routes;
mod state;
pub mod store;

pub use config::ServerConfig;
pub use error::{ApiError, ErrorDescription};
pub use state::{AppState, HttpMetrics};

use anyhow::Result;
use axum::Router;
use db::DatabaseConfig;
use telemetry::Telemetry;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Runs the todo API server.
///
/// Loads server and database configuration from environment variables and
/// serves until SIGTERM/SIGINT. Shutting telemetry down is left to the
/// caller, since it blocks until the exporters return.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration cannot be loaded from environment
/// - The server fails to bind to the configured address
/// - A fatal error occurs during operation
pub async fn run_server(telemetry: Telemetry) -> Result<()> {
    let config = ServerConfig::from_env()?;
    let db_config = DatabaseConfig::from_env()?;
    run_server_with_config(config, db_config, telemetry).await
}

/// Runs the todo API server with the provided configuration.
///
/// # Errors
///
/// Returns an error if `DATABASE_URL` is not a valid connection string or the
/// listener cannot be bound.
pub async fn run_server_with_config(
    config: ServerConfig,
    db_config: DatabaseConfig,
    telemetry: Telemetry,
) -> Result<()> {
    let addr = config.bind;
    tracing::info!(%addr, "Todo API server starting");

    let store = db::connect_store(&db_config, &telemetry).await?;
    let app = create_router(AppState::new(store, telemetry.clone()));
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(%addr, "Listening for connections");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    tracing::info!("Server shutdown complete");
    served?;
    Ok(())
}

/// Creates the main application router with all routes and middleware.
///
/// This function is public to allow testing the router without starting a full server.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::index_routes())
        .merge(routes::health_routes())
        .merge(routes::todo_routes())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::trace_requests,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Waits for a shutdown signal (SIGTERM or SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
