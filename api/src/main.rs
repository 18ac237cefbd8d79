//! Todo API Server Binary
//!
//! Entry point for the instrumented todo service.

#![deny(unsafe_code)]

use anyhow::Result;
use telemetry::config::TelemetryConfig;
use telemetry::Telemetry;

// Telemetry is created and shut down outside the runtime: the SDK exports
// from its own threads with a blocking HTTP client.
fn main() -> Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let config = TelemetryConfig::from_env()?.with_service_version(env!("CARGO_PKG_VERSION"));
    let telemetry = Telemetry::from_config(&config)?;
    telemetry.init_subscriber()?;
    tracing::info!("Application startup");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let served = runtime.block_on(todo_api::run_server(telemetry.clone()));
    drop(runtime);

    telemetry.shutdown();
    served
}
