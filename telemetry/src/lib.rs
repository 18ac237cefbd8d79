//! Telemetry
//!
//! OpenTelemetry wiring for a single service: traces, metrics and logs are
//! batched by the SDK and exported to a collector over OTLP/HTTP (JSON).
//!
//! # Architecture
//!
//! - [`config`]: `OTEL_*` environment configuration
//! - [`setup`]: the [`Telemetry`] context owning the three SDK providers
//! - [`logs`]: the `tracing` bridge and fatal records
//!
//! Export runs on the SDK's background workers. A slow or unreachable
//! collector never blocks the code that produces telemetry; failed batches
//! are reported by the SDK and dropped.
//!
//! # Example
//!
//! ```no_run
//! use opentelemetry::trace::Tracer;
//! use telemetry::config::TelemetryConfig;
//! use telemetry::Telemetry;
//!
//! fn main() -> anyhow::Result<()> {
//!     let telemetry = Telemetry::from_config(&TelemetryConfig::from_env()?)?;
//!     telemetry.init_subscriber()?;
//!
//!     telemetry.tracer().in_span("startup", |_cx| {
//!         tracing::info!("Application startup");
//!     });
//!
//!     telemetry.shutdown();
//!     Ok(())
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod logs;
pub mod setup;

pub use setup::{Telemetry, TelemetryError, Tracer};
