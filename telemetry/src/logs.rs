//! Log export: the `tracing` bridge and fatal records.
//!
//! Application code logs with `tracing` macros. [`log_layer`] forwards those
//! events to the OpenTelemetry log pipeline, where the SDK stamps each record
//! with the trace and span ids of the active [`opentelemetry::Context`].

use opentelemetry::logs::{AnyValue, LogRecord as _, Logger as _, LoggerProvider as _, Severity};
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use std::time::SystemTime;
use tracing::{Metadata, Subscriber};
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

/// Targets never forwarded to the log pipeline. Bridging these would feed
/// the exporter's own diagnostics and its HTTP client back into it.
const SUPPRESSED_TARGETS: &[&str] = &["telemetry", "hyper", "reqwest", "h2", "tower"];

/// Event field marking a console-only copy of a fatal record.
pub const FATAL_FIELD: &str = "fatal";

/// Instrumentation scope of records emitted directly by this crate.
const SCOPE: &str = "todo_service";

fn is_suppressed(target: &str) -> bool {
    target.starts_with("opentelemetry")
        || SUPPRESSED_TARGETS.iter().any(|prefix| {
            target
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
        })
}

fn is_exported(metadata: &Metadata<'_>) -> bool {
    !is_suppressed(metadata.target()) && metadata.fields().field(FATAL_FIELD).is_none()
}

/// Returns a layer forwarding `tracing` events to `provider`.
///
/// Events from the telemetry stack and the HTTP client are dropped, as are
/// events carrying a `fatal` field: those are the console half of
/// [`emit_fatal`], which exports the record itself.
pub fn log_layer<S>(provider: &SdkLoggerProvider) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    OpenTelemetryTracingBridge::new(provider).with_filter(filter_fn(is_exported))
}

/// Exports a `FATAL` record. `tracing` has no level above `ERROR`, so the
/// record is built through the OpenTelemetry logs API directly.
pub fn emit_fatal(provider: &SdkLoggerProvider, message: &str) {
    let logger = provider.logger(SCOPE);
    let mut record = logger.create_log_record();
    record.set_timestamp(SystemTime::now());
    record.set_severity_number(Severity::Fatal);
    record.set_severity_text("FATAL");
    record.set_body(AnyValue::from(message.to_string()));
    logger.emit(record);
}
