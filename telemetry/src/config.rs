//! Telemetry configuration module.
//!
//! Loads exporter and batching settings from the standard `OTEL_*`
//! environment variables, with the usual SDK defaults.

use anyhow::{Context, Result};
use std::time::Duration;

/// Batching of one export pipeline (spans or logs).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSettings {
    /// Interval between two consecutive exports.
    pub scheduled_delay: Duration,
    /// Records buffered before new ones are dropped.
    pub max_queue_size: usize,
    /// Records sent per export request.
    pub max_export_batch_size: usize,
}

impl BatchSettings {
    /// SDK defaults for the span pipeline.
    #[must_use]
    pub fn spans() -> Self {
        Self {
            scheduled_delay: Duration::from_millis(5000),
            max_queue_size: 2048,
            max_export_batch_size: 512,
        }
    }

    /// SDK defaults for the log pipeline.
    #[must_use]
    pub fn logs() -> Self {
        Self {
            scheduled_delay: Duration::from_millis(1000),
            ..Self::spans()
        }
    }

    /// Overrides the scheduled delay.
    #[must_use]
    pub fn with_scheduled_delay(mut self, delay: Duration) -> Self {
        self.scheduled_delay = delay;
        self
    }
}

/// Telemetry configuration.
///
/// Configuration values can be set via environment variables:
/// - `OTEL_SERVICE_NAME`: service name on every record (default: "`todo_service`")
/// - `OTEL_EXPORTER_OTLP_ENDPOINT`: collector base URL (default: "<http://localhost:4318>")
/// - `OTEL_EXPORTER_OTLP_TIMEOUT`: export request timeout in ms (default: 10000)
/// - `OTEL_BSP_SCHEDULE_DELAY`: span flush interval in ms (default: 5000)
/// - `OTEL_BSP_MAX_QUEUE_SIZE`: span queue capacity (default: 2048)
/// - `OTEL_BSP_MAX_EXPORT_BATCH_SIZE`: spans per export (default: 512)
/// - `OTEL_BLRP_SCHEDULE_DELAY`: log flush interval in ms (default: 1000)
/// - `OTEL_METRIC_EXPORT_INTERVAL`: metric export interval in ms (default: 5000)
///
/// A value of `0` keeps the default. `OTEL_RESOURCE_ATTRIBUTES` is read by
/// the SDK resource detector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Logical service name.
    pub service_name: String,
    /// Service version reported as `service.version`.
    pub service_version: String,
    /// Collector base URL; `/v1/traces`, `/v1/metrics` and `/v1/logs` are
    /// appended to it.
    pub endpoint: String,
    /// Per-request export timeout.
    pub export_timeout: Duration,
    /// Span pipeline batching.
    pub span_batch: BatchSettings,
    /// Log pipeline batching.
    pub log_batch: BatchSettings,
    /// Interval of the periodic metric reader.
    pub metric_interval: Duration,
}

/// Reads positive integers from a variable lookup; unset, empty and `0`
/// all mean "use the default".
struct Vars<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.trim().is_empty())
    }

    fn positive(&self, name: &str) -> Result<Option<u64>> {
        let Some(raw) = self.string(name) else {
            return Ok(None);
        };
        let value = raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("{name} must be a non-negative integer, got {raw:?}"))?;
        Ok((value > 0).then_some(value))
    }

    fn millis(&self, name: &str) -> Result<Option<Duration>> {
        Ok(self.positive(name)?.map(Duration::from_millis))
    }

    fn size(&self, name: &str) -> Result<Option<usize>> {
        self.positive(name)?
            .map(|v| usize::try_from(v).with_context(|| format!("{name} is out of range")))
            .transpose()
    }
}

impl TelemetryConfig {
    /// Creates a new configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Creates a configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable is set but cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let vars = Vars { lookup };
        let defaults = Self::default();

        let span_batch = BatchSettings {
            scheduled_delay: vars
                .millis("OTEL_BSP_SCHEDULE_DELAY")?
                .unwrap_or(defaults.span_batch.scheduled_delay),
            max_queue_size: vars
                .size("OTEL_BSP_MAX_QUEUE_SIZE")?
                .unwrap_or(defaults.span_batch.max_queue_size),
            max_export_batch_size: vars
                .size("OTEL_BSP_MAX_EXPORT_BATCH_SIZE")?
                .unwrap_or(defaults.span_batch.max_export_batch_size),
        };
        let log_batch = match vars.millis("OTEL_BLRP_SCHEDULE_DELAY")? {
            Some(delay) => defaults.log_batch.with_scheduled_delay(delay),
            None => defaults.log_batch,
        };

        Ok(Self {
            service_name: vars
                .string("OTEL_SERVICE_NAME")
                .unwrap_or(defaults.service_name),
            service_version: defaults.service_version,
            endpoint: vars
                .string("OTEL_EXPORTER_OTLP_ENDPOINT")
                .map_or(defaults.endpoint, |e| e.trim_end_matches('/').to_string()),
            export_timeout: vars
                .millis("OTEL_EXPORTER_OTLP_TIMEOUT")?
                .unwrap_or(defaults.export_timeout),
            span_batch,
            log_batch,
            metric_interval: vars
                .millis("OTEL_METRIC_EXPORT_INTERVAL")?
                .unwrap_or(defaults.metric_interval),
        })
    }

    /// Overrides the service version.
    #[must_use]
    pub fn with_service_version(mut self, version: impl Into<String>) -> Self {
        self.service_version = version.into();
        self
    }

    /// Returns the full URL of one signal, e.g. `signal_url("traces")`.
    #[must_use]
    pub fn signal_url(&self, signal: &str) -> String {
        format!("{}/v1/{signal}", self.endpoint)
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "todo_service".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            endpoint: "http://localhost:4318".to_string(),
            export_timeout: Duration::from_millis(10_000),
            span_batch: BatchSettings::spans(),
            log_batch: BatchSettings::logs(),
            metric_interval: Duration::from_millis(5000),
        }
    }
}
