//! Process-wide telemetry setup.
//!
//! [`Telemetry`] owns the three OpenTelemetry SDK providers. It is built once
//! at startup, handed to whatever needs a tracer, meter or logger, and shut
//! down once at exit so that buffered records are flushed.

use crate::config::{BatchSettings, TelemetryConfig};
use crate::logs;
use opentelemetry::metrics::{Meter, MeterProvider as _};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_otlp::{ExporterBuildError, Protocol, WithExportConfig};
use opentelemetry_sdk::logs::{BatchLogProcessor, LogExporter, SdkLoggerProvider};
use opentelemetry_sdk::metrics::exporter::PushMetricExporter;
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider, Temporality};
use opentelemetry_sdk::trace::{BatchSpanProcessor, SdkTracerProvider, SpanExporter};
use opentelemetry_sdk::Resource;
use std::sync::Arc;
use thiserror::Error;
use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Instrumentation scope of the service's tracer and meter.
const SCOPE: &str = "todo_service";

/// The SDK tracer handed out by [`Telemetry::tracer`].
pub type Tracer = <SdkTracerProvider as opentelemetry::trace::TracerProvider>::Tracer;

/// Errors raised while setting up telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// An OTLP exporter could not be created.
    #[error("Exporter setup failed: {0}")]
    Exporter(#[from] ExporterBuildError),

    /// A global `tracing` subscriber is already installed.
    #[error("Failed to install tracing subscriber: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

fn span_processor<E: SpanExporter + 'static>(exporter: E, batch: BatchSettings) -> BatchSpanProcessor {
    let config = opentelemetry_sdk::trace::BatchConfigBuilder::default()
        .with_scheduled_delay(batch.scheduled_delay)
        .with_max_queue_size(batch.max_queue_size)
        .with_max_export_batch_size(batch.max_export_batch_size)
        .build();
    BatchSpanProcessor::builder(exporter)
        .with_batch_config(config)
        .build()
}

fn log_processor<E: LogExporter + 'static>(exporter: E, batch: BatchSettings) -> BatchLogProcessor {
    let config = opentelemetry_sdk::logs::BatchConfigBuilder::default()
        .with_scheduled_delay(batch.scheduled_delay)
        .with_max_queue_size(batch.max_queue_size)
        .with_max_export_batch_size(batch.max_export_batch_size)
        .build();
    BatchLogProcessor::builder(exporter)
        .with_batch_config(config)
        .build()
}

/// The trace, metric and log providers of one service. Cheap to clone.
#[derive(Clone)]
pub struct Telemetry {
    service_name: Arc<str>,
    endpoint: Arc<str>,
    tracer_provider: SdkTracerProvider,
    meter_provider: SdkMeterProvider,
    logger_provider: SdkLoggerProvider,
}

impl Telemetry {
    /// Builds telemetry exporting all signals as OTLP/HTTP JSON to
    /// `{endpoint}/v1/traces`, `/v1/metrics` and `/v1/logs`. Metrics use
    /// delta temporality.
    ///
    /// Nothing is sent until the first batch is ready, so an unreachable
    /// collector does not fail startup.
    ///
    /// # Errors
    ///
    /// Returns an error if an exporter cannot be created.
    pub fn from_config(config: &TelemetryConfig) -> Result<Self, TelemetryError> {
        let spans = opentelemetry_otlp::SpanExporter::builder()
            .with_http()
            .with_protocol(Protocol::HttpJson)
            .with_endpoint(config.signal_url("traces"))
            .with_timeout(config.export_timeout)
            .build()?;
        let logs = opentelemetry_otlp::LogExporter::builder()
            .with_http()
            .with_protocol(Protocol::HttpJson)
            .with_endpoint(config.signal_url("logs"))
            .with_timeout(config.export_timeout)
            .build()?;
        let metrics = opentelemetry_otlp::MetricExporter::builder()
            .with_temporality(Temporality::Delta)
            .with_http()
            .with_protocol(Protocol::HttpJson)
            .with_endpoint(config.signal_url("metrics"))
            .with_timeout(config.export_timeout)
            .build()?;

        Ok(Self::with_exporters(config, spans, logs, metrics))
    }

    /// Builds telemetry around the given exporters, batching spans and logs
    /// and reading metrics periodically as `config` describes.
    pub fn with_exporters<S, L, M>(config: &TelemetryConfig, spans: S, logs: L, metrics: M) -> Self
    where
        S: SpanExporter + 'static,
        L: LogExporter + 'static,
        M: PushMetricExporter,
    {
        let resource = Resource::builder()
            .with_service_name(config.service_name.clone())
            .with_attribute(KeyValue::new("service.version", config.service_version.clone()))
            .build();

        let tracer_provider = SdkTracerProvider::builder()
            .with_resource(resource.clone())
            .with_span_processor(span_processor(spans, config.span_batch))
            .build();
        let meter_provider = SdkMeterProvider::builder()
            .with_resource(resource.clone())
            .with_reader(
                PeriodicReader::builder(metrics)
                    .with_interval(config.metric_interval)
                    .build(),
            )
            .build();
        let logger_provider = SdkLoggerProvider::builder()
            .with_resource(resource)
            .with_log_processor(log_processor(logs, config.log_batch))
            .build();

        Self {
            service_name: config.service_name.as_str().into(),
            endpoint: config.endpoint.as_str().into(),
            tracer_provider,
            meter_provider,
            logger_provider,
        }
    }

    /// Returns the `service.name` attached to every record.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Returns a tracer.
    #[must_use]
    pub fn tracer(&self) -> Tracer {
        self.tracer_provider.tracer(SCOPE)
    }

    /// Returns a meter, for creating instruments.
    #[must_use]
    pub fn meter(&self) -> Meter {
        self.meter_provider.meter(SCOPE)
    }

    /// Returns the tracer provider.
    #[must_use]
    pub fn tracer_provider(&self) -> &SdkTracerProvider {
        &self.tracer_provider
    }

    /// Returns the meter provider.
    #[must_use]
    pub fn meter_provider(&self) -> &SdkMeterProvider {
        &self.meter_provider
    }

    /// Returns the logger provider.
    #[must_use]
    pub fn logger_provider(&self) -> &SdkLoggerProvider {
        &self.logger_provider
    }

    /// Returns a `tracing` layer that forwards events into the log pipeline.
    pub fn log_layer<S>(&self) -> impl Layer<S>
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        logs::log_layer(&self.logger_provider)
    }

    /// Exports a `FATAL` log record, correlated with the active span.
    pub fn emit_fatal(&self, message: &str) {
        logs::emit_fatal(&self.logger_provider, message);
    }

    fn subscriber<W>(&self, writer: W) -> impl Subscriber + Send + Sync + 'static
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(writer))
            .with(self.log_layer())
    }

    fn log_startup(&self) {
        tracing::info!(
            endpoint = %self.endpoint,
            service = %self.service_name,
            "telemetry exporting to OTLP/HTTP collector"
        );
    }

    /// Installs the global `tracing` subscriber: `RUST_LOG` filtering
    /// (default `info`), console output and the log bridge.
    ///
    /// # Errors
    ///
    /// Returns an error if a global subscriber is already installed.
    pub fn init_subscriber(&self) -> Result<(), TelemetryError> {
        self.subscriber(std::io::stdout).try_init()?;
        self.log_startup();
        Ok(())
    }

    /// Exports everything buffered in all three pipelines. Blocks until the
    /// exporters return.
    pub fn force_flush(&self) {
        if let Err(e) = self.tracer_provider.force_flush() {
            tracing::warn!(error = %e, "span flush failed");
        }
        if let Err(e) = self.meter_provider.force_flush() {
            tracing::warn!(error = %e, "metric flush failed");
        }
        if let Err(e) = self.logger_provider.force_flush() {
            tracing::warn!(error = %e, "log flush failed");
        }
    }

    /// Flushes and stops all pipelines. Blocks until the exporters return.
    pub fn shutdown(&self) {
        if let Err(e) = self.tracer_provider.shutdown() {
            tracing::warn!(error = %e, "tracer provider shutdown failed");
        }
        if let Err(e) = self.meter_provider.shutdown() {
            tracing::warn!(error = %e, "meter provider shutdown failed");
        }
        if let Err(e) = self.logger_provider.shutdown() {
            tracing::warn!(error = %e, "logger provider shutdown failed");
        }
    }
}
