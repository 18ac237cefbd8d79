//! Application state module.
//!
//! Defines the shared application state that is passed to route handlers
//! and to the tracing middleware.

use crate::store::{InMemoryTodoStore, InstrumentedStore, TodoStore};
use opentelemetry::metrics::{Counter, Histogram};
use std::sync::Arc;
use telemetry::{Telemetry, Tracer};

/// Request-level instruments recorded by the tracing middleware.
#[derive(Clone)]
pub struct HttpMetrics {
    /// `http.server.request.count`
    pub requests: Counter<u64>,
    /// `http.server.duration`, in milliseconds.
    pub duration: Histogram<f64>,
}

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The instrumented todo store.
    store: Arc<dyn TodoStore>,
    /// Providers for traces, metrics and logs.
    telemetry: Telemetry,
    /// Request count and latency instruments.
    http_metrics: HttpMetrics,
}

impl AppState {
    /// Creates the application state, wrapping `store` so that every call
    /// is traced and timed.
    pub fn new(store: Arc<dyn TodoStore>, telemetry: Telemetry) -> Self {
        let meter = telemetry.meter();
        let http_metrics = HttpMetrics {
            requests: meter
                .u64_counter("http.server.request.count")
                .with_description("Number of HTTP requests served")
                .with_unit("{request}")
                .build(),
            duration: meter
                .f64_histogram("http.server.duration")
                .with_description("Duration of inbound HTTP requests")
                .with_unit("ms")
                .build(),
        };
        let db_duration = meter
            .f64_histogram("db.client.operation.duration")
            .with_description("Duration of database operations")
            .with_unit("ms")
            .build();

        let store = Arc::new(InstrumentedStore::new(store, telemetry.tracer(), db_duration));

        Self {
            store,
            telemetry,
            http_metrics,
        }
    }

    /// Creates the application state with an in-memory store.
    #[must_use]
    pub fn with_in_memory_store(telemetry: Telemetry) -> Self {
        Self::new(Arc::new(InMemoryTodoStore::new()), telemetry)
    }

    /// Returns the todo store.
    #[must_use]
    pub fn store(&self) -> &dyn TodoStore {
        self.store.as_ref()
    }

    /// Returns the telemetry context.
    #[must_use]
    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    /// Returns a tracer for manual spans.
    #[must_use]
    pub fn tracer(&self) -> Tracer {
        self.telemetry.tracer()
    }

    /// Returns the request-level instruments.
    #[must_use]
    pub fn http_metrics(&self) -> &HttpMetrics {
        &self.http_metrics
    }
}
