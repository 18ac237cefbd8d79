//! Store decorator that traces and times every call.

use super::{sql, StoreError, Todo, TodoStore};
use async_trait::async_trait;
use opentelemetry::context::FutureExt;
use opentelemetry::metrics::Histogram;
use opentelemetry::trace::{SpanKind, Status, TraceContextExt, Tracer as _};
use opentelemetry::{Context, KeyValue};
use std::future::Future;
use std::time::Instant;
use telemetry::Tracer;

/// Wraps a [`TodoStore`], opening a client span named `"{OPERATION} todos"`
/// around each call and recording its duration in
/// `db.client.operation.duration`.
///
/// Results are forwarded unchanged; failures are recorded on the span.
pub struct InstrumentedStore<S> {
    inner: S,
    tracer: Tracer,
    duration: Histogram<f64>,
}

impl<S: TodoStore> InstrumentedStore<S> {
    /// Wraps `inner`.
    pub fn new(inner: S, tracer: Tracer, duration: Histogram<f64>) -> Self {
        Self {
            inner,
            tracer,
            duration,
        }
    }

    async fn instrument<T, F>(
        &self,
        operation: &'static str,
        statement: &'static str,
        call: F,
    ) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>> + Send,
        T: Send,
    {
        let system = self.inner.db_system();
        let span = self
            .tracer
            .span_builder(format!("{operation} todos"))
            .with_kind(SpanKind::Client)
            .with_attributes([
                KeyValue::new("db.system", system),
                KeyValue::new("db.operation", operation),
                KeyValue::new("db.statement", statement),
                KeyValue::new("db.sql.table", "todos"),
            ])
            .start(&self.tracer);
        let cx = Context::current_with_span(span);

        let start = Instant::now();
        let result = call.with_context(cx.clone()).await;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        self.duration.record(
            elapsed_ms,
            &[
                KeyValue::new("db.system", system),
                KeyValue::new("db.operation", operation),
            ],
        );
        let span = cx.span();
        if let Err(e) = &result {
            span.record_error(e);
            span.set_status(Status::error(e.to_string()));
        }
        span.end();
        result
    }
}

#[async_trait]
impl<S: TodoStore> TodoStore for InstrumentedStore<S> {
    fn db_system(&self) -> &'static str {
        self.inner.db_system()
    }

    async fn insert(&self, title: &str) -> Result<Todo, StoreError> {
        self.instrument("INSERT", sql::INSERT, self.inner.insert(title))
            .await
    }

    async fn list(&self, offset: usize, limit: usize) -> Result<Vec<Todo>, StoreError> {
        self.instrument("SELECT", sql::LIST, self.inner.list(offset, limit))
            .await
    }

    async fn find(&self, id: i32) -> Result<Option<Todo>, StoreError> {
        self.instrument("SELECT", sql::FIND, self.inner.find(id)).await
    }

    async fn update_done(&self, id: i32) -> Result<Option<Todo>, StoreError> {
        self.instrument("UPDATE", sql::UPDATE_DONE, self.inner.update_done(id))
            .await
    }

    async fn delete(&self, id: i32) -> Result<bool, StoreError> {
        self.instrument("DELETE", sql::DELETE, self.inner.delete(id))
            .await
    }
}
