//! Request tracing middleware.
//!
//! Opens a server span per request, continuing the caller's trace when a
//! valid W3C `traceparent` header is present, runs the rest of the stack
//! with that span as the active [`Context`] and records the request count
//! and latency.

use crate::error::ErrorDescription;
use crate::state::AppState;
use axum::extract::{MatchedPath, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use opentelemetry::context::FutureExt;
use opentelemetry::propagation::{Extractor, TextMapPropagator};
use opentelemetry::trace::{SpanKind, Status, TraceContextExt, Tracer};
use opentelemetry::{Context, KeyValue};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use std::time::Instant;

/// Header carrying the caller's trace context.
pub const TRACEPARENT: &str = "traceparent";

/// Reads propagation headers. W3C trace context is lowercase hex only, so
/// a `traceparent` with uppercase letters is treated as absent.
struct HeaderExtractor<'a>(&'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        let value = self.0.get(key)?.to_str().ok()?;
        if key.eq_ignore_ascii_case(TRACEPARENT) && value.bytes().any(|b| b.is_ascii_uppercase()) {
            return None;
        }
        Some(value)
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|name| name.as_str()).collect()
    }
}

/// Returns the remote parent described by the request headers, or an empty
/// context when there is none or it is malformed.
pub fn extract_parent(headers: &HeaderMap) -> Context {
    TraceContextPropagator::new().extract(&HeaderExtractor(headers))
}

/// Traces and measures one request. The response is returned unchanged.
pub async fn trace_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().as_str().to_string();
    let path = request.uri().path().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| path.clone(), |matched| matched.as_str().to_string());
    let parent = extract_parent(request.headers());

    let tracer = state.tracer();
    let span = tracer
        .span_builder(format!("{method} {route}"))
        .with_kind(SpanKind::Server)
        .with_attributes([
            KeyValue::new("http.request.method", method.clone()),
            KeyValue::new("url.path", path),
            KeyValue::new("http.route", route.clone()),
        ])
        .start_with_context(&tracer, &parent);
    let cx = parent.with_span(span);

    let start = Instant::now();
    let response = next.run(request).with_context(cx.clone()).await;
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

    let status = response.status();
    let span = cx.span();
    span.set_attribute(KeyValue::new(
        "http.response.status_code",
        i64::from(status.as_u16()),
    ));
    if status.is_server_error() {
        let description = response
            .extensions()
            .get::<ErrorDescription>()
            .map(|d| d.0.clone())
            .or_else(|| status.canonical_reason().map(str::to_string))
            .unwrap_or_default();
        span.set_status(Status::error(description));
    }

    let labels = [
        KeyValue::new("http.request.method", method),
        KeyValue::new("http.route", route),
        KeyValue::new("http.response.status_code", i64::from(status.as_u16())),
    ];
    let metrics = state.http_metrics();
    metrics.requests.add(1, &labels);
    metrics.duration.record(elapsed_ms, &labels);

    span.end();
    response
}
