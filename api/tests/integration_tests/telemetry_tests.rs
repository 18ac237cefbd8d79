//! Integration tests for the telemetry the API emits.
//!
//! Tests cover:
//! - Server, database and manual spans and their parentage
//! - `traceparent` continuation
//! - Log correlation with the active span
//! - Request metrics
//! - Error status on server failures
//! - Requests succeeding while the collector is unreachable

use axum::body::Body;
use axum::http::{Request, StatusCode};
use opentelemetry::logs::Severity;
use opentelemetry::trace::{SpanKind, Status};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use telemetry::config::{BatchSettings, TelemetryConfig};
use telemetry::Telemetry;
use todo_api::store::PostgresTodoStore;
use todo_api::{create_router, AppState};

use super::common::{attribute, get, is_root, post_json, put, send, test_app, test_telemetry};

fn with_traceparent(value: &str) -> Request<Body> {
    Request::builder()
        .uri("/todos")
        .header("traceparent", value)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_list_request_span_tree() {
    let (app, captured) = test_app();

    get(app, "/todos").await;
    captured.flush();

    let server = &captured.spans_named("GET /todos")[0];
    let query = &captured.spans_named("SELECT todos")[0];
    let stats = &captured.spans_named("calculate_stats")[0];

    assert!(is_root(server));
    assert_eq!(server.span_kind, SpanKind::Server);
    assert_eq!(query.span_kind, SpanKind::Client);
    assert_eq!(stats.span_kind, SpanKind::Internal);

    for child in [query, stats] {
        assert_eq!(child.span_context.trace_id(), server.span_context.trace_id());
        assert_eq!(child.parent_span_id, server.span_context.span_id());
    }
    assert_eq!(attribute(query, "db.operation").as_deref(), Some("SELECT"));
    assert_eq!(attribute(server, "http.response.status_code").as_deref(), Some("200"));
    assert_eq!(attribute(stats, "todos.total").as_deref(), Some("0"));
}

#[tokio::test]
async fn test_span_name_uses_route_template() {
    let (app, captured) = test_app();
    post_json(app.clone(), "/todos", json!({"title": "Buy milk"})).await;

    put(app, "/todos/1/done").await;
    captured.flush();

    let spans = captured.spans_named("PUT /todos/{id}/done");
    assert_eq!(spans.len(), 1);
    assert_eq!(attribute(&spans[0], "url.path").as_deref(), Some("/todos/1/done"));
    assert_eq!(attribute(&spans[0], "http.route").as_deref(), Some("/todos/{id}/done"));
    assert_eq!(attribute(&spans[0], "http.request.method").as_deref(), Some("PUT"));
}

#[tokio::test]
async fn test_unrelated_requests_have_distinct_traces() {
    let (app, captured) = test_app();

    get(app.clone(), "/todos").await;
    get(app, "/todos").await;
    captured.flush();

    let spans = captured.spans_named("GET /todos");
    assert_eq!(spans.len(), 2);
    assert_ne!(spans[0].span_context.trace_id(), spans[1].span_context.trace_id());
}

#[tokio::test]
async fn test_traceparent_is_continued() {
    let (app, captured) = test_app();

    send(
        app,
        with_traceparent("00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01"),
    )
    .await;
    captured.flush();

    let server = &captured.spans_named("GET /todos")[0];
    assert_eq!(
        server.span_context.trace_id().to_string(),
        "4bf92f3577b34da6a3ce929d0e0e4736"
    );
    assert_eq!(server.parent_span_id.to_string(), "00f067aa0ba902b7");
}

#[tokio::test]
async fn test_malformed_traceparent_starts_new_trace() {
    let (app, captured) = test_app();

    for value in [
        "garbage",
        "00-4BF92F3577B34DA6A3CE929D0E0E4736-00F067AA0BA902B7-01",
    ] {
        let (status, _) = send(app.clone(), with_traceparent(value)).await;
        assert_eq!(status, StatusCode::OK);
    }
    captured.flush();

    let spans = captured.spans_named("GET /todos");
    assert_eq!(spans.len(), 2);
    for span in &spans {
        assert!(is_root(span));
        assert_ne!(
            span.span_context.trace_id().to_string(),
            "4bf92f3577b34da6a3ce929d0e0e4736"
        );
    }
}

#[tokio::test]
async fn test_handler_logs_carry_trace_context() {
    let (app, captured) = test_app();
    let _guard = captured.capture_logs();

    tracing::info!("outside any request");
    get(app, "/todos").await;
    captured.flush();

    let server = &captured.spans_named("GET /todos")[0];
    let stats = &captured.spans_named("calculate_stats")[0];

    let fetching = &captured.logs_with_message("Fetching todos list")[0];
    let fetching_cx = fetching.trace_context().unwrap();
    assert_eq!(fetching_cx.trace_id, server.span_context.trace_id());
    assert_eq!(fetching_cx.span_id, server.span_context.span_id());

    let found = &captured.logs_with_message("Found 0 todos, 0 completed.")[0];
    assert_eq!(found.trace_context().unwrap().span_id, stats.span_context.span_id());

    let outside = &captured.logs_with_message("outside any request")[0];
    assert!(outside.trace_context().is_none());
}

#[tokio::test]
async fn test_not_found_logs_warning() {
    let (app, captured) = test_app();
    let _guard = captured.capture_logs();

    let (status, _) = put(app, "/todos/9/done").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    captured.flush();

    let warning = &captured.logs_with_message("Todo 9 not found")[0];
    assert_eq!(warning.severity_number(), Some(Severity::Warn));

    // 4xx responses do not mark the server span as failed.
    let server = &captured.spans_named("PUT /todos/{id}/done")[0];
    assert_eq!(server.status, Status::Unset);
    assert_eq!(attribute(server, "http.response.status_code").as_deref(), Some("404"));
}

#[tokio::test]
async fn test_request_metrics() {
    let (app, captured) = test_app();

    get(app.clone(), "/todos").await;
    get(app.clone(), "/todos").await;
    put(app, "/todos/1/done").await;
    captured.flush();

    let list_route = ("http.route", "/todos");
    assert_eq!(captured.counter_total("http.server.request.count", list_route), 2);
    assert_eq!(
        captured.counter_total("http.server.request.count", ("http.response.status_code", "404")),
        1
    );
    assert_eq!(captured.histogram_count("http.server.duration", list_route), 2);
    assert!(captured.histogram_count("db.client.operation.duration", ("db.operation", "SELECT")) >= 2);
}

#[tokio::test]
async fn test_storage_failure_is_500_with_error_span() {
    let captured = test_telemetry();
    let store = PostgresTodoStore::new("postgres://user:pw@127.0.0.1:1/todo_db", 1).unwrap();
    let app = create_router(AppState::new(Arc::new(store), captured.telemetry.clone()));

    let (status, body) = get(app, "/todos").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["detail"], "Internal Server Error");
    captured.flush();

    let server = &captured.spans_named("GET /todos")[0];
    match &server.status {
        Status::Error { description } => assert!(description.contains("Database unavailable")),
        other => panic!("expected an error status, got {other:?}"),
    }

    let query = &captured.spans_named("SELECT todos")[0];
    assert!(matches!(query.status, Status::Error { .. }));
    assert_eq!(attribute(query, "db.system").as_deref(), Some("postgresql"));
}

/// The OTLP exporters block on their own worker threads, so telemetry is
/// built and shut down outside the runtime, as `main` does.
#[test]
fn test_unreachable_collector_does_not_affect_responses() {
    let fast = Duration::from_millis(10);
    let config = TelemetryConfig {
        endpoint: "http://127.0.0.1:1".to_string(),
        export_timeout: Duration::from_millis(200),
        span_batch: BatchSettings::spans().with_scheduled_delay(fast),
        log_batch: BatchSettings::logs().with_scheduled_delay(fast),
        metric_interval: fast,
        ..TelemetryConfig::default()
    };
    let telemetry = Telemetry::from_config(&config).unwrap();
    let app = create_router(AppState::with_in_memory_store(telemetry.clone()));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    runtime.block_on(async {
        for _ in 0..3 {
            let (status, _) = post_json(app.clone(), "/todos", json!({"title": "Buy milk"})).await;
            assert_eq!(status, StatusCode::OK);
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        let (status, list) = get(app, "/todos").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 3);
    });
    drop(runtime);

    telemetry.shutdown();
}
