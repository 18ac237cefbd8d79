//! Root page.

use axum::response::Html;
use axum::{routing::get, Router};

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Observability ToDo App</title>
</head>
<body>
  <h1>Observability ToDo App</h1>
  <p>The API lives under <code>/todos</code>. Traces, metrics and logs are
  exported to the configured OpenTelemetry collector.</p>
</body>
</html>
"#;

/// Creates the root page route.
pub fn index_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/", get(index))
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}
