//! Todo CRUD endpoints.
//!
//! Each handler logs what it is about to do before touching the store. The
//! logs are emitted inside the request span, so they carry its trace context.

use crate::error::ApiError;
use crate::state::AppState;
use crate::store::Todo;
use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use opentelemetry::trace::{TraceContextExt, Tracer};
use opentelemetry::KeyValue;
use validator::Validate;

/// Request body for creating a todo.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTodo {
    /// Title text, 1 to 255 characters.
    #[validate(length(min = 1, max = 255, message = "Title must be between 1 and 255 characters"))]
    pub title: String,
}

/// Pagination parameters for listing todos.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    /// Items to skip (default 0).
    #[serde(default)]
    pub skip: usize,
    /// Maximum items to return (default 100).
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    100
}

fn count_value(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Creates the todo routes.
pub fn todo_routes() -> Router<AppState> {
    Router::new()
        .route("/todos", get(list_todos).post(create_todo))
        .route("/todos/{id}/done", put(mark_done))
        .route("/todos/{id}", delete(delete_todo))
}

/// `GET /todos`: lists a page of todos and reports how many are completed.
async fn list_todos(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Todo>>, ApiError> {
    tracing::info!(skip = params.skip, limit = params.limit, "Fetching todos list");
    let todos = state.store().list(params.skip, params.limit).await?;

    state.tracer().in_span("calculate_stats", |cx| {
        let done_count = todos.iter().filter(|todo| todo.done).count();
        tracing::info!(
            total = todos.len(),
            completed = done_count,
            "Found {} todos, {} completed.",
            todos.len(),
            done_count
        );
        let span = cx.span();
        span.set_attribute(KeyValue::new("todos.total", count_value(todos.len())));
        span.set_attribute(KeyValue::new("todos.completed", count_value(done_count)));
    });

    Ok(Json(todos))
}

/// `POST /todos`: creates a todo.
async fn create_todo(
    State(state): State<AppState>,
    Json(payload): Json<CreateTodo>,
) -> Result<Json<Todo>, ApiError> {
    tracing::info!("Creating todo: {}", payload.title);
    payload.validate()?;

    let todo = state.store().insert(&payload.title).await?;
    Ok(Json(todo))
}

/// `PUT /todos/{id}/done`: marks a todo as done. Repeating it is harmless.
async fn mark_done(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Todo>, ApiError> {
    tracing::info!(todo_id = id, "Marking todo {id} as done");

    match state.store().update_done(id).await? {
        Some(todo) => Ok(Json(todo)),
        None => {
            tracing::warn!(todo_id = id, "Todo {id} not found");
            Err(ApiError::NotFound)
        }
    }
}

/// `DELETE /todos/{id}`: deletes a todo.
async fn delete_todo(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    tracing::info!(todo_id = id, "Deleting todo {id}");

    if state.store().delete(id).await? {
        Ok(Json(json!({ "ok": true })))
    } else {
        tracing::warn!(todo_id = id, "Todo {id} not found");
        Err(ApiError::NotFound)
    }
}
