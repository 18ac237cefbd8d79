//! Integration tests for the todo CRUD endpoints.
//!
//! Tests cover:
//! - The create, list, mark-done, delete scenario
//! - Idempotent mark-done and double delete
//! - Validation and pagination

use axum::http::StatusCode;
use serde_json::json;

use super::common::{delete, get, post_json, put, test_app};

#[tokio::test]
async fn test_full_scenario() {
    let (app, _captured) = test_app();

    let (status, created) = post_json(app.clone(), "/todos", json!({"title": "Buy milk"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created, json!({"id": 1, "title": "Buy milk", "done": false}));

    let (status, list) = get(app.clone(), "/todos").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list, json!([{"id": 1, "title": "Buy milk", "done": false}]));

    let (status, done) = put(app.clone(), "/todos/1/done").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["done"], true);

    let (status, deleted) = delete(app.clone(), "/todos/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted, json!({"ok": true}));

    let (status, list) = get(app, "/todos").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn test_n_creates_are_listed() {
    let (app, _captured) = test_app();

    for i in 0..7 {
        let (status, _) = post_json(app.clone(), "/todos", json!({"title": format!("Task-{i}")})).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, list) = get(app, "/todos").await;
    assert_eq!(list.as_array().unwrap().len(), 7);
}

#[tokio::test]
async fn test_mark_done_twice_is_idempotent() {
    let (app, _captured) = test_app();
    post_json(app.clone(), "/todos", json!({"title": "Walk dog"})).await;

    let (first_status, first) = put(app.clone(), "/todos/1/done").await;
    let (second_status, second) = put(app, "/todos/1/done").await;

    assert_eq!(first_status, StatusCode::OK);
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(first, second);
    assert_eq!(second["done"], true);
}

#[tokio::test]
async fn test_mark_done_missing_is_404() {
    let (app, _captured) = test_app();

    let (status, body) = put(app, "/todos/42/done").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"detail": "Todo not found"}));
}

#[tokio::test]
async fn test_delete_twice_second_is_404() {
    let (app, _captured) = test_app();
    post_json(app.clone(), "/todos", json!({"title": "Buy milk"})).await;

    let (status, _) = delete(app.clone(), "/todos/1").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = delete(app, "/todos/1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Todo not found");
}

#[tokio::test]
async fn test_empty_title_is_rejected() {
    let (app, _captured) = test_app();

    let (status, body) = post_json(app.clone(), "/todos", json!({"title": ""})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].as_str().unwrap().contains("title"));

    let (status, _) = post_json(app.clone(), "/todos", json!({"name": "no title"})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, list) = get(app, "/todos").await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn test_list_pagination() {
    let (app, _captured) = test_app();
    for i in 0..5 {
        post_json(app.clone(), "/todos", json!({"title": format!("Task-{i}")})).await;
    }

    let (status, page) = get(app.clone(), "/todos?skip=1&limit=2").await;
    assert_eq!(status, StatusCode::OK);
    let page = page.as_array().unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0]["title"], "Task-1");
    assert_eq!(page[1]["title"], "Task-2");

    let (status, _) = get(app, "/todos?limit=-1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
