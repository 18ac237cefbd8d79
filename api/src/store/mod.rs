//! Todo persistence.
//!
//! Handlers talk to a [`TodoStore`]; which backend sits behind it (memory or
//! PostgreSQL) is decided once at startup. [`InstrumentedStore`] wraps any
//! backend with a span and a latency measurement per call.

mod instrumented;
mod memory;
mod postgres;

pub use instrumented::InstrumentedStore;
pub use memory::InMemoryTodoStore;
pub use postgres::PostgresTodoStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// A single todo item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    /// Identifier assigned by the store.
    pub id: i32,
    /// Title text.
    pub title: String,
    /// Whether the item has been completed.
    pub done: bool,
}

/// Errors raised by a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No connection could be obtained from the pool.
    #[error("Database unavailable: {0}")]
    Unavailable(String),

    /// A statement failed.
    #[error("Query failed: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// The in-memory store's lock was poisoned.
    #[error("Failed to acquire store lock")]
    LockError,
}

/// The SQL shape of each store operation, as recorded on database spans.
pub mod sql {
    /// Creates the table if needed.
    pub const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS todos (\
        id SERIAL PRIMARY KEY, \
        title VARCHAR NOT NULL, \
        done BOOLEAN NOT NULL DEFAULT FALSE)";
    /// Inserts a new item.
    pub const INSERT: &str = "INSERT INTO todos (title, done) VALUES ($1, FALSE) RETURNING id, title, done";
    /// Lists a page of items.
    pub const LIST: &str = "SELECT id, title, done FROM todos ORDER BY id OFFSET $1 LIMIT $2";
    /// Fetches one item.
    pub const FIND: &str = "SELECT id, title, done FROM todos WHERE id = $1";
    /// Marks one item done.
    pub const UPDATE_DONE: &str = "UPDATE todos SET done = TRUE WHERE id = $1 RETURNING id, title, done";
    /// Deletes one item.
    pub const DELETE: &str = "DELETE FROM todos WHERE id = $1";
}

/// Storage for todo items.
#[async_trait]
pub trait TodoStore: Send + Sync {
    /// Value of the `db.system` span attribute for this backend.
    fn db_system(&self) -> &'static str;

    /// Stores a new, not-done item and returns it with its id.
    async fn insert(&self, title: &str) -> Result<Todo, StoreError>;

    /// Returns up to `limit` items ordered by id, skipping the first `offset`.
    async fn list(&self, offset: usize, limit: usize) -> Result<Vec<Todo>, StoreError>;

    /// Returns the item with `id`, if any.
    async fn find(&self, id: i32) -> Result<Option<Todo>, StoreError>;

    /// Marks the item done and returns it; `None` if it does not exist.
    /// Marking an already-done item is not an error.
    async fn update_done(&self, id: i32) -> Result<Option<Todo>, StoreError>;

    /// Deletes the item; returns whether it existed.
    async fn delete(&self, id: i32) -> Result<bool, StoreError>;
}

#[async_trait]
impl<T> TodoStore for Arc<T>
where
    T: TodoStore + ?Sized,
{
    fn db_system(&self) -> &'static str {
        (**self).db_system()
    }

    async fn insert(&self, title: &str) -> Result<Todo, StoreError> {
        (**self).insert(title).await
    }

    async fn list(&self, offset: usize, limit: usize) -> Result<Vec<Todo>, StoreError> {
        (**self).list(offset, limit).await
    }

    async fn find(&self, id: i32) -> Result<Option<Todo>, StoreError> {
        (**self).find(id).await
    }

    async fn update_done(&self, id: i32) -> Result<Option<Todo>, StoreError> {
        (**self).update_done(id).await
    }

    async fn delete(&self, id: i32) -> Result<bool, StoreError> {
        (**self).delete(id).await
    }
}
