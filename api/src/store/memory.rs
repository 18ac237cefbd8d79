//! In-memory todo store, used when no database is configured and in tests.

use super::{StoreError, Todo, TodoStore};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

#[derive(Debug)]
struct Inner {
    next_id: i32,
    todos: BTreeMap<i32, Todo>,
}

/// In-memory todo store. Ids start at 1 and are never reused.
#[derive(Debug, Clone)]
pub struct InMemoryTodoStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryTodoStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                next_id: 1,
                todos: BTreeMap::new(),
            })),
        }
    }
}

impl Default for InMemoryTodoStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TodoStore for InMemoryTodoStore {
    fn db_system(&self) -> &'static str {
        "memory"
    }

    async fn insert(&self, title: &str) -> Result<Todo, StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::LockError)?;
        let todo = Todo {
            id: inner.next_id,
            title: title.to_string(),
            done: false,
        };
        inner.next_id += 1;
        inner.todos.insert(todo.id, todo.clone());
        Ok(todo)
    }

    async fn list(&self, offset: usize, limit: usize) -> Result<Vec<Todo>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::LockError)?;
        Ok(inner
            .todos
            .values()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn find(&self, id: i32) -> Result<Option<Todo>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::LockError)?;
        Ok(inner.todos.get(&id).cloned())
    }

    async fn update_done(&self, id: i32) -> Result<Option<Todo>, StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::LockError)?;
        Ok(inner.todos.get_mut(&id).map(|todo| {
            todo.done = true;
            todo.clone()
        }))
    }

    async fn delete(&self, id: i32) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::LockError)?;
        Ok(inner.todos.remove(&id).is_some())
    }
}
