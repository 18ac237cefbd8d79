//! PostgreSQL todo store backed by a `deadpool-postgres` connection pool.

use super::{sql, StoreError, Todo, TodoStore};
use async_trait::async_trait;
use deadpool_postgres::{Config, Object, Pool, PoolConfig, Runtime};
use tokio_postgres::{NoTls, Row};

/// PostgreSQL todo store.
///
/// Creating the store does not connect; connections are opened lazily by
/// the pool, so a database that is down only fails the calls made while it
/// is down.
#[derive(Clone)]
pub struct PostgresTodoStore {
    pool: Pool,
}

impl PostgresTodoStore {
    /// Creates a store for the database at `url` with at most
    /// `max_connections` pooled connections.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not a valid connection string.
    pub fn new(url: &str, max_connections: usize) -> Result<Self, StoreError> {
        let mut cfg = Config::new();
        cfg.url = Some(url.to_string());
        cfg.pool = Some(PoolConfig::new(max_connections.max(1)));

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Creates the `todos` table if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be reached or the statement
    /// fails.
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        let client = self.client().await?;
        client.batch_execute(sql::CREATE_TABLE).await?;
        Ok(())
    }

    async fn client(&self) -> Result<Object, StoreError> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

fn row_to_todo(row: &Row) -> Result<Todo, StoreError> {
    Ok(Todo {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        done: row.try_get("done")?,
    })
}

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[async_trait]
impl TodoStore for PostgresTodoStore {
    fn db_system(&self) -> &'static str {
        "postgresql"
    }

    async fn insert(&self, title: &str) -> Result<Todo, StoreError> {
        let client = self.client().await?;
        let row = client.query_one(sql::INSERT, &[&title]).await?;
        row_to_todo(&row)
    }

    async fn list(&self, offset: usize, limit: usize) -> Result<Vec<Todo>, StoreError> {
        let client = self.client().await?;
        let rows = client
            .query(sql::LIST, &[&to_i64(offset), &to_i64(limit)])
            .await?;
        rows.iter().map(row_to_todo).collect()
    }

    async fn find(&self, id: i32) -> Result<Option<Todo>, StoreError> {
        let client = self.client().await?;
        let row = client.query_opt(sql::FIND, &[&id]).await?;
        row.as_ref().map(row_to_todo).transpose()
    }

    async fn update_done(&self, id: i32) -> Result<Option<Todo>, StoreError> {
        let client = self.client().await?;
        let row = client.query_opt(sql::UPDATE_DONE, &[&id]).await?;
        row.as_ref().map(row_to_todo).transpose()
    }

    async fn delete(&self, id: i32) -> Result<bool, StoreError> {
        let client = self.client().await?;
        let deleted = client.execute(sql::DELETE, &[&id]).await?;
        Ok(deleted > 0)
    }
}
