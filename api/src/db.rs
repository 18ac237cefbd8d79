//! Database selection and startup.
//!
//! With `DATABASE_URL` set the service uses PostgreSQL, otherwise an
//! in-memory store. Schema initialization is retried at a fixed interval; if
//! the database never becomes ready the server still starts, and store calls
//! fail until it does.

use crate::store::{InMemoryTodoStore, PostgresTodoStore, StoreError, TodoStore};
use anyhow::{Context, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use telemetry::Telemetry;

const DB_UNAVAILABLE: &str = "Could not connect to database.";

/// Database configuration.
///
/// Configuration values can be set via environment variables:
/// - `DATABASE_URL`: PostgreSQL connection string (unset: in-memory store)
/// - `DB_CONNECT_RETRIES`: schema initialization attempts (default: 10)
/// - `DB_RETRY_DELAY_MS`: delay between attempts in ms (default: 2000)
/// - `DB_MAX_CONNECTIONS`: pool size (default: 16)
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Connection string; `None` selects the in-memory store.
    pub url: Option<String>,
    /// Schema initialization attempts before giving up.
    pub connect_retries: u32,
    /// Delay between attempts.
    pub retry_delay: Duration,
    /// Maximum pooled connections.
    pub max_connections: usize,
}

impl DatabaseConfig {
    /// Creates a new configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty());

        let connect_retries = std::env::var("DB_CONNECT_RETRIES")
            .ok()
            .map(|v| v.parse::<u32>())
            .transpose()
            .context("DB_CONNECT_RETRIES must be a non-negative integer")?
            .unwrap_or(defaults.connect_retries);

        let retry_delay = std::env::var("DB_RETRY_DELAY_MS")
            .ok()
            .map(|v| v.parse::<u64>())
            .transpose()
            .context("DB_RETRY_DELAY_MS must be a non-negative integer")?
            .map_or(defaults.retry_delay, Duration::from_millis);

        let max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .map(|v| v.parse::<usize>())
            .transpose()
            .context("DB_MAX_CONNECTIONS must be a positive integer")?
            .unwrap_or(defaults.max_connections);

        Ok(Self {
            url,
            connect_retries,
            retry_delay,
            max_connections,
        })
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            connect_retries: 10,
            retry_delay: Duration::from_millis(2000),
            max_connections: 16,
        }
    }
}

/// Opens the configured store and initializes its schema.
///
/// # Errors
///
/// Returns an error only if `DATABASE_URL` is not a valid connection string.
/// An unreachable database is logged and does not fail startup: the console
/// gets an error line and the collector a `FATAL` record.
pub async fn connect_store(
    config: &DatabaseConfig,
    telemetry: &Telemetry,
) -> Result<Arc<dyn TodoStore>> {
    let Some(url) = config.url.as_deref() else {
        tracing::info!("DATABASE_URL not set, using in-memory store");
        return Ok(Arc::new(InMemoryTodoStore::new()));
    };

    let store = PostgresTodoStore::new(url, config.max_connections)
        .context("Invalid DATABASE_URL")?;

    let ready = init_with_retry(config.connect_retries, config.retry_delay, || {
        store.init_schema()
    })
    .await;
    if ready {
        tracing::info!("Database initialized successfully.");
    } else {
        tracing::error!(
            fatal = true,
            attempts = config.connect_retries,
            "{DB_UNAVAILABLE}"
        );
        telemetry.emit_fatal(DB_UNAVAILABLE);
    }

    Ok(Arc::new(store))
}

/// Runs `attempt` up to `retries` times with a fixed `delay` between failures.
///
/// Returns whether an attempt succeeded.
pub async fn init_with_retry<F, Fut>(retries: u32, delay: Duration, mut attempt: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), StoreError>>,
{
    for n in 1..=retries {
        match attempt().await {
            Ok(()) => return true,
            Err(e) => {
                tracing::warn!(
                    attempt = n,
                    retries,
                    error = %e,
                    "Database not ready yet, retrying..."
                );
                if n < retries {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
    false
}
