//! Connection pool and the retrying [`Database`] handle

use std::future::Future;
use std::str::FromStr;

use sqlx::postgres::{PgConnectOptions, PgConnection, PgPoolOptions, PgSslMode};
use sqlx::{Connection, PgPool};

use crate::config;
use crate::error::AppResult;
use crate::retry::{retry, RetryConfig};

/// Builds connect options from a `DATABASE_URL`.
///
/// A bare URL (no query string) gets pooler-friendly defaults: the prepared
/// statement cache is disabled, since transaction-mode poolers such as
/// PgBouncer cannot route named statements, and TLS is required. A URL that
/// already carries parameters is taken as is.
pub fn connect_options(database_url: &str) -> Result<PgConnectOptions, sqlx::Error> {
    let options = PgConnectOptions::from_str(database_url)?;

    if database_url.contains('?') {
        return Ok(options);
    }

    Ok(options.statement_cache_capacity(0).ssl_mode(PgSslMode::Require))
}

/// Create a PostgreSQL connection pool.
///
/// Does not connect eagerly; the first query (usually [`Database::ping`])
/// opens the first connection.
pub fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    let options = connect_options(database_url)?;

    Ok(PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(config::database::pool_timeout())
        .connect_lazy_with(options))
}

/// Drops every prepared statement of a fresh session (`DEALLOCATE ALL`).
///
/// Maintenance for setups behind a transaction pooler, where statements
/// prepared by earlier clients can linger on server connections.
pub async fn clear_prepared_statements(database_url: &str) -> Result<(), sqlx::Error> {
    let mut conn = PgConnection::connect_with(&connect_options(database_url)?).await?;
    sqlx::query("DEALLOCATE ALL").execute(&mut conn).await?;
    conn.close().await
}

/// Pooled database handle with a retry-on-transient-failure execution primitive.
///
/// Cloning is cheap (the pool is reference counted). The process entry point
/// creates one and hands clones to the HTTP state and the bot.
#[derive(Clone, Debug)]
pub struct Database {
    pool: PgPool,
    retry: RetryConfig,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            retry: RetryConfig::database(),
        }
    }

    /// Connects lazily using the configured URL and pool size.
    pub fn from_config(config: &config::Config) -> AppResult<Self> {
        let pool = create_pool(&config.database_url, config.db_max_connections)?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs `operation`, retrying transient connection failures.
    ///
    /// Connection errors and pool exhaustion are retried with exponential
    /// backoff; every other error is returned immediately and unchanged.
    pub async fn run<F, Fut, T>(&self, operation: F) -> Result<T, sqlx::Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, sqlx::Error>>,
    {
        retry(&self.retry, operation).await
    }

    /// `SELECT 1` through the retry wrapper.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        self.run(|| sqlx::query("SELECT 1").execute(&self.pool)).await?;
        Ok(())
    }

    /// Applies the embedded migrations.
    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Closes every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
