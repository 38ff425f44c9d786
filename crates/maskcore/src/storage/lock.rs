//! Cross-process advisory locking
//!
//! PostgreSQL session-level advisory locks belong to the connection that took
//! them, so [`PgAdvisoryLock`] keeps one dedicated connection outside the pool
//! for as long as the lock is held. Closing that connection releases the lock
//! even if `unlock` never runs.

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;
use tokio::sync::Mutex;

/// A named, cooperative lock shared by every process using the same database.
#[async_trait]
pub trait AdvisoryLock: Send + Sync {
    /// Tries to take the lock without waiting.
    ///
    /// `Ok(true)` when acquired, `Ok(false)` when another session holds it,
    /// `Err` when the state could not be determined.
    async fn try_lock(&self, name: &str) -> Result<bool, sqlx::Error>;

    /// Releases a lock taken by [`AdvisoryLock::try_lock`].
    async fn unlock(&self, name: &str) -> Result<(), sqlx::Error>;
}

/// Advisory lock backed by `pg_try_advisory_lock(hashtext(name))`.
pub struct PgAdvisoryLock {
    options: PgConnectOptions,
    conn: Mutex<Option<PgConnection>>,
}

impl PgAdvisoryLock {
    pub fn new(options: PgConnectOptions) -> Self {
        Self {
            options,
            conn: Mutex::new(None),
        }
    }
}

#[async_trait]
impl AdvisoryLock for PgAdvisoryLock {
    async fn try_lock(&self, name: &str) -> Result<bool, sqlx::Error> {
        let mut guard = self.conn.lock().await;
        if guard.is_none() {
            *guard = Some(PgConnection::connect_with(&self.options).await?);
        }
        let Some(conn) = guard.as_mut() else {
            return Err(sqlx::Error::PoolClosed);
        };

        let (acquired,): (bool,) = sqlx::query_as("SELECT pg_try_advisory_lock(hashtext($1))")
            .bind(name)
            .fetch_one(&mut *conn)
            .await?;

        if !acquired {
            // Nothing to hold on to; don't keep an idle session around
            if let Some(conn) = guard.take() {
                let _ = conn.close().await;
            }
        }
        Ok(acquired)
    }

    async fn unlock(&self, name: &str) -> Result<(), sqlx::Error> {
        let Some(mut conn) = self.conn.lock().await.take() else {
            return Ok(());
        };

        let result = sqlx::query_scalar::<_, bool>("SELECT pg_advisory_unlock(hashtext($1))")
            .bind(name)
            .fetch_one(&mut conn)
            .await;
        let _ = conn.close().await;

        match result {
            Ok(true) => Ok(()),
            Ok(false) => {
                tracing::debug!(lock = name, "Advisory lock was not held by this session");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
