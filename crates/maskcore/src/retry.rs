//! Retry logic for failed operations with exponential backoff.
//!
//! Provides a configurable retry strategy with:
//! - Exponential backoff, capped per delay
//! - A bounded number of attempts
//! - Per-error classification through [`Retryable`]
//!
//! The database wrapper ([`crate::storage::Database::run`]) funnels every
//! query through [`retry`] with [`RetryConfig::database`].

use std::future::Future;
use std::time::Duration;

use crate::config;
use crate::error::{classify, AppError, DbErrorKind};

/// Retry strategy configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, the first one included
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays
    pub add_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::database()
    }
}

impl RetryConfig {
    /// Schedule for database calls: 500ms doubling, capped at 5s, 5 attempts.
    pub fn database() -> Self {
        Self {
            max_attempts: config::retry::MAX_ATTEMPTS,
            initial_delay: config::retry::initial_delay(),
            max_delay: config::retry::max_delay(),
            backoff_multiplier: 2.0,
            add_jitter: false,
        }
    }

    /// Config for Telegram sends (few attempts, server hints respected).
    pub fn telegram() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }

    /// Restart schedule of a panicking Telegram dispatcher.
    pub fn dispatcher() -> Self {
        Self {
            max_attempts: config::bot::DISPATCHER_MAX_STARTS,
            initial_delay: Duration::from_secs(config::bot::DISPATCHER_RESTART_DELAY_SECS),
            max_delay: Duration::from_secs(config::bot::DISPATCHER_MAX_RESTART_DELAY_SECS),
            backoff_multiplier: 2.0,
            add_jitter: false,
        }
    }

    /// Sets the maximum number of attempts.
    #[must_use]
    pub fn max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = max;
        self
    }

    /// Sets the initial delay.
    #[must_use]
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    #[must_use]
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Calculates the delay after the given failed attempt (0-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let base_delay = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let capped_delay = base_delay.min(self.max_delay.as_secs_f64());

        let final_delay = if self.add_jitter {
            // Add up to 25% jitter
            let jitter = rand::random::<f64>() * 0.25 * capped_delay;
            capped_delay + jitter
        } else {
            capped_delay
        };

        Duration::from_secs_f64(final_delay)
    }
}

/// Determines if an error is retryable.
pub trait Retryable {
    /// Returns true if the error should be retried.
    fn is_retryable(&self) -> bool;

    /// Returns an optional hint for retry delay (e.g., from rate limit headers).
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl Retryable for sqlx::Error {
    fn is_retryable(&self) -> bool {
        classify(self) == DbErrorKind::Transient
    }
}

impl Retryable for AppError {
    fn is_retryable(&self) -> bool {
        match self {
            AppError::Database(e) => e.is_retryable(),
            _ => false,
        }
    }
}

/// Executes an async operation with retry logic.
///
/// Retryable failures are retried until `config.max_attempts` is reached;
/// the first non-retryable failure, or the last failure once attempts are
/// exhausted, is returned unchanged.
pub async fn retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + std::fmt::Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempts = 0;

    loop {
        attempts += 1;

        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempts < max_attempts && e.is_retryable() => {
                // Calculate delay (respect retry_after hint if provided)
                let delay = e
                    .retry_after()
                    .unwrap_or_else(|| config.delay_for_attempt(attempts - 1));

                tracing::warn!(
                    attempt = attempts,
                    max_attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "Transient failure, retry {}/{} after {:?}: {}",
                    attempts,
                    max_attempts,
                    delay,
                    e
                );

                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::testing::server_error;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Debug)]
    struct TestError(bool); // bool = is_retryable

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "TestError(retryable={})", self.0)
        }
    }

    impl Retryable for TestError {
        fn is_retryable(&self) -> bool {
            self.0
        }
    }

    fn fast() -> RetryConfig {
        RetryConfig::database().initial_delay(Duration::from_millis(5))
    }

    #[tokio::test]
    async fn test_retry_succeeds_first_try() {
        let result = retry(&fast(), || async { Ok::<_, TestError>(42) }).await;
        assert_eq!(result.ok(), Some(42));
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_transient_failures() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry(&fast(), || {
            let counter = counter_clone.clone();
            async move {
                let attempt = counter.fetch_add(1, Ordering::SeqCst);
                if attempt < 2 {
                    Err(TestError(true))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.ok(), Some(42));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_exhausted_returns_last_error() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();
        let config = fast().max_attempts(3);

        let result = retry(&config, || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(TestError(true))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error_stops_immediately() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();
        // Long delays: if we slept at all the test would take seconds
        let config = RetryConfig::database().initial_delay(Duration::from_secs(10));
        let started = std::time::Instant::now();

        let result = retry(&config, || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(TestError(false))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_transient_sqlx_error_is_retried() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry(&fast(), || {
            let counter = counter_clone.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(sqlx::Error::PoolTimedOut)
                } else {
                    Ok("row")
                }
            }
        })
        .await;

        assert_eq!(result.ok(), Some("row"));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_row_not_found_is_not_retried() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry(&fast(), || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(sqlx::Error::RowNotFound)
            }
        })
        .await;

        assert!(matches!(result, Err(sqlx::Error::RowNotFound)));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_connection_exception_from_server_is_retried() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry(&fast(), || {
            let counter = counter_clone.clone();
            async move {
                match counter.fetch_add(1, Ordering::SeqCst) {
                    0 => Err(server_error("08006")),
                    1 => Err(server_error("57P03")),
                    _ => Ok("row"),
                }
            }
        })
        .await;

        assert_eq!(result.ok(), Some("row"));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_unique_violation_from_server_is_not_retried() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry(&fast(), || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(server_error("23505"))
            }
        })
        .await;

        assert_eq!(result.as_ref().map_err(classify).err(), Some(DbErrorKind::UniqueViolation));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_tls_failure_is_not_retryable() {
        assert!(!sqlx::Error::Tls("handshake failure".into()).is_retryable());
    }

    #[test]
    fn test_dispatcher_restart_schedule() {
        let config = RetryConfig::dispatcher();

        assert_eq!(config.max_attempts, config::bot::DISPATCHER_MAX_STARTS);
        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(3), Duration::from_secs(8));
        assert_eq!(config.delay_for_attempt(9), Duration::from_secs(30)); // capped
    }

    #[test]
    fn test_database_delay_schedule() {
        let config = RetryConfig::database();

        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(500));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(1000));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(2000));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(4000));
        assert_eq!(config.delay_for_attempt(4), Duration::from_millis(5000)); // capped
        assert_eq!(config.delay_for_attempt(10), Duration::from_millis(5000));
    }

    #[test]
    fn test_app_error_retryability() {
        assert!(AppError::Database(sqlx::Error::PoolTimedOut).is_retryable());
        assert!(!AppError::NotFound("user").is_retryable());
    }
}
