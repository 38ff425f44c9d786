//! Single-instance guard for the long-polling client
//!
//! Telegram allows one `getUpdates` consumer per token. Every replica of the
//! service tries the same advisory lock at startup and only the holder polls.

use std::sync::Arc;

use maskcore::storage::AdvisoryLock;

/// Result of the startup lock attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockOutcome {
    /// This process holds the lock and should poll
    Acquired,
    /// Another process holds the lock
    Denied,
    /// The lock state could not be determined; the bot starts anyway
    Unknown,
}

impl LockOutcome {
    /// Whether the poller should be started.
    pub fn should_start(self) -> bool {
        !matches!(self, LockOutcome::Denied)
    }
}

/// Holds (or failed to hold) the poller lock until [`BotGuard::release`].
pub struct BotGuard {
    lock: Arc<dyn AdvisoryLock>,
    name: String,
    outcome: LockOutcome,
}

impl BotGuard {
    /// Tries the lock once, without waiting.
    pub async fn acquire(lock: Arc<dyn AdvisoryLock>, name: impl Into<String>) -> Self {
        let name = name.into();
        let outcome = match lock.try_lock(&name).await {
            Ok(true) => {
                log::info!("Acquired bot lock '{}', this instance will poll Telegram", name);
                LockOutcome::Acquired
            }
            Ok(false) => {
                log::info!("Bot lock '{}' is held by another instance, not starting the bot", name);
                LockOutcome::Denied
            }
            Err(e) => {
                log::warn!("Could not check bot lock '{}': {}. Starting the bot anyway", name, e);
                LockOutcome::Unknown
            }
        };

        Self { lock, name, outcome }
    }

    pub fn outcome(&self) -> LockOutcome {
        self.outcome
    }

    pub fn should_start(&self) -> bool {
        self.outcome.should_start()
    }

    /// Releases the lock if it was acquired. Errors are logged and ignored.
    pub async fn release(self) {
        if self.outcome != LockOutcome::Acquired {
            return;
        }
        match self.lock.unlock(&self.name).await {
            Ok(()) => log::info!("Released bot lock '{}'", self.name),
            Err(e) => log::debug!("Failed to release bot lock '{}': {}", self.name, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Lock table shared by every "process" in a test
    #[derive(Default)]
    struct MemoryLock {
        held: Mutex<HashSet<String>>,
    }

    #[async_trait]
    impl AdvisoryLock for MemoryLock {
        async fn try_lock(&self, name: &str) -> Result<bool, sqlx::Error> {
            tokio::task::yield_now().await;
            Ok(self.held.lock().unwrap().insert(name.to_string()))
        }

        async fn unlock(&self, name: &str) -> Result<(), sqlx::Error> {
            self.held.lock().unwrap().remove(name);
            Ok(())
        }
    }

    struct BrokenLock;

    #[async_trait]
    impl AdvisoryLock for BrokenLock {
        async fn try_lock(&self, _name: &str) -> Result<bool, sqlx::Error> {
            Err(sqlx::Error::PoolTimedOut)
        }

        async fn unlock(&self, _name: &str) -> Result<(), sqlx::Error> {
            Err(sqlx::Error::PoolClosed)
        }
    }

    #[tokio::test]
    async fn test_first_instance_acquires_second_is_denied() {
        let lock: Arc<dyn AdvisoryLock> = Arc::new(MemoryLock::default());

        let first = BotGuard::acquire(Arc::clone(&lock), "poller").await;
        let second = BotGuard::acquire(Arc::clone(&lock), "poller").await;

        assert_eq!(first.outcome(), LockOutcome::Acquired);
        assert_eq!(second.outcome(), LockOutcome::Denied);
        assert!(first.should_start());
        assert!(!second.should_start());
    }

    #[tokio::test]
    async fn test_release_lets_next_instance_in() {
        let lock: Arc<dyn AdvisoryLock> = Arc::new(MemoryLock::default());

        let first = BotGuard::acquire(Arc::clone(&lock), "poller").await;
        first.release().await;

        let next = BotGuard::acquire(Arc::clone(&lock), "poller").await;
        assert_eq!(next.outcome(), LockOutcome::Acquired);
    }

    #[tokio::test]
    async fn test_denied_guard_does_not_release_holder() {
        let lock: Arc<dyn AdvisoryLock> = Arc::new(MemoryLock::default());

        let holder = BotGuard::acquire(Arc::clone(&lock), "poller").await;
        let denied = BotGuard::acquire(Arc::clone(&lock), "poller").await;
        denied.release().await;

        let third = BotGuard::acquire(Arc::clone(&lock), "poller").await;
        assert_eq!(third.outcome(), LockOutcome::Denied);
        holder.release().await;
    }

    #[tokio::test]
    async fn test_check_failure_proceeds() {
        let guard = BotGuard::acquire(Arc::new(BrokenLock), "poller").await;

        assert_eq!(guard.outcome(), LockOutcome::Unknown);
        assert!(guard.should_start());
        guard.release().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_attempts_at_most_one_proceeds() {
        let lock: Arc<dyn AdvisoryLock> = Arc::new(MemoryLock::default());

        let attempts: Vec<_> = (0..8)
            .map(|_| {
                let lock = Arc::clone(&lock);
                tokio::spawn(async move { BotGuard::acquire(lock, "poller").await.outcome() })
            })
            .collect();

        let mut acquired = 0;
        for attempt in attempts {
            if attempt.await.unwrap() == LockOutcome::Acquired {
                acquired += 1;
            }
        }
        assert_eq!(acquired, 1);
    }
}
