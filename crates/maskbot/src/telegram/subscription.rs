//! `/start` subscription flow
//!
//! Subscribing upserts the sender by Telegram id and marks them reachable.
//! A storage failure is logged and swallowed so the bot keeps serving
//! updates; the caller decides whether to greet the user.

use async_trait::async_trait;
use teloxide::types::User as TelegramUser;

use maskcore::config;
use maskcore::storage::models::User;
use maskcore::{AppResult, Database};

/// Persists subscribers. Implemented by [`Database`]; tests use an in-memory store.
#[async_trait]
pub trait SubscriberStore: Send + Sync {
    /// Creates or updates the user and marks them reachable by the bot.
    async fn upsert_subscriber(&self, telegram_id: &str, first_name: &str) -> AppResult<User>;
}

#[async_trait]
impl SubscriberStore for Database {
    async fn upsert_subscriber(&self, telegram_id: &str, first_name: &str) -> AppResult<User> {
        Ok(self.users().upsert_subscriber(telegram_id, first_name).await?)
    }
}

/// Who sent `/start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscriber {
    pub telegram_id: String,
    pub first_name: String,
}

impl Subscriber {
    pub fn new(telegram_id: impl Into<String>, first_name: Option<&str>) -> Self {
        let first_name = first_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(config::bot::DEFAULT_FIRST_NAME);

        Self {
            telegram_id: telegram_id.into(),
            first_name: first_name.to_string(),
        }
    }

    pub fn from_telegram(user: &TelegramUser) -> Self {
        Self::new(user.id.0.to_string(), Some(user.first_name.as_str()))
    }
}

/// Records the subscription.
///
/// Returns `None` (after logging) when the store fails.
pub async fn subscribe(store: &dyn SubscriberStore, subscriber: &Subscriber) -> Option<User> {
    match store
        .upsert_subscriber(&subscriber.telegram_id, &subscriber.first_name)
        .await
    {
        Ok(user) => {
            log::info!(
                "User {} ({}) subscribed to notifications",
                subscriber.telegram_id,
                subscriber.first_name
            );
            Some(user)
        }
        Err(e) => {
            log::error!("Failed to subscribe user {}: {}", subscriber.telegram_id, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use maskcore::AppError;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        users: Mutex<HashMap<String, User>>,
        fail: bool,
    }

    #[async_trait]
    impl SubscriberStore for MemoryStore {
        async fn upsert_subscriber(&self, telegram_id: &str, first_name: &str) -> AppResult<User> {
            if self.fail {
                return Err(AppError::Database(sqlx::Error::PoolTimedOut));
            }
            let mut users = self.users.lock().unwrap();
            let next_id = i32::try_from(users.len()).unwrap() + 1;
            let user = users.entry(telegram_id.to_string()).or_insert_with(|| User {
                id: next_id,
                telegram_id: telegram_id.to_string(),
                first_name: None,
                last_name: None,
                phone: None,
                is_bot_available: false,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            });
            user.first_name = Some(first_name.to_string());
            user.is_bot_available = true;
            Ok(user.clone())
        }
    }

    #[test]
    fn test_missing_first_name_falls_back_to_placeholder() {
        assert_eq!(Subscriber::new("1", None).first_name, config::bot::DEFAULT_FIRST_NAME);
        assert_eq!(Subscriber::new("1", Some("  ")).first_name, config::bot::DEFAULT_FIRST_NAME);
        assert_eq!(Subscriber::new("1", Some("Ann")).first_name, "Ann");
    }

    #[tokio::test]
    async fn test_repeated_start_keeps_one_user() {
        let store = MemoryStore::default();

        let first = subscribe(&store, &Subscriber::new("42", Some("Ann"))).await.unwrap();
        let second = subscribe(&store, &Subscriber::new("42", Some("Anna"))).await.unwrap();

        assert_eq!(first.id, second.id);
        assert!(second.is_bot_available);
        assert_eq!(second.first_name.as_deref(), Some("Anna"));
        assert_eq!(store.users.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_store_failure_is_swallowed() {
        let store = MemoryStore {
            fail: true,
            ..MemoryStore::default()
        };

        assert!(subscribe(&store, &Subscriber::new("42", None)).await.is_none());
    }
}
