//! Admin broadcast to subscribed users
//!
//! Messages go out one at a time with a short pause, which keeps the bot
//! below Telegram's global rate limit. Flood control (`RetryAfter`) and
//! network hiccups are retried with the Telegram retry schedule; users that
//! blocked the bot are marked unreachable so later broadcasts skip them.

use std::time::Duration;

use serde::Serialize;
use teloxide::prelude::*;
use teloxide::types::ChatId;
use teloxide::{ApiError, RequestError};

use maskcore::config;
use maskcore::retry::{retry, RetryConfig, Retryable};
use maskcore::{AppResult, Database};

use super::Bot;

/// Outcome counters returned to the admin
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastReport {
    pub sent: usize,
    pub failed: usize,
    pub total: usize,
}

/// Send error wrapper so the retry executor can classify Telegram failures
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
struct SendError(RequestError);

impl Retryable for SendError {
    fn is_retryable(&self) -> bool {
        matches!(self.0, RequestError::RetryAfter(_) | RequestError::Network(_))
    }

    fn retry_after(&self) -> Option<Duration> {
        match &self.0 {
            RequestError::RetryAfter(seconds) => Some(seconds.duration()),
            _ => None,
        }
    }
}

/// Whether the error means the user can no longer be messaged at all.
pub fn is_unreachable(error: &RequestError) -> bool {
    matches!(
        error,
        RequestError::Api(
            ApiError::BotBlocked | ApiError::UserDeactivated | ApiError::ChatNotFound | ApiError::CantInitiateConversation
        )
    )
}

/// Sends `text` to every user with `is_bot_available`.
///
/// Only loading the recipient list can fail; per-user failures are counted.
pub async fn broadcast(bot: &Bot, db: &Database, text: &str) -> AppResult<BroadcastReport> {
    let recipients = db.users().list_reachable().await?;
    let retry_config = RetryConfig::telegram();
    let mut report = BroadcastReport {
        total: recipients.len(),
        ..BroadcastReport::default()
    };

    log::info!("Broadcasting message to {} users", report.total);

    for (index, user) in recipients.iter().enumerate() {
        if index > 0 {
            tokio::time::sleep(config::bot::broadcast_delay()).await;
        }

        let Ok(chat_id) = user.telegram_id.parse::<i64>() else {
            log::warn!("Skipping user {} with non-numeric telegram id", user.telegram_id);
            report.failed += 1;
            continue;
        };

        let result = retry(&retry_config, || async move {
            bot.send_message(ChatId(chat_id), text).await.map_err(SendError)
        })
        .await;

        match result {
            Ok(_) => report.sent += 1,
            Err(SendError(e)) => {
                report.failed += 1;
                if is_unreachable(&e) {
                    log::info!("User {} is unreachable ({}), marking as unavailable", user.telegram_id, e);
                    if let Err(db_err) = db.users().set_bot_available(&user.telegram_id, false).await {
                        log::warn!("Failed to mark user {} unavailable: {}", user.telegram_id, db_err);
                    }
                } else {
                    log::warn!("Failed to send broadcast to {}: {}", user.telegram_id, e);
                }
            }
        }
    }

    log::info!(
        "Broadcast finished: {} sent, {} failed, {} total",
        report.sent,
        report.failed,
        report.total
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::types::Seconds;

    #[test]
    fn test_blocked_users_are_unreachable() {
        assert!(is_unreachable(&RequestError::Api(ApiError::BotBlocked)));
        assert!(is_unreachable(&RequestError::Api(ApiError::UserDeactivated)));
        assert!(is_unreachable(&RequestError::Api(ApiError::ChatNotFound)));
        assert!(!is_unreachable(&RequestError::Api(ApiError::MessageTextIsEmpty)));
    }

    #[test]
    fn test_retry_after_is_retryable_with_hint() {
        let err = SendError(RequestError::RetryAfter(Seconds::from_seconds(3)));
        assert!(err.is_retryable());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_api_errors_are_not_retried() {
        let err = SendError(RequestError::Api(ApiError::BotBlocked));
        assert!(!err.is_retryable());
        assert_eq!(err.retry_after(), None);
    }

    #[test]
    fn test_report_serializes_counters() {
        let report = BroadcastReport {
            sent: 2,
            failed: 1,
            total: 3,
        };
        let json = serde_json::to_value(report).unwrap();
        assert_eq!(json, serde_json::json!({"sent": 2, "failed": 1, "total": 3}));
    }
}
