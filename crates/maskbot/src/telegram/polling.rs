//! Long-polling runner
//!
//! Polling drops pending updates at start. If Telegram reports that another
//! client took over `getUpdates` for the same token, local polling is shut
//! down through the dispatcher's shutdown token instead of fighting for the
//! updates stream. The process stop signal goes through the same token.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use teloxide::dispatching::{DefaultKey, ShutdownToken};
use teloxide::error_handlers::ErrorHandler;
use teloxide::prelude::*;
use teloxide::update_listeners::Polling;
use teloxide::{ApiError, RequestError};
use tokio::sync::watch;

use maskcore::Database;

use super::schema::schema;
use super::{Bot, HandlerError};

/// Whether a listener error means another process is polling this token.
pub fn is_polling_conflict(error: &RequestError) -> bool {
    matches!(error, RequestError::Api(ApiError::TerminatedByOtherGetUpdates))
}

/// Update listener error handler that stops the dispatcher on a polling conflict
struct ListenerErrorHandler {
    token: ShutdownToken,
}

impl ErrorHandler<RequestError> for ListenerErrorHandler {
    fn handle_error(self: Arc<Self>, error: RequestError) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            if !is_polling_conflict(&error) {
                log::error!("An error from the update listener: {}", error);
                return;
            }

            log::warn!("Another instance is polling this bot token, stopping local polling");
            // The returned future resolves once dispatching ends, which waits on
            // this very handler; request the shutdown without awaiting it.
            if let Err(e) = self.token.shutdown() {
                log::debug!("Dispatcher was not running: {}", e);
            }
        })
    }
}

/// Owns the dispatcher until [`Poller::run`] finishes.
pub struct Poller {
    bot: Bot,
    dispatcher: Dispatcher<Bot, HandlerError, DefaultKey>,
}

impl Poller {
    pub fn new(bot: Bot, db: Database) -> Self {
        let dispatcher = Dispatcher::builder(bot.clone(), schema(db))
            .default_handler(|upd| async move {
                log::trace!("Unhandled update: {:?}", upd.kind);
            })
            .build();

        Self { bot, dispatcher }
    }

    /// Polls until `stop` flips to `true` or a polling conflict is detected.
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) {
        let listener = Polling::builder(self.bot.clone()).drop_pending_updates().build();
        let token = self.dispatcher.shutdown_token();
        let error_handler = Arc::new(ListenerErrorHandler { token: token.clone() });

        let dispatch = self.dispatcher.dispatch_with_listener(listener, error_handler);
        tokio::pin!(dispatch);

        // Polling the dispatch first moves the dispatcher out of its idle state,
        // so a stop that is already pending can be delivered
        let stop_requested = tokio::select! {
            biased;
            () = &mut dispatch => false,
            _ = stop.wait_for(|stopped| *stopped) => true,
        };

        if stop_requested {
            log::info!("Stopping the dispatcher");
            if let Err(e) = token.shutdown() {
                log::debug!("Dispatcher was not running: {}", e);
            }
            dispatch.await;
        }
        log::info!("Dispatcher stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminated_by_other_get_updates_is_conflict() {
        assert!(is_polling_conflict(&RequestError::Api(ApiError::TerminatedByOtherGetUpdates)));
    }

    #[test]
    fn test_other_errors_are_not_conflicts() {
        assert!(!is_polling_conflict(&RequestError::Api(ApiError::BotBlocked)));
        assert!(!is_polling_conflict(&RequestError::RetryAfter(teloxide::types::Seconds::from_seconds(5))));
    }
}
