//! Telegram side of the service
//!
//! The bot does one thing for users: `/start` subscribes them to
//! notifications. Admins reach subscribers through [`broadcast`] from the
//! HTTP API. Only one process may long-poll a token at a time, which
//! [`guard::BotGuard`] enforces across processes.

pub mod bot;
pub mod broadcast;
pub mod guard;
pub mod polling;
pub mod schema;
pub mod subscription;
pub mod supervisor;

pub use bot::{create_bot, setup_bot_commands, Command};
pub use broadcast::{broadcast, BroadcastReport};
pub use guard::{BotGuard, LockOutcome};
pub use polling::Poller;
pub use subscription::{subscribe, Subscriber, SubscriberStore};
pub use supervisor::{supervise, Supervised};

/// Bot type used throughout the crate
pub type Bot = teloxide::Bot;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;
