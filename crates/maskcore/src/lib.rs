//! maskcore - shared core of the maskhub service
//!
//! Everything here is independent of Telegram and HTTP so that both the bot
//! and the REST API (and the maintenance CLI) can share it.
//!
//! # Module Structure
//!
//! - `config`: typed configuration and tuning constants
//! - `error`: the application error type and database error classification
//! - `logging`: tracing subscriber setup
//! - `retry`: exponential backoff executor used by the database wrapper
//! - `storage`: pool, `Database` handle, repositories and the advisory lock
//! - `auth`: admin password hashing and bearer tokens

pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod retry;
pub mod storage;

// Re-export commonly used types for convenience
pub use config::Config;
pub use error::{AppError, AppResult};
pub use storage::{Database, PgAdvisoryLock};
