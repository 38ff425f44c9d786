//! maskbot - REST API and Telegram bot of the maskhub service
//!
//! # Module Structure
//!
//! - `cli`: command line
//! - `http`: axum router, handlers and error mapping
//! - `telegram`: bot, polling, single-instance guard and broadcasts
//!
//! Storage, configuration and retries live in `maskcore`.

pub mod cli;
pub mod http;
pub mod telegram;
