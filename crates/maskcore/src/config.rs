use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Optional config file read before the environment
pub const CONFIG_FILE: &str = "maskhub.toml";

/// Environment variables picked up by [`Config::load`]
const ENV_KEYS: &[&str] = &[
    "DATABASE_URL",
    "TELEGRAM_BOT_TOKEN",
    "BOT_DISABLED",
    "PORT",
    "JWT_SECRET",
    "DB_MAX_CONNECTIONS",
];

/// Runtime configuration of the service.
///
/// Values come from `maskhub.toml` (if present) overridden by environment
/// variables of the same name in upper case (`DATABASE_URL`, `PORT`, ...).
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// PostgreSQL connection string
    pub database_url: String,
    /// Telegram bot token; the bot is not started without it
    #[serde(default)]
    pub telegram_bot_token: Option<SecretString>,
    /// Skip the Telegram poller even when a token is configured
    #[serde(default)]
    pub bot_disabled: bool,
    /// HTTP listen port
    pub port: u16,
    /// Secret used to sign admin bearer tokens
    pub jwt_secret: SecretString,
    /// Maximum connections in the database pool
    pub db_max_connections: u32,
}

#[derive(Serialize)]
struct Defaults {
    port: u16,
    bot_disabled: bool,
    db_max_connections: u32,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            port: http::DEFAULT_PORT,
            bot_disabled: false,
            db_max_connections: database::DEFAULT_MAX_CONNECTIONS,
        }
    }
}

impl Config {
    /// Loads the configuration from defaults, `maskhub.toml` and the environment.
    pub fn load() -> AppResult<Self> {
        Self::figment()
            .extract()
            .map_err(|e| AppError::Config(e.to_string()))
    }

    /// Loads only `DATABASE_URL`, for maintenance commands that never serve
    /// requests and therefore need no token secrets.
    pub fn load_database_url() -> AppResult<String> {
        Self::figment()
            .extract_inner("database_url")
            .map_err(|e| AppError::Config(e.to_string()))
    }

    fn figment() -> Figment {
        Figment::from(Serialized::defaults(Defaults::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::raw().only(ENV_KEYS))
    }

    /// Whether the Telegram poller should be started at all.
    pub fn bot_enabled(&self) -> bool {
        !self.bot_disabled && self.telegram_bot_token.is_some()
    }
}

/// Database tuning
pub mod database {
    use super::Duration;

    /// Default pool size
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

    /// How long one attempt waits for a pooled connection (seconds).
    /// The retry wrapper multiplies this by its attempt count.
    pub const POOL_TIMEOUT_SECS: u64 = 3;

    pub fn pool_timeout() -> Duration {
        Duration::from_secs(POOL_TIMEOUT_SECS)
    }
}

/// Retry schedule of the database execution wrapper
pub mod retry {
    use super::Duration;

    /// Total attempts, the first one included
    pub const MAX_ATTEMPTS: u32 = 5;

    /// Delay before the first retry (milliseconds)
    pub const INITIAL_DELAY_MS: u64 = 500;

    /// Upper bound for any single delay (milliseconds)
    pub const MAX_DELAY_MS: u64 = 5000;

    pub fn initial_delay() -> Duration {
        Duration::from_millis(INITIAL_DELAY_MS)
    }

    pub fn max_delay() -> Duration {
        Duration::from_millis(MAX_DELAY_MS)
    }
}

/// HTTP server configuration
pub mod http {
    /// Listen port when `PORT` is not set
    pub const DEFAULT_PORT: u16 = 3333;

    /// CORS preflight cache lifetime (seconds)
    pub const CORS_MAX_AGE_SECS: u64 = 86400;
}

/// Telegram bot configuration
pub mod bot {
    use super::Duration;

    /// Name of the advisory lock guarding the long-polling client
    pub const POLLER_LOCK_NAME: &str = "maskhub:telegram-poller";

    /// Display name stored when Telegram does not provide one
    pub const DEFAULT_FIRST_NAME: &str = "Без имени";

    /// Reply sent after a successful /start
    pub const SUBSCRIBED_REPLY: &str = "👋 Привет! Вы подписались на уведомления.";

    /// Pause between two broadcast messages (milliseconds), keeps us under
    /// Telegram's ~30 messages/second limit
    pub const BROADCAST_DELAY_MS: u64 = 40;

    pub fn broadcast_delay() -> Duration {
        Duration::from_millis(BROADCAST_DELAY_MS)
    }

    /// Dispatcher generations started before a panicking dispatcher is given up on
    pub const DISPATCHER_MAX_STARTS: u32 = 6;

    /// First restart delay after a dispatcher panic (seconds)
    pub const DISPATCHER_RESTART_DELAY_SECS: u64 = 1;

    /// Upper bound for a restart delay (seconds)
    pub const DISPATCHER_MAX_RESTART_DELAY_SECS: u64 = 30;

    /// How long the dispatcher gets to finish its in-flight long poll on shutdown (seconds)
    pub const DISPATCHER_STOP_TIMEOUT_SECS: u64 = 15;

    pub fn dispatcher_stop_timeout() -> Duration {
        Duration::from_secs(DISPATCHER_STOP_TIMEOUT_SECS)
    }
}

/// Admin authentication
pub mod admin {
    /// bcrypt cost for admin passwords
    pub const BCRYPT_COST: u32 = 10;

    /// Lifetime of an admin bearer token (hours)
    pub const TOKEN_TTL_HOURS: i64 = 12;
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_load_applies_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("DATABASE_URL", "postgres://localhost/maskhub");
            jail.set_env("JWT_SECRET", "secret");

            let config = Config::load().map_err(|e| e.to_string())?;
            assert_eq!(config.port, 3333);
            assert_eq!(config.db_max_connections, 5);
            assert!(!config.bot_disabled);
            assert!(config.telegram_bot_token.is_none());
            assert!(!config.bot_enabled());
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(CONFIG_FILE, "port = 8080\ndatabase_url = \"postgres://file/db\"\njwt_secret = \"f\"")?;
            jail.set_env("PORT", "9090");
            jail.set_env("TELEGRAM_BOT_TOKEN", "123:abc");

            let config = Config::load().map_err(|e| e.to_string())?;
            assert_eq!(config.port, 9090);
            assert!(!config.database_url.is_empty());
            assert_eq!(
                config.telegram_bot_token.as_ref().map(|t| t.expose_secret().to_string()),
                Some("123:abc".to_string())
            );
            assert!(config.bot_enabled());
            Ok(())
        });
    }

    #[test]
    fn test_database_url_alone_is_enough_for_maintenance() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(CONFIG_FILE, "database_url = \"postgres://file/db\"")?;

            let url = Config::load_database_url().map_err(|e| e.to_string())?;
            assert!(!url.is_empty());
            Ok(())
        });
    }

    #[test]
    fn test_bot_disabled_flag_wins_over_token() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("DATABASE_URL", "postgres://localhost/maskhub");
            jail.set_env("JWT_SECRET", "secret");
            jail.set_env("TELEGRAM_BOT_TOKEN", "123:abc");
            jail.set_env("BOT_DISABLED", "true");

            let config = Config::load().map_err(|e| e.to_string())?;
            assert!(!config.bot_enabled());
            Ok(())
        });
    }
}
