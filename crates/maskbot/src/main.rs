use std::sync::Arc;

use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use tokio::task::JoinHandle;

use maskbot::cli::{Cli, Commands};
use maskbot::http::{self, AppState};
use maskbot::telegram::{create_bot, setup_bot_commands, Bot, BotGuard, Poller, Supervised};
use maskcore::auth::{hash_password, TokenIssuer};
use maskcore::logging::init_logger;
use maskcore::retry::RetryConfig;
use maskcore::storage::{clear_prepared_statements, connect_options, create_pool, AdvisoryLock};
use maskcore::{Config, Database, PgAdvisoryLock};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; real deployments set the environment directly
    let _ = dotenvy::dotenv();

    init_logger()?;
    let cli = Cli::parse_args();

    match cli.command() {
        Commands::Run => run().await,
        Commands::CreateAdmin { username, password } => create_admin(username, password).await,
        Commands::ClearPreparedStatements => {
            let url = Config::load_database_url().context("failed to load configuration")?;
            clear_prepared_statements(&url)
                .await
                .context("failed to clear prepared statements")?;
            tracing::info!("Prepared statements cleared");
            Ok(())
        }
    }
}

/// A supervised poller plus the lock it runs under.
struct RunningBot {
    guard: BotGuard,
    dispatcher: Supervised,
}

impl RunningBot {
    async fn stop(self) {
        self.dispatcher
            .stop(maskcore::config::bot::dispatcher_stop_timeout())
            .await;
        self.guard.release().await;
    }
}

async fn run() -> Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    tracing::info!(port = config.port, bot_enabled = config.bot_enabled(), "Starting maskhub");

    let db = Database::from_config(&config).context("invalid DATABASE_URL")?;
    let bot = configured_bot(&config);

    // The API answers (with 503 while the database is down) before startup finishes
    let startup = tokio::spawn(start_background(db.clone(), bot.clone(), config.database_url.clone()));

    let state = Arc::new(AppState::new(db.clone(), TokenIssuer::new(config.jwt_secret.clone()), bot));
    let served = http::serve(state, config.port, http::shutdown_signal()).await;

    stop_background(startup).await;
    db.close().await;
    tracing::info!("Shutdown complete");

    served.context("HTTP server failed")
}

/// Checks the database, applies migrations, then starts the bot if configured.
async fn start_background(db: Database, bot: Option<Bot>, database_url: String) -> Option<RunningBot> {
    match db.ping().await {
        Ok(()) => tracing::info!("Database connection established"),
        Err(e) => tracing::error!("Database is not reachable yet: {}", e),
    }
    if let Err(e) = db.migrate().await {
        tracing::error!("Failed to apply migrations: {}", e);
    }

    match start_bot(bot?, db, &database_url).await {
        Ok(running) => running,
        Err(e) => {
            tracing::error!("Failed to start the Telegram bot: {:#}", e);
            None
        }
    }
}

async fn stop_background(startup: JoinHandle<Option<RunningBot>>) {
    if !startup.is_finished() {
        tracing::warn!("Shutting down before startup finished");
        startup.abort();
    }
    match startup.await {
        Ok(Some(running)) => running.stop().await,
        Ok(None) => {}
        Err(e) if e.is_cancelled() => {}
        Err(e) => tracing::error!("Startup task failed: {}", e),
    }
}

fn configured_bot(config: &Config) -> Option<Bot> {
    if config.bot_disabled {
        tracing::info!("Telegram bot disabled by BOT_DISABLED");
        return None;
    }
    match &config.telegram_bot_token {
        Some(token) => Some(create_bot(token)),
        None => {
            tracing::warn!("TELEGRAM_BOT_TOKEN is not set, the Telegram bot will not start");
            None
        }
    }
}

/// Takes the poller lock and, unless another instance holds it, starts the supervised dispatcher.
async fn start_bot(bot: Bot, db: Database, database_url: &str) -> Result<Option<RunningBot>> {
    let lock: Arc<dyn AdvisoryLock> = Arc::new(PgAdvisoryLock::new(connect_options(database_url)?));
    let guard = BotGuard::acquire(lock, maskcore::config::bot::POLLER_LOCK_NAME).await;
    if !guard.should_start() {
        return Ok(None);
    }

    if let Err(e) = setup_bot_commands(&bot).await {
        tracing::warn!("Failed to register bot commands: {}", e);
    }

    let dispatcher = Supervised::spawn(RetryConfig::dispatcher(), move |stop| {
        Poller::new(bot.clone(), db.clone()).run(stop)
    });
    tracing::info!("Telegram bot started (long polling)");

    Ok(Some(RunningBot { guard, dispatcher }))
}

async fn create_admin(username: Option<String>, password: Option<String>) -> Result<()> {
    let username = username
        .or_else(|| std::env::var("ADMIN_USERNAME").ok())
        .filter(|u| !u.trim().is_empty())
        .context("username is required (argument or ADMIN_USERNAME)")?;
    let password = password
        .or_else(|| std::env::var("ADMIN_PASSWORD").ok())
        .filter(|p| !p.is_empty())
        .map(SecretString::from)
        .context("password is required (argument or ADMIN_PASSWORD)")?;

    let url = Config::load_database_url().context("failed to load configuration")?;
    let db = Database::new(create_pool(&url, 1)?);
    db.migrate().await.context("failed to apply migrations")?;

    let hash = hash_password(password.expose_secret())?;
    let admin = db.admins().upsert(username.trim(), &hash).await?;
    tracing::info!(username = %admin.username, "Admin account saved");

    db.close().await;
    Ok(())
}
