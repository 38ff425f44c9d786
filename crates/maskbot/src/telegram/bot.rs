//! Bot initialization and the command set

use secrecy::{ExposeSecret, SecretString};
use teloxide::prelude::*;
use teloxide::types::BotCommand;
use teloxide::utils::command::BotCommands;

use super::Bot;

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Я умею:")]
pub enum Command {
    /// Deep links arrive as `/start <payload>`; the payload is accepted and ignored
    #[command(description = "подписаться на уведомления")]
    Start(String),
}

/// Creates a Bot instance for the configured token
pub fn create_bot(token: &SecretString) -> Bot {
    Bot::new(token.expose_secret())
}

/// Sets up bot commands in Telegram UI
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    bot.set_my_commands(vec![BotCommand::new("start", "подписаться на уведомления")])
        .await?;

    Ok(())
}
