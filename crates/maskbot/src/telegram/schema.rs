//! Dispatcher schema and handler chain builders

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;

use maskcore::{config, Database};

use super::bot::Command;
use super::subscription::{subscribe, Subscriber};
use super::{Bot, HandlerError};

/// Creates the dispatcher schema for the bot.
///
/// Only commands are handled; any other update falls through unanswered.
pub fn schema(db: Database) -> UpdateHandler<HandlerError> {
    dptree::entry().branch(command_handler(db))
}

fn command_handler(db: Database) -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        move |bot: Bot, msg: Message, cmd: Command| {
            let db = db.clone();
            async move {
                log::info!("Received command: {:?} from chat {}", cmd, msg.chat.id);

                match cmd {
                    Command::Start(_payload) => handle_start_command(&bot, &msg, &db).await,
                }
            }
        },
    ))
}

async fn handle_start_command(bot: &Bot, msg: &Message, db: &Database) -> Result<(), HandlerError> {
    let Some(from) = msg.from.as_ref() else {
        log::debug!("Ignoring /start without a sender in chat {}", msg.chat.id);
        return Ok(());
    };

    let subscriber = Subscriber::from_telegram(from);
    if subscribe(db, &subscriber).await.is_none() {
        return Ok(());
    }

    if let Err(e) = bot.send_message(msg.chat.id, config::bot::SUBSCRIBED_REPLY).await {
        log::warn!("Failed to confirm subscription to {}: {}", subscriber.telegram_id, e);
    }
    Ok(())
}
