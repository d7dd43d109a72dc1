#![forbid(unsafe_code)]

//! Event loop: one message at a time, each handled to completion.

use crate::commands::{Message, Place, handle_message};
use crate::config::Config;
use crate::error::{GtdError, RemoteError};
use crate::platform::{ZulipClient, ZulipEvent};
use gtd_storage::SqliteStore;

pub fn run(config: &Config) -> Result<(), GtdError> {
    let mut store = SqliteStore::open(&config.storage_dir)?;
    let client = ZulipClient::new(&config.site, &config.email, &config.api_key)?;
    let mut queue = client.register_queue()?;
    tracing::info!(
        site = %config.site,
        storage_dir = %config.storage_dir.display(),
        queue_id = %queue.queue_id,
        "listening for messages"
    );

    loop {
        let events = match client.poll_events(&mut queue) {
            Ok(events) => events,
            Err(RemoteError::Api { msg }) => {
                tracing::warn!(%msg, "event queue rejected; registering a new one");
                queue = client.register_queue()?;
                continue;
            }
            Err(err) => return Err(err.into()),
        };

        for event in events {
            let ZulipEvent::Message(message) = event else {
                continue;
            };
            let Some(message) = addressed(message, &config.email, &config.bot_name) else {
                continue;
            };
            if let Err(err) = handle_message(&mut store, &client, &message) {
                tracing::error!(error = %err, message_id = message.id, "could not report back");
            }
        }
    }
}

/// The message with the bot mention removed, or `None` when it is not for
/// the bot: its own messages, and stream messages that do not mention it.
pub fn addressed(mut message: Message, bot_email: &str, bot_name: &str) -> Option<Message> {
    if message.sender_email == bot_email {
        return None;
    }
    if matches!(message.place, Place::Stream { .. }) {
        let content = strip_mention(&message.content, bot_name)?.to_string();
        message.content = content;
    } else {
        let content = strip_mention(&message.content, bot_name)
            .unwrap_or(message.content.trim())
            .to_string();
        message.content = content;
    }
    Some(message)
}

pub fn strip_mention<'a>(content: &'a str, bot_name: &str) -> Option<&'a str> {
    let mention = format!("@**{bot_name}**");
    content
        .trim_start()
        .strip_prefix(mention.as_str())
        .map(str::trim)
}
