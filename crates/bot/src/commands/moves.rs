#![forbid(unsafe_code)]

use super::capture::INBOX;
use super::{Message, Place, Session, link};
use crate::error::GtdError;
use crate::platform::Propagate;
use gtd_core::model::{CONTEXT_PREFIX, PROJECT_LIST_PREFIX};

pub(super) fn command_project(
    session: &mut Session<'_>,
    message: &Message,
    payload: &str,
) -> Result<(), GtdError> {
    move_from_inbox(session, message, payload, PROJECT_LIST_PREFIX)
}

pub(super) fn command_task(
    session: &mut Session<'_>,
    message: &Message,
    payload: &str,
) -> Result<(), GtdError> {
    move_from_inbox(session, message, payload, CONTEXT_PREFIX)
}

fn move_from_inbox(
    session: &mut Session<'_>,
    message: &Message,
    payload: &str,
    prefix: &str,
) -> Result<(), GtdError> {
    let Place::Stream { topic, .. } = &message.place else {
        return Err(GtdError::rejected(
            "Sorry this command has to be run in the Inbox",
        ));
    };
    if message.stream() != Some(INBOX) {
        return Err(GtdError::rejected(
            "Sorry this command has to be run in the Inbox",
        ));
    }

    let destination = payload.trim_matches(|ch| matches!(ch, '#' | '*' | ' '));
    if !destination.starts_with(prefix) {
        return Err(GtdError::rejected(format!(
            "Sorry, the destination must start with '{prefix}'"
        )));
    }

    let channel_id = session
        .platform
        .ensure_channel(destination, "", message.sender_id)?;
    session
        .platform
        .move_topic(message.id, channel_id, Propagate::All)?;
    tracing::info!(%topic, destination, "moved topic out of inbox");

    // The conversation now lives in the destination stream.
    let moved = Message {
        place: Place::Stream {
            stream_id: channel_id,
            stream: destination.to_string(),
            topic: topic.clone(),
        },
        ..message.clone()
    };
    session.reply(&moved, &format!("Message moved to {}", link(destination, None)))?;
    Ok(())
}
