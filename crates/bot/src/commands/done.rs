#![forbid(unsafe_code)]

use super::{Message, Place, Session, link, retitled};
use crate::error::GtdError;
use crate::platform::Propagate;
use gtd_core::Entity;
use gtd_core::model::mark_completed;

pub(super) fn command_done(
    session: &mut Session<'_>,
    message: &Message,
    _payload: &str,
) -> Result<(), GtdError> {
    let Place::Stream {
        stream_id,
        stream,
        topic,
    } = &message.place
    else {
        return Err(GtdError::rejected("Sorry you can't use this command in DMs"));
    };

    let entity = session.resolver().resolve_topic(stream, *stream_id, topic)?;
    if entity.kind().is_channel_level() {
        return Err(GtdError::rejected("Only projects and tasks can be done"));
    }
    let title = mark_completed(entity.name());
    if title != entity.name() {
        session
            .platform
            .rename_topic(entity.id(), &title, Propagate::All)?;
    }

    match entity {
        Entity::Project(project) => {
            session.store.upsert_project(&gtd_core::Project {
                name: title.clone(),
                completed: true,
                ..project
            })?;
        }
        Entity::Task(task) => {
            session.store.upsert_task(&gtd_core::Task {
                name: title.clone(),
                completed: true,
                ..task
            })?;
        }
        Entity::ProjectList(_) | Entity::Context(_) => {}
    }

    session.reply(
        &retitled(message, &title),
        &format!("{} marked as complete :check:", link(stream, Some(&title))),
    )?;
    Ok(())
}
