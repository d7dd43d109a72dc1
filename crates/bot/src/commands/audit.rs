#![forbid(unsafe_code)]

use super::{Message, Place, Session, link, retitled};
use crate::error::GtdError;
use gtd_core::Entity;
use gtd_storage::TaskFilter;

pub(super) fn command_audit(
    session: &mut Session<'_>,
    message: &Message,
    _payload: &str,
) -> Result<(), GtdError> {
    let idle = session.store.idle_projects()?;
    if idle.is_empty() {
        session.reply(message, "You have no idle projects :tada:")?;
    } else {
        let mut lines = vec!["You have the following idle projects:".to_string()];
        for project in idle {
            let list = session.store.get_project_list(project.project_list_id)?;
            let stream = list.map(|list| list.name).unwrap_or_default();
            lines.push(format!("* {}", link(&stream, Some(&project.name))));
        }
        session.reply(message, &lines.join("\n"))?;
    }

    let Place::Stream {
        stream_id,
        stream,
        topic,
    } = &message.place
    else {
        return Ok(());
    };
    let project = match session.resolver().resolve_topic(stream, *stream_id, topic) {
        Ok(Entity::Project(project)) => project,
        Ok(_) | Err(GtdError::Unmanaged { .. }) => {
            tracing::debug!(%stream, %topic, "not a project topic");
            return Ok(());
        }
        Err(err) if err.is_per_topic() => {
            tracing::debug!(%stream, %topic, error = %err, "not a project topic");
            return Ok(());
        }
        Err(err) => return Err(err),
    };

    let tasks = session.store.select_tasks(&TaskFilter {
        project_id: Some(project.id),
        ..TaskFilter::default()
    })?;
    let mut lines = vec!["This project has been associated with the following tasks:".to_string()];
    for task in tasks {
        let context = session.store.get_context(task.context_id)?;
        let stream = context.map(|context| context.name).unwrap_or_default();
        lines.push(format!("* {}", link(&stream, Some(&task.name))));
    }
    session.reply(&retitled(message, &project.name), &lines.join("\n"))?;
    Ok(())
}
