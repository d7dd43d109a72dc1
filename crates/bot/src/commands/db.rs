#![forbid(unsafe_code)]

use super::{Message, Session, link};
use crate::error::GtdError;
use crate::platform::Propagate;
use crate::resolve::{ChannelQuery, ProjectQuery, TaskQuery};
use gtd_core::model::{CONTEXT_PREFIX, PROJECT_LIST_PREFIX, is_completed_title};
use gtd_core::title::strip_suffix;
use gtd_storage::NameFilter;

/// Topic every stream carries for platform notices.
const STREAM_EVENTS_TOPIC: &str = "stream events";

/// A topic the sweep could not store.
struct Fixup {
    stream: String,
    topic: String,
    reason: String,
}

pub(super) fn command_rebuild(
    session: &mut Session<'_>,
    message: &Message,
    _payload: &str,
) -> Result<(), GtdError> {
    tracing::warn!("truncating tables for rebuild");
    session.store.truncate_all()?;

    for channel in session.platform.list_channels()? {
        let query = ChannelQuery::new(channel.id, channel.name.as_str());
        if channel.name.starts_with(PROJECT_LIST_PREFIX) {
            let list = session.resolver().resolve_project_list(&query)?;
            tracing::info!(id = list.id, name = %list.name, "stored project list");
        } else if channel.name.starts_with(CONTEXT_PREFIX) {
            let context = session.resolver().resolve_context(&query)?;
            tracing::info!(id = context.id, name = %context.name, "stored context");
        } else {
            tracing::debug!(name = %channel.name, "skipping stream");
        }
    }

    let mut fixups = Vec::new();

    for list in session.store.select_project_lists(&NameFilter::default())? {
        for topic in session.platform.list_topics(list.id)? {
            if topic.name == STREAM_EVENTS_TOPIC {
                continue;
            }
            let query = ProjectQuery {
                id: None,
                name: Some(topic.name.clone()),
                project_list_id: Some(list.id),
                completed: is_completed_title(&topic.name),
            };
            match session.resolver().resolve_project(&query) {
                Ok(project) => {
                    tracing::info!(project_list = %list.name, name = %project.name, completed = project.completed, "stored project");
                }
                Err(err) if err.is_per_topic() => {
                    tracing::warn!(project_list = %list.name, name = %topic.name, error = %err, "unable to store project");
                    fixups.push(Fixup {
                        stream: list.name.clone(),
                        topic: topic.name,
                        reason: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }
    }

    for context in session.store.select_contexts(&NameFilter::default())? {
        for topic in session.platform.list_topics(context.id)? {
            if topic.name == STREAM_EVENTS_TOPIC {
                continue;
            }
            let query = TaskQuery {
                id: None,
                name: Some(topic.name.clone()),
                project_id: None,
                context_id: Some(context.id),
                completed: is_completed_title(&topic.name),
            };
            match session.resolver().resolve_task(&query) {
                Ok(task) => {
                    tracing::info!(context = %context.name, name = %task.name, completed = task.completed, "stored task");
                }
                Err(err) if err.is_per_topic() => {
                    tracing::warn!(context = %context.name, name = %topic.name, error = %err, "unable to store task");
                    fixups.push(Fixup {
                        stream: context.name.clone(),
                        topic: topic.name,
                        reason: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }
    }

    session.reply(message, &rebuild_report(&fixups))?;
    Ok(())
}

fn rebuild_report(fixups: &[Fixup]) -> String {
    let mut out = "Successfully updated database!".to_string();
    if fixups.is_empty() {
        return out;
    }
    out.push_str(
        "\n\nThe following topics could not be stored and need to be manually updated with their HashID:",
    );
    for fixup in fixups {
        out.push_str(&format!(
            "\n  * {} ({})",
            link(&fixup.stream, Some(&fixup.topic)),
            fixup.reason
        ));
    }
    out
}

#[derive(Debug, Default, PartialEq, Eq)]
struct PurgeFlags {
    force: bool,
    strip_titles: bool,
}

fn parse_purge_flags(payload: &str) -> Result<PurgeFlags, GtdError> {
    let mut flags = PurgeFlags::default();
    for arg in payload.split_whitespace() {
        match arg {
            "--force" => flags.force = true,
            "--strip-titles" => flags.strip_titles = true,
            other => {
                return Err(GtdError::rejected(format!(
                    "Unknown flag for db.purge: `{other}`"
                )));
            }
        }
    }
    if !flags.force {
        return Err(GtdError::rejected(
            "This is a dangerous command. It must be called with '--force'",
        ));
    }
    Ok(flags)
}

/// Wipes the cache. Remote titles are only touched with `--strip-titles`.
pub(super) fn command_purge(
    session: &mut Session<'_>,
    message: &Message,
    payload: &str,
) -> Result<(), GtdError> {
    let flags = parse_purge_flags(payload)?;

    tracing::warn!("truncating tables for purge");
    session.store.truncate_all()?;

    let mut stripped = 0usize;
    if flags.strip_titles {
        tracing::warn!("stripping codes from topic titles");
        for channel in session.platform.list_channels()? {
            for topic in session.platform.list_topics(channel.id)? {
                let bare = strip_suffix(&topic.name).trim();
                if bare == topic.name || bare.is_empty() {
                    continue;
                }
                let Some(message_id) = session
                    .platform
                    .find_first_message(channel.id, &topic.name)?
                else {
                    tracing::warn!(stream = %channel.name, topic = %topic.name, "no anchor message; leaving title");
                    continue;
                };
                tracing::info!(old_topic = %topic.name, new_topic = bare, "stripping code");
                session
                    .platform
                    .rename_topic(message_id, bare, Propagate::All)?;
                stripped += 1;
            }
        }
    }

    let mut reply = ":nuclear: Purge complete :nuclear:".to_string();
    if flags.strip_titles {
        reply.push_str(&format!("\nStripped codes from {stripped} topics."));
    }
    session.reply(message, &reply)?;
    Ok(())
}
