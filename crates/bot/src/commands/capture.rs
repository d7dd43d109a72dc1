#![forbid(unsafe_code)]

use super::{Message, Place, Session, link, retitled};
use crate::error::GtdError;
use crate::platform::Propagate;
use crate::resolve::{ChannelQuery, ProjectQuery, TaskQuery};
use gtd_core::model::{CONTEXT_PREFIX, PROJECT_LIST_PREFIX, is_completed_title};
use gtd_core::{Chain, Task, TitleStyle, canonical_name};
use regex::Regex;
use std::sync::LazyLock;

pub(super) const INBOX: &str = "Inbox";
const INBOX_DESCRIPTION: &str = "Catch-all for incoming stuff";
const CAPTURED_REACTION: &str = "robot";

static TODO_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"#\**"?@"?(?P<context>[^"*]+)["*]+\s+(?P<text>.*)"#)
        .expect("todo pattern must compile")
});

pub(super) fn command_inbox(
    session: &mut Session<'_>,
    message: &Message,
    payload: &str,
) -> Result<(), GtdError> {
    if payload.is_empty() {
        return Err(GtdError::rejected(
            "Sorry, `inbox` needs a description. Try running `help`?",
        ));
    }
    let channel_id = session
        .platform
        .ensure_channel(INBOX, INBOX_DESCRIPTION, message.sender_id)?;
    forward(session, message, INBOX, channel_id, payload)
}

pub(super) fn command_todo(
    session: &mut Session<'_>,
    message: &Message,
    payload: &str,
) -> Result<(), GtdError> {
    let Some((context, text)) = parse_todo(payload) else {
        session.reply(
            message,
            "Sorry, I couldn't parse that TODO. Try running `help`?",
        )?;
        return Ok(());
    };
    let channel_id = session
        .platform
        .ensure_channel(&context, "", message.sender_id)?;
    forward(session, message, &context, channel_id, text)
}

/// `(context channel, task text)` out of `#**@<context>** <text>`.
fn parse_todo(payload: &str) -> Option<(String, &str)> {
    let captures = TODO_PATTERN.captures(payload)?;
    let context = captures.name("context")?.as_str().trim();
    let text = captures.name("text")?.as_str().trim();
    if context.is_empty() || text.is_empty() {
        return None;
    }
    Some((format!("{CONTEXT_PREFIX}{context}"), text))
}

/// Posts `subject` as a new topic in `channel` and links it back to the
/// source message.
fn forward(
    session: &mut Session<'_>,
    source: &Message,
    channel: &str,
    channel_id: u64,
    subject: &str,
) -> Result<(), GtdError> {
    if let Place::Stream {
        stream_id,
        stream,
        topic,
    } = &source.place
        && stream.starts_with(PROJECT_LIST_PREFIX)
        && channel.starts_with(CONTEXT_PREFIX)
    {
        return forward_project_task(
            session,
            source,
            (*stream_id, stream.as_str(), topic.as_str()),
            channel,
            channel_id,
            subject,
        );
    }

    let body = match &source.place {
        Place::Stream { stream, topic, .. } => format!("Created from {}", link(stream, Some(topic))),
        Place::Private => subject.to_string(),
    };
    session.platform.post_message(channel, subject, &body)?;
    session.platform.add_reaction(source.id, CAPTURED_REACTION)?;
    session.reply(source, &format!("Created {}", link(channel, Some(subject))))?;
    Ok(())
}

/// A task captured inside a project topic: the anchor goes out under a
/// throwaway topic, then gets its canonical title once the id is known.
fn forward_project_task(
    session: &mut Session<'_>,
    source: &Message,
    (stream_id, stream, topic): (u64, &str, &str),
    channel: &str,
    channel_id: u64,
    subject: &str,
) -> Result<(), GtdError> {
    tracing::info!(stream, topic, channel, "capturing task for project");
    let mut resolver = session.resolver();
    let list = resolver.resolve_project_list(&ChannelQuery::new(stream_id, stream))?;
    let project = resolver.resolve_project(&ProjectQuery {
        id: None,
        name: Some(topic.to_string()),
        project_list_id: Some(list.id),
        completed: is_completed_title(topic),
    })?;
    let context = resolver.resolve_context(&ChannelQuery::new(channel_id, channel))?;

    let temp_topic = uuid::Uuid::new_v4().to_string();
    let body = format!(
        "{subject}\n------\nCreated from {}",
        link(stream, Some(&project.name))
    );
    let message_id = session
        .platform
        .post_message(&context.name, &temp_topic, &body)?;

    let draft = Task {
        id: message_id,
        name: subject.to_string(),
        project_id: Some(project.id),
        context_id: context.id,
        completed: is_completed_title(subject),
    };
    let named = canonical_name(
        subject,
        &Chain::for_task(&draft, Some(&project)),
        TitleStyle::Task,
    );
    let task = session.resolver().resolve_task(&TaskQuery {
        id: Some(draft.id),
        name: Some(named.name),
        project_id: draft.project_id,
        context_id: Some(draft.context_id),
        completed: draft.completed,
    })?;
    session
        .platform
        .rename_topic(task.id, &task.name, Propagate::All)?;

    session.platform.add_reaction(source.id, CAPTURED_REACTION)?;
    session.reply(
        &retitled(source, &project.name),
        &format!("Created {}", link(&context.name, Some(&task.name))),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn todo_payload_accepts_stream_mentions() {
        assert_eq!(
            parse_todo("#**@Errands** buy milk"),
            Some(("@Errands".to_string(), "buy milk"))
        );
        assert_eq!(
            parse_todo(r#"#**"@Deep work"** write report"#),
            Some(("@Deep work".to_string(), "write report"))
        );
        assert_eq!(parse_todo("buy milk"), None);
        assert_eq!(parse_todo("#**@Errands**"), None);
    }
}
