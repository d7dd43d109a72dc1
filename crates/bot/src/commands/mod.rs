#![forbid(unsafe_code)]

//! Chat commands. The first word of a message picks the command, the rest
//! is its payload.

mod audit;
mod capture;
mod db;
mod done;
mod find;
mod moves;

pub use crate::platform::{Message, Place};

use crate::error::{GtdError, RemoteError};
use crate::platform::ChatPlatform;
use crate::resolve::Resolver;
use gtd_storage::SqliteStore;
use std::fmt::Write as _;

type Handler = fn(&mut Session<'_>, &Message, &str) -> Result<(), GtdError>;

pub struct CommandSpec {
    pub name: &'static str,
    pub usage: &'static str,
    pub description: &'static str,
    handler: Handler,
}

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "help",
        usage: "help",
        description: "Prints this output",
        handler: command_help,
    },
    CommandSpec {
        name: "inbox",
        usage: "inbox <description>",
        description: "Capture a new piece of information in your #**Inbox**. It will create this stream if it doesn't already exist.",
        handler: capture::command_inbox,
    },
    CommandSpec {
        name: "todo",
        usage: "todo #**@<context>** <description>",
        description: "Capture a new task. Will create a new context stream if it doesn't already exist.",
        handler: capture::command_todo,
    },
    CommandSpec {
        name: "project",
        usage: "project <project list>",
        description: "Moves something from your inbox into a project list",
        handler: moves::command_project,
    },
    CommandSpec {
        name: "task",
        usage: "task <context>",
        description: "Moves something from your inbox into a context",
        handler: moves::command_task,
    },
    CommandSpec {
        name: "done",
        usage: "done",
        description: "Marks a task or project as done",
        handler: done::command_done,
    },
    CommandSpec {
        name: "find",
        usage: "find [project_list|project|context|task] [partial name]",
        description: "Searches for something in the database and returns the result",
        handler: find::command_find,
    },
    CommandSpec {
        name: "audit",
        usage: "audit",
        description: "Finds projects without open tasks",
        handler: audit::command_audit,
    },
    CommandSpec {
        name: "db.rebuild",
        usage: "db.rebuild",
        description: "Rebuilds the database of projects and tasks from every stream",
        handler: db::command_rebuild,
    },
    CommandSpec {
        name: "db.purge",
        usage: "db.purge --force [--strip-titles]",
        description: "Deletes the internal database. With `--strip-titles` also removes HashIDs from every topic. **WARNING** this is irreversible.",
        handler: db::command_purge,
    },
];

/// One command's view of the bot: the store it may write and the platform
/// it talks to.
pub struct Session<'a> {
    store: &'a mut SqliteStore,
    platform: &'a dyn ChatPlatform,
}

impl<'a> Session<'a> {
    pub fn new(store: &'a mut SqliteStore, platform: &'a dyn ChatPlatform) -> Self {
        Self { store, platform }
    }

    fn resolver(&mut self) -> Resolver<'_> {
        Resolver::new(self.store, self.platform)
    }

    fn reply(&self, message: &Message, body: &str) -> Result<(), RemoteError> {
        reply(self.platform, message, body)
    }
}

/// Runs the command in `message` to completion. Command failures are
/// reported back to the sender; only a failure to deliver that report
/// escapes.
pub fn handle_message(
    store: &mut SqliteStore,
    platform: &dyn ChatPlatform,
    message: &Message,
) -> Result<(), RemoteError> {
    let (command, payload) = split_command(&message.content);
    let _span = tracing::info_span!("command", command, message_id = message.id).entered();

    let Some(spec) = COMMANDS.iter().find(|spec| spec.name == command) else {
        return reply(
            platform,
            message,
            &format!(
                "Sorry, command not recognized: `{}`. Try running `help`?",
                message.content.trim()
            ),
        );
    };

    let mut session = Session::new(store, platform);
    match (spec.handler)(&mut session, message, payload) {
        Ok(()) => Ok(()),
        Err(err) => {
            tracing::warn!(error = %err, "command failed");
            reply(platform, message, &format!("Error: {err}"))
        }
    }
}

pub fn help() -> String {
    let mut out = String::from(
        "This bot helps with implementing GTD with Zulip. It supports the following commands:\n\n\
         | Command | Description |\n\
         | ------- | ----------- |\n",
    );
    for spec in COMMANDS {
        let _ = writeln!(out, "| `{}` | {} |", spec.usage, spec.description);
    }
    out
}

fn command_help(session: &mut Session<'_>, message: &Message, _payload: &str) -> Result<(), GtdError> {
    session.reply(message, &help())?;
    Ok(())
}

fn split_command(content: &str) -> (&str, &str) {
    let content = content.trim();
    match content.split_once(char::is_whitespace) {
        Some((command, payload)) => (command, payload.trim()),
        None => (content, ""),
    }
}

fn reply(platform: &dyn ChatPlatform, message: &Message, body: &str) -> Result<(), RemoteError> {
    match &message.place {
        Place::Stream { stream, topic, .. } => platform.post_message(stream, topic, body)?,
        Place::Private => platform.send_private(message.sender_id, body)?,
    };
    Ok(())
}

/// `message` as if it had been posted under `topic`, for replies that follow
/// a rename of the topic they came from.
fn retitled(message: &Message, topic: &str) -> Message {
    let place = match &message.place {
        Place::Stream {
            stream_id, stream, ..
        } => Place::Stream {
            stream_id: *stream_id,
            stream: stream.clone(),
            topic: topic.to_string(),
        },
        Place::Private => Place::Private,
    };
    Message {
        place,
        ..message.clone()
    }
}

pub(crate) fn link(stream: &str, topic: Option<&str>) -> String {
    match topic {
        Some(topic) => format!("#**{stream}>{topic}**"),
        None => format!("#**{stream}**"),
    }
}
