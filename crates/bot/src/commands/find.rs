#![forbid(unsafe_code)]

use super::{Message, Session, link};
use crate::error::GtdError;
use gtd_core::{EntityKind, encode};
use gtd_storage::{NameFilter, ProjectFilter, TaskFilter};
use std::collections::BTreeMap;
use std::fmt::Write as _;

const UNPARSED: &str = "Sorry, I couldn't parse that FIND. Try running `help`?";

pub(super) fn command_find(
    session: &mut Session<'_>,
    message: &Message,
    payload: &str,
) -> Result<(), GtdError> {
    let Some((kind, partial)) = payload
        .split_once(char::is_whitespace)
        .and_then(|(kind, partial)| Some((EntityKind::parse(kind)?, partial.trim())))
    else {
        session.reply(message, UNPARSED)?;
        return Ok(());
    };

    let rows = find_rows(session, kind, partial)?;
    session.reply(message, &render(&rows))?;
    Ok(())
}

/// Link markup to code, sorted by link.
fn find_rows(
    session: &Session<'_>,
    kind: EntityKind,
    partial: &str,
) -> Result<BTreeMap<String, String>, GtdError> {
    let store = &*session.store;
    let mut out = BTreeMap::new();
    match kind {
        EntityKind::ProjectList => {
            for row in store.select_project_lists(&NameFilter::containing(partial))? {
                out.insert(link(&row.name, None), encode(kind, row.id));
            }
        }
        EntityKind::Context => {
            for row in store.select_contexts(&NameFilter::containing(partial))? {
                out.insert(link(&row.name, None), encode(kind, row.id));
            }
        }
        EntityKind::Project => {
            let filter = ProjectFilter {
                name_contains: Some(partial.to_string()),
                ..ProjectFilter::default()
            };
            for row in store.select_projects(&filter)? {
                let list = store.get_project_list(row.project_list_id)?;
                let stream = list.map(|list| list.name).unwrap_or_default();
                out.insert(link(&stream, Some(&row.name)), encode(kind, row.id));
            }
        }
        EntityKind::Task => {
            let filter = TaskFilter {
                name_contains: Some(partial.to_string()),
                ..TaskFilter::default()
            };
            for row in store.select_tasks(&filter)? {
                let context = store.get_context(row.context_id)?;
                let stream = context.map(|context| context.name).unwrap_or_default();
                out.insert(link(&stream, Some(&row.name)), encode(kind, row.id));
            }
        }
    }
    Ok(out)
}

fn render(rows: &BTreeMap<String, String>) -> String {
    if rows.is_empty() {
        return "No results found".to_string();
    }
    let mut out = String::from("| Name | HashID |\n| ---- | ---- |");
    for (name, code) in rows {
        let _ = write!(out, "\n| {name} | `#{code}` |");
    }
    out
}
