#![forbid(unsafe_code)]

use super::{ProjectQuery, Resolver, Strategy, TaskQuery};
use crate::embed::{Initialized, init_project, init_task};
use crate::error::GtdError;
use crate::platform::Propagate;
use gtd_core::{
    Chain, EntityKind, ParsedTitle, Project, Task, TitleStyle, canonical_name, parse_name,
};
use gtd_storage::StoreError;

pub(super) const PROJECT_STRATEGIES: &[Strategy<ProjectQuery, Project>] = &[
    ("trusted", trusted_project),
    ("embedded_code", embedded_project),
    ("anchor_message", anchored_project),
];

pub(super) const TASK_STRATEGIES: &[Strategy<TaskQuery, Task>] = &[
    ("trusted", trusted_task),
    ("embedded_code", embedded_task),
    ("anchor_message", anchored_task),
];

fn trusted_project(
    resolver: &mut Resolver<'_>,
    query: &ProjectQuery,
) -> Result<Option<Project>, GtdError> {
    let (Some(id), Some(name), Some(project_list_id)) = (
        query.id.filter(|id| *id != 0),
        query.name.as_ref(),
        query.project_list_id,
    ) else {
        return Ok(None);
    };
    let row = resolver.store.upsert_project(&Project {
        id,
        name: name.clone(),
        project_list_id,
        completed: query.completed,
    })?;
    Ok(Some(row))
}

fn embedded_project(
    resolver: &mut Resolver<'_>,
    query: &ProjectQuery,
) -> Result<Option<Project>, GtdError> {
    let Some(name) = query.name.as_deref() else {
        return Ok(None);
    };
    let Some(parsed) = parse_name(name) else {
        return Ok(None);
    };
    let Some(id) = parsed.id_of(EntityKind::Project) else {
        return Ok(None);
    };

    let project_list_id = match query.project_list_id {
        Some(list_id) => Some(list_id),
        None => embedded_parent(&parsed, EntityKind::ProjectList, |list_id| {
            Ok(resolver.store.get_project_list(list_id)?.is_some())
        })?,
    };
    let Some(project_list_id) = project_list_id else {
        return Ok(resolver.store.get_project(id)?);
    };

    let project = Project {
        id,
        name: name.to_string(),
        project_list_id,
        completed: query.completed,
    };
    let named = canonical_name(name, &Chain::for_project(&project), TitleStyle::Project);
    let project = Project {
        name: named.name,
        ..project
    };
    let row = resolver.store.upsert_project(&project)?;
    if named.dirty {
        push_rename(resolver, row.id, &row.name)?;
    }
    Ok(Some(row))
}

fn anchored_project(
    resolver: &mut Resolver<'_>,
    query: &ProjectQuery,
) -> Result<Option<Project>, GtdError> {
    let (Some(name), Some(project_list_id)) = (query.name.as_ref(), query.project_list_id) else {
        return Ok(None);
    };
    let draft = Project {
        id: query.id.unwrap_or(0),
        name: name.clone(),
        project_list_id,
        completed: query.completed,
    };
    let Some(initialized) = init_project(resolver.platform, draft)? else {
        return Ok(None);
    };
    let row = resolver.store.upsert_project(&initialized.entity)?;
    finish(resolver, &initialized, row.id, &row.name)?;
    Ok(Some(row))
}

fn trusted_task(resolver: &mut Resolver<'_>, query: &TaskQuery) -> Result<Option<Task>, GtdError> {
    let (Some(id), Some(name), Some(context_id)) = (
        query.id.filter(|id| *id != 0),
        query.name.as_ref(),
        query.context_id,
    ) else {
        return Ok(None);
    };
    let row = resolver.store.upsert_task(&Task {
        id,
        name: name.clone(),
        project_id: query.project_id,
        context_id,
        completed: query.completed,
    })?;
    Ok(Some(row))
}

fn embedded_task(resolver: &mut Resolver<'_>, query: &TaskQuery) -> Result<Option<Task>, GtdError> {
    let Some(name) = query.name.as_deref() else {
        return Ok(None);
    };
    let Some(parsed) = parse_name(name) else {
        return Ok(None);
    };
    let Some(id) = parsed.id_of(EntityKind::Task) else {
        return Ok(None);
    };

    let context_id = match query.context_id {
        Some(context_id) => Some(context_id),
        None => embedded_parent(&parsed, EntityKind::Context, |context_id| {
            Ok(resolver.store.get_context(context_id)?.is_some())
        })?,
    };
    let Some(context_id) = context_id else {
        return Ok(resolver.store.get_task(id)?);
    };
    let project = match (query.project_id, parsed.id_of(EntityKind::Project)) {
        (Some(project_id), _) => match resolver.store.get_project(project_id)? {
            Some(project) => Some(project),
            None => return Ok(resolver.store.get_task(id)?),
        },
        (None, Some(project_id)) => match resolver.store.get_project(project_id)? {
            Some(project) => Some(project),
            // Project not cached: the title keeps its project segment.
            None => {
                let row = resolver.store.upsert_task(&Task {
                    id,
                    name: name.to_string(),
                    project_id: None,
                    context_id,
                    completed: query.completed,
                })?;
                tracing::debug!(id, project_id, "project segment not cached; title kept");
                return Ok(Some(row));
            }
        },
        (None, None) => None,
    };

    let task = Task {
        id,
        name: name.to_string(),
        project_id: project.as_ref().map(|project| project.id),
        context_id,
        completed: query.completed,
    };
    let named = canonical_name(
        name,
        &Chain::for_task(&task, project.as_ref()),
        TitleStyle::Task,
    );
    let task = Task {
        name: named.name,
        ..task
    };
    let row = resolver.store.upsert_task(&task)?;
    if named.dirty {
        push_rename(resolver, row.id, &row.name)?;
    }
    Ok(Some(row))
}

fn anchored_task(resolver: &mut Resolver<'_>, query: &TaskQuery) -> Result<Option<Task>, GtdError> {
    let (Some(name), Some(context_id)) = (query.name.as_ref(), query.context_id) else {
        return Ok(None);
    };
    let project = match query.project_id {
        Some(project_id) => Some(
            resolver
                .store
                .get_project(project_id)?
                .ok_or(StoreError::UnknownId)?,
        ),
        None => None,
    };
    let draft = Task {
        id: query.id.unwrap_or(0),
        name: name.clone(),
        project_id: query.project_id,
        context_id,
        completed: query.completed,
    };
    let Some(initialized) = init_task(resolver.platform, draft, project.as_ref())? else {
        return Ok(None);
    };
    let row = resolver.store.upsert_task(&initialized.entity)?;
    finish(resolver, &initialized, row.id, &row.name)?;
    Ok(Some(row))
}

/// Parent id from the title's chain, kept only when `known` confirms the row.
fn embedded_parent(
    parsed: &ParsedTitle<'_>,
    kind: EntityKind,
    known: impl Fn(u64) -> Result<bool, GtdError>,
) -> Result<Option<u64>, GtdError> {
    match parsed.id_of(kind) {
        Some(id) if known(id)? => Ok(Some(id)),
        _ => Ok(None),
    }
}

fn finish<T>(
    resolver: &mut Resolver<'_>,
    initialized: &Initialized<T>,
    id: u64,
    name: &str,
) -> Result<(), GtdError> {
    tracing::debug!(id, dirty = ?initialized.dirty, "anchored topic");
    if initialized.name_dirty() {
        push_rename(resolver, id, name)?;
    }
    Ok(())
}

fn push_rename(resolver: &mut Resolver<'_>, message_id: u64, title: &str) -> Result<(), GtdError> {
    tracing::info!(message_id, title, "renaming topic");
    resolver
        .platform
        .rename_topic(message_id, title, Propagate::All)?;
    Ok(())
}
