#![forbid(unsafe_code)]

//! Anchoring topic-level entities.
//!
//! A topic's identity is the id of its first message. Id resolution runs
//! before naming, since the canonical name embeds the id.

use crate::error::GtdError;
use crate::platform::ChatPlatform;
use gtd_core::title::strip_suffix;
use gtd_core::{Chain, Project, Task, TitleStyle, canonical_name};
use std::collections::BTreeSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DirtyField {
    Id,
    Name,
}

impl DirtyField {
    pub fn as_str(self) -> &'static str {
        match self {
            DirtyField::Id => "id",
            DirtyField::Name => "name",
        }
    }
}

pub type Dirty = BTreeSet<DirtyField>;

/// An entity with both its id and canonical name settled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Initialized<T> {
    pub entity: T,
    pub dirty: Dirty,
}

impl<T> Initialized<T> {
    pub fn name_dirty(&self) -> bool {
        self.dirty.contains(&DirtyField::Name)
    }
}

/// Returns `known` unless it is zero, otherwise the first message of the
/// topic titled `title` in `channel_id`.
pub fn resolve_id(
    platform: &dyn ChatPlatform,
    known: u64,
    channel_id: u64,
    title: &str,
    dirty: &mut Dirty,
) -> Result<u64, GtdError> {
    if known != 0 {
        return Ok(known);
    }
    match platform.find_first_message(channel_id, title)? {
        Some(id) => {
            dirty.insert(DirtyField::Id);
            Ok(id)
        }
        None => {
            tracing::error!(channel_id, topic = title, "no anchor message");
            Err(GtdError::MissingAnchor {
                channel_id,
                topic: title.to_string(),
            })
        }
    }
}

pub fn init_project(
    platform: &dyn ChatPlatform,
    project: Project,
) -> Result<Option<Initialized<Project>>, GtdError> {
    if strip_suffix(&project.name).trim().is_empty() {
        return Ok(None);
    }

    let mut dirty = Dirty::new();
    let id = resolve_id(
        platform,
        project.id,
        project.project_list_id,
        &project.name,
        &mut dirty,
    )?;
    if id == 0 {
        return Ok(None);
    }

    let mut project = Project { id, ..project };
    let named = canonical_name(
        &project.name,
        &Chain::for_project(&project),
        TitleStyle::Project,
    );
    if named.dirty {
        dirty.insert(DirtyField::Name);
    }
    project.name = named.name;
    Ok(Some(Initialized {
        entity: project,
        dirty,
    }))
}

/// `project` must be the row `task.project_id` points at.
pub fn init_task(
    platform: &dyn ChatPlatform,
    task: Task,
    project: Option<&Project>,
) -> Result<Option<Initialized<Task>>, GtdError> {
    if strip_suffix(&task.name).trim().is_empty() {
        return Ok(None);
    }

    let mut dirty = Dirty::new();
    let id = resolve_id(platform, task.id, task.context_id, &task.name, &mut dirty)?;
    if id == 0 {
        return Ok(None);
    }

    let mut task = Task { id, ..task };
    let named = canonical_name(
        &task.name,
        &Chain::for_task(&task, project),
        TitleStyle::Task,
    );
    if named.dirty {
        dirty.insert(DirtyField::Name);
    }
    task.name = named.name;
    Ok(Some(Initialized { entity: task, dirty }))
}
