#![forbid(unsafe_code)]

//! Resolver cascade.
//!
//! Each kind has a literal, ordered list of strategies. The first one that
//! produces an entity wins; strategies that find something write it through
//! to the store and may push a corrected title to the platform.

mod channel;
mod topic;

use crate::error::GtdError;
use crate::platform::ChatPlatform;
use gtd_core::model::{CONTEXT_PREFIX, PROJECT_LIST_PREFIX, is_completed_title};
use gtd_core::{Context, Entity, EntityKind, Project, ProjectList, Task};
use gtd_storage::SqliteStore;
use std::fmt::Debug;

type Strategy<Q, T> = (
    &'static str,
    fn(&mut Resolver<'_>, &Q) -> Result<Option<T>, GtdError>,
);

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChannelQuery {
    pub id: Option<u64>,
    pub name: Option<String>,
}

impl ChannelQuery {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            name: Some(name.into()),
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProjectQuery {
    pub id: Option<u64>,
    pub name: Option<String>,
    pub project_list_id: Option<u64>,
    pub completed: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TaskQuery {
    pub id: Option<u64>,
    pub name: Option<String>,
    pub project_id: Option<u64>,
    pub context_id: Option<u64>,
    pub completed: bool,
}

/// Partial attributes of one entity, tagged by kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Attributes {
    ProjectList(ChannelQuery),
    Context(ChannelQuery),
    Project(ProjectQuery),
    Task(TaskQuery),
}

impl Attributes {
    pub fn kind(&self) -> EntityKind {
        match self {
            Attributes::ProjectList(_) => EntityKind::ProjectList,
            Attributes::Context(_) => EntityKind::Context,
            Attributes::Project(_) => EntityKind::Project,
            Attributes::Task(_) => EntityKind::Task,
        }
    }
}

pub struct Resolver<'a> {
    store: &'a mut SqliteStore,
    platform: &'a dyn ChatPlatform,
}

impl<'a> Resolver<'a> {
    pub fn new(store: &'a mut SqliteStore, platform: &'a dyn ChatPlatform) -> Self {
        Self { store, platform }
    }

    pub fn resolve(&mut self, attributes: Attributes) -> Result<Entity, GtdError> {
        Ok(match attributes {
            Attributes::ProjectList(query) => Entity::ProjectList(self.resolve_project_list(&query)?),
            Attributes::Context(query) => Entity::Context(self.resolve_context(&query)?),
            Attributes::Project(query) => Entity::Project(self.resolve_project(&query)?),
            Attributes::Task(query) => Entity::Task(self.resolve_task(&query)?),
        })
    }

    pub fn resolve_project_list(&mut self, query: &ChannelQuery) -> Result<ProjectList, GtdError> {
        self.cascade(EntityKind::ProjectList, &channel::strategies(), query)
    }

    pub fn resolve_context(&mut self, query: &ChannelQuery) -> Result<Context, GtdError> {
        self.cascade(EntityKind::Context, &channel::strategies(), query)
    }

    pub fn resolve_project(&mut self, query: &ProjectQuery) -> Result<Project, GtdError> {
        self.cascade(EntityKind::Project, topic::PROJECT_STRATEGIES, query)
    }

    pub fn resolve_task(&mut self, query: &TaskQuery) -> Result<Task, GtdError> {
        self.cascade(EntityKind::Task, topic::TASK_STRATEGIES, query)
    }

    /// Resolves the entity a topic stands for, classifying its channel by
    /// name prefix.
    pub fn resolve_topic(
        &mut self,
        channel_name: &str,
        channel_id: u64,
        topic: &str,
    ) -> Result<Entity, GtdError> {
        if channel_name.starts_with(PROJECT_LIST_PREFIX) {
            let list = self.resolve_project_list(&ChannelQuery::new(channel_id, channel_name))?;
            let project = self.resolve_project(&ProjectQuery {
                id: None,
                name: Some(topic.to_string()),
                project_list_id: Some(list.id),
                completed: is_completed_title(topic),
            })?;
            return Ok(Entity::Project(project));
        }
        if channel_name.starts_with(CONTEXT_PREFIX) {
            let context = self.resolve_context(&ChannelQuery::new(channel_id, channel_name))?;
            let task = self.resolve_task(&TaskQuery {
                id: None,
                name: Some(topic.to_string()),
                project_id: None,
                context_id: Some(context.id),
                completed: is_completed_title(topic),
            })?;
            return Ok(Entity::Task(task));
        }
        Err(GtdError::Unmanaged {
            channel: channel_name.to_string(),
        })
    }

    fn cascade<Q: Debug, T>(
        &mut self,
        kind: EntityKind,
        strategies: &[Strategy<Q, T>],
        query: &Q,
    ) -> Result<T, GtdError> {
        for (name, strategy) in strategies {
            if let Some(found) = strategy(&mut *self, query)? {
                tracing::debug!(kind = kind.as_str(), strategy = *name, "resolved");
                return Ok(found);
            }
        }
        Err(GtdError::UnableToFind {
            kind,
            attributes: format!("{query:?}"),
        })
    }
}
