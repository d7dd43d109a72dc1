#![forbid(unsafe_code)]

pub const PROJECT_LIST_PREFIX: &str = "Project";
pub const CONTEXT_PREFIX: &str = "@";
pub const COMPLETED_MARK: &str = "✔";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKind {
    ProjectList,
    Context,
    Project,
    Task,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::ProjectList,
        EntityKind::Context,
        EntityKind::Project,
        EntityKind::Task,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::ProjectList => "project_list",
            EntityKind::Context => "context",
            EntityKind::Project => "project",
            EntityKind::Task => "task",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value.trim())
    }

    /// Discriminator used in public codes. Tags are never reassigned.
    pub fn tag(self) -> char {
        match self {
            EntityKind::ProjectList => 'L',
            EntityKind::Context => 'C',
            EntityKind::Project => 'P',
            EntityKind::Task => 'T',
        }
    }

    pub fn from_tag(tag: char) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    /// Channel name prefix reserved for channel-level kinds.
    pub fn reserved_prefix(self) -> Option<&'static str> {
        match self {
            EntityKind::ProjectList => Some(PROJECT_LIST_PREFIX),
            EntityKind::Context => Some(CONTEXT_PREFIX),
            EntityKind::Project | EntityKind::Task => None,
        }
    }

    pub fn is_channel_level(self) -> bool {
        self.reserved_prefix().is_some()
    }

    pub fn carries_prefix(self, name: &str) -> bool {
        self.reserved_prefix()
            .is_some_and(|prefix| name.starts_with(prefix))
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectList {
    pub id: u64,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Context {
    pub id: u64,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Project {
    pub id: u64,
    pub name: String,
    pub project_list_id: u64,
    pub completed: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Task {
    pub id: u64,
    pub name: String,
    pub project_id: Option<u64>,
    pub context_id: u64,
    pub completed: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Entity {
    ProjectList(ProjectList),
    Context(Context),
    Project(Project),
    Task(Task),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::ProjectList(_) => EntityKind::ProjectList,
            Entity::Context(_) => EntityKind::Context,
            Entity::Project(_) => EntityKind::Project,
            Entity::Task(_) => EntityKind::Task,
        }
    }

    pub fn id(&self) -> u64 {
        match self {
            Entity::ProjectList(row) => row.id,
            Entity::Context(row) => row.id,
            Entity::Project(row) => row.id,
            Entity::Task(row) => row.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Entity::ProjectList(row) => &row.name,
            Entity::Context(row) => &row.name,
            Entity::Project(row) => &row.name,
            Entity::Task(row) => &row.name,
        }
    }
}

pub fn is_completed_title(title: &str) -> bool {
    title.trim_start().starts_with(COMPLETED_MARK)
}

/// Prefixes the completion mark unless the title already carries it.
pub fn mark_completed(title: &str) -> String {
    if is_completed_title(title) {
        return title.to_string();
    }
    format!("{COMPLETED_MARK} {title}")
}
