#![forbid(unsafe_code)]

/// Case-insensitive substring match on `name`; `None` matches every row.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NameFilter {
    pub name_contains: Option<String>,
}

impl NameFilter {
    pub fn containing(value: impl Into<String>) -> Self {
        Self {
            name_contains: Some(value.into()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProjectFilter {
    pub name_contains: Option<String>,
    pub project_list_id: Option<u64>,
    pub completed: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub name_contains: Option<String>,
    pub project_id: Option<u64>,
    pub context_id: Option<u64>,
    pub completed: Option<bool>,
}
