#![forbid(unsafe_code)]

use super::{ChannelQuery, Resolver, Strategy};
use crate::error::GtdError;
use gtd_core::{Context, EntityKind, ProjectList};
use gtd_storage::{SqliteStore, StoreError};

/// Project lists and contexts resolve the same way; only the reserved
/// prefix and the backing table differ.
pub(super) trait ChannelRow: Sized {
    const KIND: EntityKind;

    fn from_parts(id: u64, name: String) -> Self;
    fn upsert(store: &mut SqliteStore, row: &Self) -> Result<Self, StoreError>;
    fn get(store: &SqliteStore, id: u64) -> Result<Option<Self>, StoreError>;
    fn find_by_name(store: &SqliteStore, name: &str) -> Result<Option<Self>, StoreError>;
}

impl ChannelRow for ProjectList {
    const KIND: EntityKind = EntityKind::ProjectList;

    fn from_parts(id: u64, name: String) -> Self {
        ProjectList { id, name }
    }

    fn upsert(store: &mut SqliteStore, row: &Self) -> Result<Self, StoreError> {
        store.upsert_project_list(row)
    }

    fn get(store: &SqliteStore, id: u64) -> Result<Option<Self>, StoreError> {
        store.get_project_list(id)
    }

    fn find_by_name(store: &SqliteStore, name: &str) -> Result<Option<Self>, StoreError> {
        store.find_project_list_by_name(name)
    }
}

impl ChannelRow for Context {
    const KIND: EntityKind = EntityKind::Context;

    fn from_parts(id: u64, name: String) -> Self {
        Context { id, name }
    }

    fn upsert(store: &mut SqliteStore, row: &Self) -> Result<Self, StoreError> {
        store.upsert_context(row)
    }

    fn get(store: &SqliteStore, id: u64) -> Result<Option<Self>, StoreError> {
        store.get_context(id)
    }

    fn find_by_name(store: &SqliteStore, name: &str) -> Result<Option<Self>, StoreError> {
        store.find_context_by_name(name)
    }
}

pub(super) fn strategies<T: ChannelRow>() -> [Strategy<ChannelQuery, T>; 3] {
    [
        ("trusted", trusted::<T>),
        ("cached", cached::<T>),
        ("remote", remote::<T>),
    ]
}

fn prefixed_name<T: ChannelRow>(query: &ChannelQuery) -> Option<&str> {
    query
        .name
        .as_deref()
        .filter(|name| T::KIND.carries_prefix(name))
}

fn trusted<T: ChannelRow>(
    resolver: &mut Resolver<'_>,
    query: &ChannelQuery,
) -> Result<Option<T>, GtdError> {
    let (Some(id), Some(name)) = (query.id, prefixed_name::<T>(query)) else {
        return Ok(None);
    };
    let row = T::upsert(resolver.store, &T::from_parts(id, name.to_string()))?;
    Ok(Some(row))
}

// Id before name: a name hit must never shadow a different row owning the id.
fn cached<T: ChannelRow>(
    resolver: &mut Resolver<'_>,
    query: &ChannelQuery,
) -> Result<Option<T>, GtdError> {
    if let Some(id) = query.id
        && let Some(row) = T::get(resolver.store, id)?
    {
        return Ok(Some(row));
    }
    match query.name.as_deref() {
        Some(name) => Ok(T::find_by_name(resolver.store, name)?),
        None => Ok(None),
    }
}

fn remote<T: ChannelRow>(
    resolver: &mut Resolver<'_>,
    query: &ChannelQuery,
) -> Result<Option<T>, GtdError> {
    let Some(name) = prefixed_name::<T>(query) else {
        return Ok(None);
    };
    let id = resolver.platform.resolve_channel_id(name)?;
    let row = T::upsert(resolver.store, &T::from_parts(id, name.to_string()))?;
    Ok(Some(row))
}
