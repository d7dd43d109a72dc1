#![forbid(unsafe_code)]

use super::{
    NameFilter, SqliteStore, StoreError, id_column, map_upsert_conflict, table_name, to_sqlite_id,
};
use gtd_core::{Context, EntityKind, ProjectList};
use rusqlite::{OptionalExtension, params};

// Project lists and contexts share one table shape: (id, unique name).

impl SqliteStore {
    pub fn upsert_project_list(&mut self, row: &ProjectList) -> Result<ProjectList, StoreError> {
        self.upsert_channel(EntityKind::ProjectList, row.id, &row.name)?;
        Ok(row.clone())
    }

    pub fn get_project_list(&self, id: u64) -> Result<Option<ProjectList>, StoreError> {
        Ok(self
            .get_channel(EntityKind::ProjectList, id)?
            .map(|(id, name)| ProjectList { id, name }))
    }

    pub fn find_project_list_by_name(&self, name: &str) -> Result<Option<ProjectList>, StoreError> {
        Ok(self
            .find_channel_by_name(EntityKind::ProjectList, name)?
            .map(|(id, name)| ProjectList { id, name }))
    }

    pub fn select_project_lists(&self, filter: &NameFilter) -> Result<Vec<ProjectList>, StoreError> {
        Ok(self
            .select_channels(EntityKind::ProjectList, filter)?
            .into_iter()
            .map(|(id, name)| ProjectList { id, name })
            .collect())
    }

    pub fn upsert_context(&mut self, row: &Context) -> Result<Context, StoreError> {
        self.upsert_channel(EntityKind::Context, row.id, &row.name)?;
        Ok(row.clone())
    }

    pub fn get_context(&self, id: u64) -> Result<Option<Context>, StoreError> {
        Ok(self
            .get_channel(EntityKind::Context, id)?
            .map(|(id, name)| Context { id, name }))
    }

    pub fn find_context_by_name(&self, name: &str) -> Result<Option<Context>, StoreError> {
        Ok(self
            .find_channel_by_name(EntityKind::Context, name)?
            .map(|(id, name)| Context { id, name }))
    }

    pub fn select_contexts(&self, filter: &NameFilter) -> Result<Vec<Context>, StoreError> {
        Ok(self
            .select_channels(EntityKind::Context, filter)?
            .into_iter()
            .map(|(id, name)| Context { id, name })
            .collect())
    }

    fn upsert_channel(&mut self, kind: EntityKind, id: u64, name: &str) -> Result<(), StoreError> {
        let id_sql = to_sqlite_id(id)?;
        let existed = self.exists(kind, id_sql)?;
        tracing::debug!(kind = kind.as_str(), id, name, existed, "upsert");

        let tx = self.conn.transaction()?;
        tx.execute(
            &format!(
                "INSERT INTO {}(id, name) VALUES (?1, ?2) \
                 ON CONFLICT(id) DO UPDATE SET name=excluded.name",
                table_name(kind)
            ),
            params![id_sql, name],
        )
        .map_err(|err| map_upsert_conflict(err, kind, name))?;
        tx.commit()?;
        Ok(())
    }

    fn get_channel(&self, kind: EntityKind, id: u64) -> Result<Option<(u64, String)>, StoreError> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT id, name FROM {} WHERE id=?1", table_name(kind)),
                params![to_sqlite_id(id)?],
                |row| Ok((id_column(row, 0)?, row.get::<_, String>(1)?)),
            )
            .optional()?)
    }

    fn find_channel_by_name(
        &self,
        kind: EntityKind,
        name: &str,
    ) -> Result<Option<(u64, String)>, StoreError> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT id, name FROM {} WHERE name=?1", table_name(kind)),
                params![name],
                |row| Ok((id_column(row, 0)?, row.get::<_, String>(1)?)),
            )
            .optional()?)
    }

    fn select_channels(
        &self,
        kind: EntityKind,
        filter: &NameFilter,
    ) -> Result<Vec<(u64, String)>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, name FROM {} \
             WHERE (?1 IS NULL OR instr(lower(name), lower(?1)) > 0) \
             ORDER BY id ASC",
            table_name(kind)
        ))?;
        let rows = stmt.query_map(params![filter.name_contains], |row| {
            Ok((id_column(row, 0)?, row.get::<_, String>(1)?))
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}
