#![forbid(unsafe_code)]

use super::{
    ProjectFilter, SqliteStore, StoreError, id_column, map_upsert_conflict, optional_sqlite_id,
    to_sqlite_id,
};
use gtd_core::{EntityKind, Project};
use rusqlite::{OptionalExtension, Row, params};

const PROJECT_COLUMNS: &str = "id, name, project_list_id, completed";

impl SqliteStore {
    pub fn upsert_project(&mut self, row: &Project) -> Result<Project, StoreError> {
        let id = to_sqlite_id(row.id)?;
        let existed = self.exists(EntityKind::Project, id)?;
        tracing::debug!(
            id = row.id,
            name = %row.name,
            project_list_id = row.project_list_id,
            completed = row.completed,
            existed,
            "project upsert"
        );

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO projects(id, name, project_list_id, completed) VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(id) DO UPDATE SET \
               name=excluded.name, \
               project_list_id=excluded.project_list_id, \
               completed=excluded.completed",
            params![
                id,
                row.name,
                to_sqlite_id(row.project_list_id)?,
                row.completed
            ],
        )
        .map_err(|err| map_upsert_conflict(err, EntityKind::Project, &row.name))?;
        tx.commit()?;
        Ok(row.clone())
    }

    pub fn get_project(&self, id: u64) -> Result<Option<Project>, StoreError> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id=?1"),
                params![to_sqlite_id(id)?],
                project_row,
            )
            .optional()?)
    }

    pub fn select_projects(&self, filter: &ProjectFilter) -> Result<Vec<Project>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects \
             WHERE (?1 IS NULL OR instr(lower(name), lower(?1)) > 0) \
               AND (?2 IS NULL OR project_list_id = ?2) \
               AND (?3 IS NULL OR completed = ?3) \
             ORDER BY id ASC"
        ))?;
        let rows = stmt.query_map(
            params![
                filter.name_contains,
                optional_sqlite_id(filter.project_list_id)?,
                filter.completed
            ],
            project_row,
        )?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Open projects without a single open task.
    pub fn idle_projects(&self) -> Result<Vec<Project>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects p \
             WHERE p.completed = 0 \
               AND NOT EXISTS ( \
                   SELECT 1 FROM tasks t WHERE t.project_id = p.id AND t.completed = 0 \
               ) \
             ORDER BY p.id ASC"
        ))?;
        let rows = stmt.query_map([], project_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn project_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: id_column(row, 0)?,
        name: row.get(1)?,
        project_list_id: id_column(row, 2)?,
        completed: row.get(3)?,
    })
}
