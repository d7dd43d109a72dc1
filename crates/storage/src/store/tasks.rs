#![forbid(unsafe_code)]

use super::{
    SqliteStore, StoreError, TaskFilter, id_column, map_upsert_conflict, optional_id_column,
    optional_sqlite_id, to_sqlite_id,
};
use gtd_core::{EntityKind, Task};
use rusqlite::{OptionalExtension, Row, params};

const TASK_COLUMNS: &str = "id, name, project_id, context_id, completed";

impl SqliteStore {
    pub fn upsert_task(&mut self, row: &Task) -> Result<Task, StoreError> {
        let id = to_sqlite_id(row.id)?;
        let existed = self.exists(EntityKind::Task, id)?;
        tracing::debug!(
            id = row.id,
            name = %row.name,
            project_id = ?row.project_id,
            context_id = row.context_id,
            completed = row.completed,
            existed,
            "task upsert"
        );

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO tasks(id, name, project_id, context_id, completed) VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT(id) DO UPDATE SET \
               name=excluded.name, \
               project_id=excluded.project_id, \
               context_id=excluded.context_id, \
               completed=excluded.completed",
            params![
                id,
                row.name,
                optional_sqlite_id(row.project_id)?,
                to_sqlite_id(row.context_id)?,
                row.completed
            ],
        )
        .map_err(|err| map_upsert_conflict(err, EntityKind::Task, &row.name))?;
        tx.commit()?;
        Ok(row.clone())
    }

    pub fn get_task(&self, id: u64) -> Result<Option<Task>, StoreError> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id=?1"),
                params![to_sqlite_id(id)?],
                task_row,
            )
            .optional()?)
    }

    pub fn select_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks \
             WHERE (?1 IS NULL OR instr(lower(name), lower(?1)) > 0) \
               AND (?2 IS NULL OR project_id = ?2) \
               AND (?3 IS NULL OR context_id = ?3) \
               AND (?4 IS NULL OR completed = ?4) \
             ORDER BY id ASC"
        ))?;
        let rows = stmt.query_map(
            params![
                filter.name_contains,
                optional_sqlite_id(filter.project_id)?,
                optional_sqlite_id(filter.context_id)?,
                filter.completed
            ],
            task_row,
        )?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn task_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: id_column(row, 0)?,
        name: row.get(1)?,
        project_id: optional_id_column(row, 2)?,
        context_id: id_column(row, 3)?,
        completed: row.get(4)?,
    })
}
