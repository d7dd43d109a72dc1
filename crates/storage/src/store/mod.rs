#![forbid(unsafe_code)]

mod channels;
mod error;
mod filters;
mod projects;
mod tasks;

pub use error::StoreError;
pub use filters::*;

use gtd_core::EntityKind;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DB_FILE_NAME: &str = "gtd.db";
const SCHEMA_VERSION: i64 = 1;

/// Local cache of project lists, contexts, projects and tasks.
///
/// Ids are the only stable key across rebuilds. Every write is a full
/// overwrite of the row keyed by id.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    storage_dir: Option<PathBuf>,
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&storage_dir)?;

        let conn = Connection::open(storage_dir.join(DB_FILE_NAME))?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Self::install(conn, Some(storage_dir))
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::install(Connection::open_in_memory()?, None)
    }

    fn install(conn: Connection, storage_dir: Option<PathBuf>) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        preflight_gate(&conn)?;
        install_schema(&conn)?;
        Ok(Self { conn, storage_dir })
    }

    pub fn storage_dir(&self) -> Option<&Path> {
        self.storage_dir.as_deref()
    }

    pub fn count(&self, kind: EntityKind) -> Result<usize, StoreError> {
        let count = self.conn.query_row(
            &format!("SELECT COUNT(1) FROM {}", table_name(kind)),
            [],
            |row| row.get::<_, i64>(0),
        )?;
        usize::try_from(count).map_err(|_| StoreError::InvalidInput("negative row count"))
    }

    /// Deletes every row of `kind`. This is not isolated to one table:
    /// dependent rows follow the schema's foreign keys, so projects go with
    /// their list, tasks go with their context, and tasks lose their project
    /// link when projects are wiped. Returns the number of `kind` rows only.
    pub fn truncate(&mut self, kind: EntityKind) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;
        let deleted = tx.execute(&format!("DELETE FROM {}", table_name(kind)), [])?;
        tx.commit()?;
        tracing::warn!(kind = kind.as_str(), deleted, "truncated table");
        Ok(deleted)
    }

    pub fn truncate_all(&mut self) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        for kind in [
            EntityKind::Task,
            EntityKind::Project,
            EntityKind::Context,
            EntityKind::ProjectList,
        ] {
            let deleted = tx.execute(&format!("DELETE FROM {}", table_name(kind)), [])?;
            tracing::warn!(kind = kind.as_str(), deleted, "truncated table");
        }
        tx.commit()?;
        Ok(())
    }

    fn exists(&self, kind: EntityKind, id: i64) -> Result<bool, StoreError> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT 1 FROM {} WHERE id=?1", table_name(kind)),
                params![id],
                |row| row.get::<_, i64>(0),
            )
            .optional()?
            .is_some())
    }
}

fn table_name(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::ProjectList => "project_lists",
        EntityKind::Context => "contexts",
        EntityKind::Project => "projects",
        EntityKind::Task => "tasks",
    }
}

fn preflight_gate(conn: &Connection) -> Result<(), StoreError> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
    )?;
    let mut rows = stmt.query([])?;
    let mut tables = BTreeSet::new();
    while let Some(row) = rows.next()? {
        tables.insert(row.get::<_, String>(0)?);
    }

    if tables.is_empty() {
        return Ok(());
    }
    if !tables.contains("store_state") {
        return Err(StoreError::InvalidInput(
            "RESET_REQUIRED: schema state table is missing",
        ));
    }

    let version = conn
        .query_row(
            "SELECT schema_version FROM store_state WHERE singleton=1",
            [],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;

    match version {
        Some(v) if v == SCHEMA_VERSION => Ok(()),
        Some(_) => Err(StoreError::InvalidInput(
            "RESET_REQUIRED: schema version mismatch",
        )),
        None => Err(StoreError::InvalidInput(
            "RESET_REQUIRED: schema state row is missing",
        )),
    }
}

fn install_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS store_state (
          singleton INTEGER PRIMARY KEY CHECK(singleton = 1),
          schema_version INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS project_lists (
          id INTEGER PRIMARY KEY,
          name TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS contexts (
          id INTEGER PRIMARY KEY,
          name TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS projects (
          id INTEGER PRIMARY KEY,
          name TEXT NOT NULL,
          project_list_id INTEGER NOT NULL,
          completed INTEGER NOT NULL,
          FOREIGN KEY(project_list_id) REFERENCES project_lists(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_projects_list ON projects(project_list_id, id);

        CREATE TABLE IF NOT EXISTS tasks (
          id INTEGER PRIMARY KEY,
          name TEXT NOT NULL,
          project_id INTEGER,
          context_id INTEGER NOT NULL,
          completed INTEGER NOT NULL,
          FOREIGN KEY(project_id) REFERENCES projects(id) ON DELETE SET NULL,
          FOREIGN KEY(context_id) REFERENCES contexts(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks(project_id, id);
        CREATE INDEX IF NOT EXISTS idx_tasks_context ON tasks(context_id, id);
        "#,
    )?;

    conn.execute(
        "INSERT INTO store_state(singleton, schema_version) VALUES (1, ?1) \
         ON CONFLICT(singleton) DO UPDATE SET schema_version=excluded.schema_version",
        params![SCHEMA_VERSION],
    )?;

    Ok(())
}

/// Unique-name violations surface as `DuplicateName`, dangling parent
/// links as `UnknownId`.
fn map_upsert_conflict(err: rusqlite::Error, kind: EntityKind, name: &str) -> StoreError {
    let (unique, foreign_key) = match constraint_message(&err) {
        Some(message) => (
            message.contains("UNIQUE constraint failed"),
            message.contains("FOREIGN KEY constraint failed"),
        ),
        None => (false, false),
    };
    if unique {
        return StoreError::DuplicateName {
            kind,
            name: name.to_string(),
        };
    }
    if foreign_key {
        return StoreError::UnknownId;
    }
    StoreError::Sql(err)
}

fn constraint_message(err: &rusqlite::Error) -> Option<&str> {
    match err {
        rusqlite::Error::SqliteFailure(code, message)
            if code.code == ErrorCode::ConstraintViolation =>
        {
            Some(message.as_deref().unwrap_or_default())
        }
        _ => None,
    }
}

fn to_sqlite_id(value: u64) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::InvalidInput("id exceeds sqlite integer range"))
}

fn id_column(row: &Row<'_>, index: usize) -> rusqlite::Result<u64> {
    let value = row.get::<_, i64>(index)?;
    u64::try_from(value).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(index, value))
}

fn optional_id_column(row: &Row<'_>, index: usize) -> rusqlite::Result<Option<u64>> {
    match row.get::<_, Option<i64>>(index)? {
        None => Ok(None),
        Some(value) => u64::try_from(value)
            .map(Some)
            .map_err(|_| rusqlite::Error::IntegralValueOutOfRange(index, value)),
    }
}

fn optional_sqlite_id(value: Option<u64>) -> Result<Option<i64>, StoreError> {
    value.map(to_sqlite_id).transpose()
}
