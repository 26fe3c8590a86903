//! SQLite-backed todo storage.
//!
//! # Responsibility
//! - Open file or in-memory connections with migrations applied.
//! - Persist the authoritative sequence into the `todos` table.
//!
//! # Invariants
//! - Returned storages have every migration applied.
//! - `save` replaces the whole table inside one transaction.
//! - Row order on load follows the `position` column written by `save`.

use super::migrations::apply_migrations;
use super::{StorageError, StorageResult, TodoStorage};
use crate::model::todo::{Priority, TodoRecord};
use log::{error, info};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::time::{Duration, Instant};
use uuid::Uuid;

const TODO_SELECT_SQL: &str = "SELECT
    id,
    title,
    completed,
    priority,
    created_at,
    modified_at,
    category,
    notes,
    tags
FROM todos
ORDER BY position ASC";

/// Storage writing records into a SQLite database.
pub struct SqliteStorage {
    conn: Connection,
    location: String,
}

impl SqliteStorage {
    /// Opens (or creates) a database file and applies pending migrations.
    ///
    /// # Side effects
    /// - Emits `db_open` events with duration and status.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let location = path.display().to_string();
        Self::bootstrap("file", location, || Connection::open(path))
    }

    /// Opens a private in-memory database with migrations applied.
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::bootstrap("memory", ":memory:".to_string(), Connection::open_in_memory)
    }

    /// Underlying connection, for diagnostics and tests.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn bootstrap(
        mode: &str,
        location: String,
        open: impl FnOnce() -> rusqlite::Result<Connection>,
    ) -> StorageResult<Self> {
        let started_at = Instant::now();
        info!("event=db_open module=storage status=start mode={mode}");

        let result = open().map_err(StorageError::from).and_then(|mut conn| {
            conn.busy_timeout(Duration::from_secs(5))?;
            apply_migrations(&mut conn)?;
            Ok(conn)
        });

        match result {
            Ok(conn) => {
                info!(
                    "event=db_open module=storage status=ok mode={mode} duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Ok(Self { conn, location })
            }
            Err(err) => {
                error!(
                    "event=db_open module=storage status=error mode={mode} duration_ms={} error={err}",
                    started_at.elapsed().as_millis()
                );
                Err(err)
            }
        }
    }
}

impl TodoStorage for SqliteStorage {
    fn load(&mut self) -> StorageResult<Vec<TodoRecord>> {
        let mut stmt = self.conn.prepare(TODO_SELECT_SQL)?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_todo_row(row)?);
        }
        Ok(records)
    }

    fn save(&mut self, records: &[TodoRecord]) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM todos;", [])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO todos (
                    id,
                    position,
                    title,
                    completed,
                    priority,
                    created_at,
                    modified_at,
                    category,
                    notes,
                    tags
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
            )?;
            for (position, record) in records.iter().enumerate() {
                insert.execute(params![
                    record.id.to_string(),
                    i64::try_from(position).unwrap_or(i64::MAX),
                    record.title.as_str(),
                    bool_to_int(record.completed),
                    i64::from(record.priority.ordinal()),
                    record.created_at,
                    record.modified_at,
                    record.category.as_str(),
                    record.notes.as_deref(),
                    serde_json::to_string(&record.tags)?,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("sqlite:{}", self.location)
    }
}

fn parse_todo_row(row: &Row<'_>) -> StorageResult<TodoRecord> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text)
        .map_err(|_| StorageError::InvalidData(format!("invalid uuid `{id_text}` in todos.id")))?;

    let completed = match row.get::<_, i64>("completed")? {
        0 => false,
        1 => true,
        other => {
            return Err(StorageError::InvalidData(format!(
                "invalid completed value `{other}` in todos.completed"
            )));
        }
    };

    let priority_value: i64 = row.get("priority")?;
    let priority = Priority::from_ordinal(priority_value).ok_or_else(|| {
        StorageError::InvalidData(format!(
            "invalid priority `{priority_value}` in todos.priority"
        ))
    })?;

    let tags_text: String = row.get("tags")?;
    let tags: Vec<String> = serde_json::from_str(&tags_text).map_err(|_| {
        StorageError::InvalidData(format!("invalid tags `{tags_text}` in todos.tags"))
    })?;

    Ok(TodoRecord {
        id,
        title: row.get("title")?,
        completed,
        priority,
        created_at: row.get("created_at")?,
        modified_at: row.get("modified_at")?,
        category: row.get("category")?,
        notes: row.get("notes")?,
        tags,
    })
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
