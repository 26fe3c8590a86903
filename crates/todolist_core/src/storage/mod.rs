//! Persistence collaborators for `RecordStore`.
//!
//! # Responsibility
//! - Define the load/save contract the store calls write-through.
//! - Provide in-memory, JSON document and SQLite implementations.
//! - Keep file formats and SQL details out of the store.
//!
//! # Invariants
//! - `save` receives the full authoritative sequence; implementations must
//!   preserve its order so `load(save(records)) == records`.
//! - Storage never validates business rules; the store re-validates on load.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod json_file;
pub mod migrations;
pub mod sqlite;

pub use json_file::{
    parse_document, read_document, write_document, JsonFileStorage, ParsedDocument, TodoDocument,
    DOCUMENT_VERSION,
};
pub use sqlite::SqliteStorage;

use crate::model::todo::TodoRecord;

pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence failure raised by a storage collaborator.
#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    InvalidData(String),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "storage io error: {err}"),
            Self::Json(err) => write!(f, "storage json error: {err}"),
            Self::Sqlite(err) => write!(f, "storage sqlite error: {err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::InvalidData(message) => write!(f, "invalid stored todo data: {message}"),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } | Self::InvalidData(_) => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Load/save contract used by `RecordStore`.
pub trait TodoStorage {
    /// Reads the persisted sequence in authoritative order.
    fn load(&mut self) -> StorageResult<Vec<TodoRecord>>;
    /// Replaces the persisted sequence with `records`.
    fn save(&mut self, records: &[TodoRecord]) -> StorageResult<()>;
    /// Short backend description for diagnostics, e.g. `json:/path`.
    fn describe(&self) -> String;
}

impl TodoStorage for Box<dyn TodoStorage> {
    fn load(&mut self) -> StorageResult<Vec<TodoRecord>> {
        (**self).load()
    }

    fn save(&mut self, records: &[TodoRecord]) -> StorageResult<()> {
        (**self).save(records)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Process-local storage keeping the last saved snapshot.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    records: Vec<TodoRecord>,
    save_count: usize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the snapshot returned by the next `load`.
    pub fn with_records(records: Vec<TodoRecord>) -> Self {
        Self {
            records,
            save_count: 0,
        }
    }

    /// Last saved snapshot.
    pub fn records(&self) -> &[TodoRecord] {
        &self.records
    }

    /// Number of completed `save` calls.
    pub fn save_count(&self) -> usize {
        self.save_count
    }
}

impl TodoStorage for MemoryStorage {
    fn load(&mut self) -> StorageResult<Vec<TodoRecord>> {
        Ok(self.records.clone())
    }

    fn save(&mut self, records: &[TodoRecord]) -> StorageResult<()> {
        self.records = records.to_vec();
        self.save_count += 1;
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{MemoryStorage, StorageError, TodoStorage};
    use crate::model::todo::{Priority, TodoRecord};
    use std::error::Error;

    #[test]
    fn memory_storage_round_trips_and_counts_saves() {
        let mut storage = MemoryStorage::new();
        let records = vec![
            TodoRecord::new("one", Priority::Low).unwrap(),
            TodoRecord::new("two", Priority::High).unwrap(),
        ];

        storage.save(&records).unwrap();
        storage.save(&records).unwrap();

        assert_eq!(storage.load().unwrap(), records);
        assert_eq!(storage.save_count(), 2);
    }

    #[test]
    fn boxed_storage_delegates() {
        let mut storage: Box<dyn TodoStorage> = Box::new(MemoryStorage::new());
        assert_eq!(storage.describe(), "memory");
        assert!(storage.load().unwrap().is_empty());
    }

    #[test]
    fn io_errors_keep_their_source() {
        let err = StorageError::from(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only volume",
        ));
        assert!(err.to_string().contains("read-only volume"));
        assert!(err.source().is_some());
    }
}
