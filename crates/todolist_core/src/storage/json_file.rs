//! JSON document storage and import/export helpers.
//!
//! # Responsibility
//! - Persist the authoritative sequence as one JSON document.
//! - Read/write the `{ "todos": [...] }` exchange document.
//!
//! # Invariants
//! - Writes go to a sibling temp file first, then rename over the target.
//! - `version`/`count`/`exportDate` are advisory; readers rely on `todos`.
//! - One malformed entry never discards the rest of the document.

use super::{StorageError, StorageResult, TodoStorage};
use crate::model::todo::{now_epoch_secs, TodoRecord};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Format version written into every document.
pub const DOCUMENT_VERSION: &str = "1.0";

/// Exchange document shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoDocument {
    pub version: String,
    pub count: usize,
    /// Unix epoch seconds at write time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_date: Option<i64>,
    pub todos: Vec<TodoRecord>,
}

impl TodoDocument {
    pub fn new(records: &[TodoRecord]) -> Self {
        Self {
            version: DOCUMENT_VERSION.to_string(),
            count: records.len(),
            export_date: Some(now_epoch_secs()),
            todos: records.to_vec(),
        }
    }
}

/// Result of a tolerant document parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDocument {
    pub records: Vec<TodoRecord>,
    /// Entries that were not decodable as records.
    pub skipped: usize,
}

/// Parses a document body.
///
/// Accepts either the `{ "todos": [...] }` object or a bare array of records.
///
/// # Errors
/// - `Json` when the text is not JSON at all.
/// - `InvalidData` when the root is neither an object with a `todos` array
///   nor an array.
pub fn parse_document(text: &str) -> StorageResult<ParsedDocument> {
    let root: Value = serde_json::from_str(text)?;
    let entries = match root {
        Value::Array(entries) => entries,
        Value::Object(mut object) => match object.remove("todos") {
            Some(Value::Array(entries)) => entries,
            _ => {
                return Err(StorageError::InvalidData(
                    "document is missing a `todos` array".to_string(),
                ))
            }
        },
        _ => {
            return Err(StorageError::InvalidData(
                "document root must be an object or an array".to_string(),
            ))
        }
    };

    let mut parsed = ParsedDocument::default();
    for (index, entry) in entries.into_iter().enumerate() {
        if !entry.is_object() {
            warn!("event=document_parse module=storage status=skip index={index} reason=not_an_object");
            parsed.skipped += 1;
            continue;
        }
        match serde_json::from_value::<TodoRecord>(entry) {
            Ok(record) => parsed.records.push(record),
            Err(err) => {
                warn!("event=document_parse module=storage status=skip index={index} error={err}");
                parsed.skipped += 1;
            }
        }
    }
    Ok(parsed)
}

/// Reads and parses a document file.
pub fn read_document(path: &Path) -> StorageResult<ParsedDocument> {
    let text = fs::read_to_string(path)?;
    parse_document(&text)
}

/// Writes `records` as a document file, replacing any previous content.
pub fn write_document(path: &Path, records: &[TodoRecord]) -> StorageResult<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let body = serde_json::to_string_pretty(&TodoDocument::new(records))?;

    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);
    fs::write(&temp_path, body)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

/// Storage backed by one JSON document file.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TodoStorage for JsonFileStorage {
    fn load(&mut self) -> StorageResult<Vec<TodoRecord>> {
        if !self.path.exists() {
            info!("event=storage_load module=storage status=ok backend=json count=0 reason=no_file");
            return Ok(Vec::new());
        }
        let started_at = Instant::now();
        let parsed = read_document(&self.path)?;
        info!(
            "event=storage_load module=storage status=ok backend=json count={} skipped={} duration_ms={}",
            parsed.records.len(),
            parsed.skipped,
            started_at.elapsed().as_millis()
        );
        Ok(parsed.records)
    }

    fn save(&mut self, records: &[TodoRecord]) -> StorageResult<()> {
        write_document(&self.path, records)
    }

    fn describe(&self) -> String {
        format!("json:{}", self.path.display())
    }
}
