//! Authoritative ordered record sequence.
//!
//! # Responsibility
//! - Own every live `TodoRecord` in insertion order.
//! - Funnel all mutations through one API so persistence and notification
//!   happen in one place.
//!
//! # Invariants
//! - No two live records share an id.
//! - Every mutation bumps `revision`, saves write-through, then notifies.
//! - A failed save is logged and published; the in-memory change stands.

use super::events::{StoreEvent, Subscribers, SubscriptionId};
use crate::model::todo::{
    normalize_tags, Priority, RecordChange, RecordValidationError, TodoId, TodoRecord,
};
use crate::storage::{MemoryStorage, StorageResult, TodoStorage};
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Semantic failures of store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    EmptyTitle,
    NilId,
    NotFound(TodoId),
    DuplicateId(TodoId),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "title cannot be empty"),
            Self::NilId => write!(f, "record id cannot be nil"),
            Self::NotFound(id) => write!(f, "todo not found: {id}"),
            Self::DuplicateId(id) => write!(f, "todo id already exists: {id}"),
        }
    }
}

impl Error for StoreError {}

impl From<RecordValidationError> for StoreError {
    fn from(value: RecordValidationError) -> Self {
        match value {
            RecordValidationError::EmptyTitle => Self::EmptyTitle,
            RecordValidationError::NilId => Self::NilId,
        }
    }
}

/// Outcome of a bulk import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    /// Records whose id was already live (or repeated within the batch).
    pub skipped_duplicates: usize,
    /// Records failing validation (blank title, nil id).
    pub skipped_invalid: usize,
}

/// Owner of the authoritative todo sequence.
pub struct RecordStore<S: TodoStorage> {
    records: Vec<TodoRecord>,
    storage: S,
    revision: u64,
    subscribers: Subscribers<StoreEvent>,
}

impl RecordStore<MemoryStorage> {
    /// Creates an empty store persisting into process memory.
    pub fn in_memory() -> Self {
        Self::new(MemoryStorage::new())
    }
}

impl<S: TodoStorage> RecordStore<S> {
    /// Creates an empty store without reading `storage`.
    pub fn new(storage: S) -> Self {
        Self {
            records: Vec::new(),
            storage,
            revision: 0,
            subscribers: Subscribers::new(),
        }
    }

    /// Creates a store hydrated from `storage`.
    ///
    /// A failed load is logged and leaves the store empty.
    pub fn open(storage: S) -> Self {
        let mut store = Self::new(storage);
        if let Err(err) = store.reload() {
            error!(
                "event=store_open module=store status=error backend={} error={err}",
                store.storage.describe()
            );
        }
        store
    }

    /// Appends a new open record built from `title`.
    ///
    /// # Errors
    /// - `EmptyTitle` when `title` is blank after trimming; nothing changes.
    pub fn insert(&mut self, title: &str, priority: Option<Priority>) -> StoreResult<TodoRecord> {
        let record = TodoRecord::new(title, priority.unwrap_or_default())?;
        self.records.push(record.clone());
        debug!(
            "event=record_insert module=store status=ok id={} total={}",
            record.id,
            self.records.len()
        );
        self.commit("insert", vec![StoreEvent::Added(record.clone())]);
        Ok(record)
    }

    /// Appends a fully formed record, keeping its id and timestamps.
    ///
    /// # Errors
    /// - `DuplicateId` when the id is already live.
    /// - `EmptyTitle`/`NilId` when the record is invalid.
    pub fn insert_existing(&mut self, record: TodoRecord) -> StoreResult<()> {
        let record = sanitize_record(record)?;
        if self.position_of(record.id).is_some() {
            return Err(StoreError::DuplicateId(record.id));
        }
        self.records.push(record.clone());
        self.commit("insert_existing", vec![StoreEvent::Added(record)]);
        Ok(())
    }

    /// Appends a batch, skipping duplicate ids and invalid records.
    ///
    /// Saves once for the whole batch.
    pub fn import_records(&mut self, records: Vec<TodoRecord>) -> ImportSummary {
        let (summary, added) = self.append_batch(records);
        if summary.imported > 0 {
            self.commit("import", added.into_iter().map(StoreEvent::Added).collect());
        }
        info!(
            "event=records_import module=store status=ok imported={} skipped_duplicates={} skipped_invalid={}",
            summary.imported, summary.skipped_duplicates, summary.skipped_invalid
        );
        summary
    }

    /// Removes the record at `position`; `None` when out of bounds.
    pub fn remove_at(&mut self, position: usize) -> Option<TodoRecord> {
        if position >= self.records.len() {
            return None;
        }
        let removed = self.records.remove(position);
        self.commit("remove", vec![StoreEvent::Removed(removed.clone())]);
        Some(removed)
    }

    /// Removes the record with `id`; `None` when absent.
    pub fn remove_by_id(&mut self, id: TodoId) -> Option<TodoRecord> {
        let position = self.position_of(id)?;
        self.remove_at(position)
    }

    /// Applies one field change to the record with `id`.
    ///
    /// Returns `Ok(false)` for a no-op change: no save, no event and
    /// `modified_at` untouched.
    ///
    /// # Errors
    /// - `NotFound` when no record has `id`.
    /// - `EmptyTitle` when a title change is blank.
    pub fn update(&mut self, id: TodoId, change: RecordChange) -> StoreResult<bool> {
        let position = self.position_of(id).ok_or(StoreError::NotFound(id))?;
        let field = change.field_name();
        if !self.records[position].apply(change)? {
            debug!("event=record_update module=store status=skip id={id} field={field} reason=unchanged");
            return Ok(false);
        }
        let updated = self.records[position].clone();
        self.commit("update", vec![StoreEvent::Updated(updated)]);
        Ok(true)
    }

    /// Flips completion of the record with `id`.
    ///
    /// Returns the new state, or `None` when absent.
    pub fn toggle_completed(&mut self, id: TodoId) -> Option<bool> {
        let position = self.position_of(id)?;
        let completed = self.records[position].toggle_completed();
        let updated = self.records[position].clone();
        self.commit("toggle", vec![StoreEvent::Updated(updated)]);
        Some(completed)
    }

    /// Sets `completed` on every record that differs from it.
    ///
    /// Returns how many records changed; `0` means nothing was saved and
    /// nothing was published.
    pub fn set_all_completed(&mut self, completed: bool) -> usize {
        let mut changed = Vec::new();
        for record in self
            .records
            .iter_mut()
            .filter(|record| record.completed != completed)
        {
            record.toggle_completed();
            changed.push(record.clone());
        }
        if changed.is_empty() {
            return 0;
        }
        let count = changed.len();
        debug!("event=records_set_completed module=store status=ok completed={completed} changed={count}");
        self.commit(
            "set_all_completed",
            changed.into_iter().map(StoreEvent::Updated).collect(),
        );
        count
    }

    /// Removes every completed record, keeping the others in order.
    ///
    /// Returns how many were removed; `0` means nothing was saved.
    pub fn clear_completed(&mut self) -> usize {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.records)
            .into_iter()
            .partition(|record| record.completed);
        self.records = kept;
        if removed.is_empty() {
            return 0;
        }
        let count = removed.len();
        self.commit(
            "clear_completed",
            removed.into_iter().map(StoreEvent::Removed).collect(),
        );
        count
    }

    /// Empties the sequence and returns how many records were dropped.
    ///
    /// An empty store is left untouched: no save, no event.
    pub fn clear_all(&mut self) -> usize {
        let removed = self.records.len();
        if removed == 0 {
            return 0;
        }
        self.records.clear();
        self.commit("clear_all", vec![StoreEvent::Cleared { removed }]);
        removed
    }

    /// Replaces the sequence with the storage contents.
    ///
    /// Loaded records go through the same duplicate/validation policy as
    /// imports. Nothing is written back.
    pub fn reload(&mut self) -> StorageResult<usize> {
        let loaded = self.storage.load()?;
        self.records.clear();
        let (summary, _) = self.append_batch(loaded);
        self.revision += 1;
        if summary.skipped_duplicates + summary.skipped_invalid > 0 {
            warn!(
                "event=store_reload module=store status=skip skipped_duplicates={} skipped_invalid={}",
                summary.skipped_duplicates, summary.skipped_invalid
            );
        }
        info!(
            "event=store_reload module=store status=ok backend={} count={}",
            self.storage.describe(),
            summary.imported
        );
        self.subscribers.emit(&StoreEvent::Reloaded {
            count: summary.imported,
        });
        Ok(summary.imported)
    }

    /// Saves the full sequence now.
    pub fn save(&mut self) -> StorageResult<()> {
        self.storage.save(&self.records)
    }

    pub fn total_count(&self) -> usize {
        self.records.len()
    }

    pub fn active_count(&self) -> usize {
        self.records.iter().filter(|record| !record.completed).count()
    }

    pub fn completed_count(&self) -> usize {
        self.records.iter().filter(|record| record.completed).count()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&TodoRecord> {
        self.records.get(position)
    }

    pub fn get_by_id(&self, id: TodoId) -> Option<&TodoRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    pub fn position_of(&self, id: TodoId) -> Option<usize> {
        self.records.iter().position(|record| record.id == id)
    }

    /// Full sequence in authoritative order.
    pub fn all(&self) -> &[TodoRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TodoRecord> {
        self.records.iter()
    }

    /// Mutation counter; changes whenever the sequence or a record changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&StoreEvent) + 'static) -> SubscriptionId {
        self.subscribers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    fn append_batch(&mut self, records: Vec<TodoRecord>) -> (ImportSummary, Vec<TodoRecord>) {
        let mut summary = ImportSummary::default();
        let mut seen: HashSet<TodoId> = self.records.iter().map(|record| record.id).collect();
        let mut added = Vec::new();
        for record in records {
            let record = match sanitize_record(record) {
                Ok(record) => record,
                Err(_) => {
                    summary.skipped_invalid += 1;
                    continue;
                }
            };
            if !seen.insert(record.id) {
                debug!(
                    "event=records_import module=store status=skip id={} reason=duplicate_id",
                    record.id
                );
                summary.skipped_duplicates += 1;
                continue;
            }
            self.records.push(record.clone());
            added.push(record);
            summary.imported += 1;
        }
        (summary, added)
    }

    /// Bumps the revision, saves write-through, then publishes `events`
    /// followed by a `PersistenceFailed` event when the save failed.
    fn commit(&mut self, operation: &str, events: Vec<StoreEvent>) {
        self.revision += 1;
        let save_result = self.storage.save(&self.records);
        for event in &events {
            self.subscribers.emit(event);
        }
        if let Err(err) = save_result {
            error!(
                "event=store_save module=store status=error operation={operation} backend={} error={err}",
                self.storage.describe()
            );
            self.subscribers.emit(&StoreEvent::PersistenceFailed {
                reason: err.to_string(),
            });
        }
    }
}

impl<S: TodoStorage> std::fmt::Debug for RecordStore<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("records", &self.records.len())
            .field("revision", &self.revision)
            .field("backend", &self.storage.describe())
            .finish()
    }
}

fn sanitize_record(mut record: TodoRecord) -> Result<TodoRecord, RecordValidationError> {
    record.title = record.title.trim().to_string();
    record.tags = normalize_tags(&record.tags);
    record.validate()?;
    Ok(record)
}
