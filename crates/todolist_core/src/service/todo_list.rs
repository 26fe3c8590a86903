//! Todo list use-case facade.
//!
//! # Responsibility
//! - Own one `RecordStore` and one `FilteredView` on behalf of a UI shell.
//! - Keep the view eagerly synced after every mutation.
//! - Provide JSON import/export entry points.
//!
//! # Invariants
//! - Every mutation goes through the store API; the facade never edits
//!   records itself.
//! - The view is Clean whenever a facade call returns.

use crate::model::filter::FilterMode;
use crate::model::todo::{Priority, RecordChange, TodoId, TodoRecord};
use crate::storage::{read_document, write_document, StorageError, StorageResult, TodoStorage};
use crate::store::events::{StoreEvent, SubscriptionId, ViewEvent};
use crate::store::record_store::{ImportSummary, RecordStore, StoreError, StoreResult};
use crate::view::filtered_view::{FilteredView, ViewError, ViewResult};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// Error for facade calls spanning more than one layer.
#[derive(Debug)]
pub enum TodoListError {
    Store(StoreError),
    View(ViewError),
    Storage(StorageError),
}

impl Display for TodoListError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::View(err) => write!(f, "{err}"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TodoListError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::View(err) => Some(err),
            Self::Storage(err) => Some(err),
        }
    }
}

impl From<StoreError> for TodoListError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<ViewError> for TodoListError {
    fn from(value: ViewError) -> Self {
        Self::View(value)
    }
}

impl From<StorageError> for TodoListError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

/// Record counters shown in status bars.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TodoCounts {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
}

/// Store plus filtered view, kept in sync.
#[derive(Debug)]
pub struct TodoList<S: TodoStorage> {
    store: RecordStore<S>,
    view: FilteredView,
}

impl<S: TodoStorage> TodoList<S> {
    /// Hydrates a list from `storage` with the `All` filter.
    pub fn open(storage: S) -> Self {
        Self::from_store(RecordStore::open(storage))
    }

    /// Wraps an existing store with the `All` filter.
    pub fn from_store(store: RecordStore<S>) -> Self {
        let view = FilteredView::attached(&store, FilterMode::All);
        Self { store, view }
    }

    pub fn add(&mut self, title: &str) -> StoreResult<TodoRecord> {
        self.add_with_priority(title, Priority::Normal)
    }

    pub fn add_with_priority(&mut self, title: &str, priority: Priority) -> StoreResult<TodoRecord> {
        let record = self.store.insert(title, Some(priority))?;
        self.view.sync(&self.store);
        Ok(record)
    }

    pub fn remove_by_id(&mut self, id: TodoId) -> Option<TodoRecord> {
        let removed = self.store.remove_by_id(id);
        self.view.sync(&self.store);
        removed
    }

    pub fn remove_at_visible(&mut self, visible_position: usize) -> ViewResult<TodoRecord> {
        self.view.remove_at_visible(&mut self.store, visible_position)
    }

    pub fn toggle(&mut self, id: TodoId) -> Option<bool> {
        let completed = self.store.toggle_completed(id);
        self.view.sync(&self.store);
        completed
    }

    pub fn toggle_at_visible(&mut self, visible_position: usize) -> ViewResult<bool> {
        self.view.toggle_at_visible(&mut self.store, visible_position)
    }

    pub fn update(&mut self, id: TodoId, change: RecordChange) -> StoreResult<bool> {
        let changed = self.store.update(id, change)?;
        self.view.sync(&self.store);
        Ok(changed)
    }

    /// Applies `change` to the record shown at `visible_position`.
    pub fn update_at_visible(
        &mut self,
        visible_position: usize,
        change: RecordChange,
    ) -> Result<bool, TodoListError> {
        let id = self.view.visible_at(&self.store, visible_position)?.id;
        Ok(self.update(id, change)?)
    }

    /// Marks every record completed (or open); returns how many changed.
    pub fn set_all_completed(&mut self, completed: bool) -> usize {
        let changed = self.store.set_all_completed(completed);
        self.view.sync(&self.store);
        changed
    }

    pub fn clear_completed(&mut self) -> usize {
        let removed = self.store.clear_completed();
        self.view.sync(&self.store);
        removed
    }

    pub fn clear_all(&mut self) -> usize {
        let removed = self.store.clear_all();
        self.view.sync(&self.store);
        removed
    }

    pub fn set_filter(&mut self, mode: FilterMode) -> bool {
        self.view.set_filter(&self.store, mode)
    }

    pub fn filter(&self) -> FilterMode {
        self.view.mode()
    }

    /// Records under the active filter, in store order.
    pub fn visible(&mut self) -> Vec<&TodoRecord> {
        self.view.visible_records(&self.store)
    }

    pub fn visible_count(&mut self) -> usize {
        self.view.visible_count(&self.store)
    }

    pub fn visible_at(&mut self, visible_position: usize) -> ViewResult<&TodoRecord> {
        self.view.visible_at(&self.store, visible_position)
    }

    pub fn counts(&self) -> TodoCounts {
        TodoCounts {
            total: self.store.total_count(),
            active: self.store.active_count(),
            completed: self.store.completed_count(),
        }
    }

    /// Appends records from an exchange document.
    ///
    /// Ids already present are skipped, never overwritten or renumbered.
    pub fn import_json(&mut self, path: &Path) -> Result<ImportSummary, TodoListError> {
        let parsed = read_document(path).map_err(|err| {
            error!("event=todos_import module=service status=error error={err}");
            err
        })?;
        let mut summary = self.store.import_records(parsed.records);
        summary.skipped_invalid += parsed.skipped;
        self.view.sync(&self.store);
        info!(
            "event=todos_import module=service status=ok imported={} skipped_duplicates={} skipped_invalid={}",
            summary.imported, summary.skipped_duplicates, summary.skipped_invalid
        );
        Ok(summary)
    }

    /// Writes every record (ignoring the filter) to an exchange document.
    pub fn export_json(&self, path: &Path) -> Result<usize, TodoListError> {
        write_document(path, self.store.all()).map_err(|err| {
            error!("event=todos_export module=service status=error error={err}");
            err
        })?;
        info!(
            "event=todos_export module=service status=ok count={}",
            self.store.total_count()
        );
        Ok(self.store.total_count())
    }

    /// Forces a full save.
    pub fn save(&mut self) -> StorageResult<()> {
        self.store.save()
    }

    pub fn store(&self) -> &RecordStore<S> {
        &self.store
    }

    /// Mutable store access for collaborators such as `AutosaveTimer`.
    ///
    /// The view resyncs lazily on its next read.
    pub fn store_mut(&mut self) -> &mut RecordStore<S> {
        &mut self.store
    }

    pub fn subscribe_store(
        &mut self,
        callback: impl FnMut(&StoreEvent) + 'static,
    ) -> SubscriptionId {
        self.store.subscribe(callback)
    }

    pub fn unsubscribe_store(&mut self, id: SubscriptionId) -> bool {
        self.store.unsubscribe(id)
    }

    pub fn subscribe_view(&mut self, callback: impl FnMut(&ViewEvent) + 'static) -> SubscriptionId {
        self.view.subscribe(callback)
    }

    pub fn unsubscribe_view(&mut self, id: SubscriptionId) -> bool {
        self.view.unsubscribe(id)
    }
}
