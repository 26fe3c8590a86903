//! Filtered projection over a `RecordStore`.
//!
//! # Responsibility
//! - Keep the ordered list of store positions matching the active filter.
//! - Translate visible positions to store positions and back.
//! - Offer remove/toggle addressed by visible position.
//!
//! # Invariants
//! - After any public call returns, the projection equals the positions of
//!   records matching `mode`, in store order.
//! - The view never owns the store; it remembers the store revision it was
//!   last synced to and rescans on every read when that revision moved.

use crate::model::filter::FilterMode;
use crate::model::todo::{TodoId, TodoRecord};
use crate::storage::TodoStorage;
use crate::store::events::{Subscribers, SubscriptionId, ViewEvent};
use crate::store::record_store::RecordStore;
use log::debug;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ViewResult<T> = Result<T, ViewError>;

/// Visible-position lookup failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewError {
    OutOfRange { position: usize, len: usize },
}

impl Display for ViewError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfRange { position, len } => write!(
                f,
                "visible position {position} is out of range (visible count {len})"
            ),
        }
    }
}

impl Error for ViewError {}

/// Order-preserving filtered projection of a store.
///
/// Reads take `&mut self` because they resynchronize against the store
/// first.
#[derive(Debug)]
pub struct FilteredView {
    mode: FilterMode,
    projection: Vec<usize>,
    synced_revision: Option<u64>,
    subscribers: Subscribers<ViewEvent>,
}

impl FilteredView {
    /// Creates a view that will build its projection on first use.
    pub fn new(mode: FilterMode) -> Self {
        Self {
            mode,
            projection: Vec::new(),
            synced_revision: None,
            subscribers: Subscribers::new(),
        }
    }

    /// Creates a view already synced to `store`.
    pub fn attached<S: TodoStorage>(store: &RecordStore<S>, mode: FilterMode) -> Self {
        let mut view = Self::new(mode);
        view.rescan(store);
        view
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    /// Returns whether the projection reflects the current store revision.
    pub fn is_synced_with<S: TodoStorage>(&self, store: &RecordStore<S>) -> bool {
        self.synced_revision == Some(store.revision())
    }

    /// Switches the filter. Returns `false` (and does nothing) when `mode`
    /// is already active.
    pub fn set_filter<S: TodoStorage>(&mut self, store: &RecordStore<S>, mode: FilterMode) -> bool {
        if self.mode == mode {
            return false;
        }
        self.mode = mode;
        self.rescan(store);
        debug!(
            "event=filter_change module=view status=ok mode={mode} visible={}",
            self.projection.len()
        );
        self.subscribers.emit(&ViewEvent::FilterChanged(mode));
        self.emit_changed();
        true
    }

    /// Rescans the store. Emits `Changed` only when the projection moved.
    pub fn rebuild<S: TodoStorage>(&mut self, store: &RecordStore<S>) {
        if self.rescan(store) {
            self.emit_changed();
        }
    }

    /// Rescans when the store changed since the last sync.
    ///
    /// Returns whether a rescan happened; any rescan emits `Changed` since
    /// visible records may have new field values even when the positions
    /// did not move.
    pub fn sync<S: TodoStorage>(&mut self, store: &RecordStore<S>) -> bool {
        if self.is_synced_with(store) {
            return false;
        }
        self.rescan(store);
        self.emit_changed();
        true
    }

    pub fn visible_count<S: TodoStorage>(&mut self, store: &RecordStore<S>) -> usize {
        self.sync(store);
        self.projection.len()
    }

    /// Current projection: store positions in store order.
    pub fn projection<S: TodoStorage>(&mut self, store: &RecordStore<S>) -> &[usize] {
        self.sync(store);
        &self.projection
    }

    /// Record shown at `visible_position`.
    pub fn visible_at<'s, S: TodoStorage>(
        &mut self,
        store: &'s RecordStore<S>,
        visible_position: usize,
    ) -> ViewResult<&'s TodoRecord> {
        let position = self.underlying_position_of(store, visible_position)?;
        store.get(position).ok_or(ViewError::OutOfRange {
            position: visible_position,
            len: self.projection.len(),
        })
    }

    /// Maps a visible position to its store position.
    pub fn underlying_position_of<S: TodoStorage>(
        &mut self,
        store: &RecordStore<S>,
        visible_position: usize,
    ) -> ViewResult<usize> {
        self.sync(store);
        self.projection
            .get(visible_position)
            .copied()
            .ok_or(ViewError::OutOfRange {
                position: visible_position,
                len: self.projection.len(),
            })
    }

    /// Maps a store position to its visible position, `None` when the
    /// record is filtered out or the position is out of bounds.
    pub fn visible_position_of<S: TodoStorage>(
        &mut self,
        store: &RecordStore<S>,
        underlying_position: usize,
    ) -> Option<usize> {
        self.sync(store);
        self.projection.binary_search(&underlying_position).ok()
    }

    /// Records currently shown, in visible order.
    pub fn visible_records<'s, S: TodoStorage>(
        &mut self,
        store: &'s RecordStore<S>,
    ) -> Vec<&'s TodoRecord> {
        self.sync(store);
        self.projection
            .iter()
            .filter_map(|&position| store.get(position))
            .collect()
    }

    /// Removes the record shown at `visible_position` from the store.
    pub fn remove_at_visible<S: TodoStorage>(
        &mut self,
        store: &mut RecordStore<S>,
        visible_position: usize,
    ) -> ViewResult<TodoRecord> {
        let position = self.underlying_position_of(store, visible_position)?;
        let removed = store.remove_at(position).ok_or(ViewError::OutOfRange {
            position: visible_position,
            len: self.projection.len(),
        })?;
        self.sync(store);
        Ok(removed)
    }

    /// Flips completion of the record shown at `visible_position`.
    ///
    /// Returns the new completion state. The record may leave the
    /// projection as a result.
    pub fn toggle_at_visible<S: TodoStorage>(
        &mut self,
        store: &mut RecordStore<S>,
        visible_position: usize,
    ) -> ViewResult<bool> {
        let position = self.underlying_position_of(store, visible_position)?;
        let id = self.record_id_at(store, position, visible_position)?;
        let completed = store.toggle_completed(id).ok_or(ViewError::OutOfRange {
            position: visible_position,
            len: self.projection.len(),
        })?;
        self.sync(store);
        Ok(completed)
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&ViewEvent) + 'static) -> SubscriptionId {
        self.subscribers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    fn record_id_at<S: TodoStorage>(
        &self,
        store: &RecordStore<S>,
        position: usize,
        visible_position: usize,
    ) -> ViewResult<TodoId> {
        store
            .get(position)
            .map(|record| record.id)
            .ok_or(ViewError::OutOfRange {
                position: visible_position,
                len: self.projection.len(),
            })
    }

    /// Full O(n) in-order scan. Returns whether the projection changed.
    fn rescan<S: TodoStorage>(&mut self, store: &RecordStore<S>) -> bool {
        let mode = self.mode;
        let next: Vec<usize> = store
            .iter()
            .enumerate()
            .filter(|(_, record)| mode.matches(record))
            .map(|(position, _)| position)
            .collect();
        self.synced_revision = Some(store.revision());
        if next == self.projection {
            return false;
        }
        self.projection = next;
        true
    }

    fn emit_changed(&mut self) {
        self.subscribers.emit(&ViewEvent::Changed {
            visible_count: self.projection.len(),
        });
    }
}

impl Default for FilteredView {
    fn default() -> Self {
        Self::new(FilterMode::All)
    }
}
