//! Synchronous observer lists and the events they carry.
//!
//! # Responsibility
//! - Register and remove callbacks by handle.
//! - Deliver events on the calling thread in registration order.
//!
//! # Invariants
//! - A `SubscriptionId` is never reused within one observer list.
//! - Callbacks run after the triggering mutation has fully completed.

use crate::model::filter::FilterMode;
use crate::model::todo::TodoRecord;

/// Handle returned by `subscribe`, used to unsubscribe later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Callback<E> = Box<dyn FnMut(&E)>;

/// Ordered list of event callbacks.
pub struct Subscribers<E> {
    next_id: u64,
    entries: Vec<(SubscriptionId, Callback<E>)>,
}

impl<E> Subscribers<E> {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            entries: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&E) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, Box::new(callback)));
        id
    }

    /// Removes a callback. Returns `false` for unknown handles.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    pub fn emit(&mut self, event: &E) {
        for (_, callback) in &mut self.entries {
            callback(event);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<E> Default for Subscribers<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for Subscribers<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscribers")
            .field("count", &self.entries.len())
            .finish()
    }
}

/// Raw change notification published by `RecordStore`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Added(TodoRecord),
    Removed(TodoRecord),
    /// Carries the record state after the change.
    Updated(TodoRecord),
    Cleared { removed: usize },
    Reloaded { count: usize },
    /// Write-through save failed; the in-memory change is kept.
    PersistenceFailed { reason: String },
}

/// View-level notification published by `FilteredView`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewEvent {
    FilterChanged(FilterMode),
    Changed { visible_count: usize },
}

#[cfg(test)]
mod tests {
    use super::Subscribers;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn emits_in_registration_order_and_stops_after_unsubscribe() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut subscribers = Subscribers::<u32>::new();

        let first = {
            let seen = Rc::clone(&seen);
            subscribers.subscribe(move |value: &u32| seen.borrow_mut().push(("first", *value)))
        };
        {
            let seen = Rc::clone(&seen);
            subscribers.subscribe(move |value: &u32| seen.borrow_mut().push(("second", *value)));
        }

        subscribers.emit(&1);
        assert!(subscribers.unsubscribe(first));
        assert!(!subscribers.unsubscribe(first));
        subscribers.emit(&2);

        assert_eq!(
            *seen.borrow(),
            vec![("first", 1), ("second", 1), ("second", 2)]
        );
        assert_eq!(subscribers.len(), 1);
    }
}
