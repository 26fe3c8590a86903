//! Periodic full-save collaborator.
//!
//! # Responsibility
//! - Decide when an autosave is due on a fixed interval.
//! - Run one full store save per due tick and report the outcome.
//!
//! # Invariants
//! - At most one save per interval; missed intervals are not replayed.
//! - A failed save is logged and reported, never retried early.
//! - Polling never panics and never blocks beyond the save itself.

use crate::storage::TodoStorage;
use crate::store::record_store::RecordStore;
use log::{debug, warn};
use std::time::{Duration, Instant};

/// Interval used when the configuration does not override it.
pub const DEFAULT_AUTOSAVE_INTERVAL: Duration = Duration::from_secs(30);

/// Outcome of one `AutosaveTimer::poll`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutosaveTick {
    /// Not due yet.
    Idle,
    Saved,
    Failed(String),
}

/// Poll-driven autosave timer for single-threaded event loops.
#[derive(Debug, Clone)]
pub struct AutosaveTimer {
    interval: Duration,
    next_due: Option<Instant>,
}

impl AutosaveTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            next_due: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Instant of the next save, once the timer has been polled.
    pub fn next_due(&self) -> Option<Instant> {
        self.next_due
    }

    /// Saves `store` when an interval has elapsed since the previous tick.
    ///
    /// The first poll only arms the timer.
    pub fn poll<S: TodoStorage>(&mut self, now: Instant, store: &mut RecordStore<S>) -> AutosaveTick {
        let due = *self.next_due.get_or_insert(now + self.interval);
        if now < due {
            return AutosaveTick::Idle;
        }
        self.next_due = Some(now + self.interval);

        match store.save() {
            Ok(()) => {
                debug!(
                    "event=autosave module=service status=ok count={}",
                    store.total_count()
                );
                AutosaveTick::Saved
            }
            Err(err) => {
                warn!("event=autosave module=service status=error error={err}");
                AutosaveTick::Failed(err.to_string())
            }
        }
    }
}

impl Default for AutosaveTimer {
    fn default() -> Self {
        Self::new(DEFAULT_AUTOSAVE_INTERVAL)
    }
}
