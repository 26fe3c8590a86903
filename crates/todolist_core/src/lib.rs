//! Core engine for the todo list: authoritative record store, filtered
//! projection, persistence collaborators and the application-shell facade.
//! This crate is the single source of truth for list invariants.

pub mod config;
pub mod logging;
pub mod model;
pub mod service;
pub mod storage;
pub mod store;
pub mod view;

pub use config::{ConfigError, ConfigResult, CoreConfig, StorageBackend};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::filter::FilterMode;
pub use model::todo::{
    normalize_tags, Priority, RecordChange, RecordValidationError, TodoId, TodoRecord,
};
pub use service::autosave::{AutosaveTick, AutosaveTimer, DEFAULT_AUTOSAVE_INTERVAL};
pub use service::todo_list::{TodoCounts, TodoList, TodoListError};
pub use storage::{
    JsonFileStorage, MemoryStorage, SqliteStorage, StorageError, StorageResult, TodoDocument,
    TodoStorage,
};
pub use store::events::{StoreEvent, Subscribers, SubscriptionId, ViewEvent};
pub use store::record_store::{ImportSummary, RecordStore, StoreError, StoreResult};
pub use view::filtered_view::{FilteredView, ViewError, ViewResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
