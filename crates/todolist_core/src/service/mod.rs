//! Application-shell services built on the store and view.
//!
//! # Responsibility
//! - Combine store, view and storage into use-case level APIs.
//! - Keep UI/CLI layers decoupled from persistence details.

pub mod autosave;
pub mod todo_list;
