//! Filtered projections presented to UI collaborators.
//!
//! # Invariants
//! - A projection never exposes a record that fails the active filter.
//! - Mutations addressed by visible position delegate to the store.

pub mod filtered_view;
