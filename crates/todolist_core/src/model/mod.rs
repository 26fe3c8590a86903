//! Todo domain model.
//!
//! # Responsibility
//! - Define the record shape shared by the store, the view and storage.
//! - Define the filter predicate used by projections.
//!
//! # Invariants
//! - Every record is identified by a stable, non-nil `TodoId`.
//! - Records are validated before they enter a store.

pub mod filter;
pub mod todo;
