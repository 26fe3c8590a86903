//! Authoritative record ownership and change notification.
//!
//! # Responsibility
//! - Own the ordered todo sequence and every mutation path into it.
//! - Publish raw change events to subscribed collaborators.
//!
//! # Invariants
//! - Ids are unique among live records.
//! - Events are delivered synchronously after the mutation completes.

pub mod events;
pub mod record_store;
