//! Forward-only schema steps for the SQLite backend.
//!
//! Step `n` (1-based) lifts a database from `user_version = n - 1` to `n`.
//! Steps are appended, never edited or reordered once released.

use crate::storage::{StorageError, StorageResult};
use log::info;
use rusqlite::Connection;
use std::cmp::Ordering;
use std::time::Instant;

const SCHEMA_STEPS: &[&str] = &[
    include_str!("0001_init.sql"),
    include_str!("0002_notes_tags.sql"),
];

/// Schema version this build writes.
pub fn latest_version() -> u32 {
    u32::try_from(SCHEMA_STEPS.len()).unwrap_or(u32::MAX)
}

/// Runs the steps between the stored `user_version` and `latest_version()`
/// in a single transaction, bumping `user_version` after each step.
///
/// A database stamped with a newer version than this build knows is refused
/// with `UnsupportedSchemaVersion` and left untouched.
pub fn apply_migrations(conn: &mut Connection) -> StorageResult<()> {
    let from = current_user_version(conn)?;
    let target = latest_version();
    match from.cmp(&target) {
        Ordering::Greater => {
            return Err(StorageError::UnsupportedSchemaVersion {
                db_version: from,
                latest_supported: target,
            })
        }
        Ordering::Equal => return Ok(()),
        Ordering::Less => {}
    }

    let started_at = Instant::now();
    let pending = usize::try_from(from).unwrap_or(usize::MAX);
    let tx = conn.transaction()?;
    for (version, sql) in (1u32..).zip(SCHEMA_STEPS.iter()).skip(pending) {
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", version)?;
    }
    tx.commit()?;

    info!(
        "event=schema_migrate module=storage status=ok from={from} to={target} duration_ms={}",
        started_at.elapsed().as_millis()
    );
    Ok(())
}

pub fn current_user_version(conn: &Connection) -> StorageResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}
