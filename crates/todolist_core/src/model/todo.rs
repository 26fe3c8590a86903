//! Todo record domain model.
//!
//! # Responsibility
//! - Define the canonical record owned by `RecordStore`.
//! - Provide field-level mutation with change detection.
//! - Define the wire shape used by every persistence collaborator.
//!
//! # Invariants
//! - `id` is stable and never reused for another record.
//! - `title` is stored trimmed and is never empty for a live record.
//! - `modified_at` moves only when a field value actually changes.
//! - `tags` are kept normalized (see [`normalize_tags`]).
//! - Decoding never rejects a record over one mistyped field; such fields
//!   fall back to their defaults.

use chrono::{DateTime, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

static TAG_WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("valid tag whitespace regex"));

/// Stable identifier of a todo record.
pub type TodoId = Uuid;

/// Urgency ordinal attached to every record.
///
/// Serialized as its ordinal (`0..=3`) to stay compatible with exported
/// documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Normal,
        Priority::High,
        Priority::Urgent,
    ];

    /// Returns the wire ordinal.
    pub fn ordinal(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Normal => 1,
            Self::High => 2,
            Self::Urgent => 3,
        }
    }

    /// Maps a wire ordinal back to a priority, `None` when out of range.
    pub fn from_ordinal(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::Low),
            1 => Some(Self::Normal),
            2 => Some(Self::High),
            3 => Some(Self::Urgent),
            _ => None,
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Normal => "Normal",
            Self::High => "High",
            Self::Urgent => "Urgent",
        }
    }
}

impl Display for Priority {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Priority {
    type Err = String;

    /// Accepts an ordinal (`"2"`) or a case-insensitive label (`"high"`).
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if let Ok(ordinal) = trimmed.parse::<i64>() {
            return Self::from_ordinal(ordinal)
                .ok_or_else(|| format!("priority ordinal `{ordinal}` is out of range 0..=3"));
        }
        Self::ALL
            .into_iter()
            .find(|priority| priority.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                format!("unsupported priority `{trimmed}`; expected low|normal|high|urgent")
            })
    }
}

impl Serialize for Priority {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.ordinal())
    }
}

impl<'de> Deserialize<'de> for Priority {
    /// Accepts an ordinal or a label. Anything else decodes as
    /// [`Priority::Normal`] instead of failing the whole record.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let priority = match Value::deserialize(deserializer)? {
            Value::Number(number) => number.as_i64().and_then(Self::from_ordinal),
            Value::String(text) => text.parse().ok(),
            _ => None,
        };
        Ok(priority.unwrap_or_default())
    }
}

/// Validation failures for record construction and mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordValidationError {
    /// Title is empty after trimming.
    EmptyTitle,
    /// Record id is the nil UUID.
    NilId,
}

impl Display for RecordValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "title cannot be empty"),
            Self::NilId => write!(f, "record id cannot be nil"),
        }
    }
}

impl Error for RecordValidationError {}

/// One field mutation applied through `RecordStore::update`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordChange {
    Title(String),
    Completed(bool),
    Priority(Priority),
    Category(String),
    Notes(Option<String>),
    Tags(Vec<String>),
}

impl RecordChange {
    /// Stable field name used in diagnostics.
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::Title(_) => "title",
            Self::Completed(_) => "completed",
            Self::Priority(_) => "priority",
            Self::Category(_) => "category",
            Self::Notes(_) => "notes",
            Self::Tags(_) => "tags",
        }
    }
}

/// Canonical todo record.
///
/// Missing or mistyped fields on decode fall back to `completed = false`,
/// `priority = Normal`, `category = ""`, a fresh id and load-time
/// timestamps. Timestamps also decode from ISO 8601 strings. A record
/// without a usable title decodes with an empty one and is rejected by
/// validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoRecord {
    #[serde(default = "Uuid::new_v4", deserialize_with = "lenient_id")]
    pub id: TodoId,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub completed: bool,
    #[serde(default)]
    pub priority: Priority,
    /// Unix epoch seconds.
    #[serde(default = "now_epoch_secs", deserialize_with = "lenient_timestamp")]
    pub created_at: i64,
    /// Unix epoch seconds.
    #[serde(default = "now_epoch_secs", deserialize_with = "lenient_timestamp")]
    pub modified_at: i64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub category: String,
    #[serde(
        default,
        deserialize_with = "lenient_notes",
        skip_serializing_if = "Option::is_none"
    )]
    pub notes: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_tags",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub tags: Vec<String>,
}

impl TodoRecord {
    /// Creates an open record with a generated id.
    ///
    /// # Errors
    /// - `EmptyTitle` when `title` is blank after trimming.
    pub fn new(title: &str, priority: Priority) -> Result<Self, RecordValidationError> {
        Self::with_id(Uuid::new_v4(), title, priority)
    }

    /// Creates an open record with a caller-provided id.
    ///
    /// Used by import paths where identity already exists externally.
    pub fn with_id(
        id: TodoId,
        title: &str,
        priority: Priority,
    ) -> Result<Self, RecordValidationError> {
        let now = now_epoch_secs();
        let record = Self {
            id,
            title: normalize_title(title)?,
            completed: false,
            priority,
            created_at: now,
            modified_at: now,
            category: String::new(),
            notes: None,
            tags: Vec::new(),
        };
        record.validate()?;
        Ok(record)
    }

    /// Checks record-level invariants.
    pub fn validate(&self) -> Result<(), RecordValidationError> {
        if self.id.is_nil() {
            return Err(RecordValidationError::NilId);
        }
        if self.title.trim().is_empty() {
            return Err(RecordValidationError::EmptyTitle);
        }
        Ok(())
    }

    /// Applies one field change.
    ///
    /// Returns `Ok(false)` when the new value equals the current one; in that
    /// case nothing is touched, including `modified_at`.
    pub fn apply(&mut self, change: RecordChange) -> Result<bool, RecordValidationError> {
        let changed = match change {
            RecordChange::Title(title) => {
                let title = normalize_title(&title)?;
                replace_if_changed(&mut self.title, title)
            }
            RecordChange::Completed(completed) => replace_if_changed(&mut self.completed, completed),
            RecordChange::Priority(priority) => replace_if_changed(&mut self.priority, priority),
            RecordChange::Category(category) => {
                replace_if_changed(&mut self.category, category.trim().to_string())
            }
            RecordChange::Notes(notes) => {
                let notes = notes.filter(|value| !value.trim().is_empty());
                replace_if_changed(&mut self.notes, notes)
            }
            RecordChange::Tags(tags) => replace_if_changed(&mut self.tags, normalize_tags(&tags)),
        };
        if changed {
            self.touch();
        }
        Ok(changed)
    }

    /// Flips completion and returns the new state.
    pub fn toggle_completed(&mut self) -> bool {
        self.completed = !self.completed;
        self.touch();
        self.completed
    }

    fn touch(&mut self) {
        // Keep modified_at monotonic even if the wall clock steps back.
        self.modified_at = now_epoch_secs().max(self.modified_at);
    }
}

fn replace_if_changed<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

/// Trims a title and rejects blank input.
pub fn normalize_title(title: &str) -> Result<String, RecordValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(RecordValidationError::EmptyTitle);
    }
    Ok(trimmed.to_string())
}

/// Normalizes one tag: trimmed, lowercase, inner whitespace folded to `-`.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(
        TAG_WHITESPACE_RE
            .replace_all(&trimmed.to_lowercase(), "-")
            .into_owned(),
    )
}

/// Normalizes, deduplicates and sorts tag values.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let unique: BTreeSet<String> = tags.iter().filter_map(|tag| normalize_tag(tag)).collect();
    unique.into_iter().collect()
}

/// Current wall-clock time in Unix epoch seconds.
pub fn now_epoch_secs() -> i64 {
    Utc::now().timestamp()
}

/// Parses an ISO 8601 timestamp into epoch seconds.
///
/// Values without an offset are read as UTC.
pub fn parse_iso_timestamp(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.timestamp());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .into_iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| naive.and_utc().timestamp())
}

fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<TodoId, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => Uuid::parse_str(text.trim()).unwrap_or_else(|_| Uuid::new_v4()),
        _ => Uuid::new_v4(),
    })
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => text,
        _ => String::new(),
    })
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(matches!(Value::deserialize(deserializer)?, Value::Bool(true)))
}

fn lenient_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let seconds = match Value::deserialize(deserializer)? {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|value| value as i64)),
        Value::String(text) => parse_iso_timestamp(&text),
        _ => None,
    };
    Ok(seconds.unwrap_or_else(now_epoch_secs))
}

fn lenient_notes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) if !text.trim().is_empty() => Some(text),
        _ => None,
    })
}

fn lenient_tags<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(tag) => Some(tag),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::{normalize_tag, normalize_tags, parse_iso_timestamp, Priority};

    #[test]
    fn priority_parses_labels_and_ordinals() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!(" 0 ".parse::<Priority>().unwrap(), Priority::Low);
        assert!("7".parse::<Priority>().is_err());
        assert!("someday".parse::<Priority>().is_err());
    }

    #[test]
    fn iso_timestamps_parse_with_and_without_offset() {
        assert_eq!(parse_iso_timestamp("1970-01-01T00:01:00Z"), Some(60));
        assert_eq!(parse_iso_timestamp("1970-01-01T01:00:00+01:00"), Some(0));
        assert_eq!(parse_iso_timestamp("2024-05-01T10:00:00"), Some(1_714_557_600));
        assert_eq!(parse_iso_timestamp("2024-05-01 10:00:00.250"), Some(1_714_557_600));
        assert_eq!(parse_iso_timestamp("yesterday"), None);
    }

    #[test]
    fn tag_normalization_folds_case_and_whitespace() {
        assert_eq!(normalize_tag("  Home   Office "), Some("home-office".to_string()));
        assert_eq!(normalize_tag("   "), None);

        let tags = normalize_tags(&[
            "Work".to_string(),
            "work".to_string(),
            " ".to_string(),
            "errands".to_string(),
        ]);
        assert_eq!(tags, vec!["errands".to_string(), "work".to_string()]);
    }
}
