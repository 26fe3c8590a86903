//! Runtime configuration for hosts of the todo core.
//!
//! # Responsibility
//! - Describe where data lives, which storage backend to use, the log
//!   level and the autosave cadence.
//! - Merge defaults, an optional JSON file and `TODOLIST_*` variables.
//!
//! # Invariants
//! - A validated config has an absolute `data_dir`, a supported log level
//!   and a non-zero autosave interval.

use crate::logging::{default_log_level, normalize_level};
use crate::storage::{JsonFileStorage, SqliteStorage, StorageResult, TodoStorage};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const ENV_DATA_DIR: &str = "TODOLIST_DATA_DIR";
pub const ENV_BACKEND: &str = "TODOLIST_BACKEND";
pub const ENV_LOG_LEVEL: &str = "TODOLIST_LOG_LEVEL";
pub const ENV_AUTOSAVE_SECS: &str = "TODOLIST_AUTOSAVE_SECS";

const DATA_DIR_NAME: &str = "todolist";
const DEFAULT_AUTOSAVE_SECS: u64 = 30;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read config: {err}"),
            Self::Json(err) => write!(f, "failed to parse config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Persistence backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Json,
    Sqlite,
}

impl StorageBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Sqlite => "sqlite",
        }
    }

    /// File name of the data file inside `data_dir`.
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Json => "todos.json",
            Self::Sqlite => "todos.db",
        }
    }
}

impl Display for StorageBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            other => Err(format!(
                "unsupported storage backend `{other}`; expected json|sqlite"
            )),
        }
    }
}

/// Host configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub data_dir: PathBuf,
    pub backend: StorageBackend,
    pub log_level: String,
    pub autosave_interval_secs: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            backend: StorageBackend::default(),
            log_level: default_log_level().to_string(),
            autosave_interval_secs: DEFAULT_AUTOSAVE_SECS,
        }
    }
}

impl CoreConfig {
    /// Reads a JSON config file; absent fields keep their defaults.
    pub fn from_json_file(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Applies `TODOLIST_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> ConfigResult<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary key lookup.
    ///
    /// Blank values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let value_of = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(dir) = value_of(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir.trim());
        }
        if let Some(backend) = value_of(ENV_BACKEND) {
            self.backend = backend.parse().map_err(ConfigError::Invalid)?;
        }
        if let Some(level) = value_of(ENV_LOG_LEVEL) {
            self.log_level = level.trim().to_string();
        }
        if let Some(secs) = value_of(ENV_AUTOSAVE_SECS) {
            self.autosave_interval_secs = secs.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("{ENV_AUTOSAVE_SECS} must be an integer, got `{secs}`"))
            })?;
        }
        Ok(self)
    }

    /// Checks invariants and normalizes the log level.
    pub fn validate(mut self) -> ConfigResult<Self> {
        if !self.data_dir.is_absolute() {
            return Err(ConfigError::Invalid(format!(
                "data_dir must be an absolute path, got `{}`",
                self.data_dir.display()
            )));
        }
        if self.autosave_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "autosave_interval_secs must be greater than zero".to_string(),
            ));
        }
        self.log_level = normalize_level(&self.log_level)
            .map_err(|err| ConfigError::Invalid(err.to_string()))?
            .to_string();
        Ok(self)
    }

    pub fn storage_path(&self) -> PathBuf {
        self.data_dir.join(self.backend.file_name())
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_interval_secs)
    }

    /// Builds the configured storage backend.
    pub fn open_storage(&self) -> StorageResult<Box<dyn TodoStorage>> {
        let path = self.storage_path();
        let storage: Box<dyn TodoStorage> = match self.backend {
            StorageBackend::Json => Box::new(JsonFileStorage::new(path)),
            StorageBackend::Sqlite => Box::new(SqliteStorage::open(path)?),
        };
        Ok(storage)
    }
}

fn default_data_dir() -> PathBuf {
    let base = std::env::var_os("XDG_DATA_HOME")
        .map(PathBuf::from)
        .filter(|path| path.is_absolute())
        .or_else(|| {
            std::env::var_os("HOME")
                .map(PathBuf::from)
                .filter(|path| path.is_absolute())
                .map(|home| home.join(".local").join("share"))
        })
        .unwrap_or_else(std::env::temp_dir);
    base.join(DATA_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::{
        ConfigError, CoreConfig, StorageBackend, ENV_AUTOSAVE_SECS, ENV_BACKEND, ENV_DATA_DIR,
        ENV_LOG_LEVEL,
    };
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "backend": "sqlite", "autosave_interval_secs": 5 }"#).unwrap();

        let config = CoreConfig::from_json_file(&path).unwrap();
        assert_eq!(config.backend, StorageBackend::Sqlite);
        assert_eq!(config.autosave_interval(), Duration::from_secs(5));
        assert_eq!(config.log_level, CoreConfig::default().log_level);
    }

    #[test]
    fn overrides_replace_file_values() {
        let data_dir = std::env::temp_dir().join("todolist-config-test");
        let data_dir_text = data_dir.to_str().unwrap().to_string();
        let config = CoreConfig::default()
            .with_overrides(lookup(&[
                (ENV_DATA_DIR, data_dir_text.as_str()),
                (ENV_BACKEND, "SQLite"),
                (ENV_LOG_LEVEL, "Warning"),
                (ENV_AUTOSAVE_SECS, "12"),
            ]))
            .unwrap()
            .validate()
            .unwrap();

        assert_eq!(config.data_dir, data_dir);
        assert_eq!(config.backend, StorageBackend::Sqlite);
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.autosave_interval_secs, 12);
        assert_eq!(config.storage_path(), data_dir.join("todos.db"));
        assert_eq!(config.log_dir(), data_dir.join("logs"));
    }

    #[test]
    fn blank_overrides_are_ignored() {
        let config = CoreConfig::default()
            .with_overrides(lookup(&[(ENV_BACKEND, "  ")]))
            .unwrap();
        assert_eq!(config.backend, StorageBackend::Json);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = CoreConfig::default()
            .with_overrides(lookup(&[(ENV_AUTOSAVE_SECS, "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let relative = CoreConfig {
            data_dir: PathBuf::from("relative/dir"),
            ..CoreConfig::default()
        };
        assert!(relative.validate().is_err());

        let zero_interval = CoreConfig {
            autosave_interval_secs: 0,
            ..CoreConfig::default()
        };
        assert!(zero_interval.validate().is_err());
    }
}
