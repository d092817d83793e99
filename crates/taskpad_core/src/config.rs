//! Application paths and log level.
//!
//! # Invariants
//! - `data_dir` is absolute and non-empty.
//! - The task database and preference document live directly in `data_dir`.

use crate::db::{open_db, DbError};
use crate::logging::default_log_level;
use crate::repo::task_repo::TaskRepository;
use crate::store::preference_store::PreferenceStore;
use crate::store::task_store::TaskStore;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DATA_DIR_ENV: &str = "TASKPAD_DATA_DIR";
pub const LOG_LEVEL_ENV: &str = "TASKPAD_LOG_LEVEL";
pub const DATABASE_FILE_NAME: &str = "todo_database.sqlite3";
pub const PREFERENCE_FILE_NAME: &str = "todo_preferences.json";
const LOG_DIR_NAME: &str = "logs";

#[derive(Debug)]
pub enum ConfigError {
    MissingDataDir,
    RelativeDataDir(PathBuf),
    CreateDataDir { path: PathBuf, source: std::io::Error },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingDataDir => write!(f, "data directory is not set (use {DATA_DIR_ENV})"),
            Self::RelativeDataDir(path) => {
                write!(f, "data directory must be absolute, got `{}`", path.display())
            }
            Self::CreateDataDir { path, source } => write!(
                f,
                "failed to create data directory `{}`: {source}",
                path.display()
            ),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateDataDir { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Resolved application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub log_level: String,
}

impl AppConfig {
    /// Configuration rooted at `data_dir` with the build's default level.
    pub fn from_data_dir(data_dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let data_dir = data_dir.into();
        if data_dir.as_os_str().is_empty() {
            return Err(ConfigError::MissingDataDir);
        }
        if !data_dir.is_absolute() {
            return Err(ConfigError::RelativeDataDir(data_dir));
        }
        Ok(Self {
            data_dir,
            log_level: default_log_level().to_string(),
        })
    }

    /// Reads `TASKPAD_DATA_DIR` and optional `TASKPAD_LOG_LEVEL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let data_dir = std::env::var_os(DATA_DIR_ENV).ok_or(ConfigError::MissingDataDir)?;
        let mut config = Self::from_data_dir(data_dir)?;
        if let Ok(level) = std::env::var(LOG_LEVEL_ENV) {
            config.log_level = level;
        }
        Ok(config)
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE_NAME)
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.data_dir.join(PREFERENCE_FILE_NAME)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join(LOG_DIR_NAME)
    }

    /// Creates `data_dir` when missing.
    pub fn ensure_data_dir(&self) -> Result<&Path, ConfigError> {
        std::fs::create_dir_all(&self.data_dir).map_err(|source| ConfigError::CreateDataDir {
            path: self.data_dir.clone(),
            source,
        })?;
        Ok(&self.data_dir)
    }

    /// Opens the task database under `data_dir`.
    pub fn open_repository(&self) -> Result<TaskRepository, DbError> {
        let conn = open_db(self.database_path())?;
        Ok(TaskRepository::new(Arc::new(TaskStore::new(conn))))
    }

    /// Opens the preference document under `data_dir`.
    pub fn open_preferences(&self) -> Arc<PreferenceStore> {
        Arc::new(PreferenceStore::open_file(self.preferences_path()))
    }
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigError, DATABASE_FILE_NAME, PREFERENCE_FILE_NAME};

    #[test]
    fn rejects_relative_and_empty_dirs() {
        assert!(matches!(
            AppConfig::from_data_dir("data"),
            Err(ConfigError::RelativeDataDir(_))
        ));
        assert!(matches!(
            AppConfig::from_data_dir(""),
            Err(ConfigError::MissingDataDir)
        ));
    }

    #[test]
    fn derives_file_paths_inside_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::from_data_dir(dir.path()).unwrap().with_log_level("warn");
        assert_eq!(config.database_path(), dir.path().join(DATABASE_FILE_NAME));
        assert_eq!(config.preferences_path(), dir.path().join(PREFERENCE_FILE_NAME));
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn open_repository_creates_schema_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::from_data_dir(dir.path().join("nested")).unwrap();
        config.ensure_data_dir().unwrap();
        let repo = config.open_repository().unwrap();
        assert!(repo.store().all_tasks().unwrap().is_empty());
        assert!(config.database_path().exists());
    }
}
