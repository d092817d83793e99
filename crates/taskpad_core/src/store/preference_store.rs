//! Key-value preference slots with a live sort-state read.
//!
//! # Responsibility
//! - Persist the last chosen sort priority under the `sort_state` key.
//! - Expose a live read that falls back to `NONE` when nothing is stored
//!   or when the medium reports an IO failure.
//!
//! # Invariants
//! - Writes overwrite; last write wins.
//! - Only `PreferenceError::Io` is mapped to the default on read; every
//!   other read failure is delivered to the subscriber.

use crate::model::task::Priority;
use crate::store::live::LiveQuery;
use log::{debug, warn};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// Key of the persisted sort preference.
pub const SORT_STATE_KEY: &str = "sort_state";

/// Value reported when no sort preference has been stored.
pub const DEFAULT_SORT_STATE: &str = "NONE";

/// Preference medium failure.
#[derive(Debug)]
pub enum PreferenceError {
    /// Transient medium failure. Reads substitute the default value.
    Io(std::io::Error),
    /// Stored document is unreadable.
    Decode(String),
    LockPoisoned,
}

impl PreferenceError {
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

impl Display for PreferenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "preference io failure: {err}"),
            Self::Decode(message) => write!(f, "preference document is corrupt: {message}"),
            Self::LockPoisoned => write!(f, "preference lock poisoned"),
        }
    }
}

impl Error for PreferenceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PreferenceError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Storage medium behind [`PreferenceStore`].
pub trait PreferenceBackend: Send + Sync {
    fn read_value(&self, key: &str) -> Result<Option<String>, PreferenceError>;
    fn write_value(&self, key: &str, value: &str) -> Result<(), PreferenceError>;
}

/// JSON document on disk holding every preference slot.
///
/// Writes go to a sibling temp file first and are renamed into place.
pub struct JsonFilePreferences {
    path: PathBuf,
    write_guard: Mutex<()>,
}

impl JsonFilePreferences {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_guard: Mutex::new(()),
        }
    }

    fn load(&self) -> Result<BTreeMap<String, String>, PreferenceError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => return Err(err.into()),
        };
        serde_json::from_slice(&bytes).map_err(|err| PreferenceError::Decode(err.to_string()))
    }
}

impl PreferenceBackend for JsonFilePreferences {
    fn read_value(&self, key: &str) -> Result<Option<String>, PreferenceError> {
        Ok(self.load()?.remove(key))
    }

    fn write_value(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        let _guard = self
            .write_guard
            .lock()
            .map_err(|_| PreferenceError::LockPoisoned)?;

        let mut slots = self.load()?;
        slots.insert(key.to_string(), value.to_string());
        let document = serde_json::to_vec_pretty(&slots)
            .map_err(|err| PreferenceError::Decode(err.to_string()))?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let staging = self.path.with_extension("json.tmp");
        std::fs::write(&staging, document)?;
        std::fs::rename(&staging, &self.path)?;
        Ok(())
    }
}

/// Process-local preference slots, for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryPreferences {
    slots: Mutex<BTreeMap<String, String>>,
}

impl PreferenceBackend for MemoryPreferences {
    fn read_value(&self, key: &str) -> Result<Option<String>, PreferenceError> {
        let slots = self.slots.lock().map_err(|_| PreferenceError::LockPoisoned)?;
        Ok(slots.get(key).cloned())
    }

    fn write_value(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        let mut slots = self.slots.lock().map_err(|_| PreferenceError::LockPoisoned)?;
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Sort preference slot with change notification.
pub struct PreferenceStore {
    backend: Arc<dyn PreferenceBackend>,
    changes: watch::Sender<u64>,
}

impl PreferenceStore {
    pub fn new(backend: Arc<dyn PreferenceBackend>) -> Self {
        let (changes, _) = watch::channel(0);
        Self { backend, changes }
    }

    /// Store backed by a JSON document at `path`.
    pub fn open_file(path: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(JsonFilePreferences::new(path)))
    }

    /// Store backed by process memory.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryPreferences::default()))
    }

    /// Overwrites the stored sort priority and wakes live readers.
    pub fn write_sort_state(&self, priority: Priority) -> Result<(), PreferenceError> {
        self.backend
            .write_value(SORT_STATE_KEY, priority.as_str())?;
        debug!(
            "event=pref_write module=store status=ok key={SORT_STATE_KEY} value={}",
            priority.as_str()
        );
        self.changes
            .send_modify(|generation| *generation = generation.wrapping_add(1));
        Ok(())
    }

    /// Reads the stored sort text once, applying the default policy.
    pub fn read_sort_state(&self) -> Result<String, PreferenceError> {
        read_with_default(self.backend.as_ref())
    }

    /// Live sort text. The value is delivered raw; parsing into a
    /// [`Priority`] is the subscriber's job.
    pub fn live_sort_state(&self) -> LiveQuery<String, PreferenceError> {
        let backend = Arc::clone(&self.backend);
        LiveQuery::new("sort_state", self.changes.subscribe(), move || {
            read_with_default(backend.as_ref())
        })
    }
}

fn read_with_default(backend: &dyn PreferenceBackend) -> Result<String, PreferenceError> {
    match backend.read_value(SORT_STATE_KEY) {
        Ok(Some(value)) => Ok(value),
        Ok(None) => Ok(DEFAULT_SORT_STATE.to_string()),
        Err(PreferenceError::Io(err)) => {
            warn!(
                "event=pref_read module=store status=degraded key={SORT_STATE_KEY} error_code=io_fallback error={err}"
            );
            Ok(DEFAULT_SORT_STATE.to_string())
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        JsonFilePreferences, PreferenceBackend, PreferenceError, PreferenceStore,
        DEFAULT_SORT_STATE, SORT_STATE_KEY,
    };
    use crate::model::task::Priority;
    use std::sync::Arc;

    #[test]
    fn missing_value_reads_as_none() {
        let store = PreferenceStore::in_memory();
        assert_eq!(store.read_sort_state().unwrap(), DEFAULT_SORT_STATE);
    }

    #[test]
    fn last_write_wins() {
        let store = PreferenceStore::in_memory();
        store.write_sort_state(Priority::Low).unwrap();
        store.write_sort_state(Priority::High).unwrap();
        assert_eq!(store.read_sort_state().unwrap(), "HIGH");
    }

    #[test]
    fn json_file_survives_reopen_and_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs").join("todo_preferences.json");

        let backend = JsonFilePreferences::new(&path);
        backend.write_value("theme", "dark").unwrap();
        let store = PreferenceStore::new(Arc::new(backend));
        store.write_sort_state(Priority::Medium).unwrap();
        drop(store);

        let reopened = JsonFilePreferences::new(&path);
        assert_eq!(
            reopened.read_value(SORT_STATE_KEY).unwrap().as_deref(),
            Some("MEDIUM")
        );
        assert_eq!(reopened.read_value("theme").unwrap().as_deref(), Some("dark"));
    }

    #[test]
    fn corrupt_json_is_a_decode_error_not_a_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("todo_preferences.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let store = PreferenceStore::open_file(&path);
        let err = store.read_sort_state().unwrap_err();
        assert!(matches!(err, PreferenceError::Decode(_)));
        assert!(!err.is_io());
    }

    #[test]
    fn unreadable_path_is_io_and_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where a file is expected makes `fs::read` fail with
        // an IO error other than NotFound.
        let store = PreferenceStore::open_file(dir.path());
        assert_eq!(store.read_sort_state().unwrap(), DEFAULT_SORT_STATE);
    }
}
