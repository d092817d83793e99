//! Core of the taskpad task list.
//!
//! Task table and sort preference storage, the repository facade, and the
//! view-state coordinator that presentation layers observe and drive.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod store;
pub mod viewmodel;

pub use config::{AppConfig, ConfigError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::task::{
    Priority, Task, TaskDraft, TaskId, UnknownPriorityError, ValidationError, UNSAVED_TASK_ID,
};
pub use repo::task_repo::TaskRepository;
pub use store::live::LiveQuery;
pub use store::preference_store::{
    JsonFilePreferences, MemoryPreferences, PreferenceBackend, PreferenceError, PreferenceStore,
};
pub use store::task_store::{StoreError, StoreResult, TaskStore};
pub use viewmodel::action::{Action, ActionParseError};
pub use viewmodel::coordinator::{Notice, TaskListCoordinator, TaskListView};
pub use viewmodel::request_state::{ReadError, RequestState};
pub use viewmodel::selection::{select_task_list, ListSelection, ListSource, ListSources, SearchBarState};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
