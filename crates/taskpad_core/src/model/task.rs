//! Task domain model.
//!
//! # Responsibility
//! - Define the persisted task record and the four priority levels.
//! - Define the editable draft used while a task is created or changed.
//!
//! # Invariants
//! - `Task::id == UNSAVED_TASK_ID` only for records that were never inserted.
//! - `Priority` round-trips through its uppercase name (`HIGH`, `MEDIUM`,
//!   `LOW`, `NONE`); any other text is an `UnknownPriorityError`.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Store-assigned integer identifier.
pub type TaskId = i64;

/// Identifier carried by a task that has not been inserted yet.
pub const UNSAVED_TASK_ID: TaskId = 0;

/// Priority level attached to every task, also used as the sort preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    High,
    Medium,
    Low,
    /// No priority. As a sort preference this means "show everything".
    None,
}

impl Priority {
    /// All levels in display order.
    pub const ALL: [Priority; 4] = [
        Priority::High,
        Priority::Medium,
        Priority::Low,
        Priority::None,
    ];

    /// Stable uppercase name used in storage and preferences.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
            Self::None => "NONE",
        }
    }
}

impl Display for Priority {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = UnknownPriorityError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "HIGH" => Ok(Self::High),
            "MEDIUM" => Ok(Self::Medium),
            "LOW" => Ok(Self::Low),
            "NONE" => Ok(Self::None),
            other => Err(UnknownPriorityError(other.to_string())),
        }
    }
}

/// Stored priority text that matches none of the four known names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPriorityError(pub String);

impl Display for UnknownPriorityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown priority `{}`; expected HIGH|MEDIUM|LOW|NONE",
            self.0
        )
    }
}

impl Error for UnknownPriorityError {}

/// One row of the task table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// `UNSAVED_TASK_ID` until the store assigns one.
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub priority: Priority,
}

impl Task {
    /// Creates an unsaved task. The store assigns the identifier on insert.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        priority: Priority,
    ) -> Self {
        Self::with_id(UNSAVED_TASK_ID, title, description, priority)
    }

    /// Creates a task with a caller-provided identifier.
    pub fn with_id(
        id: TaskId,
        title: impl Into<String>,
        description: impl Into<String>,
        priority: Priority,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            description: description.into(),
            priority,
        }
    }

    /// Returns whether this record was ever persisted.
    pub fn is_saved(&self) -> bool {
        self.id != UNSAVED_TASK_ID
    }
}

/// In-memory draft of the task currently being created or edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub priority: Priority,
}

impl Default for TaskDraft {
    /// The "new task" draft: unsaved id, empty text, `LOW` priority.
    fn default() -> Self {
        Self {
            id: UNSAVED_TASK_ID,
            title: String::new(),
            description: String::new(),
            priority: Priority::Low,
        }
    }
}

impl TaskDraft {
    /// Copies every field of a loaded task into a draft.
    pub fn from_task(task: &Task) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            description: task.description.clone(),
            priority: task.priority,
        }
    }

    /// Checks that title and description are both non-empty.
    ///
    /// Priority never fails validation.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match (self.title.is_empty(), self.description.is_empty()) {
            (true, true) => Err(ValidationError::MissingTitleAndDescription),
            (true, false) => Err(ValidationError::MissingTitle),
            (false, true) => Err(ValidationError::MissingDescription),
            (false, false) => Ok(()),
        }
    }

    /// Builds the record sent to the store.
    ///
    /// Uses the draft's identifier verbatim; callers that insert pass
    /// through [`TaskDraft::to_new_task`] instead.
    pub fn to_task(&self) -> Task {
        Task::with_id(
            self.id,
            self.title.clone(),
            self.description.clone(),
            self.priority,
        )
    }

    /// Builds an insertable record with the identifier forced to unsaved.
    pub fn to_new_task(&self) -> Task {
        Task::new(self.title.clone(), self.description.clone(), self.priority)
    }
}

/// Draft rejected before it reaches the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    MissingTitle,
    MissingDescription,
    MissingTitleAndDescription,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingTitle => write!(f, "task title must not be empty"),
            Self::MissingDescription => write!(f, "task description must not be empty"),
            Self::MissingTitleAndDescription => {
                write!(f, "task title and description must not be empty")
            }
        }
    }
}

impl Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::{Priority, Task, TaskDraft, ValidationError, UNSAVED_TASK_ID};

    #[test]
    fn priority_parses_only_uppercase_names() {
        for priority in Priority::ALL {
            assert_eq!(priority.as_str().parse::<Priority>().unwrap(), priority);
        }
        let err = "low".parse::<Priority>().unwrap_err();
        assert_eq!(err.0, "low");
        assert!("PURPLE".parse::<Priority>().is_err());
    }

    #[test]
    fn default_draft_is_unsaved_low_priority() {
        let draft = TaskDraft::default();
        assert_eq!(draft.id, UNSAVED_TASK_ID);
        assert!(draft.title.is_empty());
        assert!(draft.description.is_empty());
        assert_eq!(draft.priority, Priority::Low);
    }

    #[test]
    fn validate_requires_title_and_description() {
        let mut draft = TaskDraft::default();
        assert_eq!(
            draft.validate(),
            Err(ValidationError::MissingTitleAndDescription)
        );

        draft.title = "Buy milk".to_string();
        assert_eq!(draft.validate(), Err(ValidationError::MissingDescription));

        draft.title.clear();
        draft.description = "2%".to_string();
        assert_eq!(draft.validate(), Err(ValidationError::MissingTitle));

        draft.title = "Buy milk".to_string();
        for priority in Priority::ALL {
            draft.priority = priority;
            assert_eq!(draft.validate(), Ok(()));
        }
    }

    #[test]
    fn to_new_task_drops_identifier() {
        let loaded = Task::with_id(7, "t", "d", Priority::High);
        let draft = TaskDraft::from_task(&loaded);
        assert_eq!(draft.to_task(), loaded);
        assert_eq!(draft.to_new_task().id, UNSAVED_TASK_ID);
        assert!(!draft.to_new_task().is_saved());
    }

    #[test]
    fn priority_serializes_as_uppercase_name() {
        let json = serde_json::to_string(&Priority::Medium).unwrap();
        assert_eq!(json, "\"MEDIUM\"");
    }
}
