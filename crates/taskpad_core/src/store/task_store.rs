//! SQLite-backed task table with live queries.
//!
//! # Responsibility
//! - Insert, update and delete task rows.
//! - Serve the all-tasks, title-search, priority-filter and single-row
//!   queries, both as one-shot reads and as [`LiveQuery`] subscriptions.
//!
//! # Invariants
//! - Inserting a task with `UNSAVED_TASK_ID` lets SQLite assign a fresh,
//!   never reused identifier (`AUTOINCREMENT`).
//! - Updating or deleting an absent identifier succeeds with zero rows.
//! - Negative identifiers are rejected before any SQL runs.
//! - Every successful mutation bumps the change signal exactly once.

use crate::db::DbError;
use crate::model::task::{Priority, Task, TaskId, UNSAVED_TASK_ID};
use crate::store::live::LiveQuery;
use log::{debug, warn};
use rusqlite::{params, Connection, ErrorCode, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

const TASK_SELECT_SQL: &str = "SELECT id, title, description, priority FROM tasks";

pub type StoreResult<T> = Result<T, StoreError>;

/// Task table failure.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    /// A row violated a table constraint, e.g. a duplicate explicit id.
    Constraint(String),
    /// Identifier that can never name a row.
    InvalidId(TaskId),
    /// Persisted row that does not decode into a `Task`.
    InvalidData(String),
    /// A previous holder of the connection panicked.
    LockPoisoned,
    /// The background worker running the operation failed.
    Background(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Constraint(message) => write!(f, "task constraint violated: {message}"),
            Self::InvalidId(id) => write!(f, "invalid task id: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted task data: {message}"),
            Self::LockPoisoned => write!(f, "task store connection lock poisoned"),
            Self::Background(message) => write!(f, "task store worker failed: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(failure, message) = &value {
            if failure.code == ErrorCode::ConstraintViolation {
                return Self::Constraint(message.clone().unwrap_or_else(|| failure.to_string()));
            }
        }
        Self::Db(DbError::Sqlite(value))
    }
}

/// Durable task table. Share it behind an `Arc` to open live queries.
pub struct TaskStore {
    conn: Mutex<Connection>,
    changes: watch::Sender<u64>,
}

impl TaskStore {
    /// Wraps a connection returned by [`crate::db::open_db`] or
    /// [`crate::db::open_db_in_memory`].
    pub fn new(conn: Connection) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            conn: Mutex::new(conn),
            changes,
        }
    }

    /// Inserts a task and returns its identifier.
    ///
    /// `UNSAVED_TASK_ID` lets the table assign the id; a positive id is
    /// inserted verbatim and fails with `Constraint` when already taken.
    pub fn insert(&self, task: &Task) -> StoreResult<TaskId> {
        ensure_valid_id(task.id)?;
        let conn = self.lock()?;

        let id = if task.id == UNSAVED_TASK_ID {
            conn.execute(
                "INSERT INTO tasks (title, description, priority) VALUES (?1, ?2, ?3);",
                params![task.title, task.description, task.priority.as_str()],
            )?;
            conn.last_insert_rowid()
        } else {
            conn.execute(
                "INSERT INTO tasks (id, title, description, priority) VALUES (?1, ?2, ?3, ?4);",
                params![task.id, task.title, task.description, task.priority.as_str()],
            )?;
            task.id
        };
        drop(conn);

        debug!("event=task_insert module=store status=ok id={id}");
        self.notify_changed();
        Ok(id)
    }

    /// Replaces every column of the row with `task.id`.
    ///
    /// Returns the number of rows changed; an absent id changes nothing.
    pub fn update(&self, task: &Task) -> StoreResult<usize> {
        ensure_valid_id(task.id)?;
        let changed = self.lock()?.execute(
            "UPDATE tasks SET title = ?1, description = ?2, priority = ?3 WHERE id = ?4;",
            params![task.title, task.description, task.priority.as_str(), task.id],
        )?;

        if changed == 0 {
            warn!("event=task_update module=store status=noop id={}", task.id);
        } else {
            debug!("event=task_update module=store status=ok id={}", task.id);
        }
        self.notify_changed();
        Ok(changed)
    }

    /// Deletes the row with `id`. Returns the number of rows removed.
    pub fn delete(&self, id: TaskId) -> StoreResult<usize> {
        ensure_valid_id(id)?;
        let removed = self
            .lock()?
            .execute("DELETE FROM tasks WHERE id = ?1;", [id])?;

        if removed == 0 {
            warn!("event=task_delete module=store status=noop id={id}");
        } else {
            debug!("event=task_delete module=store status=ok id={id}");
        }
        self.notify_changed();
        Ok(removed)
    }

    /// Deletes every row. Returns the number of rows removed.
    pub fn delete_all(&self) -> StoreResult<usize> {
        let removed = self.lock()?.execute("DELETE FROM tasks;", [])?;
        debug!("event=task_delete_all module=store status=ok removed={removed}");
        self.notify_changed();
        Ok(removed)
    }

    /// All tasks ordered by id ascending.
    pub fn all_tasks(&self) -> StoreResult<Vec<Task>> {
        let conn = self.lock()?;
        query_tasks(&conn, &format!("{TASK_SELECT_SQL} ORDER BY id ASC;"), params![])
    }

    /// Tasks whose title matches a SQL `LIKE` pattern, case-insensitively
    /// for ASCII. Callers wrap the needle in `%` for "contains" matching.
    pub fn search_by_title(&self, pattern: &str) -> StoreResult<Vec<Task>> {
        let conn = self.lock()?;
        query_tasks(
            &conn,
            &format!("{TASK_SELECT_SQL} WHERE title LIKE ?1 ORDER BY id ASC;"),
            [pattern],
        )
    }

    /// Tasks whose priority equals `priority`, ordered by id ascending.
    pub fn tasks_with_priority(&self, priority: Priority) -> StoreResult<Vec<Task>> {
        let conn = self.lock()?;
        query_tasks(
            &conn,
            &format!("{TASK_SELECT_SQL} WHERE priority = ?1 ORDER BY id ASC;"),
            [priority.as_str()],
        )
    }

    /// One task by id.
    pub fn get_task(&self, id: TaskId) -> StoreResult<Option<Task>> {
        let conn = self.lock()?;
        let mut tasks = query_tasks(&conn, &format!("{TASK_SELECT_SQL} WHERE id = ?1;"), [id])?;
        Ok(tasks.pop())
    }

    /// Live variant of [`TaskStore::all_tasks`].
    pub fn live_all_tasks(self: &Arc<Self>) -> LiveQuery<Vec<Task>, StoreError> {
        let store = Arc::clone(self);
        LiveQuery::new("all_tasks", self.changes.subscribe(), move || {
            store.all_tasks()
        })
    }

    /// Live variant of [`TaskStore::search_by_title`].
    pub fn live_search_by_title(
        self: &Arc<Self>,
        pattern: impl Into<String>,
    ) -> LiveQuery<Vec<Task>, StoreError> {
        let store = Arc::clone(self);
        let pattern = pattern.into();
        LiveQuery::new("search_by_title", self.changes.subscribe(), move || {
            store.search_by_title(&pattern)
        })
    }

    /// Live variant of [`TaskStore::tasks_with_priority`].
    pub fn live_tasks_with_priority(
        self: &Arc<Self>,
        priority: Priority,
    ) -> LiveQuery<Vec<Task>, StoreError> {
        let store = Arc::clone(self);
        LiveQuery::new("tasks_with_priority", self.changes.subscribe(), move || {
            store.tasks_with_priority(priority)
        })
    }

    /// Live variant of [`TaskStore::get_task`].
    pub fn live_task(self: &Arc<Self>, id: TaskId) -> LiveQuery<Option<Task>, StoreError> {
        let store = Arc::clone(self);
        LiveQuery::new("task_by_id", self.changes.subscribe(), move || {
            store.get_task(id)
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn notify_changed(&self) {
        self.changes
            .send_modify(|generation| *generation = generation.wrapping_add(1));
    }
}

fn ensure_valid_id(id: TaskId) -> StoreResult<()> {
    if id < 0 {
        return Err(StoreError::InvalidId(id));
    }
    Ok(())
}

fn query_tasks<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> StoreResult<Vec<Task>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut tasks = Vec::new();

    while let Some(row) = rows.next()? {
        tasks.push(parse_task_row(row)?);
    }

    Ok(tasks)
}

fn parse_task_row(row: &Row<'_>) -> StoreResult<Task> {
    let priority_text: String = row.get("priority")?;
    let priority = priority_text.parse::<Priority>().map_err(|_| {
        StoreError::InvalidData(format!(
            "invalid priority `{priority_text}` in tasks.priority"
        ))
    })?;

    Ok(Task {
        id: row.get("id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        priority,
    })
}

#[cfg(test)]
mod tests {
    use super::{StoreError, TaskStore};
    use crate::db::open_db_in_memory;
    use crate::model::task::{Priority, Task};

    fn store() -> TaskStore {
        TaskStore::new(open_db_in_memory().unwrap())
    }

    #[test]
    fn negative_ids_are_rejected_before_sql() {
        let store = store();
        let task = Task::with_id(-4, "t", "d", Priority::Low);
        assert!(matches!(store.insert(&task), Err(StoreError::InvalidId(-4))));
        assert!(matches!(store.update(&task), Err(StoreError::InvalidId(-4))));
        assert!(matches!(store.delete(-4), Err(StoreError::InvalidId(-4))));
    }

    #[test]
    fn duplicate_explicit_id_is_a_constraint_error() {
        let store = store();
        store
            .insert(&Task::with_id(5, "a", "b", Priority::Low))
            .unwrap();
        let err = store
            .insert(&Task::with_id(5, "c", "d", Priority::High))
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)), "{err}");
    }

    #[test]
    fn failed_mutation_does_not_signal_change() {
        let store = store();
        let rx = store.changes.subscribe();
        let _ = store.delete(-1);
        assert!(!rx.has_changed().unwrap());
        store.delete_all().unwrap();
        assert!(rx.has_changed().unwrap());
    }

    #[test]
    fn corrupt_priority_surfaces_invalid_data() {
        let store = store();
        store
            .lock()
            .unwrap()
            .execute(
                "INSERT INTO tasks (title, description, priority) VALUES ('t', 'd', 'URGENT');",
                [],
            )
            .unwrap();
        let err = store.all_tasks().unwrap_err();
        assert!(matches!(err, StoreError::InvalidData(message) if message.contains("URGENT")));
    }
}
