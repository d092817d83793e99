//! Task repository facade.
//!
//! Mutations run on the blocking pool and resolve once the row is written.
//! Reads are live queries that the caller drives.

use crate::model::task::{Priority, Task, TaskId};
use crate::store::live::LiveQuery;
use crate::store::task_store::{StoreError, StoreResult, TaskStore};
use std::sync::Arc;

/// Cloneable handle over a shared [`TaskStore`].
#[derive(Clone)]
pub struct TaskRepository {
    store: Arc<TaskStore>,
}

impl TaskRepository {
    pub fn new(store: Arc<TaskStore>) -> Self {
        Self { store }
    }

    /// Underlying store, for synchronous one-shot reads.
    pub fn store(&self) -> &Arc<TaskStore> {
        &self.store
    }

    /// All tasks ordered by id, re-delivered after every change.
    pub fn get_all_tasks(&self) -> LiveQuery<Vec<Task>, StoreError> {
        self.store.live_all_tasks()
    }

    /// Title search. `pattern` is a SQL `LIKE` pattern, already wrapped by
    /// the caller (e.g. `%milk%` for "contains").
    pub fn search_database(&self, pattern: impl Into<String>) -> LiveQuery<Vec<Task>, StoreError> {
        self.store.live_search_by_title(pattern)
    }

    pub fn sort_by_low_priority(&self) -> LiveQuery<Vec<Task>, StoreError> {
        self.store.live_tasks_with_priority(Priority::Low)
    }

    pub fn sort_by_high_priority(&self) -> LiveQuery<Vec<Task>, StoreError> {
        self.store.live_tasks_with_priority(Priority::High)
    }

    pub fn get_selected_task(&self, id: TaskId) -> LiveQuery<Option<Task>, StoreError> {
        self.store.live_task(id)
    }

    /// Inserts `task` and resolves to the assigned identifier.
    pub async fn add_task(&self, task: Task) -> StoreResult<TaskId> {
        self.run_blocking(move |store| store.insert(&task)).await
    }

    /// Full-record update keyed by `task.id`. Resolves to rows changed.
    pub async fn update_task(&self, task: Task) -> StoreResult<usize> {
        self.run_blocking(move |store| store.update(&task)).await
    }

    /// Deletes the row named by `task.id`. Resolves to rows removed.
    pub async fn delete_task(&self, task: Task) -> StoreResult<usize> {
        self.run_blocking(move |store| store.delete(task.id)).await
    }

    pub async fn delete_all_tasks(&self) -> StoreResult<usize> {
        self.run_blocking(|store| store.delete_all()).await
    }

    async fn run_blocking<T, F>(&self, op: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&TaskStore) -> StoreResult<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || op(&store))
            .await
            .map_err(|err| StoreError::Background(err.to_string()))?
    }
}
