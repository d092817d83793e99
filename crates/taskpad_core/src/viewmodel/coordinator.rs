//! Task-list view-state coordinator.
//!
//! # Responsibility
//! - Publish the all-tasks, searched-tasks and sort-state channels as
//!   `RequestState`s, and the low/high priority projections as plain lists.
//! - Own the edit draft, the action tag, and the search bar fields.
//! - Dispatch persistence actions to the repository in the background.
//!
//! # Invariants
//! - Every published field has exactly one writer: this coordinator.
//! - Opening a read channel sets `Loading` before its subscription attaches.
//! - A channel that reports `Error` is finished; it is never re-attached
//!   automatically.
//! - An action handler runs once per change of the action tag into a
//!   non-`NoAction` value; re-setting the same value is a no-op.
//! - A route argument reaches the action tag only when it differs from the
//!   previous route argument, so resetting the tag to `NoAction` after a
//!   notice never lets a repeated route replay its mutation.
//! - Dropping the coordinator aborts its subscriptions. Background writes
//!   already started run to completion.
//!
//! All methods that start background work must be called from inside a
//! Tokio runtime.

use crate::model::task::{Priority, Task, TaskDraft, TaskId, ValidationError};
use crate::repo::task_repo::TaskRepository;
use crate::store::live::LiveQuery;
use crate::store::preference_store::PreferenceStore;
use crate::store::task_store::StoreResult;
use crate::viewmodel::action::{Action, ActionParseError};
use crate::viewmodel::request_state::{ReadError, RequestState};
use crate::viewmodel::selection::{select_task_list, ListSource, ListSources, SearchBarState};
use log::{debug, error, info, warn};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

const NOTICE_CAPACITY: usize = 32;
const DELETE_ALL_MESSAGE: &str = "Tasks have been removed";
const MISSING_INPUTS_MESSAGE: &str = "Missing inputs";

/// One-shot user notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The action tag moved to a new non-`NoAction` value.
    ActionApplied { action: Action, message: String },
    /// A commit was refused because the draft is incomplete.
    MissingInputs(ValidationError),
    /// A background write failed.
    ActionFailed { action: Action, message: String },
}

impl Notice {
    fn applied(action: Action, title: &str) -> Self {
        let message = match action {
            Action::DeleteAll => DELETE_ALL_MESSAGE.to_string(),
            other => format!("{}: {title}", other.name()),
        };
        Self::ActionApplied { action, message }
    }

    /// Text shown to the user.
    pub fn message(&self) -> &str {
        match self {
            Self::ActionApplied { message, .. } | Self::ActionFailed { message, .. } => message,
            Self::MissingInputs(_) => MISSING_INPUTS_MESSAGE,
        }
    }
}

/// Watch channel whose writers are fenced by an epoch.
///
/// Re-attaching a subscription advances the epoch; writes carrying an older
/// epoch are dropped, so a replaced subscription can never overwrite the
/// state of its successor.
struct Published<S> {
    state: watch::Sender<S>,
    epoch: AtomicU64,
}

impl<S> Published<S> {
    fn new(initial: S) -> Arc<Self> {
        let (state, _) = watch::channel(initial);
        Arc::new(Self {
            state,
            epoch: AtomicU64::new(0),
        })
    }

    /// Starts a new epoch, optionally replacing the current value in the
    /// same step.
    fn advance(&self, reset: Option<S>) -> u64 {
        let mut next = 0;
        self.state.send_if_modified(|current| {
            next = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
            match reset {
                Some(value) => {
                    *current = value;
                    true
                }
                None => false,
            }
        });
        next
    }

    fn publish(&self, epoch: u64, value: S) -> bool {
        self.state.send_if_modified(|current| {
            if self.epoch.load(Ordering::SeqCst) != epoch {
                return false;
            }
            *current = value;
            true
        })
    }

    fn subscribe(&self) -> watch::Receiver<S> {
        self.state.subscribe()
    }
}

#[derive(Default)]
struct Subscriptions {
    fixed: Vec<JoinHandle<()>>,
    search: Option<JoinHandle<()>>,
    selected_task: Option<JoinHandle<()>>,
}

impl Subscriptions {
    fn abort_all(&mut self) {
        for handle in self
            .fixed
            .drain(..)
            .chain(self.search.take())
            .chain(self.selected_task.take())
        {
            handle.abort();
        }
    }
}

/// Shared view state for the task list screens.
pub struct TaskListCoordinator {
    repo: TaskRepository,
    preferences: Arc<PreferenceStore>,
    all_tasks: Arc<Published<RequestState<Vec<Task>>>>,
    searched_tasks: Arc<Published<RequestState<Vec<Task>>>>,
    sort_state: Arc<Published<RequestState<Priority>>>,
    low_priority_tasks: Arc<Published<Vec<Task>>>,
    high_priority_tasks: Arc<Published<Vec<Task>>>,
    selected_task: Arc<Published<Option<Task>>>,
    draft: watch::Sender<TaskDraft>,
    action: watch::Sender<Action>,
    search_bar: watch::Sender<SearchBarState>,
    search_text: watch::Sender<String>,
    route_action: Mutex<Action>,
    notices: broadcast::Sender<Notice>,
    subscriptions: Mutex<Subscriptions>,
    pending_writes: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskListCoordinator {
    /// Creates the coordinator and attaches the all-tasks, sort-state and
    /// priority projection subscriptions.
    pub fn new(repo: TaskRepository, preferences: Arc<PreferenceStore>) -> Self {
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        let coordinator = Self {
            repo,
            preferences,
            all_tasks: Published::new(RequestState::Idle),
            searched_tasks: Published::new(RequestState::Idle),
            sort_state: Published::new(RequestState::Idle),
            low_priority_tasks: Published::new(Vec::new()),
            high_priority_tasks: Published::new(Vec::new()),
            selected_task: Published::new(None),
            draft: watch::channel(TaskDraft::default()).0,
            action: watch::channel(Action::NoAction).0,
            search_bar: watch::channel(SearchBarState::Closed).0,
            search_text: watch::channel(String::new()).0,
            route_action: Mutex::new(Action::NoAction),
            notices,
            subscriptions: Mutex::new(Subscriptions::default()),
            pending_writes: Mutex::new(Vec::new()),
        };

        let fixed = vec![
            attach_request(
                coordinator.repo.get_all_tasks(),
                Arc::clone(&coordinator.all_tasks),
                Ok,
            ),
            attach_request(
                coordinator.preferences.live_sort_state(),
                Arc::clone(&coordinator.sort_state),
                |raw: String| raw.parse::<Priority>().map_err(ReadError::from),
            ),
            attach_projection(
                coordinator.repo.sort_by_low_priority(),
                Arc::clone(&coordinator.low_priority_tasks),
            ),
            attach_projection(
                coordinator.repo.sort_by_high_priority(),
                Arc::clone(&coordinator.high_priority_tasks),
            ),
        ];
        lock(&coordinator.subscriptions).fixed = fixed;
        info!("event=coordinator_start module=viewmodel status=ok");
        coordinator
    }

    /// Read-only handle for presentation.
    pub fn view(&self) -> TaskListView {
        TaskListView {
            all_tasks: self.all_tasks.subscribe(),
            searched_tasks: self.searched_tasks.subscribe(),
            sort_state: self.sort_state.subscribe(),
            low_priority_tasks: self.low_priority_tasks.subscribe(),
            high_priority_tasks: self.high_priority_tasks.subscribe(),
            selected_task: self.selected_task.subscribe(),
            draft: self.draft.subscribe(),
            action: self.action.subscribe(),
            search_bar: self.search_bar.subscribe(),
            search_text: self.search_text.subscribe(),
        }
    }

    /// One-shot notifications published from now on.
    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    pub fn all_tasks(&self) -> watch::Receiver<RequestState<Vec<Task>>> {
        self.all_tasks.subscribe()
    }

    pub fn searched_tasks(&self) -> watch::Receiver<RequestState<Vec<Task>>> {
        self.searched_tasks.subscribe()
    }

    pub fn sort_state(&self) -> watch::Receiver<RequestState<Priority>> {
        self.sort_state.subscribe()
    }

    pub fn low_priority_tasks(&self) -> watch::Receiver<Vec<Task>> {
        self.low_priority_tasks.subscribe()
    }

    pub fn high_priority_tasks(&self) -> watch::Receiver<Vec<Task>> {
        self.high_priority_tasks.subscribe()
    }

    pub fn selected_task(&self) -> watch::Receiver<Option<Task>> {
        self.selected_task.subscribe()
    }

    /// Current edit draft.
    pub fn draft(&self) -> TaskDraft {
        self.draft.borrow().clone()
    }

    /// Current action tag.
    pub fn action(&self) -> Action {
        *self.action.borrow()
    }

    pub fn search_bar(&self) -> SearchBarState {
        *self.search_bar.borrow()
    }

    pub fn search_text(&self) -> String {
        self.search_text.borrow().clone()
    }

    pub fn set_task_id(&self, id: TaskId) {
        self.draft.send_modify(|draft| draft.id = id);
    }

    pub fn set_title(&self, title: impl Into<String>) {
        let title = title.into();
        self.draft.send_modify(|draft| draft.title = title);
    }

    pub fn set_description(&self, description: impl Into<String>) {
        let description = description.into();
        self.draft.send_modify(|draft| draft.description = description);
    }

    pub fn set_priority(&self, priority: Priority) {
        self.draft.send_modify(|draft| draft.priority = priority);
    }

    /// Loads `task` into the draft, or resets the draft to a new `LOW` task.
    pub fn update_task_fields(&self, task: Option<&Task>) {
        let next = task.map_or_else(TaskDraft::default, TaskDraft::from_task);
        self.draft.send_replace(next);
    }

    /// Whether the draft may be added or updated.
    pub fn validate_inputs(&self) -> bool {
        self.draft.borrow().validate().is_ok()
    }

    pub fn set_search_bar(&self, state: SearchBarState) {
        self.search_bar.send_replace(state);
    }

    pub fn set_search_text(&self, text: impl Into<String>) {
        self.search_text.send_replace(text.into());
    }

    /// Writes the action tag.
    ///
    /// Returns `true` when the value changed. A change into a non-`NoAction`
    /// value runs its repository handler and publishes an `ActionApplied`
    /// notice; setting the current value again does neither.
    pub fn set_action(&self, action: Action) -> bool {
        let changed = self.action.send_if_modified(|current| {
            if *current == action {
                return false;
            }
            *current = action;
            true
        });

        if changed && action != Action::NoAction {
            let title = self.draft.borrow().title.clone();
            let _ = self.notices.send(Notice::applied(action, &title));
            self.handle_database_actions(action);
        }
        changed
    }

    /// Applies an action name received when entering the list view.
    ///
    /// The action tag is written only when `route_arg` names a different
    /// action than the previous navigation did. Returns whether the tag
    /// changed.
    pub fn navigate_to_list(&self, route_arg: Option<&str>) -> Result<bool, ActionParseError> {
        let action = Action::from_route_arg(route_arg)?;
        {
            let mut last = lock(&self.route_action);
            if *last == action {
                debug!(
                    "event=route_action module=viewmodel status=skip action={}",
                    action.name()
                );
                return Ok(false);
            }
            *last = action;
        }
        Ok(self.set_action(action))
    }

    /// Commits an action from the edit screen.
    ///
    /// `ADD` and `UPDATE` require a valid draft; on failure a
    /// `MissingInputs` notice is published and neither the action tag nor
    /// the store is touched.
    pub fn submit(&self, action: Action) -> Result<bool, ValidationError> {
        if action.requires_valid_draft() {
            let verdict = self.draft.borrow().validate();
            if let Err(err) = verdict {
                debug!(
                    "event=action_rejected module=viewmodel action={} reason={err}",
                    action.name()
                );
                let _ = self.notices.send(Notice::MissingInputs(err));
                return Err(err);
            }
        }
        Ok(self.set_action(action))
    }

    /// Loads `task` into the draft and requests its deletion.
    pub fn request_delete(&self, task: &Task) -> bool {
        self.update_task_fields(Some(task));
        self.set_action(Action::Delete)
    }

    /// Runs the repository mutation for `action` with the current draft.
    ///
    /// Does not read or write the action tag.
    pub fn handle_database_actions(&self, action: Action) {
        let draft = self.draft.borrow().clone();
        let repo = self.repo.clone();
        info!(
            "event=action_dispatch module=viewmodel action={} id={}",
            action.name(),
            draft.id
        );

        match action {
            Action::Add => {
                let task = draft.to_new_task();
                self.spawn_write(action, async move { repo.add_task(task).await.map(drop) });
                self.search_bar.send_replace(SearchBarState::Closed);
            }
            Action::Update => {
                let task = draft.to_task();
                self.spawn_write(action, async move { repo.update_task(task).await.map(drop) });
            }
            Action::Delete => {
                let task = draft.to_task();
                self.spawn_write(action, async move { repo.delete_task(task).await.map(drop) });
            }
            Action::DeleteAll => {
                self.spawn_write(action, async move { repo.delete_all_tasks().await.map(drop) });
            }
            Action::NoAction => {}
        }
    }

    /// Opens a title search for `query` and triggers search mode.
    ///
    /// Replaces any previous search subscription.
    pub fn search_database(&self, query: &str) {
        let live = self.repo.search_database(format!("%{query}%"));
        let mut subscriptions = lock(&self.subscriptions);
        if let Some(previous) = subscriptions.search.take() {
            previous.abort();
        }
        subscriptions.search = Some(attach_request(live, Arc::clone(&self.searched_tasks), Ok));
        drop(subscriptions);
        self.search_bar.send_replace(SearchBarState::Triggered);
    }

    /// Persists the sort priority in the background.
    ///
    /// The sort-state channel picks the new value up from the store; it is
    /// not updated here.
    pub fn persist_sort_state(&self, priority: Priority) {
        let preferences = Arc::clone(&self.preferences);
        let handle = tokio::spawn(async move {
            let outcome =
                tokio::task::spawn_blocking(move || preferences.write_sort_state(priority)).await;
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(err)) => error!(
                    "event=pref_write module=viewmodel status=error value={} error={err}",
                    priority.as_str()
                ),
                Err(err) => error!(
                    "event=pref_write module=viewmodel status=error value={} error_code=worker_failed error={err}",
                    priority.as_str()
                ),
            }
        });
        self.track_pending(handle);
    }

    /// Follows the task with `id`; replaces any previous selection.
    pub fn load_selected_task(&self, id: TaskId) {
        let live = self.repo.get_selected_task(id);
        let mut subscriptions = lock(&self.subscriptions);
        if let Some(previous) = subscriptions.selected_task.take() {
            previous.abort();
        }
        subscriptions.selected_task =
            Some(attach_projection(live, Arc::clone(&self.selected_task)));
    }

    /// The list presentation should show right now, if any.
    pub fn displayed_tasks(&self) -> Option<(ListSource, Vec<Task>)> {
        self.view().displayed_tasks()
    }

    /// Waits until every background write started so far has finished.
    pub async fn wait_for_pending_writes(&self) {
        let handles = std::mem::take(&mut *lock(&self.pending_writes));
        for handle in handles {
            if let Err(err) = handle.await {
                warn!("event=pending_write module=viewmodel status=error error={err}");
            }
        }
    }

    fn spawn_write<F>(&self, action: Action, write: F)
    where
        F: Future<Output = StoreResult<()>> + Send + 'static,
    {
        let notices = self.notices.clone();
        let handle = tokio::spawn(async move {
            if let Err(err) = write.await {
                error!(
                    "event=task_write module=viewmodel status=error action={} error={err}",
                    action.name()
                );
                let _ = notices.send(Notice::ActionFailed {
                    action,
                    message: format!("{} failed: {err}", action.name()),
                });
            }
        });
        self.track_pending(handle);
    }

    fn track_pending(&self, handle: JoinHandle<()>) {
        let mut pending = lock(&self.pending_writes);
        pending.retain(|running| !running.is_finished());
        pending.push(handle);
    }
}

impl Drop for TaskListCoordinator {
    fn drop(&mut self) {
        lock(&self.subscriptions).abort_all();
        debug!("event=coordinator_stop module=viewmodel status=ok");
    }
}

/// Cloneable read-only view of every published field.
#[derive(Clone)]
pub struct TaskListView {
    pub all_tasks: watch::Receiver<RequestState<Vec<Task>>>,
    pub searched_tasks: watch::Receiver<RequestState<Vec<Task>>>,
    pub sort_state: watch::Receiver<RequestState<Priority>>,
    pub low_priority_tasks: watch::Receiver<Vec<Task>>,
    pub high_priority_tasks: watch::Receiver<Vec<Task>>,
    pub selected_task: watch::Receiver<Option<Task>>,
    pub draft: watch::Receiver<TaskDraft>,
    pub action: watch::Receiver<Action>,
    pub search_bar: watch::Receiver<SearchBarState>,
    pub search_text: watch::Receiver<String>,
}

impl TaskListView {
    /// Applies the list selection policy to the current values.
    pub fn displayed_tasks(&self) -> Option<(ListSource, Vec<Task>)> {
        let all_tasks = self.all_tasks.borrow();
        let searched_tasks = self.searched_tasks.borrow();
        let sort_state = self.sort_state.borrow();
        let low_priority_tasks = self.low_priority_tasks.borrow();
        let high_priority_tasks = self.high_priority_tasks.borrow();
        let sources = ListSources {
            all_tasks: &all_tasks,
            searched_tasks: &searched_tasks,
            sort_state: &sort_state,
            low_priority_tasks: &low_priority_tasks,
            high_priority_tasks: &high_priority_tasks,
            search_bar: *self.search_bar.borrow(),
        };
        select_task_list(&sources).map(|selection| (selection.source, selection.tasks.to_vec()))
    }
}

/// Drives a live query into a `RequestState` channel.
///
/// Sets `Loading` synchronously, then `Success` for every snapshot, and
/// `Error` once before stopping on the first failure.
fn attach_request<R, T, E, M>(
    mut query: LiveQuery<R, E>,
    target: Arc<Published<RequestState<T>>>,
    map: M,
) -> JoinHandle<()>
where
    R: Send + 'static,
    T: Send + Sync + 'static,
    E: Into<ReadError> + Send + 'static,
    M: Fn(R) -> Result<T, ReadError> + Send + 'static,
{
    let epoch = target.advance(Some(RequestState::Loading));
    tokio::spawn(async move {
        let name = query.name();
        loop {
            let cause = match query.next().await {
                Some(Ok(raw)) => match map(raw) {
                    Ok(data) => {
                        target.publish(epoch, RequestState::Success(data));
                        continue;
                    }
                    Err(cause) => cause,
                },
                Some(Err(err)) => err.into(),
                None => ReadError::SubscriptionClosed(name),
            };
            error!("event=live_query module=viewmodel status=error query={name} error={cause}");
            target.publish(epoch, RequestState::Error(Arc::new(cause)));
            break;
        }
    })
}

/// Drives a live query into a plain value channel. Failures are logged and
/// leave the last delivered value in place.
fn attach_projection<T, E>(
    mut query: LiveQuery<T, E>,
    target: Arc<Published<T>>,
) -> JoinHandle<()>
where
    T: Send + Sync + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let epoch = target.advance(None);
    tokio::spawn(async move {
        while let Some(result) = query.next().await {
            match result {
                Ok(value) => {
                    target.publish(epoch, value);
                }
                Err(err) => {
                    error!(
                        "event=live_query module=viewmodel status=error query={} error={err}",
                        query.name()
                    );
                    break;
                }
            }
        }
    })
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
