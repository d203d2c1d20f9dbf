//! Task controller: form transitions, store writes, derived views.
//!
//! Every transition replaces the whole [`TaskFormState`] inside its watch
//! channel, so observers only ever see complete states. Store reads that
//! fail degrade to empty views, and store writes that fail are logged and
//! otherwise dropped.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use mytasks_proto::task::{Task, TaskId};

use super::{TaskEvent, TaskFormState, TaskViews};
use crate::store::{TaskSnapshot, TaskStore};

/// Source of the current time, replaceable in tests.
pub type Clock = fn() -> DateTime<Utc>;

/// Owns the task form and the filtered task lists.
///
/// Must be created inside a Tokio runtime: construction spawns a
/// background task that follows the store's snapshots. That task is
/// aborted when the controller is dropped.
pub struct TaskController<S> {
    store: Arc<S>,
    state: watch::Sender<TaskFormState>,
    views: Arc<watch::Sender<TaskViews>>,
    forwarder: JoinHandle<()>,
    clock: Clock,
}

impl<S: TaskStore> TaskController<S> {
    /// Creates a controller over `store` with a blank form.
    pub fn new(store: Arc<S>) -> Self {
        let snapshots = store.subscribe_all_tasks();
        let views = Arc::new(watch::channel(TaskViews::default()).0);
        let forwarder = spawn_view_forwarder(snapshots, Arc::clone(&views));
        let clock: Clock = Utc::now;
        let (state, _rx) = watch::channel(TaskFormState::new(clock()));
        Self {
            store,
            state,
            views,
            forwarder,
            clock,
        }
    }

    /// Replaces the clock and resets the form against it.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self.state.send_replace(TaskFormState::new(clock()));
        self
    }

    /// Returns a snapshot of the form.
    #[must_use]
    pub fn state(&self) -> TaskFormState {
        self.state.borrow().clone()
    }

    /// Subscribe to form changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<TaskFormState> {
        self.state.subscribe()
    }

    /// Returns the latest derived views.
    #[must_use]
    pub fn views(&self) -> TaskViews {
        self.views.borrow().clone()
    }

    /// Subscribe to derived view changes.
    #[must_use]
    pub fn subscribe_views(&self) -> watch::Receiver<TaskViews> {
        self.views.subscribe()
    }

    /// Re-derives the views from the store's current snapshot instead of
    /// waiting for the background forwarder to catch up.
    pub fn refresh_views(&self) {
        let snapshots = self.store.subscribe_all_tasks();
        self.views
            .send_modify(|views| *views = derive_views(&snapshots.borrow()));
    }

    /// Returns the tasks listed under the current filter.
    #[must_use]
    pub fn visible_tasks(&self) -> Vec<Task> {
        let filter = self.state.borrow().filter;
        self.views.borrow().select(filter).to_vec()
    }

    /// Dispatches one intent.
    ///
    /// Field edits apply immediately. Intents that reach the store complete
    /// when the store call does; the resulting state change (if any) is
    /// published in one step afterwards.
    pub async fn handle(&self, event: TaskEvent) {
        match event {
            TaskEvent::LoadTask(id) => self.load_task(id).await,
            TaskEvent::SaveTask => self.save_task().await,
            TaskEvent::DeleteTask(task) => self.delete_task(&task).await,
            TaskEvent::ToggleTaskCompletion { id, completed } => {
                self.toggle_completion(&id, completed).await;
            }
            TaskEvent::UpdateTitle(title) => self.transition(|s| TaskFormState {
                title,
                ..s.clone()
            }),
            TaskEvent::UpdateDescription(description) => self.transition(|s| TaskFormState {
                description,
                ..s.clone()
            }),
            TaskEvent::UpdateDate(date) => {
                self.transition(|s| TaskFormState { date, ..s.clone() });
            }
            TaskEvent::UpdatePriority(priority) => self.transition(|s| TaskFormState {
                priority,
                ..s.clone()
            }),
            TaskEvent::SetFilter(filter) => self.transition(|s| TaskFormState {
                filter,
                ..s.clone()
            }),
            TaskEvent::ClearForm => self.clear_form(),
            TaskEvent::ClearCompleted => self.clear_completed().await,
        }
    }

    /// Replaces the form with `f(current)` in one step.
    fn transition(&self, f: impl FnOnce(&TaskFormState) -> TaskFormState) {
        self.state.send_modify(|state| *state = f(state));
    }

    fn clear_form(&self) {
        let fresh = TaskFormState::new((self.clock)());
        self.state.send_replace(fresh);
        tracing::debug!("task form cleared");
    }

    async fn load_task(&self, id: Option<TaskId>) {
        let Some(id) = id.filter(|id| !id.is_blank()) else {
            self.clear_form();
            return;
        };

        match self.store.get_by_id(&id).await {
            Ok(Some(task)) => {
                tracing::debug!(task_id = %id, title = %task.title, "task loaded");
                self.transition(|s| s.editing(task));
            }
            Ok(None) => {
                tracing::warn!(task_id = %id, "task not found");
                self.clear_form();
            }
            Err(e) => {
                tracing::error!(task_id = %id, error = %e, "error loading task");
                self.clear_form();
            }
        }
    }

    async fn save_task(&self) {
        let form = self.state();
        if form.title_is_blank() {
            tracing::warn!("cannot save task with empty title");
            return;
        }

        let task = form.to_task((self.clock)());
        if form.is_editing && form.current_task.is_some() {
            match self.store.update(task).await {
                Ok(()) => tracing::info!("task updated"),
                Err(e) => tracing::error!(error = %e, "error updating task"),
            }
        } else {
            match self.store.create(task).await {
                Ok(id) => tracing::info!(task_id = %id, "task created"),
                Err(e) => tracing::error!(error = %e, "error creating task"),
            }
        }
        self.clear_form();
    }

    async fn delete_task(&self, task: &Task) {
        match self.store.delete(task).await {
            Ok(()) => tracing::info!(task_id = %task.id, "task deleted"),
            Err(e) => tracing::error!(task_id = %task.id, error = %e, "error deleting task"),
        }
    }

    async fn toggle_completion(&self, id: &TaskId, completed: bool) {
        match self.store.set_completion(id, completed).await {
            Ok(()) => tracing::info!(task_id = %id, completed, "task completion toggled"),
            Err(e) => tracing::error!(task_id = %id, error = %e, "error toggling task completion"),
        }
    }

    async fn clear_completed(&self) {
        let completed = self.views.borrow().completed.clone();
        let mut cleared = 0usize;
        for task in &completed {
            match self.store.delete(task).await {
                Ok(()) => cleared += 1,
                Err(e) => {
                    tracing::error!(task_id = %task.id, error = %e, "error clearing completed task");
                }
            }
        }
        tracing::info!(cleared, total = completed.len(), "cleared completed tasks");
    }
}

impl<S> Drop for TaskController<S> {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}

/// Follows store snapshots and republishes them as [`TaskViews`].
///
/// A failed snapshot is logged and shown as an empty list. The task ends
/// when the store side of the channel closes.
///
/// Views are derived while the views channel is locked, so a slow forwarder
/// never overwrites a newer [`TaskController::refresh_views`] result.
fn spawn_view_forwarder(
    mut snapshots: watch::Receiver<TaskSnapshot>,
    views: Arc<watch::Sender<TaskViews>>,
) -> JoinHandle<()> {
    views.send_modify(|v| *v = derive_views(&snapshots.borrow_and_update()));
    tokio::spawn(async move {
        while snapshots.changed().await.is_ok() {
            views.send_modify(|v| *v = derive_views(&snapshots.borrow_and_update()));
        }
        tracing::debug!("task snapshot channel closed");
    })
}

fn derive_views(snapshot: &TaskSnapshot) -> TaskViews {
    match snapshot {
        Ok(tasks) => TaskViews::from_tasks(tasks.clone()),
        Err(e) => {
            tracing::error!(error = %e, "error loading tasks");
            TaskViews::default()
        }
    }
}
