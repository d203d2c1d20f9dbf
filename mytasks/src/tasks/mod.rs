//! Task editing and listing state.
//!
//! The [`TaskController`] owns the task form and the active filter,
//! turns [`TaskEvent`]s into [`TaskStore`](crate::store::TaskStore) calls,
//! and keeps [`TaskViews`] in step with the store's published snapshots.

pub mod controller;
pub mod form;
pub mod views;

pub use controller::TaskController;
pub use form::TaskFormState;
pub use views::TaskViews;

use chrono::{DateTime, Utc};
use mytasks_proto::task::{Task, TaskFilter, TaskId, TaskPriority};

/// Every intent the task screens can dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    /// Load a task into the form for editing. `None` or a blank id starts
    /// a fresh form instead.
    LoadTask(Option<TaskId>),
    /// Create or update the task described by the form.
    SaveTask,
    /// Remove a task.
    DeleteTask(Task),
    /// Mark a task done or not done without loading it.
    ToggleTaskCompletion {
        /// Task to change.
        id: TaskId,
        /// New completion flag.
        completed: bool,
    },
    /// Replace the working title.
    UpdateTitle(String),
    /// Replace the working description.
    UpdateDescription(String),
    /// Replace the working due date.
    UpdateDate(DateTime<Utc>),
    /// Replace the working priority.
    UpdatePriority(TaskPriority),
    /// Choose which tasks are listed.
    SetFilter(TaskFilter),
    /// Discard the form.
    ClearForm,
    /// Remove every task currently shown as completed.
    ClearCompleted,
}
