//! Working copy of the task being created or edited.

use chrono::{DateTime, Utc};
use mytasks_proto::task::{Task, TaskFilter, TaskPriority};

/// Form state owned by [`TaskController`](super::TaskController).
///
/// Replaced as a whole on every transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFormState {
    /// The stored task being edited; `None` while creating a new one.
    pub current_task: Option<Task>,
    /// Working title.
    pub title: String,
    /// Working description.
    pub description: String,
    /// Working due date.
    pub date: DateTime<Utc>,
    /// Working priority.
    pub priority: TaskPriority,
    /// Whether the form edits an existing task.
    pub is_editing: bool,
    /// Which tasks are listed.
    pub filter: TaskFilter,
}

impl TaskFormState {
    /// The blank form: empty text, due `now`, medium priority, all tasks
    /// listed.
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            current_task: None,
            title: String::new(),
            description: String::new(),
            date: now,
            priority: TaskPriority::default(),
            is_editing: false,
            filter: TaskFilter::default(),
        }
    }

    /// This form with its working fields taken from `task`.
    #[must_use]
    pub fn editing(&self, task: Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            date: task.date,
            priority: task.priority,
            is_editing: true,
            current_task: Some(task),
            filter: self.filter,
        }
    }

    /// Returns `true` if the working title would be rejected on save.
    #[must_use]
    pub fn title_is_blank(&self) -> bool {
        self.title.trim().is_empty()
    }

    /// Builds the record a save should write, stamped with `now`.
    ///
    /// When editing, the held task is copied with the working fields merged
    /// in and a new `updated_at`. Otherwise a new, not-yet-stored task is
    /// built. Title and description are trimmed either way.
    #[must_use]
    pub fn to_task(&self, now: DateTime<Utc>) -> Task {
        let title = self.title.trim();
        let description = self.description.trim();
        match (&self.current_task, self.is_editing) {
            (Some(task), true) => Task {
                title: title.to_string(),
                description: description.to_string(),
                date: self.date,
                priority: self.priority,
                updated_at: now,
                ..task.clone()
            },
            _ => Task::new(title, description, self.date, self.priority, now),
        }
    }
}
