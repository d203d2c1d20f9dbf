//! Read-only task lists derived from a store snapshot.

use mytasks_proto::task::{Task, TaskFilter};

/// The task list split by completion state.
///
/// Always a pure function of one store snapshot, never edited directly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskViews {
    /// Every task, in store order.
    pub all: Vec<Task>,
    /// Tasks not yet completed.
    pub active: Vec<Task>,
    /// Completed tasks.
    pub completed: Vec<Task>,
    /// Number of active tasks.
    pub active_count: usize,
}

impl TaskViews {
    /// Derives the views from a snapshot.
    #[must_use]
    pub fn from_tasks(all: Vec<Task>) -> Self {
        let active = TaskFilter::Active.apply(&all);
        let completed = TaskFilter::Completed.apply(&all);
        Self {
            active_count: active.len(),
            all,
            active,
            completed,
        }
    }

    /// Returns the list shown under `filter`.
    #[must_use]
    pub fn select(&self, filter: TaskFilter) -> &[Task] {
        match filter {
            TaskFilter::All => &self.all,
            TaskFilter::Active => &self.active,
            TaskFilter::Completed => &self.completed,
        }
    }
}
