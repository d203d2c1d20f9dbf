//! Task model types for `MyTasks`.
//!
//! Defines the persisted [`Task`] record, its string identifier, the ordered
//! [`TaskPriority`] scale, and the [`TaskFilter`] used to split a task list
//! by completion state.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Errors produced when parsing task fields from user text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseTaskFieldError {
    /// The text does not name a priority.
    #[error("unknown priority: {0}")]
    UnknownPriority(String),
    /// The text does not name a filter.
    #[error("unknown filter: {0}")]
    UnknownFilter(String),
}

/// Unique identifier for a task.
///
/// Assigned by the task store on creation. A task that has not been
/// persisted yet carries an empty identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(String);

impl TaskId {
    /// Wraps an existing identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh time-ordered identifier (UUID v7).
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// The identifier of a task that has not been stored yet.
    #[must_use]
    pub const fn unassigned() -> Self {
        Self(String::new())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the identifier is empty or whitespace only.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Urgency of a task, ordered from least to most urgent.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum TaskPriority {
    /// Can wait.
    Low,
    /// The default for new tasks.
    #[default]
    Medium,
    /// Should be handled soon.
    High,
    /// Needs attention now.
    Urgent,
}

impl TaskPriority {
    /// All priorities in ascending order.
    pub const ALL: [Self; 4] = [Self::Low, Self::Medium, Self::High, Self::Urgent];

    /// Human-readable name shown next to a task.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Urgent => "Urgent",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for TaskPriority {
    type Err = ParseTaskFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.display_name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ParseTaskFieldError::UnknownPriority(s.to_string()))
    }
}

/// A personal to-do item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Store-assigned identifier; empty until the task is created.
    pub id: TaskId,
    /// Short summary. Must be non-blank to be saved.
    pub title: String,
    /// Free-form notes, may be empty.
    pub description: String,
    /// Due date.
    pub date: DateTime<Utc>,
    /// Urgency.
    pub priority: TaskPriority,
    /// Whether the task has been done.
    pub is_completed: bool,
    /// When the task was first created.
    pub created_at: DateTime<Utc>,
    /// When the task was last modified.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Builds a new, not-yet-stored task stamped with `now`.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        date: DateTime<Utc>,
        priority: TaskPriority,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TaskId::unassigned(),
            title: title.into(),
            description: description.into(),
            date,
            priority,
            is_completed: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Which subset of the task list is shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskFilter {
    /// Every task; excludes nothing.
    #[default]
    All,
    /// Tasks not yet completed.
    Active,
    /// Completed tasks only.
    Completed,
}

impl TaskFilter {
    /// Returns `true` if `task` is visible under this filter.
    #[must_use]
    pub const fn matches(self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Active => !task.is_completed,
            Self::Completed => task.is_completed,
        }
    }

    /// Returns the tasks visible under this filter, preserving order.
    #[must_use]
    pub fn apply(self, tasks: &[Task]) -> Vec<Task> {
        tasks.iter().filter(|t| self.matches(t)).cloned().collect()
    }
}

impl fmt::Display for TaskFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Active => write!(f, "active"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

impl FromStr for TaskFilter {
    type Err = ParseTaskFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            _ => Err(ParseTaskFieldError::UnknownFilter(s.to_string())),
        }
    }
}
