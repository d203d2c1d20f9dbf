//! Store contracts consumed by the controllers.
//!
//! Defines the three services the state controllers read from and write to:
//! - [`TaskStore`]: CRUD and a live snapshot of the user's tasks
//! - [`AuthStore`]: account registration, sign-in, and the current identity
//! - [`SettingsStore`]: the small on-device login blob
//!
//! Concrete implementations:
//! - [`memory`]: in-process stores backed by [`tokio::sync::watch`] channels
//! - [`settings_file::FileSettingsStore`]: settings blob persisted to disk
//!
//! Every subscription is a `watch` channel: the latest value is cached and
//! handed to each new subscriber, and a subscriber only ever sees whole
//! snapshots.

pub mod memory;
pub mod settings_file;

use std::future::Future;

use tokio::sync::watch;

use mytasks_proto::codec::CodecError;
use mytasks_proto::settings::LoginSettings;
use mytasks_proto::task::{Task, TaskId};
use mytasks_proto::user::{Identity, UserProfile};

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested record does not exist.
    #[error("record not found: {0}")]
    NotFound(String),

    /// The service refused the request. The message is shown to the user.
    #[error("{0}")]
    Rejected(String),

    /// The service could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// An underlying I/O error occurred.
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted settings blob could not be encoded or decoded.
    #[error("settings blob error: {0}")]
    Codec(#[from] CodecError),
}

/// One published state of the task list, or the failure that replaced it.
pub type TaskSnapshot = Result<Vec<Task>, StoreError>;

/// Persistence service for [`Task`] records.
///
/// # Invariant
///
/// Snapshots published through [`TaskStore::subscribe_all_tasks`] are
/// ordered by due date, earliest first.
pub trait TaskStore: Send + Sync {
    /// Subscribe to the full task list. The receiver holds the latest
    /// snapshot immediately.
    fn subscribe_all_tasks(&self) -> watch::Receiver<TaskSnapshot>;

    /// Fetch one task by identifier.
    fn get_by_id(
        &self,
        id: &TaskId,
    ) -> impl Future<Output = Result<Option<Task>, StoreError>> + Send;

    /// Persist a new task and return the identifier the store assigned.
    /// The incoming `id` is ignored.
    fn create(&self, task: Task) -> impl Future<Output = Result<TaskId, StoreError>> + Send;

    /// Replace an existing task, matched by identifier.
    fn update(&self, task: Task) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Remove a task, matched by identifier.
    fn delete(&self, task: &Task) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Set only the completion flag of a task.
    fn set_completion(
        &self,
        id: &TaskId,
        completed: bool,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Remove every completed task, returning how many were removed.
    fn delete_all_completed(&self) -> impl Future<Output = Result<usize, StoreError>> + Send;
}

/// Identity service: registration, sign-in, sign-out.
pub trait AuthStore: Send + Sync {
    /// Subscribe to the live session. `None` while signed out.
    fn subscribe_current_identity(&self) -> watch::Receiver<Option<Identity>>;

    /// Create an account and sign it in.
    fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Sign in to an existing account.
    fn login(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// End the current session.
    fn logout(&self) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Fetch the profile of the signed-in account, if any.
    fn fetch_current_profile(
        &self,
    ) -> impl Future<Output = Result<Option<UserProfile>, StoreError>> + Send;
}

/// On-device key-value store caching the login flag and profile fields.
///
/// The login flag, user name, and user email subscriptions are projections
/// of the single [`LoginSettings`] snapshot.
pub trait SettingsStore: Send + Sync {
    /// Subscribe to the persisted settings.
    fn subscribe_settings(&self) -> watch::Receiver<LoginSettings>;

    /// Record the outcome of a sign-in.
    fn save_login_state(
        &self,
        is_logged_in: bool,
        name: &str,
        email: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Forget everything stored about the last sign-in.
    fn clear_login_state(&self) -> impl Future<Output = Result<(), StoreError>> + Send;
}
