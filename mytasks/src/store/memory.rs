//! In-memory stores.
//!
//! Each store keeps its records behind a [`parking_lot::Mutex`] and
//! publishes every change through a [`tokio::sync::watch`] channel, so any
//! number of controllers can share one instance via `Arc`. The lock is never
//! held across an `.await`.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use mytasks_proto::settings::LoginSettings;
use mytasks_proto::task::{Task, TaskId};
use mytasks_proto::user::{Identity, UserProfile};

use super::{AuthStore, SettingsStore, StoreError, TaskSnapshot, TaskStore};

/// Message reported when registering an address that already has an account.
pub const EMAIL_IN_USE: &str = "The email address is already in use by another account.";

/// Message reported when signing in to an address with no account.
pub const NO_SUCH_USER: &str = "There is no user record corresponding to this identifier.";

/// Message reported when the password does not match the account.
pub const WRONG_PASSWORD: &str = "The password is invalid.";

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

/// Owner key of the single list kept by an unscoped store.
const LOCAL_OWNER: &str = "local";

/// Where a task store learns whose list to serve.
enum Owner {
    /// One list, always available.
    Local,
    /// The signed-in account's uid, read from the auth identity channel.
    Session(watch::Receiver<Option<Identity>>),
}

impl Owner {
    fn current(&self) -> Option<String> {
        match self {
            Self::Local => Some(LOCAL_OWNER.to_string()),
            Self::Session(identity) => identity.borrow().as_ref().map(|i| i.uid.clone()),
        }
    }
}

/// Task lists keyed by owner, plus the owner of the last published snapshot.
#[derive(Default)]
struct Lists {
    by_owner: HashMap<String, Vec<Task>>,
    published: Option<String>,
}

/// Task store held entirely in memory.
///
/// Tasks belong to an owner. A store built with [`per_user`](Self::per_user)
/// serves the signed-in account's list: while nobody is signed in the
/// snapshot is empty, reads find nothing and writes do nothing. The
/// snapshot is republished whenever the signed-in account changes.
///
/// Identifiers are assigned on [`create`](TaskStore::create) as UUID v7
/// strings. Writes addressed to a blank or unknown identifier are ignored.
pub struct MemoryTaskStore {
    lists: Mutex<Lists>,
    owner: Owner,
    tx: watch::Sender<TaskSnapshot>,
    follower: Mutex<Option<JoinHandle<()>>>,
}

impl Default for MemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTaskStore {
    /// Creates an empty single-owner store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_tasks(Vec::new())
    }

    /// Creates a single-owner store pre-loaded with `tasks`, keeping their
    /// identifiers.
    #[must_use]
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let lists = Lists {
            by_owner: HashMap::from([(LOCAL_OWNER.to_string(), tasks.clone())]),
            published: Some(LOCAL_OWNER.to_string()),
        };
        let (tx, _rx) = watch::channel(Ok(sorted_by_due_date(tasks)));
        Self {
            lists: Mutex::new(lists),
            owner: Owner::Local,
            tx,
            follower: Mutex::new(None),
        }
    }

    /// Creates a store that keeps one list per account and serves the one
    /// named by `identity`.
    ///
    /// Must be called inside a Tokio runtime: a background task republishes
    /// the snapshot when the identity changes. It stops with the store.
    #[must_use]
    pub fn per_user(identity: watch::Receiver<Option<Identity>>) -> Arc<Self> {
        let (tx, _rx) = watch::channel(Ok(Vec::new()));
        let store = Arc::new(Self {
            lists: Mutex::new(Lists::default()),
            owner: Owner::Session(identity.clone()),
            tx,
            follower: Mutex::new(None),
        });
        store.sync_owner();
        let follower = spawn_owner_follower(identity, Arc::downgrade(&store));
        *store.follower.lock() = Some(follower);
        store
    }

    /// Returns the number of tasks the current owner holds.
    #[must_use]
    pub fn len(&self) -> usize {
        let Some(owner) = self.owner.current() else {
            return 0;
        };
        self.lists.lock().by_owner.get(&owner).map_or(0, Vec::len)
    }

    /// Returns `true` if the current owner holds no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs `f` against the current owner's list and publishes the result.
    /// Returns `None` without running `f` while nobody is signed in.
    fn mutate<R>(&self, f: impl FnOnce(&mut Vec<Task>) -> R) -> Option<R> {
        let owner = self.owner.current();
        let mut lists = self.lists.lock();
        let result = owner
            .as_ref()
            .map(|uid| f(lists.by_owner.entry(uid.clone()).or_default()));
        self.publish(&mut lists, owner);
        result
    }

    /// Republishes if the owner changed since the last snapshot.
    fn sync_owner(&self) {
        let owner = self.owner.current();
        let mut lists = self.lists.lock();
        if lists.published != owner {
            tracing::debug!(owner = owner.as_deref(), "task list owner changed");
            self.publish(&mut lists, owner);
        }
    }

    fn publish(&self, lists: &mut Lists, owner: Option<String>) {
        let snapshot = owner
            .as_ref()
            .and_then(|uid| lists.by_owner.get(uid))
            .map_or_else(Vec::new, |tasks| sorted_by_due_date(tasks.clone()));
        lists.published = owner;
        self.tx.send_replace(Ok(snapshot));
    }
}

impl Drop for MemoryTaskStore {
    fn drop(&mut self) {
        if let Some(follower) = self.follower.get_mut().take() {
            follower.abort();
        }
    }
}

/// Republishes the store's snapshot on every identity change. Ends when the
/// store is dropped or the identity channel closes.
fn spawn_owner_follower(
    mut identity: watch::Receiver<Option<Identity>>,
    store: Weak<MemoryTaskStore>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while identity.changed().await.is_ok() {
            let Some(store) = store.upgrade() else {
                break;
            };
            store.sync_owner();
        }
        tracing::debug!("task owner follower stopped");
    })
}

/// Orders tasks by due date, then by creation time.
fn sorted_by_due_date(mut tasks: Vec<Task>) -> Vec<Task> {
    tasks.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
    tasks
}

impl TaskStore for MemoryTaskStore {
    fn subscribe_all_tasks(&self) -> watch::Receiver<TaskSnapshot> {
        self.sync_owner();
        self.tx.subscribe()
    }

    async fn get_by_id(&self, id: &TaskId) -> Result<Option<Task>, StoreError> {
        let Some(owner) = self.owner.current() else {
            return Ok(None);
        };
        let lists = self.lists.lock();
        let found = lists
            .by_owner
            .get(&owner)
            .and_then(|tasks| tasks.iter().find(|t| t.id == *id))
            .cloned();
        Ok(found)
    }

    async fn create(&self, mut task: Task) -> Result<TaskId, StoreError> {
        let id = TaskId::generate();
        task.id = id.clone();
        if self.mutate(|tasks| tasks.push(task)).is_none() {
            tracing::warn!("task not created: nobody signed in");
            return Ok(TaskId::unassigned());
        }
        Ok(id)
    }

    async fn update(&self, task: Task) -> Result<(), StoreError> {
        if task.id.is_blank() {
            return Ok(());
        }
        self.mutate(|tasks| {
            if let Some(slot) = tasks.iter_mut().find(|t| t.id == task.id) {
                *slot = task;
            }
        });
        Ok(())
    }

    async fn delete(&self, task: &Task) -> Result<(), StoreError> {
        if task.id.is_blank() {
            return Ok(());
        }
        self.mutate(|tasks| tasks.retain(|t| t.id != task.id));
        Ok(())
    }

    async fn set_completion(&self, id: &TaskId, completed: bool) -> Result<(), StoreError> {
        if id.is_blank() {
            return Ok(());
        }
        let now = Utc::now();
        self.mutate(|tasks| {
            if let Some(task) = tasks.iter_mut().find(|t| t.id == *id) {
                task.is_completed = completed;
                task.updated_at = now;
            }
        });
        Ok(())
    }

    async fn delete_all_completed(&self) -> Result<usize, StoreError> {
        let removed = self.mutate(|tasks| {
            let before = tasks.len();
            tasks.retain(|t| !t.is_completed);
            before - tasks.len()
        });
        Ok(removed.unwrap_or(0))
    }
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

/// A registered account.
struct Account {
    password: String,
    profile: UserProfile,
}

/// Auth service held entirely in memory.
///
/// Accounts are keyed by lowercase email. Registering signs the new account
/// in, matching hosted identity services.
pub struct MemoryAuthStore {
    accounts: Mutex<HashMap<String, Account>>,
    identity: watch::Sender<Option<Identity>>,
}

impl Default for MemoryAuthStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAuthStore {
    /// Creates a store with no accounts and no session.
    #[must_use]
    pub fn new() -> Self {
        let (identity, _rx) = watch::channel(None);
        Self {
            accounts: Mutex::new(HashMap::new()),
            identity,
        }
    }

    /// Returns the identity of the current session, if any.
    #[must_use]
    pub fn current_identity(&self) -> Option<Identity> {
        self.identity.borrow().clone()
    }

    /// Drops the session without going through [`AuthStore::logout`], as
    /// when a remote session expires.
    pub fn expire_session(&self) {
        self.identity.send_replace(None);
    }
}

impl AuthStore for MemoryAuthStore {
    fn subscribe_current_identity(&self) -> watch::Receiver<Option<Identity>> {
        self.identity.subscribe()
    }

    async fn register(&self, email: &str, password: &str, name: &str) -> Result<(), StoreError> {
        let key = email.to_lowercase();
        let now = Utc::now();
        let profile = UserProfile {
            uid: uuid::Uuid::now_v7().to_string(),
            name: name.to_string(),
            email: email.to_string(),
            created_at: now,
            last_login_time: now,
        };
        let identity = profile.identity();
        {
            let mut accounts = self.accounts.lock();
            if accounts.contains_key(&key) {
                return Err(StoreError::Rejected(EMAIL_IN_USE.to_string()));
            }
            accounts.insert(
                key,
                Account {
                    password: password.to_string(),
                    profile,
                },
            );
        }
        self.identity.send_replace(Some(identity));
        Ok(())
    }

    async fn login(&self, email: &str, password: &str) -> Result<(), StoreError> {
        let identity = {
            let mut accounts = self.accounts.lock();
            let account = accounts
                .get_mut(&email.to_lowercase())
                .ok_or_else(|| StoreError::Rejected(NO_SUCH_USER.to_string()))?;
            if account.password != password {
                return Err(StoreError::Rejected(WRONG_PASSWORD.to_string()));
            }
            account.profile.last_login_time = Utc::now();
            account.profile.identity()
        };
        self.identity.send_replace(Some(identity));
        Ok(())
    }

    async fn logout(&self) -> Result<(), StoreError> {
        self.identity.send_replace(None);
        Ok(())
    }

    async fn fetch_current_profile(&self) -> Result<Option<UserProfile>, StoreError> {
        let Some(identity) = self.current_identity() else {
            return Ok(None);
        };
        Ok(self
            .accounts
            .lock()
            .values()
            .find(|a| a.profile.uid == identity.uid)
            .map(|a| a.profile.clone()))
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Settings store that forgets everything when dropped.
pub struct MemorySettingsStore {
    tx: watch::Sender<LoginSettings>,
}

impl Default for MemorySettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySettingsStore {
    /// Creates a store holding default (logged-out) settings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_settings(LoginSettings::default())
    }

    /// Creates a store pre-loaded with `settings`.
    #[must_use]
    pub fn with_settings(settings: LoginSettings) -> Self {
        let (tx, _rx) = watch::channel(settings);
        Self { tx }
    }

    /// Returns the current settings.
    #[must_use]
    pub fn current(&self) -> LoginSettings {
        self.tx.borrow().clone()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn subscribe_settings(&self) -> watch::Receiver<LoginSettings> {
        self.tx.subscribe()
    }

    async fn save_login_state(
        &self,
        is_logged_in: bool,
        name: &str,
        email: &str,
    ) -> Result<(), StoreError> {
        self.tx.send_replace(LoginSettings {
            is_logged_in,
            user_name: name.to_string(),
            user_email: email.to_string(),
        });
        Ok(())
    }

    async fn clear_login_state(&self) -> Result<(), StoreError> {
        self.tx.send_replace(LoginSettings::default());
        Ok(())
    }
}
