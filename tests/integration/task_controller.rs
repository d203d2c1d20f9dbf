//! Integration tests for the task controller against a recording store.
//!
//! The store logs every call it receives, can be told to fail reads or
//! writes, and lets the test push snapshots directly.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::similar_names,
    clippy::redundant_clone
)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use tokio::sync::watch;

use mytasks::store::{StoreError, TaskSnapshot, TaskStore};
use mytasks::tasks::{TaskController, TaskEvent, TaskFormState};
use mytasks_proto::task::{Task, TaskFilter, TaskId, TaskPriority};

// ---------------------------------------------------------------------------
// Recording store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    GetById(TaskId),
    Create(Task),
    Update(Task),
    Delete(TaskId),
    SetCompletion(TaskId, bool),
    DeleteAllCompleted,
}

struct RecordingTaskStore {
    calls: Mutex<Vec<Call>>,
    records: Mutex<HashMap<TaskId, Task>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    fail_deletes: Mutex<HashSet<TaskId>>,
    feed: watch::Sender<TaskSnapshot>,
}

impl RecordingTaskStore {
    fn new() -> Self {
        let (feed, _rx) = watch::channel(Ok(Vec::new()));
        Self {
            calls: Mutex::new(Vec::new()),
            records: Mutex::new(HashMap::new()),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            fail_deletes: Mutex::new(HashSet::new()),
            feed,
        }
    }

    fn with_record(self, task: Task) -> Self {
        self.records.lock().insert(task.id.clone(), task);
        self
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    fn publish(&self, snapshot: TaskSnapshot) {
        self.feed.send_replace(snapshot);
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    fn write_result(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("network down".to_string()))
        } else {
            Ok(())
        }
    }
}

impl TaskStore for RecordingTaskStore {
    fn subscribe_all_tasks(&self) -> watch::Receiver<TaskSnapshot> {
        self.feed.subscribe()
    }

    async fn get_by_id(&self, id: &TaskId) -> Result<Option<Task>, StoreError> {
        self.record(Call::GetById(id.clone()));
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("network down".to_string()));
        }
        Ok(self.records.lock().get(id).cloned())
    }

    async fn create(&self, task: Task) -> Result<TaskId, StoreError> {
        self.record(Call::Create(task));
        self.write_result().map(|()| TaskId::new("created-1"))
    }

    async fn update(&self, task: Task) -> Result<(), StoreError> {
        self.record(Call::Update(task));
        self.write_result()
    }

    async fn delete(&self, task: &Task) -> Result<(), StoreError> {
        self.record(Call::Delete(task.id.clone()));
        if self.fail_deletes.lock().contains(&task.id) {
            return Err(StoreError::Rejected("permission denied".to_string()));
        }
        self.write_result()
    }

    async fn set_completion(&self, id: &TaskId, completed: bool) -> Result<(), StoreError> {
        self.record(Call::SetCompletion(id.clone(), completed));
        self.write_result()
    }

    async fn delete_all_completed(&self) -> Result<usize, StoreError> {
        self.record(Call::DeleteAllCompleted);
        Ok(0)
    }
}

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

fn fixed_now() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap()
}

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

/// Creates a stored task with an assigned id.
fn make_task(id: &str, title: &str, completed: bool) -> Task {
    let mut task = Task::new(title, "notes", at(1_000), TaskPriority::Low, at(500));
    task.id = TaskId::new(id);
    task.is_completed = completed;
    task
}

fn make_controller(
    store: RecordingTaskStore,
) -> (Arc<RecordingTaskStore>, TaskController<RecordingTaskStore>) {
    let store = Arc::new(store);
    let ctl = TaskController::new(Arc::clone(&store)).with_clock(fixed_now);
    (store, ctl)
}

fn default_form() -> TaskFormState {
    TaskFormState::new(fixed_now())
}

// ===========================================================================
// Saving
// ===========================================================================

#[tokio::test]
async fn blank_title_save_makes_no_store_call() {
    let (store, ctl) = make_controller(RecordingTaskStore::new());
    ctl.handle(TaskEvent::UpdateTitle("   ".into())).await;
    ctl.handle(TaskEvent::SaveTask).await;

    assert!(store.calls().is_empty());
    assert_eq!(ctl.state().title, "   ");
    assert!(!ctl.state().is_editing);
}

#[tokio::test]
async fn blank_title_save_while_editing_keeps_editing() {
    let (store, ctl) =
        make_controller(RecordingTaskStore::new().with_record(make_task("t1", "Old", false)));
    ctl.handle(TaskEvent::LoadTask(Some(TaskId::new("t1")))).await;
    ctl.handle(TaskEvent::UpdateTitle(String::new())).await;
    ctl.handle(TaskEvent::SaveTask).await;

    assert_eq!(store.calls(), vec![Call::GetById(TaskId::new("t1"))]);
    assert!(ctl.state().is_editing);
}

#[tokio::test]
async fn fresh_form_save_creates_task() {
    let (store, ctl) = make_controller(RecordingTaskStore::new());
    ctl.handle(TaskEvent::UpdateTitle("Buy milk".into())).await;
    ctl.handle(TaskEvent::SaveTask).await;

    let calls = store.calls();
    assert_eq!(calls.len(), 1);
    let Call::Create(task) = &calls[0] else {
        panic!("expected create, got {calls:?}");
    };
    assert_eq!(task.title, "Buy milk");
    assert_eq!(task.description, "");
    assert!(!task.is_completed);
    assert!(task.id.is_blank());
    assert_eq!(task.priority, TaskPriority::Medium);
    assert_eq!(task.created_at, fixed_now());
    assert_eq!(task.updated_at, fixed_now());
    assert_eq!(ctl.state(), default_form());
}

#[tokio::test]
async fn create_trims_title_and_description() {
    let (store, ctl) = make_controller(RecordingTaskStore::new());
    ctl.handle(TaskEvent::UpdateTitle("  Call mom  ".into())).await;
    ctl.handle(TaskEvent::UpdateDescription("\tabout dinner \n".into()))
        .await;
    ctl.handle(TaskEvent::UpdatePriority(TaskPriority::Urgent))
        .await;
    ctl.handle(TaskEvent::UpdateDate(at(2_000_000))).await;
    ctl.handle(TaskEvent::SaveTask).await;

    let calls = store.calls();
    let Call::Create(task) = &calls[0] else {
        panic!("expected create, got {calls:?}");
    };
    assert_eq!(task.title, "Call mom");
    assert_eq!(task.description, "about dinner");
    assert_eq!(task.priority, TaskPriority::Urgent);
    assert_eq!(task.date, at(2_000_000));
}

#[tokio::test]
async fn editing_save_updates_merged_copy() {
    let original = make_task("t1", "Old", true);
    let (store, ctl) = make_controller(RecordingTaskStore::new().with_record(original.clone()));
    ctl.handle(TaskEvent::LoadTask(Some(TaskId::new("t1")))).await;

    let loaded = ctl.state();
    assert!(loaded.is_editing);
    assert_eq!(loaded.title, "Old");
    assert_eq!(loaded.description, "notes");
    assert_eq!(loaded.priority, TaskPriority::Low);
    assert_eq!(loaded.date, at(1_000));
    assert_eq!(loaded.current_task.as_ref(), Some(&original));

    ctl.handle(TaskEvent::UpdateTitle(" New ".into())).await;
    ctl.handle(TaskEvent::UpdatePriority(TaskPriority::High)).await;
    ctl.handle(TaskEvent::SaveTask).await;

    let calls = store.calls();
    assert_eq!(calls.len(), 2);
    let Call::Update(task) = &calls[1] else {
        panic!("expected update, got {calls:?}");
    };
    assert_eq!(task.id, TaskId::new("t1"));
    assert_eq!(task.title, "New");
    assert_eq!(task.priority, TaskPriority::High);
    assert!(task.is_completed);
    assert_eq!(task.created_at, original.created_at);
    assert_eq!(task.updated_at, fixed_now());
    assert_eq!(ctl.state(), default_form());
}

#[tokio::test]
async fn write_failure_still_resets_form() {
    let store = RecordingTaskStore::new();
    store.fail_writes.store(true, Ordering::SeqCst);
    let (store, ctl) = make_controller(store);

    ctl.handle(TaskEvent::UpdateTitle("Buy milk".into())).await;
    ctl.handle(TaskEvent::SaveTask).await;

    assert_eq!(store.calls().len(), 1);
    assert_eq!(ctl.state(), default_form());
}

#[tokio::test]
async fn save_resets_filter_with_form() {
    let (_store, ctl) = make_controller(RecordingTaskStore::new());
    ctl.handle(TaskEvent::SetFilter(TaskFilter::Completed)).await;
    ctl.handle(TaskEvent::UpdateTitle("x".into())).await;
    ctl.handle(TaskEvent::SaveTask).await;
    assert_eq!(ctl.state().filter, TaskFilter::All);
}

// ===========================================================================
// Loading
// ===========================================================================

#[tokio::test]
async fn load_unknown_id_resets_form() {
    let (store, ctl) = make_controller(RecordingTaskStore::new());
    ctl.handle(TaskEvent::UpdateTitle("draft".into())).await;
    ctl.handle(TaskEvent::LoadTask(Some(TaskId::new("abc")))).await;

    assert_eq!(store.calls(), vec![Call::GetById(TaskId::new("abc"))]);
    assert_eq!(ctl.state(), default_form());
    assert!(!ctl.state().is_editing);
}

#[tokio::test]
async fn load_error_resets_form() {
    let store = RecordingTaskStore::new().with_record(make_task("t1", "Old", false));
    store.fail_reads.store(true, Ordering::SeqCst);
    let (_store, ctl) = make_controller(store);

    ctl.handle(TaskEvent::LoadTask(Some(TaskId::new("t1")))).await;
    assert_eq!(ctl.state(), default_form());
}

#[tokio::test]
async fn load_without_id_makes_no_call() {
    let (store, ctl) = make_controller(RecordingTaskStore::new());
    ctl.handle(TaskEvent::LoadTask(None)).await;
    ctl.handle(TaskEvent::LoadTask(Some(TaskId::new("")))).await;
    assert!(store.calls().is_empty());
    assert_eq!(ctl.state(), default_form());
}

// ===========================================================================
// Direct writes
// ===========================================================================

#[tokio::test]
async fn toggle_completion_is_one_call_without_fetch() {
    let (store, ctl) = make_controller(RecordingTaskStore::new());
    ctl.handle(TaskEvent::ToggleTaskCompletion {
        id: TaskId::new("t1"),
        completed: true,
    })
    .await;

    assert_eq!(
        store.calls(),
        vec![Call::SetCompletion(TaskId::new("t1"), true)]
    );
}

#[tokio::test]
async fn delete_task_leaves_form_alone() {
    let (store, ctl) = make_controller(RecordingTaskStore::new());
    ctl.handle(TaskEvent::UpdateTitle("draft".into())).await;
    ctl.handle(TaskEvent::DeleteTask(make_task("t9", "gone", false)))
        .await;

    assert_eq!(store.calls(), vec![Call::Delete(TaskId::new("t9"))]);
    assert_eq!(ctl.state().title, "draft");
}

#[tokio::test]
async fn failed_toggle_is_swallowed() {
    let store = RecordingTaskStore::new();
    store.fail_writes.store(true, Ordering::SeqCst);
    let (store, ctl) = make_controller(store);
    let before = ctl.state();

    ctl.handle(TaskEvent::ToggleTaskCompletion {
        id: TaskId::new("t1"),
        completed: false,
    })
    .await;

    assert_eq!(store.calls().len(), 1);
    assert_eq!(ctl.state(), before);
}

// ===========================================================================
// Views
// ===========================================================================

#[tokio::test]
async fn clear_completed_deletes_each_completed_task_from_view() {
    let (store, ctl) = make_controller(RecordingTaskStore::new());
    store.publish(Ok(vec![
        make_task("a", "a", true),
        make_task("b", "b", false),
        make_task("c", "c", true),
    ]));
    let mut views = ctl.subscribe_views();
    views.wait_for(|v| v.all.len() == 3).await.unwrap();

    ctl.handle(TaskEvent::ClearCompleted).await;

    assert_eq!(
        store.calls(),
        vec![Call::Delete(TaskId::new("a")), Call::Delete(TaskId::new("c"))]
    );
}

#[tokio::test]
async fn clear_completed_continues_past_failures() {
    let (store, ctl) = make_controller(RecordingTaskStore::new());
    store.fail_deletes.lock().insert(TaskId::new("a"));
    store.publish(Ok(vec![make_task("a", "a", true), make_task("c", "c", true)]));
    let mut views = ctl.subscribe_views();
    views.wait_for(|v| v.completed.len() == 2).await.unwrap();

    ctl.handle(TaskEvent::ClearCompleted).await;

    assert_eq!(
        store.calls(),
        vec![Call::Delete(TaskId::new("a")), Call::Delete(TaskId::new("c"))]
    );
}

#[tokio::test]
async fn views_partition_latest_snapshot() {
    let (store, ctl) = make_controller(RecordingTaskStore::new());
    store.publish(Ok(vec![
        make_task("a", "a", false),
        make_task("b", "b", true),
        make_task("c", "c", false),
    ]));
    let mut views = ctl.subscribe_views();
    let latest = views.wait_for(|v| v.all.len() == 3).await.unwrap().clone();

    assert_eq!(latest.active_count, 2);
    assert_eq!(latest.active.len(), 2);
    assert_eq!(latest.completed.len(), 1);
    assert_eq!(latest.completed[0].id, TaskId::new("b"));

    ctl.handle(TaskEvent::SetFilter(TaskFilter::Active)).await;
    let visible: Vec<_> = ctl.visible_tasks().into_iter().map(|t| t.id).collect();
    assert_eq!(visible, vec![TaskId::new("a"), TaskId::new("c")]);
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn subscription_error_degrades_to_empty_views() {
    let (store, ctl) = make_controller(RecordingTaskStore::new());
    let mut views = ctl.subscribe_views();

    store.publish(Ok(vec![make_task("a", "a", false)]));
    views.wait_for(|v| v.all.len() == 1).await.unwrap();

    store.publish(Err(StoreError::Unavailable("offline".to_string())));
    let degraded = views.wait_for(|v| v.all.is_empty()).await.unwrap().clone();
    assert_eq!(degraded.active_count, 0);
    assert!(degraded.completed.is_empty());

    store.publish(Ok(vec![make_task("b", "b", true)]));
    let recovered = views.wait_for(|v| v.all.len() == 1).await.unwrap().clone();
    assert_eq!(recovered.completed.len(), 1);
}

#[tokio::test]
async fn dropping_controller_stops_following_store() {
    let (store, ctl) = make_controller(RecordingTaskStore::new());
    assert!(store.feed.receiver_count() > 0);
    drop(ctl);

    tokio::time::timeout(Duration::from_secs(1), store.feed.closed())
        .await
        .expect("forwarder should release its subscription");
}
