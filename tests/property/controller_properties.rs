//! Property-based tests for the controllers and their pure helpers.
//!
//! Uses proptest to verify:
//! 1. Derived views split any task list into active and completed parts.
//! 2. `ClearForm` restores the default form from any prior form.
//! 3. A blank name is reported first whatever else is wrong.
//! 4. Sign-in validation fails exactly when email or password is blank.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;

use mytasks::auth::{AuthFormState, ValidationError, validate_login, validate_registration};
use mytasks::store::memory::MemoryTaskStore;
use mytasks::tasks::{TaskController, TaskEvent, TaskFormState, TaskViews};
use mytasks_proto::task::{Task, TaskFilter, TaskId, TaskPriority};

// --- Strategies ---

fn fixed_now() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap()
}

fn arb_priority() -> impl Strategy<Value = TaskPriority> {
    prop::sample::select(TaskPriority::ALL.to_vec())
}

fn arb_time() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..4_000_000_000).prop_map(|secs| Utc.timestamp_opt(secs, 0).unwrap())
}

fn arb_task() -> impl Strategy<Value = Task> {
    (
        "[a-z0-9]{1,12}",
        ".{0,40}",
        any::<bool>(),
        arb_priority(),
        arb_time(),
    )
        .prop_map(|(id, title, completed, priority, date)| {
            let mut task = Task::new(title, "", date, priority, date);
            task.id = TaskId::new(id);
            task.is_completed = completed;
            task
        })
}

fn arb_filter() -> impl Strategy<Value = TaskFilter> {
    prop_oneof![
        Just(TaskFilter::All),
        Just(TaskFilter::Active),
        Just(TaskFilter::Completed),
    ]
}

/// Any sequence of pure form edits.
fn arb_edit() -> impl Strategy<Value = TaskEvent> {
    prop_oneof![
        ".{0,20}".prop_map(TaskEvent::UpdateTitle),
        ".{0,20}".prop_map(TaskEvent::UpdateDescription),
        arb_time().prop_map(TaskEvent::UpdateDate),
        arb_priority().prop_map(TaskEvent::UpdatePriority),
        arb_filter().prop_map(TaskEvent::SetFilter),
    ]
}

fn blank() -> impl Strategy<Value = String> {
    "[ \t]{0,4}"
}

// --- Properties ---

proptest! {
    #[test]
    fn views_partition_any_task_list(tasks in prop::collection::vec(arb_task(), 0..30)) {
        let views = TaskViews::from_tasks(tasks.clone());

        prop_assert_eq!(&views.all, &tasks);
        prop_assert_eq!(views.active.len() + views.completed.len(), tasks.len());
        prop_assert_eq!(views.active_count, views.active.len());
        prop_assert!(views.active.iter().all(|t| !t.is_completed));
        prop_assert!(views.completed.iter().all(|t| t.is_completed));

        // Both halves keep store order.
        prop_assert_eq!(views.active, TaskFilter::Active.apply(&tasks));
        prop_assert_eq!(views.completed, TaskFilter::Completed.apply(&tasks));
    }

    #[test]
    fn clear_form_restores_defaults(edits in prop::collection::vec(arb_edit(), 0..12)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let state = runtime.block_on(async {
            let ctl = TaskController::new(Arc::new(MemoryTaskStore::new())).with_clock(fixed_now);
            for edit in edits {
                ctl.handle(edit).await;
            }
            ctl.handle(TaskEvent::ClearForm).await;
            ctl.state()
        });
        prop_assert_eq!(state, TaskFormState::new(fixed_now()));
    }

    #[test]
    fn blank_name_reported_first(
        name in blank(),
        email in ".{0,30}",
        password in ".{0,12}",
        confirm in ".{0,12}",
        min in 0usize..20,
    ) {
        let form = AuthFormState {
            name,
            email,
            password,
            confirm_password: confirm,
            ..AuthFormState::default()
        };
        prop_assert_eq!(validate_registration(&form, min), Err(ValidationError::NameBlank));
    }

    #[test]
    fn login_validation_matches_blankness(email in ".{0,20}", password in ".{0,20}") {
        let form = AuthFormState {
            email: email.clone(),
            password: password.clone(),
            ..AuthFormState::default()
        };
        let missing = email.trim().is_empty() || password.trim().is_empty();
        prop_assert_eq!(validate_login(&form).is_err(), missing);
    }
}
