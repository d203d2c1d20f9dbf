//! Shared data model for `MyTasks`.

pub mod codec;
pub mod settings;
pub mod task;
pub mod user;
