//! `MyTasks`: task and sign-in state controllers over pluggable stores.

pub mod auth;
pub mod config;
pub mod shell;
pub mod store;
pub mod tasks;
