//! Locally persisted login state.

use serde::{Deserialize, Serialize};

/// The small key-value blob kept on-device between runs.
///
/// Mirrors what the last successful login or registration reported, so the
/// app can show the user's name before the auth service answers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginSettings {
    /// Set after a successful login or registration, cleared on logout.
    pub is_logged_in: bool,
    /// Cached display name.
    pub user_name: String,
    /// Cached email address.
    pub user_email: String,
}

impl LoginSettings {
    /// Settings recorded after a successful sign-in.
    pub fn logged_in(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            is_logged_in: true,
            user_name: name.into(),
            user_email: email.into(),
        }
    }
}
