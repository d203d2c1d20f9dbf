//! Account and session types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The live remote session reported by the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Account identifier issued by the auth service.
    pub uid: String,
    /// Address the account signed in with.
    pub email: String,
}

/// Profile record stored for every registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Account identifier issued by the auth service.
    pub uid: String,
    /// Display name given at registration.
    pub name: String,
    /// Registration email address.
    pub email: String,
    /// When the account was registered.
    pub created_at: DateTime<Utc>,
    /// Refreshed on every successful login.
    pub last_login_time: DateTime<Utc>,
}

impl UserProfile {
    /// The session identity for this profile.
    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity {
            uid: self.uid.clone(),
            email: self.email.clone(),
        }
    }
}
