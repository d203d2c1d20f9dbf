//! Credential form state.

/// Form state owned by [`AuthController`](super::AuthController).
///
/// Replaced as a whole on every transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthFormState {
    /// Entered email address.
    pub email: String,
    /// Entered password.
    pub password: String,
    /// Entered display name (registration only).
    pub name: String,
    /// Entered password confirmation (registration only).
    pub confirm_password: String,
    /// Set while a sign-in or registration call is in flight.
    pub is_loading: bool,
    /// Message from the last failed validation or remote call.
    pub error_message: Option<String>,
    /// Whether the password is shown in clear text.
    pub is_password_visible: bool,
    /// Whether the confirmation is shown in clear text.
    pub is_confirm_password_visible: bool,
}

impl AuthFormState {
    /// This form with `message` as the error and loading finished.
    #[must_use]
    pub fn failed(&self, message: impl Into<String>) -> Self {
        Self {
            is_loading: false,
            error_message: Some(message.into()),
            ..self.clone()
        }
    }
}
