//! Sign-in, registration, and session state.
//!
//! The [`AuthController`] owns the credential form, validates it before
//! any remote call, and derives a [`SessionView`] that only reports a user
//! as logged in when the remote session and the locally persisted login
//! flag agree.

pub mod controller;
pub mod form;
pub mod session;
pub mod validate;

pub use controller::AuthController;
pub use form::AuthFormState;
pub use session::SessionView;
pub use validate::{DEFAULT_MIN_PASSWORD_LENGTH, ValidationError, validate_login, validate_registration};

/// Every intent the sign-in and registration screens can dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// Replace the email field.
    UpdateEmail(String),
    /// Replace the password field.
    UpdatePassword(String),
    /// Replace the name field.
    UpdateName(String),
    /// Replace the confirm-password field.
    UpdateConfirmPassword(String),
    /// Sign in with the entered email and password.
    Login,
    /// Create an account from the entered fields.
    Register,
    /// End the session and forget the cached login.
    Logout,
    /// Dismiss the error message.
    ClearError,
    /// Show or hide the password.
    TogglePasswordVisibility,
    /// Show or hide the confirm-password field.
    ToggleConfirmPasswordVisibility,
}
