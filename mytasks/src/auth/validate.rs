//! Local credential checks run before any remote call.

use std::sync::LazyLock;

use regex::Regex;

use super::AuthFormState;

/// Minimum password length accepted at registration unless configured.
pub const DEFAULT_MIN_PASSWORD_LENGTH: usize = 6;

/// Address pattern accepted at registration: a local part, `@`, then one or
/// more dot-separated domain labels.
const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9+._%\-]{1,256}@[a-zA-Z0-9][a-zA-Z0-9\-]{0,64}(\.[a-zA-Z0-9][a-zA-Z0-9\-]{0,25})+$";

#[allow(clippy::expect_used)]
static EMAIL_ADDRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(EMAIL_PATTERN).expect("EMAIL_PATTERN is a valid regex"));

/// A credential check that failed. The display text is shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Email or password missing at sign-in.
    #[error("Please fill in all fields")]
    MissingCredentials,
    /// Name missing at registration.
    #[error("Please enter your name")]
    NameBlank,
    /// Email missing at registration.
    #[error("Please enter your email")]
    EmailBlank,
    /// Email does not look like an address.
    #[error("Please enter a valid email")]
    EmailInvalid,
    /// Password missing at registration.
    #[error("Please enter your password")]
    PasswordBlank,
    /// Password shorter than the configured minimum.
    #[error("Password must be at least {0} characters")]
    PasswordTooShort(usize),
    /// Confirmation missing.
    #[error("Please confirm your password")]
    ConfirmBlank,
    /// Password and confirmation differ.
    #[error("Passwords do not match")]
    PasswordMismatch,
}

/// Returns `true` if `email` matches the accepted address pattern.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_ADDRESS.is_match(email)
}

/// Checks the sign-in form: email and password must both be non-blank.
///
/// # Errors
///
/// Returns [`ValidationError::MissingCredentials`] if either is blank.
pub fn validate_login(form: &AuthFormState) -> Result<(), ValidationError> {
    if form.email.trim().is_empty() || form.password.trim().is_empty() {
        return Err(ValidationError::MissingCredentials);
    }
    Ok(())
}

/// Checks the registration form, stopping at the first failing rule.
///
/// Rules run in a fixed order: name, email present, email well-formed,
/// password present, password length (in characters), confirmation
/// present, confirmation matches.
///
/// # Errors
///
/// Returns the [`ValidationError`] of the first rule that fails.
pub fn validate_registration(
    form: &AuthFormState,
    min_password_length: usize,
) -> Result<(), ValidationError> {
    if form.name.trim().is_empty() {
        return Err(ValidationError::NameBlank);
    }
    if form.email.trim().is_empty() {
        return Err(ValidationError::EmailBlank);
    }
    if !is_valid_email(&form.email) {
        return Err(ValidationError::EmailInvalid);
    }
    if form.password.trim().is_empty() {
        return Err(ValidationError::PasswordBlank);
    }
    if form.password.chars().count() < min_password_length {
        return Err(ValidationError::PasswordTooShort(min_password_length));
    }
    if form.confirm_password.trim().is_empty() {
        return Err(ValidationError::ConfirmBlank);
    }
    if form.password != form.confirm_password {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(())
}
