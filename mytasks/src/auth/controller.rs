//! Auth controller: credential form transitions and sign-in flows.
//!
//! Flow per sign-in attempt: `Idle -> Loading -> {Authenticated, Idle+Error}`.
//! The controller never marks the user authenticated itself; that comes
//! from [`SessionView`] once the auth store and the settings store both
//! report the sign-in.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::session::spawn_session_forwarder;
use super::validate::{DEFAULT_MIN_PASSWORD_LENGTH, validate_login, validate_registration};
use super::{AuthEvent, AuthFormState, SessionView};
use crate::store::{AuthStore, SettingsStore};

/// Owns the credential form and the derived session view.
///
/// Must be created inside a Tokio runtime. The session forwarder task is
/// aborted when the controller is dropped.
pub struct AuthController<A, P> {
    auth: Arc<A>,
    settings: Arc<P>,
    state: watch::Sender<AuthFormState>,
    session: watch::Receiver<SessionView>,
    forwarder: JoinHandle<()>,
    min_password_length: usize,
}

impl<A: AuthStore, P: SettingsStore> AuthController<A, P> {
    /// Creates a controller with an empty form.
    pub fn new(auth: Arc<A>, settings: Arc<P>) -> Self {
        let (session_tx, session) = watch::channel(SessionView::default());
        let forwarder = spawn_session_forwarder(
            auth.subscribe_current_identity(),
            settings.subscribe_settings(),
            session_tx,
        );
        let (state, _rx) = watch::channel(AuthFormState::default());
        Self {
            auth,
            settings,
            state,
            session,
            forwarder,
            min_password_length: DEFAULT_MIN_PASSWORD_LENGTH,
        }
    }

    /// Sets the minimum password length enforced at registration.
    #[must_use]
    pub fn with_min_password_length(mut self, len: usize) -> Self {
        self.min_password_length = len;
        self
    }

    /// Returns a snapshot of the form.
    #[must_use]
    pub fn state(&self) -> AuthFormState {
        self.state.borrow().clone()
    }

    /// Subscribe to form changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthFormState> {
        self.state.subscribe()
    }

    /// Returns the latest session view.
    #[must_use]
    pub fn session(&self) -> SessionView {
        self.session.borrow().clone()
    }

    /// Subscribe to session changes.
    #[must_use]
    pub fn subscribe_session(&self) -> watch::Receiver<SessionView> {
        self.session.clone()
    }

    /// Combines the stores' present values directly, so a sign-in or
    /// sign-out shows as soon as [`handle`](Self::handle) returns.
    #[must_use]
    pub fn current_session(&self) -> SessionView {
        let identity = self.auth.subscribe_current_identity();
        let settings = self.settings.subscribe_settings();
        let identity = identity.borrow();
        let settings = settings.borrow();
        SessionView::combine(identity.as_ref(), &settings)
    }

    /// Returns `true` while both the remote session and the local login
    /// flag are present.
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.session.borrow().is_logged_in
    }

    /// Dispatches one intent.
    pub async fn handle(&self, event: AuthEvent) {
        match event {
            AuthEvent::UpdateEmail(email) => self.transition(|s| AuthFormState {
                email,
                ..s.clone()
            }),
            AuthEvent::UpdatePassword(password) => self.transition(|s| AuthFormState {
                password,
                ..s.clone()
            }),
            AuthEvent::UpdateName(name) => self.transition(|s| AuthFormState {
                name,
                ..s.clone()
            }),
            AuthEvent::UpdateConfirmPassword(confirm_password) => {
                self.transition(|s| AuthFormState {
                    confirm_password,
                    ..s.clone()
                });
            }
            AuthEvent::TogglePasswordVisibility => self.transition(|s| AuthFormState {
                is_password_visible: !s.is_password_visible,
                ..s.clone()
            }),
            AuthEvent::ToggleConfirmPasswordVisibility => self.transition(|s| AuthFormState {
                is_confirm_password_visible: !s.is_confirm_password_visible,
                ..s.clone()
            }),
            AuthEvent::Login => self.login().await,
            AuthEvent::Register => self.register().await,
            AuthEvent::Logout => self.logout().await,
            AuthEvent::ClearError => self.transition(|s| AuthFormState {
                error_message: None,
                ..s.clone()
            }),
        }
    }

    /// Replaces the form with `f(current)` in one step.
    fn transition(&self, f: impl FnOnce(&AuthFormState) -> AuthFormState) {
        self.state.send_modify(|state| *state = f(state));
    }

    fn start_loading(&self) {
        self.transition(|s| AuthFormState {
            is_loading: true,
            error_message: None,
            ..s.clone()
        });
    }

    fn finish_loading(&self) {
        self.transition(|s| AuthFormState {
            is_loading: false,
            ..s.clone()
        });
    }

    async fn login(&self) {
        let form = self.state();
        if let Err(e) = validate_login(&form) {
            self.transition(|s| s.failed(e.to_string()));
            return;
        }

        self.start_loading();
        let email = form.email.trim();
        if let Err(e) = self.auth.login(email, &form.password).await {
            tracing::error!(error = %e, "login failed");
            self.transition(|s| s.failed(e.to_string()));
            return;
        }

        let profile = match self.auth.fetch_current_profile().await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::error!(error = %e, "failed to fetch user profile");
                None
            }
        };
        let (name, email) = profile.map_or_else(
            || (String::new(), email.to_string()),
            |p| (p.name, p.email),
        );
        match self.settings.save_login_state(true, &name, &email).await {
            Ok(()) => {
                tracing::info!("login successful");
                self.finish_loading();
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to persist login state");
                self.transition(|s| s.failed(format!("Login failed: {e}")));
            }
        }
    }

    async fn register(&self) {
        let form = self.state();
        if let Err(e) = validate_registration(&form, self.min_password_length) {
            tracing::debug!(rule = ?e, "registration rejected locally");
            self.transition(|s| AuthFormState {
                error_message: Some(e.to_string()),
                ..s.clone()
            });
            return;
        }

        self.start_loading();
        let email = form.email.trim();
        let name = form.name.trim();
        if let Err(e) = self.auth.register(email, &form.password, name).await {
            tracing::error!(error = %e, "registration failed");
            self.transition(|s| s.failed(e.to_string()));
            return;
        }

        match self.settings.save_login_state(true, name, email).await {
            Ok(()) => {
                tracing::info!("registration successful");
                self.finish_loading();
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to persist login state");
                self.transition(|s| s.failed(format!("Registration failed: {e}")));
            }
        }
    }

    async fn logout(&self) {
        if let Err(e) = self.auth.logout().await {
            tracing::error!(error = %e, "logout failed");
            return;
        }
        match self.settings.clear_login_state().await {
            Ok(()) => tracing::info!("logout successful"),
            Err(e) => tracing::error!(error = %e, "failed to clear login state"),
        }
    }
}

impl<A, P> Drop for AuthController<A, P> {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}
