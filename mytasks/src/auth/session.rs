//! Combined login state derived from the remote session and local settings.

use tokio::sync::watch;
use tokio::task::JoinHandle;

use mytasks_proto::settings::LoginSettings;
use mytasks_proto::user::Identity;

/// What the app shows about the signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionView {
    /// `true` only while a remote session exists AND the local login flag
    /// is set.
    pub is_logged_in: bool,
    /// Cached display name from local settings.
    pub user_name: String,
    /// Cached email from local settings.
    pub user_email: String,
}

impl SessionView {
    /// Combines the two sources. A stale local flag without a live session,
    /// or a live session without the local flag, is not logged in.
    #[must_use]
    pub fn combine(identity: Option<&Identity>, settings: &LoginSettings) -> Self {
        Self {
            is_logged_in: identity.is_some() && settings.is_logged_in,
            user_name: settings.user_name.clone(),
            user_email: settings.user_email.clone(),
        }
    }
}

/// Follows both sources and republishes their combination.
///
/// The task ends when either source channel closes.
pub(crate) fn spawn_session_forwarder(
    mut identity: watch::Receiver<Option<Identity>>,
    mut settings: watch::Receiver<LoginSettings>,
    session: watch::Sender<SessionView>,
) -> JoinHandle<()> {
    session.send_replace(current(&mut identity, &mut settings));
    tokio::spawn(async move {
        loop {
            tokio::select! {
                changed = identity.changed() => if changed.is_err() { break },
                changed = settings.changed() => if changed.is_err() { break },
            }
            session.send_replace(current(&mut identity, &mut settings));
        }
        tracing::debug!("session source channel closed");
    })
}

fn current(
    identity: &mut watch::Receiver<Option<Identity>>,
    settings: &mut watch::Receiver<LoginSettings>,
) -> SessionView {
    let identity = identity.borrow_and_update();
    let settings = settings.borrow_and_update();
    let view = SessionView::combine(identity.as_ref(), &settings);
    tracing::debug!(
        remote = identity.as_ref().map(|i| i.email.as_str()),
        local = settings.is_logged_in,
        logged_in = view.is_logged_in,
        "login state"
    );
    view
}
