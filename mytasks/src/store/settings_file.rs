//! Settings store persisted to a single file on disk.
//!
//! The file holds the versioned blob produced by
//! [`mytasks_proto::codec::encode_settings`]. Every save rewrites the whole
//! file through a temporary sibling and a rename, so a crash mid-write
//! leaves the previous blob intact.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::sync::{Mutex, watch};

use mytasks_proto::codec::{decode_settings, encode_settings};
use mytasks_proto::settings::LoginSettings;

use super::{SettingsStore, StoreError};

/// Settings store backed by a file.
pub struct FileSettingsStore {
    path: PathBuf,
    tx: watch::Sender<LoginSettings>,
    /// Serializes writers so renames land in call order.
    write_lock: Mutex<()>,
}

impl FileSettingsStore {
    /// Opens the store at `path`, loading any settings already saved there.
    ///
    /// A missing file starts from default (logged-out) settings. A file
    /// that cannot be decoded is logged and also treated as defaults; it is
    /// overwritten by the next save.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file exists but cannot be read.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let settings = match tokio::fs::read(&path).await {
            Ok(bytes) => decode_settings(&bytes).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "discarding unreadable settings file");
                LoginSettings::default()
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => LoginSettings::default(),
            Err(e) => return Err(StoreError::Io(e)),
        };
        tracing::debug!(path = %path.display(), logged_in = settings.is_logged_in, "settings loaded");
        let (tx, _rx) = watch::channel(settings);
        Ok(Self {
            path,
            tx,
            write_lock: Mutex::new(()),
        })
    }

    /// Returns the path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `settings` to disk, then publishes them.
    async fn persist(&self, settings: LoginSettings) -> Result<(), StoreError> {
        let blob = encode_settings(&settings)?;
        let _guard = self.write_lock.lock().await;
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &blob).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        self.tx.send_replace(settings);
        Ok(())
    }
}

impl SettingsStore for FileSettingsStore {
    fn subscribe_settings(&self) -> watch::Receiver<LoginSettings> {
        self.tx.subscribe()
    }

    async fn save_login_state(
        &self,
        is_logged_in: bool,
        name: &str,
        email: &str,
    ) -> Result<(), StoreError> {
        self.persist(LoginSettings {
            is_logged_in,
            user_name: name.to_string(),
            user_email: email.to_string(),
        })
        .await
    }

    async fn clear_login_state(&self) -> Result<(), StoreError> {
        self.persist(LoginSettings::default()).await
    }
}
