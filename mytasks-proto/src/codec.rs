//! Binary encoding for the on-device settings blob.
//!
//! The blob is a single version byte followed by the postcard encoding of
//! [`LoginSettings`]:
//!
//! ```text
//! [u8 version][postcard payload]
//! ```

use crate::settings::LoginSettings;

/// Current settings blob format version.
pub const SETTINGS_FORMAT_VERSION: u8 = 1;

/// Error type for codec encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// The blob is empty or was written by an unknown format version.
    #[error("invalid settings blob: {0}")]
    InvalidBlob(String),
}

/// Encodes [`LoginSettings`] into a versioned byte blob.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the settings cannot be serialized.
pub fn encode_settings(settings: &LoginSettings) -> Result<Vec<u8>, CodecError> {
    let payload =
        postcard::to_allocvec(settings).map_err(|e| CodecError::Serialization(e.to_string()))?;
    let mut blob = Vec::with_capacity(1 + payload.len());
    blob.push(SETTINGS_FORMAT_VERSION);
    blob.extend_from_slice(&payload);
    Ok(blob)
}

/// Decodes a versioned byte blob back into [`LoginSettings`].
///
/// # Errors
///
/// Returns `CodecError::InvalidBlob` if the blob is empty or carries an
/// unknown version, or `CodecError::Serialization` if the payload cannot be
/// deserialized.
pub fn decode_settings(bytes: &[u8]) -> Result<LoginSettings, CodecError> {
    let Some((&version, payload)) = bytes.split_first() else {
        return Err(CodecError::InvalidBlob("empty blob".to_string()));
    };
    if version != SETTINGS_FORMAT_VERSION {
        return Err(CodecError::InvalidBlob(format!(
            "unsupported format version {version}"
        )));
    }
    postcard::from_bytes(payload).map_err(|e| CodecError::Serialization(e.to_string()))
}
