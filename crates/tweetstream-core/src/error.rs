//! Decode errors for single stream messages

use thiserror::Error;

/// Result type for message decoding
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Maximum number of payload bytes quoted in an error message
const PREVIEW_LEN: usize = 100;

/// Errors that can occur while turning one frame into a message
///
/// A decode error only ever affects the frame it was raised for; the
/// stream keeps going.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Payload was not valid JSON
    #[error("Invalid JSON: {source} (data: {preview})")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
        preview: String,
    },

    /// Length prefix line could not be read as a byte count
    #[error("Invalid length prefix: {0:?}")]
    InvalidLength(String),
}

impl DecodeError {
    /// Build an `InvalidJson` error quoting the start of the payload
    pub fn invalid_json(source: serde_json::Error, payload: &[u8]) -> Self {
        Self::InvalidJson {
            source,
            preview: preview(payload),
        }
    }
}

/// Lossy, truncated rendering of a payload for error messages
pub fn preview(payload: &[u8]) -> String {
    let text = String::from_utf8_lossy(payload);
    if text.chars().count() > PREVIEW_LEN {
        let cut: String = text.chars().take(PREVIEW_LEN).collect();
        format!("{}...", cut)
    } else {
        text.into_owned()
    }
}
