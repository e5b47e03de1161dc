//! Unified SDK error types.

use thiserror::Error;

/// Backend error code meaning the user's session is no longer valid.
///
/// When the coordinator sees this code it invokes the configured
/// session-expiry callback before returning the error.
pub const SESSION_EXPIRED_CODE: i64 = 13;

/// Top-level SDK error, as surfaced to every caller of
/// [`execute`](crate::coordinate::RequestCoordinator::execute).
#[derive(Error, Debug)]
pub enum ApiError {
    /// Network failure before a usable response: connect, DNS, timeout.
    /// Not retried by this layer.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response body was not valid JSON where JSON was expected.
    /// Transport-class: the backend never produced a usable answer.
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Structured rejection from the backend, with its numeric code when
    /// one was supplied. Codes pass through unmodified except for the
    /// session-expiry side effect on [`SESSION_EXPIRED_CODE`].
    #[error("Backend error{}: {message}", .code.map(|c| format!(" (code {})", c)).unwrap_or_default())]
    Backend { code: Option<i64>, message: String },

    /// A concurrent caller gave up waiting for the in-flight request
    /// holding the lock for this fingerprint.
    #[error("Timed out waiting for in-flight request: {key}")]
    LockTimeout { key: String },

    /// Local (de)serialization failure.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl ApiError {
    /// The backend-supplied error code, if any.
    pub fn code(&self) -> Option<i64> {
        match self {
            ApiError::Backend { code, .. } => *code,
            _ => None,
        }
    }

    /// Whether this error means the backend session must be re-established.
    pub fn is_session_expired(&self) -> bool {
        self.code() == Some(SESSION_EXPIRED_CODE)
    }
}
