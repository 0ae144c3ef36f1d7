//! Error types for LLM provider calls.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("provider returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("provider response could not be parsed: {0}")]
    BadResponse(String),

    #[error("content blocked by provider: {reason}")]
    Blocked { reason: String },

    #[error("caching is disabled on this client")]
    CachingDisabled,

    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },
}

impl ClientError {
    /// Whether a retry could plausibly succeed.
    ///
    /// Hard client errors (HTTP 400 that is not a rate limit) and
    /// explicit content blocks are final; everything else is treated as
    /// transient (429, 503, timeouts, transport failures).
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Http { status, .. } => *status != 400,
            ClientError::Blocked { .. } => false,
            ClientError::CachingDisabled => false,
            ClientError::RetriesExhausted { .. } => false,
            ClientError::Transport(_) | ClientError::Timeout { .. } => true,
            ClientError::BadResponse(_) => true,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout { seconds: 0 }
        } else if let Some(status) = err.status() {
            ClientError::Http {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
