//! Error types for the transport boundary.
//!
//! Fetch failures never cross the public engine surface — the engine folds
//! them into the `is_error` state flag (cancellations are dropped silently).
//! [`FetchError`] exists so `Fetcher` implementations and the retry loop can
//! agree on failure classes.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    /// Non-success HTTP status.
    #[error("http status {0}")]
    Status(u16),

    /// Connection-level failure (DNS, refused, timeout, TLS).
    #[error("transport error: {0}")]
    Transport(String),

    /// Response body was not the expected JSON shape.
    #[error("decode error: {0}")]
    Decode(String),
}

impl FetchError {
    /// Whether the retry loop should attempt this request again.
    ///
    /// Server errors and rate limits are transient; a malformed body or any
    /// other client-side HTTP error is terminal.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Status(code) => *code >= 500 || *code == 429,
            FetchError::Transport(_) => true,
            FetchError::Decode(_) => false,
        }
    }
}
