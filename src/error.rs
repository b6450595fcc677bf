//! Error types for upstream completion calls.

use thiserror::Error;

/// Maximum number of characters from an upstream error body kept in errors and logs.
const MAX_ERROR_BODY_LEN: usize = 200;

/// Failure of a single call to the completion provider.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Rate limited by upstream: {body}")]
    RateLimited { body: String },

    #[error("Unauthorized: check the provider API key")]
    Unauthorized,

    #[error("Upstream HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Malformed upstream response: {0}")]
    Decode(String),
}

/// How a failure should be treated by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Worth one more attempt after a backoff (rate limiting).
    Transient,
    /// Retrying would not help.
    Permanent,
}

impl CompletionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RateLimited { .. } => ErrorKind::Transient,
            _ => ErrorKind::Permanent,
        }
    }

    /// Build the error for a non-success HTTP status.
    pub fn from_status(status: u16, body: &str) -> Self {
        let body = truncate_body(body);
        match status {
            401 => Self::Unauthorized,
            429 => Self::RateLimited { body },
            s => Self::Status { status: s, body },
        }
    }

    /// HTTP status reported by upstream, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RateLimited { .. } => Some(429),
            Self::Unauthorized => Some(401),
            Self::Status { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Decode(_) => None,
        }
    }
}

// Char-based so a multi-byte boundary never panics.
fn truncate_body(body: &str) -> String {
    if body.chars().count() > MAX_ERROR_BODY_LEN {
        let truncated: String = body.chars().take(MAX_ERROR_BODY_LEN).collect();
        format!("{truncated}…[truncated]")
    } else {
        body.to_string()
    }
}
