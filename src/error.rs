use std::path::PathBuf;

use thiserror::Error;

/// Broad error category used for user-facing handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rejected locally before any request was made.
    Validation,
    /// Authentication/authorization failure.
    Auth,
    /// Rate-limited or timed out by the server.
    RateLimited,
    /// The request itself was wrong (unknown id, bad payload).
    Client,
    /// Server-side failure.
    Server,
    /// Could not reach the server.
    Network,
    /// Response body did not match the expected shape.
    Decode,
    /// Local filesystem failure.
    Io,
    /// Refused by local workflow state (duplicate submit).
    Workflow,
}

/// Errors surfaced by the client library.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{0}")]
    Validation(String),

    #[error("{method} {path} failed with HTTP {status}")]
    Http {
        method: &'static str,
        path: String,
        status: u16,
    },

    #[error("request to {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected response from {path}: {message}")]
    Decode { path: String, message: String },

    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} is already in progress")]
    Busy(&'static str),
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) => ErrorCategory::Validation,
            Self::Http { status, .. } => classify_http_status(*status),
            Self::Transport { .. } => ErrorCategory::Network,
            Self::Decode { .. } => ErrorCategory::Decode,
            Self::Io { .. } => ErrorCategory::Io,
            Self::Busy(_) => ErrorCategory::Workflow,
        }
    }
}

/// Map HTTP status codes to error categories.
pub fn classify_http_status(status: u16) -> ErrorCategory {
    match status {
        401 | 403 => ErrorCategory::Auth,
        408 | 429 => ErrorCategory::RateLimited,
        400..=499 => ErrorCategory::Client,
        500..=599 => ErrorCategory::Server,
        _ => ErrorCategory::Network,
    }
}
