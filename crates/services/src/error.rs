//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::model::{AnswerError, PaperError, PhaseError};
use storage::repository::StorageError;

/// Errors emitted by the exam backend client.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    /// The backend answered `success: false` (or an error envelope).
    #[error("{message}")]
    Rejected { message: String },
    #[error("exam server responded with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("unexpected response from exam server: {0}")]
    Decode(String),
    #[error(transparent)]
    Paper(#[from] PaperError),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl ApiError {
    /// Server-unavailable style failures that are safe to retry for idempotent calls.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::HttpStatus(status) => matches!(status.as_u16(), 502..=504),
            ApiError::Http(err) => err.is_connect() || err.is_timeout(),
            _ => false,
        }
    }
}

/// Errors emitted while reading configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("invalid {var} value {raw:?}: {source}")]
    InvalidUrl {
        var: &'static str,
        raw: String,
        source: url::ParseError,
    },
    #[error("invalid {var} value {raw:?}: expected a whole number")]
    InvalidNumber { var: &'static str, raw: String },
}

/// Errors emitted by exam session services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("exam has not been started")]
    NotActive,
    #[error("exam was already started")]
    AlreadyStarted,
    #[error("exam already submitted")]
    Completed,
    #[error("another request is still in progress")]
    Busy,
    #[error("time is up; answers can no longer be changed")]
    TimeUp,
    #[error("{unanswered} unanswered question(s) need confirmation")]
    ConfirmationRequired { unanswered: usize },
    #[error(transparent)]
    Answer(#[from] AnswerError),
    #[error(transparent)]
    Phase(#[from] PhaseError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
