//! Error types for quillbox.

use thiserror::Error;

/// Result type alias using quillbox's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for quillbox operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Note not found (or not owned by the requester)
    #[error("Note not found: {0}")]
    NoteNotFound(uuid::Uuid),

    /// Operation conflicts with in-flight state (e.g. summarization busy)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Content extraction failed (markup conversion, PDF text)
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Inference/generation failed (transport, malformed response)
    #[error("Inference error: {0}")]
    Inference(String),

    /// AI generation exceeded the per-attempt deadline
    #[error("AI generation timed out")]
    AiTimeout,

    /// AI provider rejected the request for quota/rate-limit reasons.
    /// `retry_after` carries the provider's retry-delay hint verbatim
    /// (e.g. "30s") when one was present.
    #[error("{message}")]
    AiRateLimited {
        message: String,
        retry_after: Option<String>,
    },

    /// AI service cannot be used at all (missing credential, exhausted candidates)
    #[error("AI service unavailable: {0}")]
    AiUnavailable(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Internal(format!("Serialization error: {}", e))
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        // reqwest is only used to reach the generative backend, so its
        // timeouts are AI timeouts by definition.
        if e.is_timeout() {
            Error::AiTimeout
        } else {
            Error::Inference(e.to_string())
        }
    }
}
