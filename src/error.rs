//! Error types for the drafting assistant

use thiserror::Error;

/// Result type alias for drafting operations
pub type Result<T> = std::result::Result<T, DraftingError>;

#[derive(Error, Debug)]
pub enum DraftingError {

    // =============================
    // Collaborator Errors
    // =============================

    #[error("Commit failed: {0}")]
    CommitFailed(String),

    #[error("Collaborator error: {0}")]
    CollaboratorError(String),

    #[error("Transcript persistence error: {0}")]
    TranscriptError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    // =============================
    // Session Errors
    // =============================

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Session busy: {0}")]
    SessionBusy(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("UUID parse error: {0}")]
    UuidError(#[from] uuid::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
