//! Error types for the eventdesk ecosystem.

use thiserror::Error;

/// Errors that can occur in eventdesk operations.
#[derive(Error, Debug)]
pub enum EventDeskError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid event: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Remote store unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Remote store rejected the request ({status}): {message}")]
    Remote { status: u16, message: String },

    #[error("Unknown question type '{0}'")]
    UnknownType(String),

    #[error("Option index {index} is out of range (question has {len} options)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Add at least one question before saving the form")]
    EmptySchema,

    #[error("Invalid event ID '{0}'")]
    InvalidEventId(String),

    #[error("Event was created but its ID could not be determined")]
    MissingEventId,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for EventDeskError {
    fn from(e: serde_json::Error) -> Self {
        EventDeskError::Serialization(e.to_string())
    }
}

/// Result type alias for eventdesk operations.
pub type EventDeskResult<T> = Result<T, EventDeskError>;
