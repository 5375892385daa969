//! Error types for the messenger core.

use thiserror::Error;

/// Result type alias for messenger operations
pub type MessengerResult<T> = Result<T, MessengerError>;

/// Domain-level error taxonomy shared by every create and delivery path.
#[derive(Debug, Error)]
pub enum MessengerError {
    /// Referenced conversation or entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Unique constraint on a business field (username, email) was violated.
    #[error("value already in use: {constraint}")]
    AlreadyExists { constraint: String },

    /// Generated identifier collided with an existing primary key.
    /// Recovered inside [`insert_with_retry`](crate::conflict::insert_with_retry),
    /// which reports each one before drawing a fresh identifier.
    #[error("identifier collision on attempt {attempt}")]
    TransientCollision { attempt: u32 },

    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    #[error("internal error: {message}")]
    Fatal { message: String },

    /// A subscriber's stream ended; never an error for the publisher.
    #[error("stream terminated: {reason}")]
    StreamTerminated { reason: String },
}

impl MessengerError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn already_exists(constraint: impl Into<String>) -> Self {
        Self::AlreadyExists {
            constraint: constraint.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal {
            message: message.into(),
        }
    }

    pub fn stream_terminated(reason: impl Into<String>) -> Self {
        Self::StreamTerminated {
            reason: reason.into(),
        }
    }
}
