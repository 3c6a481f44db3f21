//! Domain errors for the contact store.

use thiserror::Error;

/// Domain-level errors surfaced by repositories.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Contact not found: {0}")]
    ContactNotFound(i64),

    #[error("Tag not found: {0}")]
    TagNotFound(i64),

    #[error("Tag with name '{0}' already exists")]
    DuplicateTag(String),

    #[error("Contact with Telegram id {0} already exists")]
    DuplicateContact(i64),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        Self::DatabaseError(err.to_string())
    }
}
