use thiserror::Error;

use crate::contract::ErrorKind;

/// Domain-specific errors using thiserror
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Invalid {field}: '{value}' is not a valid id")]
    InvalidId { field: &'static str, value: String },

    #[error("Validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("No fields to update")]
    EmptyUpdate,

    #[error("{message}")]
    Conflict { message: String },

    #[error("Unauthenticated: {reason}")]
    Unauthenticated { reason: String },

    #[error("{service} failure: {message}")]
    ExternalService {
        service: &'static str,
        message: String,
    },

    #[error("Database error: {message}")]
    Database { message: String },
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn invalid_id(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidId {
            field,
            value: value.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn unauthenticated(reason: impl Into<String>) -> Self {
        Self::Unauthenticated {
            reason: reason.into(),
        }
    }

    pub fn external(service: &'static str, message: impl Into<String>) -> Self {
        Self::ExternalService {
            service,
            message: message.into(),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    /// A `null` was sent for a field that cannot be cleared.
    pub fn not_nullable(field: &str) -> Self {
        Self::validation(field, "cannot be null")
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidId { .. } | Self::Validation { .. } | Self::EmptyUpdate => {
                ErrorKind::InvalidArgument
            }
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Unauthenticated { .. } => ErrorKind::Unauthenticated,
            Self::ExternalService { .. } => ErrorKind::ExternalService,
            Self::Database { .. } => ErrorKind::Internal,
        }
    }
}
