//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::domain::{DomainError, ValidationReport};

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("{0}")]
    Validation(#[from] ValidationReport),

    #[error("unknown field type: {0}")]
    UnknownFieldType(String),

    /// The schema repository failed; `action` is `load` or `save`.
    #[error("cannot {action} schema '{context}': {source}")]
    Persistence {
        action: &'static str,
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("template error: {message}")]
    Template { message: String },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("{context}: {source}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ApplicationError {
    /// The validation report, if saving was refused by the validator.
    pub fn validation_report(&self) -> Option<&ValidationReport> {
        match self {
            ApplicationError::Validation(report) => Some(report),
            _ => None,
        }
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
