//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::node::NodeId;
use crate::domain::rules::StructuralViolation;

/// Domain errors represent tree-editing rule violations.
/// These are independent of persistence and presentation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("{0}")]
    Structural(#[from] StructuralViolation),

    #[error("invalid node path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("tree invariant broken: {0}")]
    Inconsistent(String),
}

impl DomainError {
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// The structural violation behind this error, if any.
    pub fn violation(&self) -> Option<&StructuralViolation> {
        match self {
            DomainError::Structural(v) => Some(v),
            _ => None,
        }
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
