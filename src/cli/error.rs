//! CLI-level errors (wraps infrastructure errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::{DomainError, ValidationReport};
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("{0}")]
    Usage(String),
}

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(InfraError::Application(e))
    }
}

impl From<DomainError> for CliError {
    fn from(e: DomainError) -> Self {
        ApplicationError::from(e).into()
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) | CliError::Usage(_) => crate::exitcode::USAGE,
            CliError::Infra(e) => match e {
                InfraError::File { action: "read", source, .. }
                    if source.kind() == std::io::ErrorKind::NotFound =>
                {
                    crate::exitcode::NOINPUT
                }
                InfraError::File { .. } | InfraError::Io { .. } => crate::exitcode::IOERR,
                InfraError::Editor { .. } => crate::exitcode::SOFTWARE,
                InfraError::Application(app) => match app {
                    ApplicationError::Validation(_) => crate::exitcode::DATAERR,
                    ApplicationError::Domain(DomainError::Structural(_)) => {
                        crate::exitcode::DATAERR
                    }
                    ApplicationError::Domain(DomainError::Inconsistent(_)) => {
                        crate::exitcode::SOFTWARE
                    }
                    ApplicationError::Domain(_) | ApplicationError::UnknownFieldType(_) => {
                        crate::exitcode::USAGE
                    }
                    ApplicationError::Persistence { .. }
                    | ApplicationError::OperationFailed { .. } => crate::exitcode::IOERR,
                    ApplicationError::Template { .. } | ApplicationError::Config { .. } => {
                        crate::exitcode::CONFIG
                    }
                },
            },
        }
    }

    /// The validation report behind this error, if saving was refused.
    pub fn validation_report(&self) -> Option<&ValidationReport> {
        match self {
            CliError::Infra(InfraError::Application(app)) => app.validation_report(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{StructuralViolation, ValidationIssue};

    #[test]
    fn given_validation_failure_when_mapping_exit_code_then_dataerr() {
        let err: CliError =
            ApplicationError::Validation(ValidationReport(vec![ValidationIssue::EmptyTree])).into();
        assert_eq!(err.exit_code(), crate::exitcode::DATAERR);
        assert!(err.validation_report().is_some());
    }

    #[test]
    fn given_rejected_move_when_mapping_exit_code_then_dataerr() {
        let err: CliError = DomainError::from(StructuralViolation::root_escape()).into();
        assert_eq!(err.exit_code(), crate::exitcode::DATAERR);
    }

    #[test]
    fn given_bad_path_when_mapping_exit_code_then_usage() {
        let err: CliError = DomainError::invalid_path("9", "no entry").into();
        assert_eq!(err.exit_code(), crate::exitcode::USAGE);
    }
}
