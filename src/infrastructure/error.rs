//! Errors raised at the process boundary: files the CLI touches directly
//! and the external editor it launches.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::application::ApplicationError;

#[derive(Error, Debug)]
pub enum InfraError {
    #[error("{0}")]
    Application(#[from] ApplicationError),

    /// Reading or writing an import, export, or config file.
    #[error("cannot {action} {}: {source}", path.display())]
    File {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing to the terminal or listing the data directory.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// The external editor could not be started or exited non-zero.
    #[error("editing {} failed: {source}", path.display())]
    Editor {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl InfraError {
    pub fn file(action: &'static str, path: &Path, source: io::Error) -> Self {
        Self::File {
            action,
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn editor(path: &Path, source: io::Error) -> Self {
        Self::Editor {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type InfraResult<T> = Result<T, InfraError>;
