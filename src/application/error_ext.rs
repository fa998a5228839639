//! Lifting repository and file I/O failures into `ApplicationError`.

use std::io;
use std::path::Path;

use crate::application::{ApplicationError, ApplicationResult};

/// Attach schema-editing context to a failed I/O call.
pub trait IoResultExt<T> {
    /// Failure while reading a file the editor depends on (templates, imports).
    ///
    /// ```ignore
    /// fs.read_to_string(&path).with_path_context("read templates", &path)?;
    /// ```
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T>;

    /// Failure of the schema repository while loading `context`.
    fn loading_schema(self, context: &str) -> ApplicationResult<T>;

    /// Failure of the schema repository while storing `context`.
    fn saving_schema(self, context: &str) -> ApplicationResult<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::OperationFailed {
            context: format!("{} {}", action, path.display()),
            source: Box::new(e),
        })
    }

    fn loading_schema(self, context: &str) -> ApplicationResult<T> {
        self.map_err(|source| persistence("load", context, source))
    }

    fn saving_schema(self, context: &str) -> ApplicationResult<T> {
        self.map_err(|source| persistence("save", context, source))
    }
}

fn persistence(action: &'static str, context: &str, source: io::Error) -> ApplicationError {
    ApplicationError::Persistence {
        action,
        context: context.to_string(),
        source,
    }
}
