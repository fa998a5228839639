//! JSON file storage for schemas: one `<data_dir>/<context>.json` per context.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::infrastructure::traits::{FileSystem, SchemaRepository};

const SCHEMA_EXTENSION: &str = "json";

pub struct FileSchemaRepository {
    fs: Arc<dyn FileSystem>,
    data_dir: PathBuf,
}

impl FileSchemaRepository {
    pub fn new(fs: Arc<dyn FileSystem>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// File holding the schema of `context`.
    pub fn path_for(&self, context: &str) -> io::Result<PathBuf> {
        validate_context(context)?;
        Ok(self
            .data_dir
            .join(context)
            .with_extension(SCHEMA_EXTENSION))
    }
}

/// Context keys become file names: ASCII alphanumerics, `-` and `_` only.
fn validate_context(context: &str) -> io::Result<()> {
    let valid = !context.is_empty()
        && context
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid context key '{}'", context),
        ))
    }
}

impl SchemaRepository for FileSchemaRepository {
    fn load(&self, context: &str) -> io::Result<Option<Vec<Value>>> {
        let path = self.path_for(context)?;
        if !self.fs.exists(&path) {
            debug!("load: no schema at {}", path.display());
            return Ok(None);
        }
        let content = self.fs.read_to_string(&path)?;
        let schema: Vec<Value> = serde_json::from_str(&content).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{}: {}", path.display(), e),
            )
        })?;
        info!("loaded {} top-level entries from {}", schema.len(), path.display());
        Ok(Some(schema))
    }

    fn save(&self, context: &str, schema: &[Value]) -> io::Result<()> {
        let path = self.path_for(context)?;
        let content = serde_json::to_string_pretty(schema)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        self.fs.ensure_parent(&path)?;
        self.fs.write_atomic(&path, &content)?;
        info!("saved {} top-level entries to {}", schema.len(), path.display());
        Ok(())
    }

    fn contexts(&self) -> io::Result<Vec<String>> {
        if !self.fs.exists(&self.data_dir) {
            return Ok(Vec::new());
        }
        let mut contexts: Vec<String> = self
            .fs
            .list_dir(&self.data_dir)?
            .into_iter()
            .filter(|p| p.extension().is_some_and(|ext| ext == SCHEMA_EXTENSION))
            .filter(|p| self.fs.is_file(p))
            .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .filter(|stem| validate_context(stem).is_ok())
            .collect();
        contexts.sort();
        Ok(contexts)
    }
}
