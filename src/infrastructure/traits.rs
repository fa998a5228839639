//! Seams between the editor and the outside world: schema storage, the
//! filesystem used for templates and import/export, and the user's editor.

use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;

/// File access used by template loading, import/export and
/// [`FileSchemaRepository`](crate::infrastructure::FileSchemaRepository).
pub trait FileSystem: Send + Sync {
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    fn write(&self, path: &Path, content: &str) -> io::Result<()>;

    fn exists(&self, path: &Path) -> bool;

    fn is_file(&self, path: &Path) -> bool;

    /// Replace `path` in one step: either the old content or the new one
    /// is visible, never a partial write. Parent directories must exist.
    fn write_atomic(&self, path: &Path, content: &str) -> io::Result<()>;

    /// Create the directories above `path` so a schema can be written there.
    fn ensure_parent(&self, path: &Path) -> io::Result<()>;

    /// Entries of a directory, unsorted. Used to enumerate stored contexts.
    fn list_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;
}

/// Persistence collaborator for schemas, keyed by context (e.g. a post type).
pub trait SchemaRepository: Send + Sync {
    /// Load the nested schema for `context`. `None` if nothing was saved yet.
    fn load(&self, context: &str) -> io::Result<Option<Vec<Value>>>;

    /// Store the nested schema for `context`, replacing what was there.
    fn save(&self, context: &str, schema: &[Value]) -> io::Result<()>;

    /// Contexts with a stored schema, sorted.
    fn contexts(&self) -> io::Result<Vec<String>>;
}

/// Interactive editing of a node's properties or a settings file.
pub trait Editor: Send + Sync {
    /// Blocks until the user closes the file.
    fn open(&self, path: &Path) -> io::Result<()>;
}

/// Direct `std::fs` access.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        std::fs::write(path, content)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn write_atomic(&self, path: &Path, content: &str) -> io::Result<()> {
        use std::io::Write;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        // Staged in the target directory so persist() is a same-filesystem rename.
        let mut staged = tempfile::NamedTempFile::new_in(dir)?;
        staged.write_all(content.as_bytes())?;
        staged.as_file().sync_all()?;
        staged.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    fn ensure_parent(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        std::fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect()
    }
}

/// Launches the configured editor command, else $VISUAL, $EDITOR, vim.
#[derive(Debug, Default)]
pub struct EnvironmentEditor {
    /// Overrides the environment lookup when set
    pub command: Option<String>,
}

impl EnvironmentEditor {
    /// Program and leading arguments, e.g. `code --wait` → `["code", "--wait"]`.
    fn command_line(&self) -> Vec<String> {
        let configured = self
            .command
            .clone()
            .or_else(|| std::env::var("VISUAL").ok())
            .or_else(|| std::env::var("EDITOR").ok())
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| "vim".to_string());
        configured.split_whitespace().map(str::to_string).collect()
    }
}

impl Editor for EnvironmentEditor {
    fn open(&self, path: &Path) -> io::Result<()> {
        let command_line = self.command_line();
        let (program, args) = command_line
            .split_first()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty editor command"))?;

        let status = std::process::Command::new(program)
            .args(args)
            .arg(path)
            .status()?;
        if !status.success() {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("{} exited with {}", program, status),
            ));
        }
        Ok(())
    }
}
