//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::{EditorOptions, EditorService};
use crate::application::{ApplicationResult, FieldTypeCatalog, TemplateRegistry};
use crate::config::Settings;
use crate::infrastructure::repository::FileSchemaRepository;
use crate::infrastructure::traits::{
    Editor, EnvironmentEditor, FileSystem, RealFileSystem, SchemaRepository,
};

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Schema persistence
    pub repository: Arc<dyn SchemaRepository>,

    /// Field-type templates
    pub catalog: Arc<dyn FieldTypeCatalog>,

    /// External editor for property editing
    pub editor: Arc<dyn Editor>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> ApplicationResult<Self> {
        let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
        let catalog = TemplateRegistry::load(fs.as_ref(), settings.templates_file.as_deref())?;
        let repository = Arc::new(FileSchemaRepository::new(
            fs.clone(),
            settings.data_dir.clone(),
        ));
        let editor = Arc::new(EnvironmentEditor {
            command: settings.editor.clone(),
        });
        Ok(Self::with_deps(
            settings,
            fs,
            repository,
            Arc::new(catalog),
            editor,
        ))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        repository: Arc<dyn SchemaRepository>,
        catalog: Arc<dyn FieldTypeCatalog>,
        editor: Arc<dyn Editor>,
    ) -> Self {
        let settings = Arc::new(settings);

        Self {
            settings,
            fs,
            repository,
            catalog,
            editor,
        }
    }

    /// Open an editing session on `context`.
    pub fn editor_service(&self, context: &str) -> ApplicationResult<EditorService> {
        EditorService::open(
            context,
            self.catalog.clone(),
            self.repository.clone(),
            EditorOptions::from(self.settings.as_ref()),
        )
    }
}
