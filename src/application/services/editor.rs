//! Editing session over one schema context.
//!
//! Owns the tree for one context and routes every edit through the domain
//! mutator. Pending deferred reorders are committed before any other
//! structural edit and before saving.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::application::templates::FieldTypeCatalog;
use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::config::Settings;
use crate::domain::node::{LABEL_KEY, NAME_KEY};
use crate::domain::{
    CopyNaming, Direction, DropTarget, NodeId, NodePath, NodeStore, Placement, ReorderQueue,
    SchemaTransformer, SkippedEntry, TreeMutator, TreeRender, TreeValidator, ValidationReport,
};
use crate::infrastructure::traits::SchemaRepository;

/// Session knobs taken from [`Settings`].
#[derive(Debug, Clone)]
pub struct EditorOptions {
    pub naming: CopyNaming,
    pub transient_keys: Vec<String>,
    pub reorder_delay: Duration,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for EditorOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            naming: CopyNaming {
                name_suffix: settings.schema.name_copy_suffix.clone(),
                label_suffix: settings.schema.label_copy_suffix.clone(),
            },
            transient_keys: settings.schema.transient_keys.clone(),
            reorder_delay: Duration::from_millis(settings.reorder_delay_ms),
        }
    }
}

pub struct EditorService {
    context: String,
    store: NodeStore,
    skipped: Vec<SkippedEntry>,
    catalog: Arc<dyn FieldTypeCatalog>,
    repository: Arc<dyn SchemaRepository>,
    transformer: SchemaTransformer,
    naming: CopyNaming,
    reorder: ReorderQueue,
}

impl EditorService {
    /// Start a session on `context`, loading its stored schema if any.
    pub fn open(
        context: &str,
        catalog: Arc<dyn FieldTypeCatalog>,
        repository: Arc<dyn SchemaRepository>,
        options: EditorOptions,
    ) -> ApplicationResult<Self> {
        let transformer = SchemaTransformer::with_transient_keys(options.transient_keys)
            .with_field_types(catalog.templates().iter().map(|t| t.field_type.clone()));
        let mut editor = Self {
            context: context.to_string(),
            store: NodeStore::new(),
            skipped: Vec::new(),
            catalog,
            repository,
            transformer,
            naming: options.naming,
            reorder: ReorderQueue::new(options.reorder_delay),
        };
        editor.reload()?;
        Ok(editor)
    }

    /// Discard the session tree and load the stored schema again.
    pub fn reload(&mut self) -> ApplicationResult<()> {
        self.reorder.cancel_all(&mut self.store);
        let entries = self
            .repository
            .load(&self.context)
            .loading_schema(&self.context)?
            .unwrap_or_default();
        self.replace_tree(&entries);
        Ok(())
    }

    /// Replace the session tree with `entries` without saving.
    pub fn import(&mut self, entries: &[Value]) -> &[SkippedEntry] {
        self.reorder.cancel_all(&mut self.store);
        self.replace_tree(entries);
        &self.skipped
    }

    fn replace_tree(&mut self, entries: &[Value]) {
        let outcome = self.transformer.initialize(entries);
        if let Err(e) = outcome.store.verify() {
            warn!("loaded tree for '{}' is inconsistent: {}", self.context, e);
        }
        info!(
            "opened '{}': {} nodes, {} entries skipped",
            self.context,
            outcome.store.len(),
            outcome.skipped.len()
        );
        self.store = outcome.store;
        self.skipped = outcome.skipped;
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    pub fn catalog(&self) -> &dyn FieldTypeCatalog {
        self.catalog.as_ref()
    }

    /// Entries dropped by the last load or import.
    pub fn skipped(&self) -> &[SkippedEntry] {
        &self.skipped
    }

    pub fn resolve(&self, path: &NodePath) -> ApplicationResult<NodeId> {
        Ok(path.resolve(&self.store)?)
    }

    pub fn path_of(&self, id: NodeId) -> ApplicationResult<NodePath> {
        Ok(NodePath::of(&self.store, id)?)
    }

    pub fn render(&self) -> String {
        self.store.to_tree_string().to_string()
    }

    fn mutator(&mut self) -> TreeMutator<'_> {
        TreeMutator::new(&mut self.store)
            .with_naming(self.naming.clone())
            .with_property_keys(self.transformer.keys())
    }

    /// Add a node of `field_type` with template defaults and a numbered name and label.
    #[instrument(level = "debug", skip(self))]
    pub fn add(&mut self, field_type: &str, parent: Option<NodeId>) -> ApplicationResult<NodeId> {
        let template = self
            .catalog
            .template(field_type)
            .ok_or_else(|| ApplicationError::UnknownFieldType(field_type.to_string()))?;
        let mut defaults = template.defaults();
        let label = template.label.clone();

        self.flush()?;
        let (name, ordinal) = self.mutator().next_default_name(field_type);
        defaults.insert(NAME_KEY.into(), Value::String(name));
        defaults.insert(
            LABEL_KEY.into(),
            Value::String(format!("{} {}", label, ordinal)),
        );
        Ok(self.mutator().add(field_type, &defaults, parent)?)
    }

    pub fn update(&mut self, id: NodeId, props: Map<String, Value>) -> ApplicationResult<()> {
        Ok(self.mutator().update(id, props)?)
    }

    /// Replace the editable properties of a node (settings editor round trip).
    pub fn replace_properties(
        &mut self,
        id: NodeId,
        props: Map<String, Value>,
    ) -> ApplicationResult<Vec<String>> {
        Ok(self.mutator().replace_properties(id, props)?)
    }

    /// Flat property view of a node, as handed to a settings editor.
    pub fn editable_properties(&self, id: NodeId) -> ApplicationResult<Map<String, Value>> {
        let node = self.store.node(id)?;
        Ok(self.transformer.flat_entry(node))
    }

    pub fn delete(&mut self, id: NodeId) -> ApplicationResult<Vec<NodeId>> {
        self.flush()?;
        Ok(self.mutator().delete(id)?)
    }

    pub fn duplicate(&mut self, id: NodeId) -> ApplicationResult<NodeId> {
        self.flush()?;
        Ok(self.mutator().duplicate(id)?)
    }

    /// Immediate reorder.
    pub fn move_up(&mut self, id: NodeId) -> ApplicationResult<bool> {
        self.flush()?;
        Ok(self.mutator().move_up(id)?)
    }

    /// Immediate reorder.
    pub fn move_down(&mut self, id: NodeId) -> ApplicationResult<bool> {
        self.flush()?;
        Ok(self.mutator().move_down(id)?)
    }

    /// Deferred reorder: tag now, commit on a later [`tick`](Self::tick).
    pub fn request_move(
        &mut self,
        id: NodeId,
        direction: Direction,
        now: Instant,
    ) -> ApplicationResult<bool> {
        Ok(self.reorder.request(&mut self.store, id, direction, now)?)
    }

    /// Commit deferred reorders that are due at `now`.
    pub fn tick(&mut self, now: Instant) -> ApplicationResult<Vec<NodeId>> {
        Ok(self.reorder.poll(&mut self.store, now)?)
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.reorder.next_due()
    }

    /// Commit all deferred reorders now.
    pub fn flush(&mut self) -> ApplicationResult<Vec<NodeId>> {
        if self.reorder.is_empty() {
            return Ok(Vec::new());
        }
        let moved = self.reorder.flush(&mut self.store)?;
        debug!("flushed {} pending reorders", moved.len());
        Ok(moved)
    }

    pub fn reparent(&mut self, id: NodeId, target: DropTarget) -> ApplicationResult<Placement> {
        self.flush()?;
        Ok(self.mutator().reparent(id, target)?)
    }

    /// Switch a node to another known field type with that type's default settings.
    pub fn change_type(&mut self, id: NodeId, field_type: &str) -> ApplicationResult<()> {
        let settings = self
            .catalog
            .template(field_type)
            .ok_or_else(|| ApplicationError::UnknownFieldType(field_type.to_string()))?
            .settings_defaults();
        self.flush()?;
        Ok(self.mutator().change_type(id, field_type, settings)?)
    }

    pub fn validate(&self) -> Result<(), ValidationReport> {
        let required = self.catalog.required_properties();
        TreeValidator::new(&self.store, &required).validate()
    }

    /// Nested schema of the current tree.
    pub fn export(&self) -> Vec<Value> {
        self.transformer.serialize(&self.store)
    }

    /// Validate and persist. Nothing is written when validation fails, and a
    /// failed write leaves the session tree as it was.
    #[instrument(level = "debug", skip(self), fields(context = %self.context))]
    pub fn save(&mut self) -> ApplicationResult<Vec<Value>> {
        self.flush()?;
        self.validate()?;
        let schema = self.export();
        self.repository
            .save(&self.context, &schema)
            .saving_schema(&self.context)?;
        info!("saved '{}' ({} nodes)", self.context, self.store.len());
        Ok(schema)
    }

    /// End the session: pending reorders are dropped, not committed.
    pub fn teardown(mut self) {
        self.reorder.cancel_all(&mut self.store);
        debug!("teardown '{}'", self.context);
    }
}
