//! Node records stored in the arena.

use std::collections::BTreeSet;
use std::fmt;

use generational_arena::Index;
use serde_json::{Map, Value};
use tracing::warn;

/// Property key holding the field type discriminator.
pub const FIELD_TYPE_KEY: &str = "fieldType";
/// Property key of the logical field name.
pub const NAME_KEY: &str = "name";
/// Property key of the human label.
pub const LABEL_KEY: &str = "fieldLabel";
/// Key of the nested child array in the persisted schema.
pub const FIELDS_KEY: &str = "fields";
/// Shared bucket for advanced options.
pub const ADVANCED_KEY: &str = "advanced_options";
/// Shared bucket for visibility conditions.
pub const CONDITIONS_KEY: &str = "visibility_conditions";
/// Suffix of the per-type settings bucket, e.g. `text_settings`.
pub const TYPE_BUCKET_SUFFIX: &str = "_settings";

/// Keys that describe tree structure and never become node properties.
const STRUCTURAL_KEYS: [&str; 5] = ["id", "parentId", "children", FIELDS_KEY, FIELD_TYPE_KEY];

/// Keys that get special treatment when a property map is merged onto a node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyKeys {
    transient: Vec<String>,
    field_types: BTreeSet<String>,
}

impl PropertyKeys {
    pub const EMPTY: Self = Self {
        transient: Vec::new(),
        field_types: BTreeSet::new(),
    };

    /// Session-only UI keys (expansion flags and the like) that are never stored.
    pub fn new(transient: Vec<String>) -> Self {
        Self {
            transient,
            field_types: BTreeSet::new(),
        }
    }

    /// Field types whose `<type>_settings` key is a settings bucket. Without
    /// this list every `*_settings` key is taken for one.
    pub fn with_field_types<I, S>(mut self, field_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.field_types = field_types.into_iter().map(Into::into).collect();
        self
    }

    pub fn transient(&self) -> &[String] {
        &self.transient
    }

    pub fn is_transient(&self, key: &str) -> bool {
        self.transient.iter().any(|t| t == key)
    }

    /// True for the settings bucket of a field type, e.g. `select_settings`.
    pub fn is_type_bucket(&self, key: &str) -> bool {
        match key.strip_suffix(TYPE_BUCKET_SUFFIX) {
            Some(field_type) if !field_type.is_empty() => {
                self.field_types.is_empty() || self.field_types.contains(field_type)
            }
            _ => false,
        }
    }
}

/// Opaque node handle. Regenerated whenever a tree is rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) Index);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (idx, generation) = self.0.into_raw_parts();
        write!(f, "#{}.{}", idx, generation)
    }
}

/// Structural category of a field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// `section`, `meta_box`: root-only grouping
    Container,
    /// `group`, `repeater`: may hold children anywhere
    Composite,
    /// everything else
    Leaf,
}

impl FieldKind {
    pub fn of(field_type: &str) -> Self {
        match field_type {
            "section" | "meta_box" => FieldKind::Container,
            "group" | "repeater" => FieldKind::Composite,
            _ => FieldKind::Leaf,
        }
    }

    pub fn accepts_children(self) -> bool {
        !matches!(self, FieldKind::Leaf)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FieldKind::Container => "container",
            FieldKind::Composite => "composite",
            FieldKind::Leaf => "leaf",
        };
        f.write_str(s)
    }
}

/// Transient animation tag set while a deferred reorder is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveAnimation {
    Up,
    Down,
}

/// Session-only UI state. Never serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UiState {
    pub expanded: bool,
    pub animation: Option<MoveAnimation>,
}

/// Tree node in the arena.
///
/// The type-specific settings bucket is owned together with `field_type`:
/// the only way to change the type is [`Node::retype`], which replaces the
/// bucket. Settings of any other type cannot be held by a node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    field_type: String,
    kind: FieldKind,
    /// Logical key, unique among non-container nodes at save time
    pub name: Option<String>,
    /// Human label
    pub field_label: Option<String>,
    /// Parent handle, None for root entries
    pub parent: Option<NodeId>,
    /// Ordered child handles; `None` on leaves
    pub children: Option<Vec<NodeId>>,
    /// Settings bucket of the node's own field type
    pub settings: Map<String, Value>,
    /// Shared advanced options bucket
    pub advanced: Map<String, Value>,
    /// Shared visibility conditions bucket
    pub conditions: Vec<Value>,
    /// Remaining top-level properties, opaque to the tree layer
    pub properties: Map<String, Value>,
    pub ui: UiState,
}

impl Node {
    pub fn new(field_type: impl Into<String>) -> Self {
        let field_type = field_type.into();
        let kind = FieldKind::of(&field_type);
        Self {
            children: kind.accepts_children().then(Vec::new),
            field_type,
            kind,
            name: None,
            field_label: None,
            parent: None,
            settings: Map::new(),
            advanced: Map::new(),
            conditions: Vec::new(),
            properties: Map::new(),
            ui: UiState::default(),
        }
    }

    pub fn field_type(&self) -> &str {
        &self.field_type
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn is_container(&self) -> bool {
        self.kind == FieldKind::Container
    }

    pub fn accepts_children(&self) -> bool {
        self.kind.accepts_children()
    }

    pub fn child_ids(&self) -> &[NodeId] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Persisted key of this node's settings bucket.
    pub fn bucket_key(&self) -> String {
        bucket_key(&self.field_type)
    }

    /// Label used in messages: field label, then name, then type.
    pub fn display_label(&self) -> &str {
        [self.field_label.as_deref(), self.name.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.trim().is_empty())
            .unwrap_or(self.field_type.as_str())
    }

    /// Switch to another field type, discarding the old settings bucket.
    ///
    /// Children are kept when the new type still accepts them. Callers must
    /// ensure a leaf type is never assigned to a node that has children.
    pub fn retype(&mut self, field_type: impl Into<String>, settings: Map<String, Value>) {
        self.field_type = field_type.into();
        self.kind = FieldKind::of(&self.field_type);
        self.settings = settings;
        self.children = if self.kind.accepts_children() {
            Some(self.children.take().unwrap_or_default())
        } else {
            None
        };
    }

    /// Merge a flat property map onto this node.
    ///
    /// Structural keys and transient UI keys are skipped. Settings buckets of
    /// another field type (see [`PropertyKeys::is_type_bucket`]) are dropped;
    /// any other `*_settings` key is an ordinary property. Returns the keys
    /// that were discarded.
    pub fn apply_properties(
        &mut self,
        props: Map<String, Value>,
        keys: &PropertyKeys,
    ) -> Vec<String> {
        let own_bucket = self.bucket_key();
        let mut discarded = Vec::new();

        for (key, value) in props {
            if STRUCTURAL_KEYS.contains(&key.as_str()) || keys.is_transient(&key) {
                discarded.push(key);
                continue;
            }
            match key.as_str() {
                NAME_KEY => match value {
                    Value::String(s) => self.name = Some(s),
                    Value::Null => self.name = None,
                    other => {
                        warn!("ignoring non-string name on {}: {}", self.field_type, other);
                        discarded.push(key);
                    }
                },
                LABEL_KEY => match value {
                    Value::String(s) => self.field_label = Some(s),
                    Value::Null => self.field_label = None,
                    other => {
                        warn!("ignoring non-string label on {}: {}", self.field_type, other);
                        discarded.push(key);
                    }
                },
                ADVANCED_KEY => match value {
                    Value::Object(map) => self.advanced.extend(map),
                    _ => discarded.push(key),
                },
                CONDITIONS_KEY => match value {
                    Value::Array(items) => self.conditions = items,
                    _ => discarded.push(key),
                },
                k if k == own_bucket => match value {
                    Value::Object(map) => self.settings.extend(map),
                    _ => discarded.push(key),
                },
                k if keys.is_type_bucket(k) => discarded.push(key),
                _ => {
                    self.properties.insert(key, value);
                }
            }
        }
        discarded
    }
}

/// Persisted key of the settings bucket for `field_type`.
pub fn bucket_key(field_type: &str) -> String {
    format!("{}{}", field_type, TYPE_BUCKET_SUFFIX)
}
