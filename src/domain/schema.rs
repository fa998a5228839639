//! Conversion between the nested persisted schema and the flat [`NodeStore`].
//!
//! Persisted shape: an array of entries
//! `{ fieldType, name?, fieldLabel?, ...properties, fields?: [...] }`.

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::domain::node::{
    Node, NodeId, PropertyKeys, ADVANCED_KEY, CONDITIONS_KEY, FIELDS_KEY, FIELD_TYPE_KEY,
    LABEL_KEY, NAME_KEY,
};
use crate::domain::store::NodeStore;

/// Why an input entry was skipped during load.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedInput {
    #[error("entry is not an object")]
    NotAnObject,

    #[error("entry has no string fieldType")]
    MissingFieldType,

    #[error("fields is not an array")]
    FieldsNotArray,

    #[error("{0} may only appear at the top level")]
    NestedContainer(String),

    #[error("{0} cannot hold child fields; nested entries dropped")]
    ChildrenOnLeaf(String),
}

/// A skipped entry and where it was found, e.g. `[0].fields[2]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub location: String,
    pub reason: MalformedInput,
}

/// Result of [`SchemaTransformer::initialize`].
#[derive(Debug, Clone, Default)]
pub struct LoadOutcome {
    pub store: NodeStore,
    pub skipped: Vec<SkippedEntry>,
}

/// Builds a [`NodeStore`] from a nested schema and flattens it back.
#[derive(Debug, Clone, Default)]
pub struct SchemaTransformer {
    keys: PropertyKeys,
}

impl SchemaTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session-only UI keys to strip from loaded entries.
    pub fn with_transient_keys(transient: Vec<String>) -> Self {
        Self {
            keys: PropertyKeys::new(transient),
        }
    }

    /// Restrict stale-bucket detection to the settings of these field types.
    pub fn with_field_types<I, S>(mut self, field_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keys = self.keys.with_field_types(field_types);
        self
    }

    pub fn keys(&self) -> &PropertyKeys {
        &self.keys
    }

    /// Build a fresh store; every node gets a new id. Malformed entries are
    /// skipped and reported, the rest of the tree still loads.
    #[instrument(level = "debug", skip(self, entries))]
    pub fn initialize(&self, entries: &[Value]) -> LoadOutcome {
        let mut outcome = LoadOutcome::default();
        for (i, entry) in entries.iter().enumerate() {
            self.load_entry(&mut outcome, entry, None, format!("[{}]", i));
        }
        debug!(
            "initialize: {} nodes, {} skipped",
            outcome.store.len(),
            outcome.skipped.len()
        );
        outcome
    }

    fn load_entry(
        &self,
        outcome: &mut LoadOutcome,
        entry: &Value,
        parent: Option<NodeId>,
        location: String,
    ) {
        let mut skip = |location: String, reason: MalformedInput| {
            warn!("skipping schema entry {}: {}", location, reason);
            outcome.skipped.push(SkippedEntry { location, reason });
        };

        let Value::Object(map) = entry else {
            return skip(location, MalformedInput::NotAnObject);
        };
        let Some(field_type) = map.get(FIELD_TYPE_KEY).and_then(Value::as_str) else {
            return skip(location, MalformedInput::MissingFieldType);
        };
        let nested = match map.get(FIELDS_KEY) {
            None | Some(Value::Null) => &[][..],
            Some(Value::Array(items)) => items.as_slice(),
            Some(_) => return skip(location, MalformedInput::FieldsNotArray),
        };

        let mut node = Node::new(field_type);
        if node.is_container() && parent.is_some() {
            return skip(location, MalformedInput::NestedContainer(field_type.into()));
        }
        if !node.accepts_children() && !nested.is_empty() {
            skip(
                location.clone(),
                MalformedInput::ChildrenOnLeaf(field_type.into()),
            );
        }

        node.apply_properties(map.clone(), &self.keys);
        let id = outcome.store.attach(node, parent);

        if outcome.store.get(id).is_some_and(Node::accepts_children) {
            for (i, child) in nested.iter().enumerate() {
                self.load_entry(
                    outcome,
                    child,
                    Some(id),
                    format!("{}.{}[{}]", location, FIELDS_KEY, i),
                );
            }
        }
    }

    /// Flatten the store back into the nested schema, following the root order.
    #[instrument(level = "debug", skip(self, store))]
    pub fn serialize(&self, store: &NodeStore) -> Vec<Value> {
        store
            .root_order()
            .iter()
            .filter_map(|&id| self.serialize_node(store, id))
            .collect()
    }

    /// One entry with its nested `fields`. Empty buckets are omitted.
    pub fn serialize_node(&self, store: &NodeStore, id: NodeId) -> Option<Value> {
        let node = store.get(id)?;
        let mut entry = self.flat_entry(node);

        let fields: Vec<Value> = node
            .child_ids()
            .iter()
            .filter_map(|&child| self.serialize_node(store, child))
            .collect();
        if !fields.is_empty() {
            entry.insert(FIELDS_KEY.into(), Value::Array(fields));
        }
        Some(Value::Object(entry))
    }

    /// Node properties without children, as the settings editor sees them.
    pub fn flat_entry(&self, node: &Node) -> Map<String, Value> {
        let mut entry = Map::new();
        entry.insert(FIELD_TYPE_KEY.into(), Value::String(node.field_type().into()));
        if let Some(name) = &node.name {
            entry.insert(NAME_KEY.into(), Value::String(name.clone()));
        }
        if let Some(label) = &node.field_label {
            entry.insert(LABEL_KEY.into(), Value::String(label.clone()));
        }
        for (key, value) in &node.properties {
            if !self.keys.is_transient(key) {
                entry.insert(key.clone(), value.clone());
            }
        }
        if !node.settings.is_empty() {
            entry.insert(node.bucket_key(), Value::Object(node.settings.clone()));
        }
        if !node.advanced.is_empty() {
            entry.insert(ADVANCED_KEY.into(), Value::Object(node.advanced.clone()));
        }
        if !node.conditions.is_empty() {
            entry.insert(CONDITIONS_KEY.into(), Value::Array(node.conditions.clone()));
        }
        entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entries(v: Value) -> Vec<Value> {
        match v {
            Value::Array(items) => items,
            _ => unreachable!(),
        }
    }

    #[test]
    fn given_nested_schema_when_initializing_then_fields_become_children() {
        let schema = entries(json!([
            {"fieldType": "section", "name": "main", "fields": [
                {"fieldType": "text", "name": "title"},
                {"fieldType": "group", "name": "addr", "fields": [
                    {"fieldType": "text", "name": "street"}
                ]}
            ]}
        ]));

        let outcome = SchemaTransformer::new().initialize(&schema);
        let store = outcome.store;

        assert!(outcome.skipped.is_empty());
        assert_eq!(store.len(), 4);
        let section = store.root_order()[0];
        assert_eq!(store.children(section).len(), 2);
        assert!(store.get(section).unwrap().properties.get("fields").is_none());
        assert!(store.verify().is_ok());
    }

    #[test]
    fn given_malformed_entries_when_initializing_then_skipped_rest_loads() {
        let schema = entries(json!([
            {"name": "no type"},
            {"fieldType": "group", "fields": "oops"},
            42,
            {"fieldType": "group", "fields": [
                {"fieldType": "section"},
                {"fieldType": "text", "name": "ok"}
            ]}
        ]));

        let outcome = SchemaTransformer::new().initialize(&schema);

        let reasons: Vec<_> = outcome.skipped.iter().map(|s| s.reason.clone()).collect();
        assert_eq!(
            reasons,
            vec![
                MalformedInput::MissingFieldType,
                MalformedInput::FieldsNotArray,
                MalformedInput::NotAnObject,
                MalformedInput::NestedContainer("section".into()),
            ]
        );
        assert_eq!(outcome.skipped[3].location, "[3].fields[0]");
        assert_eq!(outcome.store.len(), 2);
        assert!(outcome.store.verify().is_ok());
    }

    #[test]
    fn given_transient_keys_when_initializing_then_not_stored() {
        let schema = entries(json!([
            {"fieldType": "text", "id": "x1", "parentId": null, "expanded": true, "name": "a"}
        ]));
        let transformer = SchemaTransformer::with_transient_keys(vec!["expanded".into()]);

        let store = transformer.initialize(&schema).store;
        let node = store.get(store.root_order()[0]).unwrap();

        assert!(node.properties.is_empty());
    }

    #[test]
    fn given_empty_and_foreign_buckets_when_serializing_then_omitted() {
        let schema = entries(json!([
            {"fieldType": "text", "name": "a",
             "text_settings": {}, "number_settings": {"min": 1},
             "advanced_options": {}, "visibility_conditions": [],
             "placeholder": ""}
        ]));
        let transformer = SchemaTransformer::new();

        let out = transformer.serialize(&transformer.initialize(&schema).store);

        assert_eq!(
            out,
            entries(json!([{"fieldType": "text", "name": "a", "placeholder": ""}]))
        );
    }

    #[test]
    fn given_empty_group_when_serializing_then_no_fields_key() {
        let schema = entries(json!([{"fieldType": "group", "name": "g", "fields": []}]));
        let transformer = SchemaTransformer::new();

        let out = transformer.serialize(&transformer.initialize(&schema).store);

        assert_eq!(out, entries(json!([{"fieldType": "group", "name": "g"}])));
    }
}
