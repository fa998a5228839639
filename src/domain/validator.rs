//! Pre-save checks: required properties and tree-wide name uniqueness.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use itertools::Itertools;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::domain::node::{Node, NodeId, LABEL_KEY, NAME_KEY};
use crate::domain::store::NodeStore;

/// Property name → human label, for every property flagged `required` by
/// any field-type template.
pub type RequiredProperties = BTreeMap<String, String>;

/// A single reason the tree cannot be saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyTree,
    MissingRequired {
        node: NodeId,
        node_label: String,
        property: String,
        property_label: String,
    },
    DuplicateName {
        name: String,
        occurrences: usize,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyTree => write!(f, "at least one top-level entry required"),
            ValidationIssue::MissingRequired {
                node_label,
                property_label,
                ..
            } => write!(f, "{}: {} is required", node_label, property_label),
            ValidationIssue::DuplicateName { name, occurrences } => write!(
                f,
                "field name \"{}\" is used {} times; names must be unique",
                name, occurrences
            ),
        }
    }
}

/// All issues found in one validation pass. Never empty.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("validation failed: {}", .0.iter().join("; "))]
pub struct ValidationReport(pub Vec<ValidationIssue>);

impl ValidationReport {
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.0
    }
}

/// Read-only pre-save gate over a [`NodeStore`].
pub struct TreeValidator<'a> {
    store: &'a NodeStore,
    required: &'a RequiredProperties,
}

impl<'a> TreeValidator<'a> {
    pub fn new(store: &'a NodeStore, required: &'a RequiredProperties) -> Self {
        Self { store, required }
    }

    /// Collect every issue in the tree, not just the first.
    #[instrument(level = "debug", skip(self))]
    pub fn validate(&self) -> Result<(), ValidationReport> {
        if self.store.root_order().is_empty() {
            return Err(ValidationReport(vec![ValidationIssue::EmptyTree]));
        }

        let mut issues = Vec::new();
        let mut names: Vec<&str> = Vec::new();
        let mut counts: HashMap<&str, usize> = HashMap::new();

        for (id, node) in self.store.iter() {
            self.check_required(id, node, &mut issues);

            if node.is_container() {
                continue;
            }
            if let Some(name) = node.name.as_deref().filter(|n| !n.trim().is_empty()) {
                let count = counts.entry(name).or_insert(0);
                if *count == 0 {
                    names.push(name);
                }
                *count += 1;
            }
        }

        issues.extend(names.into_iter().filter_map(|name| {
            let occurrences = counts.get(name).copied().unwrap_or(0);
            (occurrences > 1).then(|| ValidationIssue::DuplicateName {
                name: name.to_string(),
                occurrences,
            })
        }));

        debug!("validate: {} issues", issues.len());
        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationReport(issues))
        }
    }

    fn check_required(&self, id: NodeId, node: &Node, issues: &mut Vec<ValidationIssue>) {
        let name = node.name.clone().map(Value::String);
        let label = node.field_label.clone().map(Value::String);
        let present = [(NAME_KEY, name.as_ref()), (LABEL_KEY, label.as_ref())]
            .into_iter()
            .filter_map(|(k, v)| v.map(|v| (k, v)))
            .chain(node.properties.iter().map(|(k, v)| (k.as_str(), v)))
            .chain(node.settings.iter().map(|(k, v)| (k.as_str(), v)))
            .chain(node.advanced.iter().map(|(k, v)| (k.as_str(), v)));

        for (key, value) in present {
            let Some(property_label) = self.required.get(key) else {
                continue;
            };
            if is_empty_value(value) {
                issues.push(ValidationIssue::MissingRequired {
                    node: id,
                    node_label: node.display_label().to_string(),
                    property: key.to_string(),
                    property_label: property_label.clone(),
                });
            }
        }
    }
}

/// Null, blank strings and empty arrays count as missing.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
