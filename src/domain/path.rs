//! Positional node addresses like `0/2/1`.
//!
//! Ids are regenerated on every load, so anything outside a session refers
//! to nodes by their sibling indices from the root.

use std::fmt;
use std::str::FromStr;

use itertools::Itertools;

use crate::domain::error::DomainError;
use crate::domain::node::NodeId;
use crate::domain::store::NodeStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    pub fn new(indices: Vec<usize>) -> Self {
        Self(indices)
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    /// Walk the store from the root order down to the addressed node.
    pub fn resolve(&self, store: &NodeStore) -> Result<NodeId, DomainError> {
        let mut list = store.root_order();
        let mut current = None;
        for (depth, &idx) in self.0.iter().enumerate() {
            let Some(&id) = list.get(idx) else {
                return Err(DomainError::invalid_path(
                    self.to_string(),
                    format!("no entry {} at depth {}", idx, depth),
                ));
            };
            current = Some(id);
            list = store.children(id);
        }
        current.ok_or_else(|| DomainError::invalid_path(self.to_string(), "empty path"))
    }

    /// Path of `id` in the current tree.
    pub fn of(store: &NodeStore, id: NodeId) -> Result<Self, DomainError> {
        store.node(id)?;
        let mut indices = Vec::new();
        let mut chain = vec![id];
        chain.extend(store.ancestors(id));
        for &node in chain.iter().rev() {
            let pos = store
                .position(node)
                .ok_or_else(|| DomainError::Inconsistent(format!("{} is not linked", node)))?;
            indices.push(pos);
        }
        Ok(Self(indices))
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().join("/"))
    }
}

impl FromStr for NodePath {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_matches('/');
        if trimmed.is_empty() {
            return Err(DomainError::invalid_path(s, "empty path"));
        }
        trimmed
            .split('/')
            .map(|part| {
                part.trim()
                    .parse::<usize>()
                    .map_err(|_| DomainError::invalid_path(s, format!("'{}' is not an index", part)))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}
