//! Arena-backed node table plus the ordered list of root entries.

use std::collections::HashSet;

use generational_arena::Arena;
use tracing::instrument;

use crate::domain::error::DomainError;
use crate::domain::node::{Node, NodeId};

/// Flat node table keyed by [`NodeId`].
///
/// Uses a generational arena so removed handles are never reused by later
/// inserts. No placement rules live here; see
/// [`ContainmentRules`](crate::domain::rules::ContainmentRules).
#[derive(Debug, Clone, Default)]
pub struct NodeStore {
    arena: Arena<Node>,
    roots: Vec<NodeId>,
}

impl NodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.arena.contains(id.0)
    }

    #[instrument(level = "trace", skip(self))]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.arena.get(id.0)
    }

    #[instrument(level = "trace", skip(self))]
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.arena.get_mut(id.0)
    }

    /// Like [`get`](Self::get) but reports a missing node as an error.
    pub fn node(&self, id: NodeId) -> Result<&Node, DomainError> {
        self.get(id).ok_or(DomainError::NodeNotFound(id))
    }

    /// Replace the record stored under `id`, returning the previous one.
    pub fn set(&mut self, id: NodeId, node: Node) -> Result<Node, DomainError> {
        let slot = self.get_mut(id).ok_or(DomainError::NodeNotFound(id))?;
        Ok(std::mem::replace(slot, node))
    }

    /// Store a record without linking it anywhere.
    pub fn insert(&mut self, node: Node) -> NodeId {
        NodeId(self.arena.insert(node))
    }

    /// Store a record and append it to `parent`'s children or to the root order.
    #[instrument(level = "trace", skip(self, node))]
    pub fn attach(&mut self, mut node: Node, parent: Option<NodeId>) -> NodeId {
        node.parent = parent;
        let id = self.insert(node);
        match parent {
            Some(p) => {
                if let Some(children) = self.get_mut(p).and_then(|n| n.children.as_mut()) {
                    children.push(id);
                }
            }
            None => self.roots.push(id),
        }
        id
    }

    /// Drop a record. References to it are not touched.
    pub fn remove(&mut self, id: NodeId) -> Option<Node> {
        self.arena.remove(id.0)
    }

    pub fn root_order(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn set_root_order(&mut self, ids: Vec<NodeId>) {
        self.roots = ids;
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(Node::child_ids).unwrap_or(&[])
    }

    /// The ordered list `id` lives in: its parent's children or the root order.
    pub fn siblings(&self, id: NodeId) -> Option<&[NodeId]> {
        let node = self.get(id)?;
        match node.parent {
            Some(p) => self.get(p).and_then(|n| n.children.as_deref()),
            None => Some(&self.roots),
        }
    }

    /// Mutable access to the child list of `parent`, or to the root order.
    pub(crate) fn list_mut(&mut self, parent: Option<NodeId>) -> Option<&mut Vec<NodeId>> {
        match parent {
            Some(p) => self.get_mut(p).and_then(|n| n.children.as_mut()),
            None => Some(&mut self.roots),
        }
    }

    /// Index of `id` within its sibling list.
    pub fn position(&self, id: NodeId) -> Option<usize> {
        self.siblings(id)?.iter().position(|&s| s == id)
    }

    /// Ancestor chain of `id`, nearest first. Stops on a dangling or
    /// repeated reference.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = self.parent(id);
        while let Some(p) = current {
            if p == id || chain.contains(&p) {
                break;
            }
            chain.push(p);
            current = self.parent(p);
        }
        chain
    }

    /// `id` followed by all its descendants in pre-order.
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        SubtreeIterator::new(self, vec![id]).map(|(i, _)| i).collect()
    }

    /// Pre-order walk over every root and its descendants.
    pub fn iter(&self) -> SubtreeIterator<'_> {
        SubtreeIterator::new(self, self.roots.clone())
    }

    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self) -> usize {
        self.roots
            .iter()
            .map(|&root| self.calculate_depth(root))
            .max()
            .unwrap_or(0)
    }

    fn calculate_depth(&self, id: NodeId) -> usize {
        match self.get(id) {
            Some(node) => {
                1 + node
                    .child_ids()
                    .iter()
                    .map(|&child| self.calculate_depth(child))
                    .max()
                    .unwrap_or(0)
            }
            None => 0,
        }
    }

    /// Check the structural invariants: single placement of every id,
    /// consistent back-references, children iff composite/container,
    /// containers only at root, nothing escaping a container, no cycles.
    #[instrument(level = "debug", skip(self))]
    pub fn verify(&self) -> Result<(), DomainError> {
        let broken = |msg: String| Err(DomainError::Inconsistent(msg));
        let mut seen = HashSet::new();

        for &root in &self.roots {
            let Some(node) = self.get(root) else {
                return broken(format!("root {} is not in the table", root));
            };
            if node.parent.is_some() {
                return broken(format!("root {} has a parent", root));
            }
            if !seen.insert(root) {
                return broken(format!("{} referenced twice", root));
            }
        }

        for (idx, node) in self.arena.iter() {
            let id = NodeId(idx);
            if node.children.is_some() != node.accepts_children() {
                return broken(format!("{} children list does not match its type", id));
            }
            if node.is_container() && node.parent.is_some() {
                return broken(format!("container {} is nested", id));
            }
            for &child in node.child_ids() {
                match self.get(child) {
                    Some(c) if c.parent == Some(id) => {}
                    Some(_) => return broken(format!("{} has wrong parent link", child)),
                    None => return broken(format!("{} lists missing child {}", id, child)),
                }
                if !seen.insert(child) {
                    return broken(format!("{} referenced twice", child));
                }
            }
        }

        if seen.len() != self.len() {
            return broken(format!(
                "{} nodes are orphaned",
                self.len().saturating_sub(seen.len())
            ));
        }

        // Every id is placed exactly once and linked back, so walking from the
        // roots must reach everything; an unreachable remainder means a cycle.
        if self.iter().count() != self.len() {
            return broken("cycle in parent links".to_string());
        }
        Ok(())
    }
}

/// Pre-order iterator over one or more subtrees.
pub struct SubtreeIterator<'a> {
    store: &'a NodeStore,
    stack: Vec<NodeId>,
    visited: HashSet<NodeId>,
}

impl<'a> SubtreeIterator<'a> {
    fn new(store: &'a NodeStore, mut starts: Vec<NodeId>) -> Self {
        starts.reverse();
        Self {
            store,
            stack: starts,
            visited: HashSet::new(),
        }
    }
}

impl<'a> Iterator for SubtreeIterator<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.stack.pop() {
            if !self.visited.insert(current) {
                continue;
            }
            if let Some(node) = self.store.get(current) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.child_ids().iter().rev() {
                    self.stack.push(child);
                }
                return Some((current, node));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_attached_nodes_when_iterating_then_preorder_across_roots() {
        let mut store = NodeStore::new();
        let section = store.attach(Node::new("section"), None);
        let a = store.attach(Node::new("text"), Some(section));
        let b = store.attach(Node::new("text"), Some(section));
        let tail = store.attach(Node::new("number"), None);

        let order: Vec<NodeId> = store.iter().map(|(id, _)| id).collect();
        assert_eq!(order, vec![section, a, b, tail]);
        assert_eq!(store.depth(), 2);
        assert!(store.verify().is_ok());
    }

    #[test]
    fn given_removed_node_when_inserting_then_handle_not_reused() {
        let mut store = NodeStore::new();
        let first = store.insert(Node::new("text"));
        store.remove(first);
        let second = store.insert(Node::new("text"));

        assert_ne!(first, second);
        assert!(store.get(first).is_none());
    }

    #[test]
    fn given_orphan_when_verifying_then_inconsistent() {
        let mut store = NodeStore::new();
        store.attach(Node::new("section"), None);
        store.insert(Node::new("text"));

        assert!(matches!(store.verify(), Err(DomainError::Inconsistent(_))));
    }

    #[test]
    fn given_nested_container_when_verifying_then_inconsistent() {
        let mut store = NodeStore::new();
        let group = store.attach(Node::new("group"), None);
        store.attach(Node::new("section"), Some(group));

        assert!(store.verify().is_err());
    }

    #[test]
    fn given_set_on_missing_id_when_replacing_then_not_found() {
        let mut store = NodeStore::new();
        let id = store.insert(Node::new("text"));
        store.remove(id);

        assert!(matches!(
            store.set(id, Node::new("text")),
            Err(DomainError::NodeNotFound(_))
        ));
    }
}
