//! Placement rules that keep the tree well-formed.
//!
//! Pure predicates over a [`NodeStore`]; nothing here mutates. A failed rule
//! yields a [`StructuralViolation`] which the mutator returns unchanged.

use thiserror::Error;

use crate::domain::node::{Node, NodeId};
use crate::domain::store::NodeStore;

/// Category of a rejected structural mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    /// Target lies inside the dragged subtree
    Cycle,
    /// Container would get a parent
    ContainerNotAtRoot,
    /// Field inside a container would move straight to root
    RootEscape,
    /// Destination is a leaf
    NotAcceptingChildren,
}

/// A rejected structural mutation. The store is left untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct StructuralViolation {
    pub kind: ViolationKind,
    pub reason: String,
}

impl StructuralViolation {
    pub fn new(kind: ViolationKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }

    pub fn cycle() -> Self {
        Self::new(
            ViolationKind::Cycle,
            "cannot move a node into its own subtree",
        )
    }

    pub fn container_not_at_root() -> Self {
        Self::new(
            ViolationKind::ContainerNotAtRoot,
            "containers may only be placed at root level",
        )
    }

    pub fn root_escape() -> Self {
        Self::new(
            ViolationKind::RootEscape,
            "fields inside a container cannot move to root directly",
        )
    }

    pub fn not_accepting_children(field_type: &str) -> Self {
        Self::new(
            ViolationKind::NotAcceptingChildren,
            format!("{} fields cannot hold child fields", field_type),
        )
    }
}

pub type RuleResult = Result<(), StructuralViolation>;

/// Containment predicates over a store snapshot.
pub struct ContainmentRules<'a> {
    store: &'a NodeStore,
}

impl<'a> ContainmentRules<'a> {
    pub fn new(store: &'a NodeStore) -> Self {
        Self { store }
    }

    pub fn is_container(node: &Node) -> bool {
        node.is_container()
    }

    pub fn can_accept_children(node: &Node) -> bool {
        node.accepts_children()
    }

    /// True if `candidate` lies anywhere below `ancestor`. A node is not its
    /// own descendant.
    pub fn is_descendant(&self, ancestor: NodeId, candidate: NodeId) -> bool {
        self.store
            .ancestors(candidate)
            .into_iter()
            .any(|id| id == ancestor)
    }

    /// True if some ancestor of `id` is a container.
    pub fn is_inside_container(&self, id: NodeId) -> bool {
        self.store
            .ancestors(id)
            .into_iter()
            .filter_map(|a| self.store.get(a))
            .any(Node::is_container)
    }

    /// Containers always may sit at root; other nodes only if that does not
    /// pull them out of a container.
    pub fn can_place_at_root(&self, id: NodeId) -> bool {
        match self.store.get(id) {
            Some(node) if node.is_container() => true,
            Some(_) => !self.is_inside_container(id),
            None => false,
        }
    }

    /// Check whether `dragged` may end up under `parent` (None = root).
    pub fn check_placement(&self, dragged: NodeId, parent: Option<NodeId>) -> RuleResult {
        let Some(node) = self.store.get(dragged) else {
            return Ok(());
        };

        match parent {
            Some(p) => {
                if p == dragged || self.is_descendant(dragged, p) {
                    return Err(StructuralViolation::cycle());
                }
                if node.is_container() {
                    return Err(StructuralViolation::container_not_at_root());
                }
                match self.store.get(p) {
                    Some(parent_node) if !parent_node.accepts_children() => Err(
                        StructuralViolation::not_accepting_children(parent_node.field_type()),
                    ),
                    _ => Ok(()),
                }
            }
            None => {
                if self.can_place_at_root(dragged) {
                    Ok(())
                } else {
                    Err(StructuralViolation::root_escape())
                }
            }
        }
    }
}
