//! Structural edits: add, update, delete, duplicate, reorder, reparent.
//!
//! Every operation validates against [`ContainmentRules`] before touching the
//! store. A rejected operation returns an error and leaves the store exactly
//! as it was.

use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::node::{FieldKind, Node, NodeId, PropertyKeys};
use crate::domain::rules::{ContainmentRules, StructuralViolation};
use crate::domain::store::NodeStore;

/// Suffixes appended to copies made by [`TreeMutator::duplicate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyNaming {
    pub name_suffix: String,
    pub label_suffix: String,
}

impl Default for CopyNaming {
    fn default() -> Self {
        Self {
            name_suffix: "_copy".into(),
            label_suffix: " Copy".into(),
        }
    }
}

/// Where a dragged node was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropTarget {
    /// Explicit "insert inside" zone of a node
    Inside(NodeId),
    /// The node itself: child if it is an empty composite/container, else sibling
    Onto(NodeId),
    /// Explicit root-level zone, appends to the root order
    Root,
}

/// Resulting position of a moved node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub parent: Option<NodeId>,
    pub index: usize,
}

/// Sibling direction for reordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    End,
    At(NodeId),
}

/// Applies structural edits to a [`NodeStore`].
pub struct TreeMutator<'a> {
    store: &'a mut NodeStore,
    naming: CopyNaming,
    keys: &'a PropertyKeys,
}

static NO_KEYS: PropertyKeys = PropertyKeys::EMPTY;

impl<'a> TreeMutator<'a> {
    pub fn new(store: &'a mut NodeStore) -> Self {
        Self {
            store,
            naming: CopyNaming::default(),
            keys: &NO_KEYS,
        }
    }

    pub fn with_naming(mut self, naming: CopyNaming) -> Self {
        self.naming = naming;
        self
    }

    /// Transient UI keys and known settings buckets, see [`PropertyKeys`].
    pub fn with_property_keys(mut self, keys: &'a PropertyKeys) -> Self {
        self.keys = keys;
        self
    }

    /// Smallest `<field_type>_<n>` not used by any node, with its ordinal.
    pub fn next_default_name(&self, field_type: &str) -> (String, usize) {
        let taken: Vec<&str> = self
            .store
            .iter()
            .filter_map(|(_, n)| n.name.as_deref())
            .collect();
        (1..)
            .map(|n| (format!("{}_{}", field_type, n), n))
            .find(|(name, _)| !taken.contains(&name.as_str()))
            .unwrap_or_else(|| (field_type.to_string(), 0))
    }

    /// Create a node from template defaults under `parent` (None = root).
    #[instrument(level = "debug", skip(self, defaults))]
    pub fn add(
        &mut self,
        field_type: &str,
        defaults: &Map<String, Value>,
        parent: Option<NodeId>,
    ) -> DomainResult<NodeId> {
        let mut node = Node::new(field_type);
        node.apply_properties(defaults.clone(), self.keys);

        if let Some(p) = parent {
            let parent_node = self.store.node(p)?;
            if !parent_node.accepts_children() {
                return Err(
                    StructuralViolation::not_accepting_children(parent_node.field_type()).into(),
                );
            }
            if node.is_container() {
                return Err(StructuralViolation::container_not_at_root().into());
            }
        }

        let id = self.store.attach(node, parent);
        debug!("add: {} {} under {:?}", field_type, id, parent);
        Ok(id)
    }

    /// Merge properties onto a node. Never touches `children` or `parent`.
    #[instrument(level = "debug", skip(self, props))]
    pub fn update(&mut self, id: NodeId, props: Map<String, Value>) -> DomainResult<()> {
        let keys = self.keys;
        let node = self
            .store
            .get_mut(id)
            .ok_or(DomainError::NodeNotFound(id))?;
        let discarded = node.apply_properties(props, keys);
        if !discarded.is_empty() {
            warn!("update {}: ignored keys {:?}", id, discarded);
        }
        Ok(())
    }

    /// Replace every editable property of a node with `props`.
    ///
    /// Type, links and UI state are kept. Returns the keys that were ignored.
    #[instrument(level = "debug", skip(self, props))]
    pub fn replace_properties(
        &mut self,
        id: NodeId,
        props: Map<String, Value>,
    ) -> DomainResult<Vec<String>> {
        let keys = self.keys;
        let node = self
            .store
            .get_mut(id)
            .ok_or(DomainError::NodeNotFound(id))?;
        node.name = None;
        node.field_label = None;
        node.settings.clear();
        node.advanced.clear();
        node.conditions.clear();
        node.properties.clear();
        let discarded = node.apply_properties(props, keys);
        debug!("replace_properties: {} ({} ignored)", id, discarded.len());
        Ok(discarded)
    }

    /// Remove `id` and its whole subtree. Returns the removed ids.
    #[instrument(level = "debug", skip(self))]
    pub fn delete(&mut self, id: NodeId) -> DomainResult<Vec<NodeId>> {
        let parent = self.store.node(id)?.parent;
        let doomed = self.store.subtree(id);

        if let Some(list) = self.store.list_mut(parent) {
            list.retain(|&s| s != id);
        }
        for &gone in &doomed {
            self.store.remove(gone);
        }
        debug!("delete: {} removed {} nodes", id, doomed.len());
        Ok(doomed)
    }

    /// Deep-copy the subtree at `id` and insert the copy right after it.
    ///
    /// Every copied node gets a fresh id and suffixed name and label.
    #[instrument(level = "debug", skip(self))]
    pub fn duplicate(&mut self, id: NodeId) -> DomainResult<NodeId> {
        let parent = self.store.node(id)?.parent;
        let position = self
            .store
            .position(id)
            .ok_or_else(|| DomainError::Inconsistent(format!("{} is not linked", id)))?;

        let copy = self.clone_subtree(id, parent);
        if let Some(list) = self.store.list_mut(parent) {
            list.insert(position + 1, copy);
        }
        debug!("duplicate: {} -> {}", id, copy);
        Ok(copy)
    }

    fn clone_subtree(&mut self, source: NodeId, parent: Option<NodeId>) -> NodeId {
        let Some(original) = self.store.get(source) else {
            return source;
        };
        let mut node = original.clone();
        let children = original.child_ids().to_vec();

        node.parent = parent;
        node.ui = Default::default();
        if let Some(c) = node.children.as_mut() {
            c.clear();
        }
        if let Some(name) = node.name.as_mut() {
            name.push_str(&self.naming.name_suffix);
        }
        if let Some(label) = node.field_label.as_mut() {
            label.push_str(&self.naming.label_suffix);
        }

        let copy = self.store.insert(node);
        for child in children {
            let child_copy = self.clone_subtree(child, Some(copy));
            if let Some(list) = self.store.list_mut(Some(copy)) {
                list.push(child_copy);
            }
        }
        copy
    }

    /// Swap with the previous sibling. Returns false if already first.
    pub fn move_up(&mut self, id: NodeId) -> DomainResult<bool> {
        self.shift(id, Direction::Up)
    }

    /// Swap with the next sibling. Returns false if already last.
    pub fn move_down(&mut self, id: NodeId) -> DomainResult<bool> {
        self.shift(id, Direction::Down)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn shift(&mut self, id: NodeId, direction: Direction) -> DomainResult<bool> {
        let parent = self.store.node(id)?.parent;
        let Some(list) = self.store.list_mut(parent) else {
            return Ok(false);
        };
        let Some(pos) = list.iter().position(|&s| s == id) else {
            return Ok(false);
        };
        let other = match direction {
            Direction::Up if pos > 0 => pos - 1,
            Direction::Down if pos + 1 < list.len() => pos + 1,
            _ => return Ok(false),
        };
        list.swap(pos, other);
        debug!("shift: {} {:?} to index {}", id, direction, other);
        Ok(true)
    }

    /// Resolve a drop and move `dragged` there, or reject without mutating.
    #[instrument(level = "debug", skip(self))]
    pub fn reparent(&mut self, dragged: NodeId, target: DropTarget) -> DomainResult<Placement> {
        let old_parent = self.store.node(dragged)?.parent;
        let rules = ContainmentRules::new(self.store);

        let (dest_parent, slot) = match target {
            DropTarget::Root => (None, Slot::End),
            DropTarget::Inside(t) => {
                self.store.node(t)?;
                if t == dragged || rules.is_descendant(dragged, t) {
                    return Err(StructuralViolation::cycle().into());
                }
                (Some(t), Slot::End)
            }
            DropTarget::Onto(t) => {
                let t_node = self.store.node(t)?;
                if t == dragged {
                    return self.placement_of(dragged);
                }
                if rules.is_descendant(dragged, t) {
                    return Err(StructuralViolation::cycle().into());
                }
                if t_node.accepts_children() && t_node.child_ids().is_empty() {
                    (Some(t), Slot::End)
                } else {
                    (t_node.parent, Slot::At(t))
                }
            }
        };

        rules.check_placement(dragged, dest_parent)?;

        let from = self.store.position(dragged);
        let target_before = match slot {
            Slot::At(t) => self.store.position(t),
            Slot::End => None,
        };
        let moving_down = old_parent == dest_parent
            && from.zip(target_before).is_some_and(|(f, t)| f < t);

        if self.store.list_mut(dest_parent).is_none() {
            return Err(DomainError::Inconsistent(format!(
                "destination of {} has no child list",
                dragged
            )));
        }

        // All checks passed; from here on nothing can fail.
        if let Some(list) = self.store.list_mut(old_parent) {
            list.retain(|&s| s != dragged);
        }
        let mut index = 0;
        if let Some(list) = self.store.list_mut(dest_parent) {
            // Within one list the dragged node takes the target's former
            // index: after it when moving down, before it when moving up.
            index = match slot {
                Slot::End => list.len(),
                Slot::At(t) => match list.iter().position(|&s| s == t) {
                    Some(pos) if moving_down => pos + 1,
                    Some(pos) => pos,
                    None => list.len(),
                },
            };
            list.insert(index, dragged);
        }
        if let Some(node) = self.store.get_mut(dragged) {
            node.parent = dest_parent;
        }
        debug!(
            "reparent: {} -> parent {:?} index {}",
            dragged, dest_parent, index
        );
        Ok(Placement {
            parent: dest_parent,
            index,
        })
    }

    fn placement_of(&self, id: NodeId) -> DomainResult<Placement> {
        let parent = self.store.node(id)?.parent;
        let index = self
            .store
            .position(id)
            .ok_or_else(|| DomainError::Inconsistent(format!("{} is not linked", id)))?;
        Ok(Placement { parent, index })
    }

    /// Change a node's field type, replacing its settings bucket.
    #[instrument(level = "debug", skip(self, settings))]
    pub fn change_type(
        &mut self,
        id: NodeId,
        field_type: &str,
        settings: Map<String, Value>,
    ) -> DomainResult<()> {
        let node = self.store.node(id)?;
        match FieldKind::of(field_type) {
            FieldKind::Leaf if !node.child_ids().is_empty() => {
                return Err(StructuralViolation::not_accepting_children(field_type).into());
            }
            FieldKind::Container if node.parent.is_some() => {
                return Err(StructuralViolation::container_not_at_root().into());
            }
            _ => {}
        }

        if let Some(node) = self.store.get_mut(id) {
            node.retype(field_type, settings);
        }
        debug!("change_type: {} -> {}", id, field_type);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rules::ViolationKind;
    use serde_json::json;

    fn snapshot(store: &NodeStore) -> (Vec<NodeId>, Vec<(NodeId, Node)>) {
        (
            store.root_order().to_vec(),
            store.iter().map(|(id, n)| (id, n.clone())).collect(),
        )
    }

    fn named(store: &mut NodeStore, ft: &str, name: &str, parent: Option<NodeId>) -> NodeId {
        let mut node = Node::new(ft);
        node.name = Some(name.into());
        node.field_label = Some(name.to_uppercase());
        store.attach(node, parent)
    }

    #[test]
    fn given_leaf_parent_when_adding_then_rejected_without_change() {
        let mut store = NodeStore::new();
        let text = named(&mut store, "text", "title", None);
        let before = snapshot(&store);

        let err = TreeMutator::new(&mut store)
            .add("number", &Map::new(), Some(text))
            .unwrap_err();

        assert_eq!(
            err.violation().map(|v| v.kind),
            Some(ViolationKind::NotAcceptingChildren)
        );
        assert_eq!(snapshot(&store), before);
    }

    #[test]
    fn given_container_when_adding_under_group_then_rejected() {
        let mut store = NodeStore::new();
        let group = named(&mut store, "group", "g", None);

        let err = TreeMutator::new(&mut store)
            .add("section", &Map::new(), Some(group))
            .unwrap_err();

        assert_eq!(
            err.violation().map(|v| v.kind),
            Some(ViolationKind::ContainerNotAtRoot)
        );
    }

    #[test]
    fn given_defaults_when_adding_then_properties_split_into_buckets() {
        let mut store = NodeStore::new();
        let defaults = json!({"name": "email_1", "email_settings": {"confirm": true}, "placeholder": ""});
        let Value::Object(defaults) = defaults else {
            unreachable!()
        };

        let id = TreeMutator::new(&mut store)
            .add("email", &defaults, None)
            .unwrap();

        let node = store.get(id).unwrap();
        assert_eq!(node.name.as_deref(), Some("email_1"));
        assert_eq!(node.settings.get("confirm"), Some(&json!(true)));
        assert_eq!(store.root_order(), &[id]);
    }

    #[test]
    fn given_existing_names_when_asking_default_name_then_skips_taken() {
        let mut store = NodeStore::new();
        named(&mut store, "text", "text_1", None);
        named(&mut store, "text", "text_3", None);

        let mutator = TreeMutator::new(&mut store);
        assert_eq!(mutator.next_default_name("text"), ("text_2".to_string(), 2));
        assert_eq!(mutator.next_default_name("email"), ("email_1".to_string(), 1));
    }

    #[test]
    fn given_update_with_structural_keys_when_applied_then_links_untouched() {
        let mut store = NodeStore::new();
        let section = named(&mut store, "section", "s", None);
        let text = named(&mut store, "text", "t", Some(section));
        let Value::Object(props) = json!({"parentId": null, "children": [], "fieldLabel": "Title"})
        else {
            unreachable!()
        };

        TreeMutator::new(&mut store).update(text, props).unwrap();

        let node = store.get(text).unwrap();
        assert_eq!(node.parent, Some(section));
        assert_eq!(node.field_label.as_deref(), Some("Title"));
        assert!(node.children.is_none());
    }

    #[test]
    fn given_edited_entry_when_replacing_then_missing_keys_removed() {
        let mut store = NodeStore::new();
        let text = named(&mut store, "text", "t", None);
        store
            .get_mut(text)
            .unwrap()
            .properties
            .insert("placeholder".into(), json!("x"));
        let Value::Object(props) = json!({"name": "title", "text_settings": {"max_length": 9}})
        else {
            unreachable!()
        };

        TreeMutator::new(&mut store)
            .replace_properties(text, props)
            .unwrap();

        let node = store.get(text).unwrap();
        assert_eq!(node.name.as_deref(), Some("title"));
        assert!(node.field_label.is_none());
        assert!(node.properties.is_empty());
        assert_eq!(node.settings.get("max_length"), Some(&json!(9)));
    }

    #[test]
    fn given_section_with_subtree_when_deleting_then_all_removed() {
        let mut store = NodeStore::new();
        let section = named(&mut store, "section", "s", None);
        let group = named(&mut store, "group", "g", Some(section));
        named(&mut store, "text", "a", Some(group));
        named(&mut store, "text", "b", Some(section));
        let keep = named(&mut store, "number", "n", None);

        let removed = TreeMutator::new(&mut store).delete(section).unwrap();

        assert_eq!(removed.len(), 4);
        assert_eq!(store.len(), 1);
        assert_eq!(store.root_order(), &[keep]);
        assert!(store.verify().is_ok());
    }

    #[test]
    fn given_group_when_duplicating_then_copy_follows_original_with_suffixes() {
        let mut store = NodeStore::new();
        let section = named(&mut store, "section", "s", None);
        let group = named(&mut store, "group", "address", Some(section));
        named(&mut store, "text", "street", Some(group));
        let last = named(&mut store, "text", "note", Some(section));
        let before: Vec<NodeId> = store.iter().map(|(id, _)| id).collect();

        let copy = TreeMutator::new(&mut store).duplicate(group).unwrap();

        assert_eq!(store.children(section), &[group, copy, last]);
        let copied = store.get(copy).unwrap();
        assert_eq!(copied.name.as_deref(), Some("address_copy"));
        assert_eq!(copied.field_label.as_deref(), Some("ADDRESS Copy"));
        let inner = store.children(copy)[0];
        assert!(!before.contains(&inner));
        assert_eq!(store.get(inner).unwrap().name.as_deref(), Some("street_copy"));
        assert!(store.verify().is_ok());
    }

    #[test]
    fn given_siblings_when_shifting_then_swaps_or_noops_at_edges() {
        let mut store = NodeStore::new();
        let a = named(&mut store, "text", "a", None);
        let b = named(&mut store, "text", "b", None);
        let c = named(&mut store, "text", "c", None);
        let mut mutator = TreeMutator::new(&mut store);

        assert!(!mutator.move_up(a).unwrap());
        assert!(!mutator.move_down(c).unwrap());
        assert!(mutator.move_up(c).unwrap());

        assert_eq!(store.root_order(), &[a, c, b]);
    }

    #[test]
    fn given_same_parent_when_dropping_onto_sibling_then_takes_its_index() {
        let mut store = NodeStore::new();
        let a = named(&mut store, "text", "a", None);
        let b = named(&mut store, "text", "b", None);
        let c = named(&mut store, "text", "c", None);

        let placement = TreeMutator::new(&mut store)
            .reparent(a, DropTarget::Onto(c))
            .unwrap();
        assert_eq!(store.root_order(), &[b, c, a]);
        assert_eq!(placement.index, 2);

        TreeMutator::new(&mut store)
            .reparent(a, DropTarget::Onto(b))
            .unwrap();
        assert_eq!(store.root_order(), &[a, b, c]);
    }

    #[test]
    fn given_empty_group_when_dropping_onto_it_then_becomes_child() {
        let mut store = NodeStore::new();
        let group = named(&mut store, "group", "g", None);
        let text = named(&mut store, "text", "t", None);

        let placement = TreeMutator::new(&mut store)
            .reparent(text, DropTarget::Onto(group))
            .unwrap();

        assert_eq!(placement.parent, Some(group));
        assert_eq!(store.children(group), &[text]);
        assert_eq!(store.root_order(), &[group]);
        assert!(store.verify().is_ok());
    }

    #[test]
    fn given_filled_group_when_dropping_onto_it_then_becomes_sibling() {
        let mut store = NodeStore::new();
        let group = named(&mut store, "group", "g", None);
        let inner = named(&mut store, "text", "i", Some(group));
        let text = named(&mut store, "text", "t", None);

        TreeMutator::new(&mut store)
            .reparent(text, DropTarget::Onto(group))
            .unwrap();

        assert_eq!(store.root_order(), &[text, group]);
        assert_eq!(store.children(group), &[inner]);
    }

    #[test]
    fn given_cross_parent_drop_when_onto_node_then_inserted_at_its_index() {
        let mut store = NodeStore::new();
        let section = named(&mut store, "section", "s", None);
        let x = named(&mut store, "text", "x", Some(section));
        let y = named(&mut store, "text", "y", Some(section));
        let other = named(&mut store, "meta_box", "m", None);
        let z = named(&mut store, "text", "z", Some(other));

        TreeMutator::new(&mut store)
            .reparent(z, DropTarget::Onto(y))
            .unwrap();

        assert_eq!(store.children(section), &[x, z, y]);
        assert!(store.children(other).is_empty());
        assert_eq!(store.parent(z), Some(section));
        assert!(store.verify().is_ok());
    }

    #[test]
    fn given_group_when_dropping_inside_own_descendant_then_cycle_and_unchanged() {
        let mut store = NodeStore::new();
        let outer = named(&mut store, "group", "outer", None);
        let inner = named(&mut store, "repeater", "inner", Some(outer));
        let before = snapshot(&store);

        let err = TreeMutator::new(&mut store)
            .reparent(outer, DropTarget::Inside(inner))
            .unwrap_err();

        assert_eq!(err.violation().map(|v| v.kind), Some(ViolationKind::Cycle));
        assert_eq!(snapshot(&store), before);
    }

    #[test]
    fn given_node_when_dropping_onto_itself_then_noop() {
        let mut store = NodeStore::new();
        let a = named(&mut store, "text", "a", None);
        let b = named(&mut store, "text", "b", None);

        let placement = TreeMutator::new(&mut store)
            .reparent(b, DropTarget::Onto(b))
            .unwrap();

        assert_eq!(placement, Placement { parent: None, index: 1 });
        assert_eq!(store.root_order(), &[a, b]);
    }

    #[test]
    fn given_group_with_children_when_retyping_to_leaf_then_rejected() {
        let mut store = NodeStore::new();
        let group = named(&mut store, "group", "g", None);
        named(&mut store, "text", "t", Some(group));

        let err = TreeMutator::new(&mut store)
            .change_type(group, "text", Map::new())
            .unwrap_err();

        assert_eq!(
            err.violation().map(|v| v.kind),
            Some(ViolationKind::NotAcceptingChildren)
        );
        assert_eq!(store.get(group).unwrap().field_type(), "group");
    }

    #[test]
    fn given_nested_leaf_when_retyping_to_container_then_rejected() {
        let mut store = NodeStore::new();
        let group = named(&mut store, "group", "g", None);
        let text = named(&mut store, "text", "t", Some(group));

        let err = TreeMutator::new(&mut store)
            .change_type(text, "section", Map::new())
            .unwrap_err();

        assert_eq!(
            err.violation().map(|v| v.kind),
            Some(ViolationKind::ContainerNotAtRoot)
        );
    }

    #[test]
    fn given_text_when_retyping_to_select_then_old_bucket_gone() {
        let mut store = NodeStore::new();
        let text = named(&mut store, "text", "t", None);
        store.get_mut(text).unwrap().settings.insert("max".into(), json!(5));
        let Value::Object(settings) = json!({"options": ["a"]}) else {
            unreachable!()
        };

        TreeMutator::new(&mut store)
            .change_type(text, "select", settings)
            .unwrap();

        let node = store.get(text).unwrap();
        assert_eq!(node.bucket_key(), "select_settings");
        assert!(node.settings.get("max").is_none());
        assert_eq!(node.name.as_deref(), Some("t"));
    }
}
