//! Text rendering of the field tree.

use termtree::Tree;

use crate::domain::node::{Node, NodeId};
use crate::domain::store::NodeStore;

pub trait TreeRender {
    fn to_tree_string(&self) -> Tree<String>;
}

fn describe(index: usize, node: &Node) -> String {
    let mut line = format!("{} {} [{}]", index, node.display_label(), node.field_type());
    if let Some(name) = node.name.as_deref() {
        if Some(name) != node.field_label.as_deref() {
            line.push_str(&format!(" {}", name));
        }
    }
    line
}

fn build_tree(store: &NodeStore, id: NodeId, index: usize) -> Option<Tree<String>> {
    let node = store.get(id)?;
    let leaves: Vec<_> = node
        .child_ids()
        .iter()
        .enumerate()
        .filter_map(|(i, &child)| build_tree(store, child, i))
        .collect();
    Some(Tree::new(describe(index, node)).with_leaves(leaves))
}

impl TreeRender for NodeStore {
    fn to_tree_string(&self) -> Tree<String> {
        if self.root_order().is_empty() {
            return Tree::new("Empty schema".to_string());
        }
        let leaves: Vec<_> = self
            .root_order()
            .iter()
            .enumerate()
            .filter_map(|(i, &root)| build_tree(self, root, i))
            .collect();
        Tree::new("schema".to_string()).with_leaves(leaves)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_tree_when_rendering_then_lists_nodes_with_indices() {
        let mut store = NodeStore::new();
        let mut section = Node::new("section");
        section.field_label = Some("Main".into());
        let section = store.attach(section, None);
        let mut text = Node::new("text");
        text.name = Some("title".into());
        text.field_label = Some("Title".into());
        store.attach(text, Some(section));

        let rendered = store.to_tree_string().to_string();

        assert!(rendered.contains("0 Main [section]"));
        assert!(rendered.contains("0 Title [text] title"));
    }

    #[test]
    fn given_empty_store_when_rendering_then_placeholder() {
        let store = NodeStore::new();
        assert_eq!(store.to_tree_string().to_string().trim(), "Empty schema");
    }
}
