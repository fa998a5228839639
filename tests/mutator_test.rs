//! Tests for structural edits and the drop decision.

use std::collections::HashSet;

use rstest::{fixture, rstest};
use serde_json::{json, Value};

use fieldtree::domain::{
    CopyNaming, DomainError, DropTarget, NodeId, NodePath, NodeStore, Placement,
    SchemaTransformer, TreeMutator, ViolationKind,
};
use fieldtree::util::testing;

/// Everything observable about the tree, ids included.
fn snapshot(store: &NodeStore) -> (Vec<NodeId>, String) {
    (
        store.root_order().to_vec(),
        format!("{:?}", store.iter().collect::<Vec<_>>()),
    )
}

fn at(store: &NodeStore, path: &str) -> NodeId {
    path.parse::<NodePath>().unwrap().resolve(store).unwrap()
}

fn names(store: &NodeStore, ids: &[NodeId]) -> Vec<String> {
    ids.iter()
        .map(|&id| store.get(id).and_then(|n| n.name.clone()).unwrap_or_default())
        .collect()
}

fn violation(err: DomainError) -> ViolationKind {
    err.violation().expect("structural violation").kind
}

/// ```text
/// 0 section "main"
///   0/0 text a
///   0/1 group g
///     0/1/0 text g1
///     0/1/1 text g2
///   0/2 text b
/// 1 group "loose"
///   1/0 text l1
/// 2 group "empty"
/// 3 text top
/// 4 section "side"
/// ```
#[fixture]
fn store() -> NodeStore {
    testing::init_test_setup();
    let schema: Vec<Value> = serde_json::from_value(json!([
        {"fieldType": "section", "name": "main", "fieldLabel": "Main", "fields": [
            {"fieldType": "text", "name": "a", "fieldLabel": "A"},
            {"fieldType": "group", "name": "g", "fieldLabel": "G", "fields": [
                {"fieldType": "text", "name": "g1", "fieldLabel": "G1"},
                {"fieldType": "text", "name": "g2", "fieldLabel": "G2"}
            ]},
            {"fieldType": "text", "name": "b", "fieldLabel": "B"}
        ]},
        {"fieldType": "group", "name": "loose", "fieldLabel": "Loose", "fields": [
            {"fieldType": "text", "name": "l1", "fieldLabel": "L1"}
        ]},
        {"fieldType": "group", "name": "empty", "fieldLabel": "Empty"},
        {"fieldType": "text", "name": "top", "fieldLabel": "Top"},
        {"fieldType": "section", "name": "side", "fieldLabel": "Side"}
    ]))
    .unwrap();
    let outcome = SchemaTransformer::new().initialize(&schema);
    assert!(outcome.skipped.is_empty());
    outcome.store
}

// ============================================================
// delete()
// ============================================================

#[rstest]
fn given_section_with_descendants_when_deleting_then_n_plus_one_removed(mut store: NodeStore) {
    let main = at(&store, "0");
    let before = store.len();
    let subtree = store.subtree(main);

    let removed = TreeMutator::new(&mut store).delete(main).unwrap();

    assert_eq!(removed.len(), 6);
    assert_eq!(store.len(), before - 6);
    assert_eq!(removed, subtree);
    for (_, node) in store.iter() {
        assert!(node.parent.map_or(true, |p| !removed.contains(&p)));
        assert!(node.child_ids().iter().all(|c| !removed.contains(c)));
    }
    assert!(!store.root_order().contains(&main));
    assert!(store.verify().is_ok());
}

#[rstest]
fn given_nested_leaf_when_deleting_then_only_it_leaves_parent_list(mut store: NodeStore) {
    let g = at(&store, "0/1");
    let g1 = at(&store, "0/1/0");

    let removed = TreeMutator::new(&mut store).delete(g1).unwrap();

    assert_eq!(removed, vec![g1]);
    assert_eq!(names(&store, store.children(g)), vec!["g2"]);
}

// ============================================================
// duplicate()
// ============================================================

#[rstest]
fn given_group_with_children_when_duplicating_then_fresh_ids_same_shape(mut store: NodeStore) {
    let main = at(&store, "0");
    let g = at(&store, "0/1");
    let existing: HashSet<NodeId> = store.iter().map(|(id, _)| id).collect();

    let copy = TreeMutator::new(&mut store).duplicate(g).unwrap();

    let copied: Vec<NodeId> = store.subtree(copy);
    assert_eq!(copied.len(), 3);
    assert!(copied.iter().all(|id| !existing.contains(id)));
    assert_eq!(store.children(main)[2], copy);
    assert_eq!(names(&store, store.children(main)), vec!["a", "g", "g_copy", "b"]);
    assert_eq!(names(&store, store.children(copy)), vec!["g1_copy", "g2_copy"]);
    let labels: Vec<&str> = copied
        .iter()
        .filter_map(|&id| store.get(id).and_then(|n| n.field_label.as_deref()))
        .collect();
    assert_eq!(labels, vec!["G Copy", "G1 Copy", "G2 Copy"]);
    assert!(store.verify().is_ok());
}

#[rstest]
fn given_custom_naming_when_duplicating_root_then_inserted_after_original(mut store: NodeStore) {
    let top = at(&store, "3");
    let naming = CopyNaming {
        name_suffix: "_2".into(),
        label_suffix: " (2)".into(),
    };

    let copy = TreeMutator::new(&mut store)
        .with_naming(naming)
        .duplicate(top)
        .unwrap();

    assert_eq!(store.root_order()[4], copy);
    let node = store.get(copy).unwrap();
    assert_eq!(node.name.as_deref(), Some("top_2"));
    assert_eq!(node.field_label.as_deref(), Some("Top (2)"));
}

// ============================================================
// move_up() / move_down()
// ============================================================

#[rstest]
fn given_first_sibling_when_moving_up_then_noop(mut store: NodeStore) {
    let a = at(&store, "0/0");
    let before = snapshot(&store);

    let moved = TreeMutator::new(&mut store).move_up(a).unwrap();

    assert!(!moved);
    assert_eq!(snapshot(&store), before);
}

#[rstest]
fn given_last_sibling_when_moving_down_then_noop(mut store: NodeStore) {
    let side = at(&store, "4");
    let before = snapshot(&store);

    assert!(!TreeMutator::new(&mut store).move_down(side).unwrap());
    assert_eq!(snapshot(&store), before);
}

#[rstest]
fn given_sibling_at_k_when_moving_up_then_swaps_with_k_minus_one_only(mut store: NodeStore) {
    let top = at(&store, "3");
    let roots_before = store.root_order().to_vec();

    assert!(TreeMutator::new(&mut store).move_up(top).unwrap());

    let mut expected = roots_before;
    expected.swap(2, 3);
    assert_eq!(store.root_order(), expected.as_slice());
}

// ============================================================
// reparent()
// ============================================================

#[rstest]
fn given_leaf_in_section_when_dropped_at_root_then_root_escape_and_unchanged(
    mut store: NodeStore,
) {
    let g1 = at(&store, "0/1/0");
    let before = snapshot(&store);

    let err = TreeMutator::new(&mut store)
        .reparent(g1, DropTarget::Root)
        .unwrap_err();

    assert_eq!(violation(err), ViolationKind::RootEscape);
    assert_eq!(snapshot(&store), before);
}

#[rstest]
fn given_leaf_in_loose_group_when_dropped_at_root_then_appended(mut store: NodeStore) {
    let l1 = at(&store, "1/0");

    let placement = TreeMutator::new(&mut store)
        .reparent(l1, DropTarget::Root)
        .unwrap();

    assert_eq!(
        placement,
        Placement {
            parent: None,
            index: 5
        }
    );
    assert_eq!(store.get(l1).unwrap().parent, None);
    assert!(store.verify().is_ok());
}

#[rstest]
#[case::inside_group("0/1", true)]
#[case::onto_empty_group("2", false)]
#[case::onto_nested_leaf("0/0", false)]
#[case::inside_loose_group("1", true)]
fn given_container_when_dropped_under_any_parent_then_rejected_and_unchanged(
    mut store: NodeStore,
    #[case] target: &str,
    #[case] inside: bool,
) {
    let side = at(&store, "4");
    let t = at(&store, target);
    let drop = if inside {
        DropTarget::Inside(t)
    } else {
        DropTarget::Onto(t)
    };
    let before = snapshot(&store);

    let err = TreeMutator::new(&mut store).reparent(side, drop).unwrap_err();

    assert_eq!(violation(err), ViolationKind::ContainerNotAtRoot);
    assert_eq!(snapshot(&store), before);
}

#[rstest]
fn given_container_when_dropped_onto_root_sibling_then_reordered(mut store: NodeStore) {
    let side = at(&store, "4");
    let main = at(&store, "0");

    let placement = TreeMutator::new(&mut store)
        .reparent(side, DropTarget::Onto(main))
        .unwrap();

    assert_eq!(placement.index, 0);
    assert_eq!(
        names(&store, store.root_order()),
        vec!["side", "main", "loose", "empty", "top"]
    );
}

#[rstest]
fn given_group_when_dropped_inside_own_child_then_cycle(mut store: NodeStore) {
    let loose = at(&store, "1");
    let g = at(&store, "0/1");
    TreeMutator::new(&mut store)
        .reparent(g, DropTarget::Inside(loose))
        .unwrap();
    let before = snapshot(&store);

    let err = TreeMutator::new(&mut store)
        .reparent(loose, DropTarget::Inside(g))
        .unwrap_err();

    assert_eq!(violation(err), ViolationKind::Cycle);
    assert_eq!(snapshot(&store), before);
}

#[rstest]
fn given_leaf_when_dropped_inside_leaf_then_not_accepting_children(mut store: NodeStore) {
    let top = at(&store, "3");
    let a = at(&store, "0/0");
    let before = snapshot(&store);

    let err = TreeMutator::new(&mut store)
        .reparent(top, DropTarget::Inside(a))
        .unwrap_err();

    assert_eq!(violation(err), ViolationKind::NotAcceptingChildren);
    assert_eq!(snapshot(&store), before);
}

#[rstest]
fn given_empty_group_when_dropping_onto_it_then_becomes_only_child(mut store: NodeStore) {
    let empty = at(&store, "2");
    let b = at(&store, "0/2");

    let placement = TreeMutator::new(&mut store)
        .reparent(b, DropTarget::Onto(empty))
        .unwrap();

    assert_eq!(
        placement,
        Placement {
            parent: Some(empty),
            index: 0
        }
    );
    assert_eq!(store.children(empty), &[b]);
    assert_eq!(names(&store, store.children(at(&store, "0"))), vec!["a", "g"]);
    assert!(store.verify().is_ok());
}

#[rstest]
fn given_filled_group_when_dropping_onto_it_then_placed_beside(mut store: NodeStore) {
    let main = at(&store, "0");
    let g = at(&store, "0/1");
    let top = at(&store, "3");

    let placement = TreeMutator::new(&mut store)
        .reparent(top, DropTarget::Onto(g))
        .unwrap();

    assert_eq!(placement.parent, Some(main));
    assert_eq!(names(&store, store.children(main)), vec!["a", "top", "g", "b"]);
    assert_eq!(store.get(top).unwrap().parent, Some(main));
    assert!(!store.root_order().contains(&top));
}

#[rstest]
#[case::down_past_next("0/0", "0/2", vec!["g", "b", "a"])]
#[case::up_before_previous("0/2", "0/0", vec!["b", "a", "g"])]
#[case::down_one("0/0", "0/1", vec!["g", "a", "b"])]
fn given_same_parent_when_dropping_onto_sibling_then_takes_its_slot(
    mut store: NodeStore,
    #[case] dragged: &str,
    #[case] target: &str,
    #[case] expected: Vec<&str>,
) {
    let main = at(&store, "0");
    let d = at(&store, dragged);
    let t = at(&store, target);

    TreeMutator::new(&mut store)
        .reparent(d, DropTarget::Onto(t))
        .unwrap();

    assert_eq!(names(&store, store.children(main)), expected);
}

#[rstest]
fn given_nested_leaf_when_moved_between_containers_then_parent_updated(mut store: NodeStore) {
    let side = at(&store, "4");
    let g2 = at(&store, "0/1/1");

    TreeMutator::new(&mut store)
        .reparent(g2, DropTarget::Inside(side))
        .unwrap();

    assert_eq!(store.parent(g2), Some(side));
    assert_eq!(names(&store, store.children(at(&store, "0/1"))), vec!["g1"]);
    assert_eq!(NodePath::of(&store, g2).unwrap().to_string(), "4/0");
    assert!(store.verify().is_ok());
}

// ============================================================
// update() / change_type()
// ============================================================

#[rstest]
fn given_properties_when_updating_then_merged_without_structure_change(mut store: NodeStore) {
    let g = at(&store, "0/1");
    let children = store.children(g).to_vec();
    let props = json!({
        "fieldLabel": "Renamed",
        "instructions": "Fill in",
        "group_settings": {"layout": "table"},
        "children": [],
        "parentId": null
    });
    let Value::Object(props) = props else {
        unreachable!()
    };

    TreeMutator::new(&mut store).update(g, props).unwrap();

    let node = store.get(g).unwrap();
    assert_eq!(node.field_label.as_deref(), Some("Renamed"));
    assert_eq!(node.name.as_deref(), Some("g"));
    assert_eq!(node.properties.get("instructions"), Some(&json!("Fill in")));
    assert_eq!(node.settings.get("layout"), Some(&json!("table")));
    assert_eq!(node.child_ids(), children.as_slice());
    assert!(node.parent.is_some());
}

#[rstest]
fn given_group_with_children_when_retyped_to_repeater_then_children_kept(mut store: NodeStore) {
    let g = at(&store, "0/1");
    let children = store.children(g).to_vec();
    let mut settings = serde_json::Map::new();
    settings.insert("min_rows".into(), json!(0));

    TreeMutator::new(&mut store)
        .change_type(g, "repeater", settings)
        .unwrap();

    let node = store.get(g).unwrap();
    assert_eq!(node.field_type(), "repeater");
    assert_eq!(node.child_ids(), children.as_slice());
    assert_eq!(node.bucket_key(), "repeater_settings");
}
