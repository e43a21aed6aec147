//! Tests for LayoutEngine and visibility

use rstest::rstest;

use orgdelta::domain::{
    build_hierarchy, calculate_layout, subtree_width, visible_links, visible_nodes,
    EmployeeRecord, HierarchyTree, LayoutConfig, LayoutEngine,
};
use orgdelta::domain::layout::{HORIZONTAL_GAP, NODE_WIDTH, VERTICAL_GAP};
use orgdelta::util::testing::init_test_setup;

// 1
// ├── 2
// │   ├── 4
// │   └── 5
// │       └── 7
// └── 3
//     └── 6
fn org() -> HierarchyTree {
    init_test_setup();
    let records: Vec<EmployeeRecord> = [
        ("1", ""),
        ("2", "1"),
        ("3", "1"),
        ("4", "2"),
        ("5", "2"),
        ("6", "3"),
        ("7", "5"),
    ]
    .iter()
    .map(|(id, mgr)| EmployeeRecord::new(*id, *mgr))
    .collect();
    build_hierarchy(&records).unwrap()
}

fn coordinates(tree: &HierarchyTree) -> Vec<(String, f64, f64)> {
    tree.iter()
        .map(|(_, n)| (n.id().to_string(), n.x, n.y))
        .collect()
}

#[rstest]
#[case(false)]
#[case(true)]
fn given_any_expand_state_when_measuring_then_width_is_at_least_one_node(#[case] all: bool) {
    // Arrange
    let mut tree = org();
    if all {
        tree.expand_all();
    }

    // Act / Assert
    for (idx, node) in tree.iter() {
        let width = subtree_width(&tree, idx).unwrap();
        assert!(width >= NODE_WIDTH, "{} has width {}", node.id(), width);
        if !node.expanded || node.is_leaf() {
            assert_eq!(width, NODE_WIDTH);
        }
    }
}

#[test]
fn given_unchanged_state_when_laying_out_twice_then_coordinates_are_identical() {
    // Arrange
    let mut tree = org();
    tree.expand_all();
    let root = tree.root().unwrap();

    // Act
    calculate_layout(&mut tree, root, 0.0, 0.0).unwrap();
    let first = coordinates(&tree);
    calculate_layout(&mut tree, root, 0.0, 0.0).unwrap();
    let second = coordinates(&tree);

    // Assert
    assert_eq!(first, second);
}

#[test]
fn given_fully_expanded_org_when_laying_out_then_siblings_do_not_overlap() {
    // Arrange
    let mut tree = org();
    tree.expand_all();

    // Act
    LayoutEngine::new().layout_tree(&mut tree).unwrap();

    // Assert
    for (_, node) in tree.iter() {
        let xs: Vec<f64> = node
            .children
            .iter()
            .map(|&c| tree.get_node(c).unwrap().x)
            .collect();
        for pair in xs.windows(2) {
            assert!(pair[1] - pair[0] >= NODE_WIDTH + HORIZONTAL_GAP);
        }
    }
    let seven = tree.get_node(tree.find("7").unwrap()).unwrap();
    assert_eq!(seven.y, 3.0 * VERTICAL_GAP);
}

#[test]
fn given_toggle_between_layouts_when_recomputing_then_reflects_new_flags() {
    // Arrange
    let mut tree = org();
    let engine = LayoutEngine::with_config(LayoutConfig::default());
    engine.layout_tree(&mut tree).unwrap();
    assert_eq!(visible_nodes(&tree).len(), 3);

    // Act
    tree.toggle("2").unwrap();
    engine.layout_tree(&mut tree).unwrap();

    // Assert
    let ids: Vec<&str> = visible_nodes(&tree).into_iter().map(|(_, n)| n.id()).collect();
    assert_eq!(ids, vec!["1", "2", "4", "5", "3"]);
    assert_eq!(visible_links(&tree).len(), 4);
    let root = tree.root_node().unwrap();
    // 2 spans 4 and 5, 3 is a single slot
    assert_eq!(
        root.subtree_width,
        2.0 * NODE_WIDTH + HORIZONTAL_GAP + HORIZONTAL_GAP + NODE_WIDTH
    );
}

#[test]
fn given_reveal_when_laying_out_then_path_to_employee_is_visible() {
    let mut tree = org();

    tree.reveal("7").unwrap();

    let ids: Vec<&str> = visible_nodes(&tree).into_iter().map(|(_, n)| n.id()).collect();
    assert!(ids.contains(&"7"));
    assert!(!ids.contains(&"6"));
}
