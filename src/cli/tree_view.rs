/*
termtree rendering for the arena hierarchy.

Only the visible part is rendered; a collapsed manager shows how many
direct reports are hidden beneath it.
 */
use colored::Colorize;
use generational_arena::Index;
use termtree::Tree;
use tracing::instrument;

use crate::domain::{ChangeType, HierarchyNode, HierarchyTree};

pub trait TreeDisplay {
    fn to_termtree(&self) -> Tree<String>;
}

impl TreeDisplay for HierarchyTree {
    #[instrument(level = "debug", skip(self))]
    fn to_termtree(&self) -> Tree<String> {
        fn build(tree: &HierarchyTree, idx: Index) -> Tree<String> {
            let Some(node) = tree.get_node(idx) else {
                return Tree::new(String::new());
            };
            let mut out = Tree::new(label(node));
            if node.expanded {
                for &child in &node.children {
                    out.push(build(tree, child));
                }
            }
            out
        }

        match self.root() {
            Some(root) => build(self, root),
            None => Tree::new("Empty hierarchy".to_string()),
        }
    }
}

fn label(node: &HierarchyNode) -> String {
    let mut text = node.record.label();
    if !node.record.title.is_empty() {
        text.push_str(&format!(", {}", node.record.title.dimmed()));
    }
    if !node.expanded && !node.is_leaf() {
        text.push_str(&format!(" [+{}]", node.children.len()));
    }
    if let Some(change) = &node.change {
        let tag = match change.change_type {
            ChangeType::New => "new".green(),
            ChangeType::Moved => match &change.previous_manager_name {
                Some(name) => format!("moved from {name}").yellow(),
                None => format!(
                    "moved from {}",
                    change.previous_manager_id.as_deref().unwrap_or("?")
                )
                .yellow(),
            },
            ChangeType::Cascade => "cascade".blue(),
            ChangeType::Exit => "exit".red(),
            ChangeType::Unchanged => return text,
        };
        text.push_str(&format!(" ({tag})"));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{build_hierarchy, EmployeeRecord};

    fn render(tree: &HierarchyTree) -> String {
        colored::control::set_override(false);
        tree.to_termtree().to_string()
    }

    #[test]
    fn given_fresh_tree_when_rendering_then_marks_collapsed_managers() {
        let records = vec![
            EmployeeRecord::new("1", "").with_name("Ceo"),
            EmployeeRecord::new("2", "1").with_name("Ann"),
            EmployeeRecord::new("3", "2"),
            EmployeeRecord::new("4", "2"),
        ];
        let tree = build_hierarchy(&records).unwrap();

        let out = render(&tree);

        assert!(out.contains("Ceo (1)"));
        assert!(out.contains("Ann (2) [+2]"));
        assert!(!out.contains("3"));
    }

    #[test]
    fn given_expanded_tree_when_rendering_then_shows_every_node() {
        let records = vec![
            EmployeeRecord::new("1", ""),
            EmployeeRecord::new("2", "1"),
            EmployeeRecord::new("3", "2"),
        ];
        let mut tree = build_hierarchy(&records).unwrap();
        tree.expand_all();

        let out = render(&tree);

        assert_eq!(out.lines().count(), 3);
        assert!(!out.contains("[+"));
    }
}
