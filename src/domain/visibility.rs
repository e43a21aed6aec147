//! Visible portion of a hierarchy, derived from the expand flags.
//!
//! Nothing here is cached: both walks read the flags on every call.

use generational_arena::Index;
use serde::Serialize;
use tracing::instrument;

use crate::domain::arena::{ChangeAnnotation, HierarchyNode, HierarchyTree};

/// Edge from a manager to a direct report, both visible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibleLink {
    #[serde(skip)]
    pub source: Index,
    #[serde(skip)]
    pub target: Index,
    pub source_id: String,
    pub target_id: String,
}

/// Render-ready view of one visible node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionedNode {
    pub id: String,
    pub name: String,
    pub title: String,
    pub x: f64,
    pub y: f64,
    pub subtree_width: f64,
    pub expanded: bool,
    pub report_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<ChangeAnnotation>,
}

impl From<&HierarchyNode> for PositionedNode {
    fn from(node: &HierarchyNode) -> Self {
        Self {
            id: node.record.id.clone(),
            name: node.record.name.clone(),
            title: node.record.title.clone(),
            x: node.x,
            y: node.y,
            subtree_width: node.subtree_width,
            expanded: node.expanded,
            report_count: node.children.len(),
            change: node.change.clone(),
        }
    }
}

/// Visible nodes in depth-first pre-order, root first.
#[instrument(level = "trace", skip(tree))]
pub fn visible_nodes(tree: &HierarchyTree) -> Vec<(Index, &HierarchyNode)> {
    let mut visible = Vec::new();
    let mut stack: Vec<Index> = tree.root().into_iter().collect();

    while let Some(idx) = stack.pop() {
        let Some(node) = tree.get_node(idx) else {
            continue;
        };
        visible.push((idx, node));
        if node.expanded {
            for &child in node.children.iter().rev() {
                stack.push(child);
            }
        }
    }
    visible
}

/// Manager -> report edges whose both ends are visible, in the same
/// depth-first order as [`visible_nodes`].
#[instrument(level = "trace", skip(tree))]
pub fn visible_links(tree: &HierarchyTree) -> Vec<VisibleLink> {
    let mut links = Vec::new();
    for (idx, node) in visible_nodes(tree) {
        if !node.expanded {
            continue;
        }
        for &child in &node.children {
            if let Some(report) = tree.get_node(child) {
                links.push(VisibleLink {
                    source: idx,
                    target: child,
                    source_id: node.record.id.clone(),
                    target_id: report.record.id.clone(),
                });
            }
        }
    }
    links
}

/// Visible nodes with their current coordinates, for the renderer.
pub fn positioned_nodes(tree: &HierarchyTree) -> Vec<PositionedNode> {
    visible_nodes(tree)
        .into_iter()
        .map(|(_, node)| PositionedNode::from(node))
        .collect()
}
