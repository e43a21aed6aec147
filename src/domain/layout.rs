//! Deterministic top-down layout of the visible part of a hierarchy.
//!
//! Every expanded node reserves the width of its children block; children
//! are centered beneath their parent and each depth level sits a fixed
//! vertical gap below the previous one. Collapsed nodes occupy a single slot
//! and their descendants keep whatever coordinates they had.

use std::collections::HashMap;

use generational_arena::Index;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::domain::arena::HierarchyTree;
use crate::domain::error::DomainResult;

pub const NODE_WIDTH: f64 = 200.0;
pub const HORIZONTAL_GAP: f64 = 40.0;
pub const VERTICAL_GAP: f64 = 120.0;

/// Geometry used by the layout engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub node_width: f64,
    pub horizontal_gap: f64,
    pub vertical_gap: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_width: NODE_WIDTH,
            horizontal_gap: HORIZONTAL_GAP,
            vertical_gap: VERTICAL_GAP,
        }
    }
}

/// Layout algorithm implementation
#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    config: LayoutConfig,
}

impl LayoutEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Horizontal space needed by `node` and its expanded descendants.
    pub fn subtree_width(&self, tree: &HierarchyTree, node: Index) -> DomainResult<f64> {
        let widths = self.widths(tree, node)?;
        Ok(widths.last().map_or(self.config.node_width, |&(_, width)| width))
    }

    /// Widths of `node` and its expanded descendants in post-order, so
    /// `node` itself comes last.
    fn widths(&self, tree: &HierarchyTree, node: Index) -> DomainResult<Vec<(Index, f64)>> {
        let mut measured: HashMap<Index, f64> = HashMap::new();
        let mut order = Vec::new();
        let mut stack = vec![(node, false)];

        while let Some((idx, children_done)) = stack.pop() {
            let current = tree.node(idx)?;
            let width = if !current.expanded || current.is_leaf() {
                self.config.node_width
            } else if !children_done {
                stack.push((idx, true));
                stack.extend(current.children.iter().rev().map(|&child| (child, false)));
                continue;
            } else {
                let total = current
                    .children
                    .iter()
                    .map(|child| measured.get(child).copied().unwrap_or(0.0))
                    .sum();
                self.combine(total, current.children.len())
            };
            measured.insert(idx, width);
            order.push((idx, width));
        }
        Ok(order)
    }

    fn combine(&self, children_total: f64, child_count: usize) -> f64 {
        let gaps = child_count.saturating_sub(1) as f64 * self.config.horizontal_gap;
        (children_total + gaps).max(self.config.node_width)
    }

    /// Place `node` centered at `x` on row `y` and lay out its visible
    /// descendants beneath it.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn calculate_layout(
        &self,
        tree: &mut HierarchyTree,
        node: Index,
        x: f64,
        y: f64,
    ) -> DomainResult<()> {
        self.measure(tree, node)?;
        self.place(tree, node, x, y)
    }

    /// Lay out the whole tree with the root at the origin.
    pub fn layout_tree(&self, tree: &mut HierarchyTree) -> DomainResult<()> {
        match tree.root() {
            Some(root) => self.calculate_layout(tree, root, 0.0, 0.0),
            None => Ok(()),
        }
    }

    /// Bottom-up pass storing `subtree_width` on every visible node.
    fn measure(&self, tree: &mut HierarchyTree, node: Index) -> DomainResult<()> {
        for (idx, width) in self.widths(tree, node)? {
            tree.node_mut(idx)?.subtree_width = width;
        }
        Ok(())
    }

    /// Top-down pass assigning coordinates from the stored widths.
    fn place(&self, tree: &mut HierarchyTree, node: Index, x: f64, y: f64) -> DomainResult<()> {
        let mut stack = vec![(node, x, y)];

        while let Some((idx, x, y)) = stack.pop() {
            let (expanded, children) = {
                let current = tree.node_mut(idx)?;
                current.x = x;
                current.y = y;
                (current.expanded, current.children.clone())
            };
            if !expanded || children.is_empty() {
                continue;
            }

            let mut block = 0.0;
            for &child in &children {
                block += tree.node(child)?.subtree_width;
            }
            block += children.len().saturating_sub(1) as f64 * self.config.horizontal_gap;

            let child_y = y + self.config.vertical_gap;
            let mut offset = x - block / 2.0;
            let mut placed = Vec::with_capacity(children.len());
            for &child in &children {
                let width = tree.node(child)?.subtree_width;
                placed.push((child, offset + width / 2.0, child_y));
                offset += width + self.config.horizontal_gap;
            }
            stack.extend(placed.into_iter().rev());
        }
        Ok(())
    }
}

/// Lay out `node` with the default geometry.
pub fn calculate_layout(tree: &mut HierarchyTree, node: Index, x: f64, y: f64) -> DomainResult<()> {
    LayoutEngine::new().calculate_layout(tree, node, x, y)
}

/// Subtree width with the default geometry.
pub fn subtree_width(tree: &HierarchyTree, node: Index) -> DomainResult<f64> {
    LayoutEngine::new().subtree_width(tree, node)
}
