use std::collections::{HashMap, HashSet};
use std::fmt;

use generational_arena::{Arena, Index};
use serde::Serialize;
use tracing::instrument;

use crate::domain::diff::ChangeType;
use crate::domain::entities::EmployeeRecord;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::normalize::normalize_id;

/// Comparison-mode annotation attached to a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeAnnotation {
    pub change_type: ChangeType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_manager_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_manager_name: Option<String>,
}

/// Tree node in the arena-based hierarchy structure.
#[derive(Debug, Clone)]
pub struct HierarchyNode {
    pub record: EmployeeRecord,
    /// Indices of direct reports in the arena, in input order
    pub children: Vec<Index>,
    pub expanded: bool,
    /// Horizontal center, written by the layout engine
    pub x: f64,
    pub y: f64,
    pub subtree_width: f64,
    pub change: Option<ChangeAnnotation>,
}

impl HierarchyNode {
    pub fn new(record: EmployeeRecord) -> Self {
        Self {
            record,
            children: Vec::new(),
            expanded: false,
            x: 0.0,
            y: 0.0,
            subtree_width: 0.0,
            change: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

impl fmt::Display for HierarchyNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.record)
    }
}

/// Arena-based tree holding one snapshot's hierarchy.
///
/// Nodes own their children through arena indices only. There is no stored
/// parent pointer; [`HierarchyTree::parent_index`] derives one when needed.
#[derive(Debug, Clone)]
pub struct HierarchyTree {
    arena: Arena<HierarchyNode>,
    root: Option<Index>,
    /// Canonical id -> node
    by_id: HashMap<String, Index>,
}

impl Default for HierarchyTree {
    fn default() -> Self {
        Self::new()
    }
}

impl HierarchyTree {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            root: None,
            by_id: HashMap::new(),
        }
    }

    /// Insert a detached node. Returns `None` if the canonical id is taken.
    #[instrument(level = "trace", skip(self, record), fields(id = %record.id))]
    pub fn insert_node(&mut self, record: EmployeeRecord) -> Option<Index> {
        let key = record.key();
        if self.by_id.contains_key(&key) {
            return None;
        }
        let idx = self.arena.insert(HierarchyNode::new(record));
        self.by_id.insert(key, idx);
        Some(idx)
    }

    /// Append `child` to `parent`'s direct reports.
    pub fn attach(&mut self, parent: Index, child: Index) -> DomainResult<()> {
        if !self.arena.contains(child) {
            return Err(DomainError::NodeNotFound(child));
        }
        let parent = self
            .arena
            .get_mut(parent)
            .ok_or(DomainError::NodeNotFound(parent))?;
        parent.children.push(child);
        Ok(())
    }

    /// Remove `child` from `parent`'s direct reports, if present.
    pub fn detach(&mut self, parent: Index, child: Index) -> DomainResult<()> {
        let parent = self
            .arena
            .get_mut(parent)
            .ok_or(DomainError::NodeNotFound(parent))?;
        parent.children.retain(|&c| c != child);
        Ok(())
    }

    pub fn set_root(&mut self, idx: Index) -> DomainResult<()> {
        if !self.arena.contains(idx) {
            return Err(DomainError::NodeNotFound(idx));
        }
        self.root = Some(idx);
        Ok(())
    }

    pub fn root(&self) -> Option<Index> {
        self.root
    }

    pub fn root_node(&self) -> Option<&HierarchyNode> {
        self.root.and_then(|idx| self.arena.get(idx))
    }

    pub fn get_node(&self, idx: Index) -> Option<&HierarchyNode> {
        self.arena.get(idx)
    }

    pub fn get_node_mut(&mut self, idx: Index) -> Option<&mut HierarchyNode> {
        self.arena.get_mut(idx)
    }

    /// Contract-checked lookup used by the layout and visibility code.
    pub fn node(&self, idx: Index) -> DomainResult<&HierarchyNode> {
        self.arena.get(idx).ok_or(DomainError::NodeNotFound(idx))
    }

    pub fn node_mut(&mut self, idx: Index) -> DomainResult<&mut HierarchyNode> {
        self.arena.get_mut(idx).ok_or(DomainError::NodeNotFound(idx))
    }

    /// Look up a node by (unnormalized) employee id.
    pub fn find(&self, id: &str) -> Option<Index> {
        self.by_id.get(&normalize_id(id)).copied()
    }

    fn find_or_err(&self, id: &str) -> DomainResult<Index> {
        self.find(id)
            .ok_or_else(|| DomainError::UnknownEmployee(id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Pre-order traversal from the root over all nodes, ignoring expand flags.
    pub fn iter(&self) -> TreeIterator<'_> {
        TreeIterator::new(self)
    }

    /// Mutable access to every node, in arena order.
    pub fn nodes_mut(&mut self) -> impl Iterator<Item = (Index, &mut HierarchyNode)> {
        self.arena.iter_mut()
    }

    /// Child -> parent map derived from the current children lists.
    #[instrument(level = "trace", skip(self))]
    pub fn parent_index(&self) -> HashMap<Index, Index> {
        self.arena
            .iter()
            .flat_map(|(idx, node)| node.children.iter().map(move |&c| (c, idx)))
            .collect()
    }

    /// Ancestors of `idx`, nearest first.
    pub fn ancestors(&self, idx: Index) -> Vec<Index> {
        let parents = self.parent_index();
        let mut chain = Vec::new();
        let mut current = idx;
        while let Some(&parent) = parents.get(&current) {
            // corrupted children lists must not loop forever
            if chain.contains(&parent) {
                break;
            }
            chain.push(parent);
            current = parent;
        }
        chain
    }

    /// Number of levels below and including the root.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack: Vec<(Index, usize)> = self.root.map(|root| (root, 1)).into_iter().collect();
        while let Some((idx, level)) = stack.pop() {
            if let Some(node) = self.get_node(idx) {
                deepest = deepest.max(level);
                stack.extend(node.children.iter().map(|&child| (child, level + 1)));
            }
        }
        deepest
    }

    /// Drop every node that cannot be reached from the root. Returns the
    /// number of removed nodes.
    #[instrument(level = "debug", skip(self))]
    pub fn prune_unreachable(&mut self) -> usize {
        let reachable: HashSet<Index> = self.iter().map(|(idx, _)| idx).collect();
        let before = self.arena.len();
        self.arena.retain(|idx, _| reachable.contains(&idx));
        self.by_id.retain(|_, idx| reachable.contains(idx));
        before - self.arena.len()
    }

    /// All records in pre-order, regardless of expand flags.
    pub fn flatten(&self) -> Vec<EmployeeRecord> {
        self.iter().map(|(_, node)| node.record.clone()).collect()
    }

    // ------------------------------------------------------------
    // Expand / collapse
    // ------------------------------------------------------------

    /// Flip the expand flag of one employee; returns the new state.
    pub fn toggle(&mut self, id: &str) -> DomainResult<bool> {
        let idx = self.find_or_err(id)?;
        let node = self.node_mut(idx)?;
        node.expanded = !node.expanded;
        Ok(node.expanded)
    }

    pub fn set_expanded(&mut self, id: &str, expanded: bool) -> DomainResult<()> {
        let idx = self.find_or_err(id)?;
        self.node_mut(idx)?.expanded = expanded;
        Ok(())
    }

    pub fn expand_all(&mut self) {
        for (_, node) in self.arena.iter_mut() {
            node.expanded = true;
        }
    }

    /// Collapse everything except the root, the initial state after building.
    pub fn collapse_all(&mut self) {
        let root = self.root;
        for (idx, node) in self.arena.iter_mut() {
            node.expanded = Some(idx) == root;
        }
    }

    /// Expand every ancestor of `id` so that it becomes visible.
    pub fn reveal(&mut self, id: &str) -> DomainResult<()> {
        let idx = self.find_or_err(id)?;
        for ancestor in self.ancestors(idx) {
            self.node_mut(ancestor)?.expanded = true;
        }
        Ok(())
    }

    /// Remove all comparison annotations.
    pub fn clear_changes(&mut self) {
        for (_, node) in self.arena.iter_mut() {
            node.change = None;
        }
    }
}

pub struct TreeIterator<'a> {
    tree: &'a HierarchyTree,
    stack: Vec<Index>,
}

impl<'a> TreeIterator<'a> {
    fn new(tree: &'a HierarchyTree) -> Self {
        let mut stack = Vec::new();
        if let Some(root) = tree.root() {
            stack.push(root);
        }
        Self { tree, stack }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (Index, &'a HierarchyNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current_idx) = self.stack.pop() {
            if let Some(node) = self.tree.get_node(current_idx) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some((current_idx, node));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1
    // ├── 2
    // │   └── 4
    // └── 3
    fn sample() -> HierarchyTree {
        let mut tree = HierarchyTree::new();
        let one = tree.insert_node(EmployeeRecord::new("1", "")).unwrap();
        let two = tree.insert_node(EmployeeRecord::new("2", "1")).unwrap();
        let three = tree.insert_node(EmployeeRecord::new("3", "1")).unwrap();
        let four = tree.insert_node(EmployeeRecord::new("4", "2")).unwrap();
        tree.attach(one, two).unwrap();
        tree.attach(one, three).unwrap();
        tree.attach(two, four).unwrap();
        tree.set_root(one).unwrap();
        tree.node_mut(one).unwrap().expanded = true;
        tree
    }

    #[test]
    fn given_tree_when_iterating_then_visits_in_preorder() {
        let tree = sample();
        let ids: Vec<&str> = tree.iter().map(|(_, n)| n.id()).collect();
        assert_eq!(ids, vec!["1", "2", "4", "3"]);
        assert_eq!(tree.depth(), 3);
    }

    #[test]
    fn given_duplicate_key_when_inserting_then_rejects() {
        let mut tree = sample();
        assert!(tree.insert_node(EmployeeRecord::new(" 2 ", "1")).is_none());
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn given_leaf_when_deriving_ancestors_then_returns_chain_to_root() {
        let tree = sample();
        let four = tree.find("4").unwrap();
        let chain: Vec<&str> = tree
            .ancestors(four)
            .into_iter()
            .map(|i| tree.get_node(i).unwrap().id())
            .collect();
        assert_eq!(chain, vec!["2", "1"]);
    }

    #[test]
    fn given_collapsed_branch_when_revealing_then_expands_ancestors() {
        let mut tree = sample();
        tree.reveal("4").unwrap();
        let two = tree.find("2").unwrap();
        assert!(tree.get_node(two).unwrap().expanded);
    }

    #[test]
    fn given_unknown_id_when_toggling_then_errors() {
        let mut tree = sample();
        assert_eq!(
            tree.toggle("nope"),
            Err(DomainError::UnknownEmployee("nope".into()))
        );
    }

    #[test]
    fn given_expanded_tree_when_collapsing_all_then_root_stays_open() {
        let mut tree = sample();
        tree.expand_all();
        tree.collapse_all();
        let open: Vec<&str> = tree
            .iter()
            .filter(|(_, n)| n.expanded)
            .map(|(_, n)| n.id())
            .collect();
        assert_eq!(open, vec!["1"]);
    }

    #[test]
    fn given_detached_node_when_pruning_then_removes_it() {
        let mut tree = sample();
        tree.insert_node(EmployeeRecord::new("9", "x")).unwrap();
        assert_eq!(tree.prune_unreachable(), 1);
        assert!(tree.find("9").is_none());
        assert_eq!(tree.len(), 4);
    }
}
