//! Hierarchy builder turning a flat snapshot into a rooted tree.
//!
//! Validation findings are advisory, so the builder has to cope with
//! whatever it is given: blank or duplicate ids, dangling managers, several
//! roots or none at all. It never fails and always terminates.

use generational_arena::Index;
use tracing::{debug, instrument, warn};

use crate::domain::arena::HierarchyTree;
use crate::domain::entities::EmployeeRecord;

/// Constructs hierarchy trees from employee snapshots.
#[derive(Debug, Default, Clone, Copy)]
pub struct HierarchyBuilder;

impl HierarchyBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build a fresh tree; `None` when no usable employee remains.
    ///
    /// Only the root starts expanded. Nodes that cannot be reached from the
    /// chosen root (secondary roots, isolated cycles) are dropped.
    #[instrument(level = "debug", skip(self, employees), fields(employees = employees.len()))]
    pub fn build(&self, employees: &[EmployeeRecord]) -> Option<HierarchyTree> {
        let mut tree = HierarchyTree::new();
        let mut order: Vec<Index> = Vec::with_capacity(employees.len());

        for record in employees {
            if record.key().is_empty() {
                warn!("skipping record without employee id: {:?}", record.name);
                continue;
            }
            match tree.insert_node(record.clone()) {
                Some(idx) => order.push(idx),
                None => warn!("skipping duplicate employee id: {}", record.id),
            }
        }

        if order.is_empty() {
            debug!("no employees, no hierarchy");
            return None;
        }

        let mut blank_manager: Vec<Index> = Vec::new();
        let mut potential_roots: Vec<Index> = Vec::new();

        for &idx in &order {
            let Some(manager_key) = tree.get_node(idx).map(|n| n.record.manager_key()) else {
                continue;
            };
            if manager_key.is_empty() {
                blank_manager.push(idx);
                potential_roots.push(idx);
                continue;
            }
            match tree.find(&manager_key) {
                Some(manager) if manager != idx => {
                    if let Err(e) = tree.attach(manager, idx) {
                        warn!("cannot attach node: {e}");
                        potential_roots.push(idx);
                    }
                }
                _ => {
                    debug!("manager {manager_key} unavailable, treating node as potential root");
                    potential_roots.push(idx);
                }
            }
        }

        let root = if let [only] = blank_manager.as_slice() {
            *only
        } else if let Some(root) = most_direct_reports(&tree, &potential_roots) {
            warn!(
                "{} employees without a manager, {} potential roots; using the one with most direct reports",
                blank_manager.len(),
                potential_roots.len()
            );
            root
        } else {
            // Everybody sits on a reporting cycle: cut the first employee
            // loose from its manager and grow the tree from there.
            let first = order[0];
            if let Some(&parent) = tree.parent_index().get(&first) {
                if let Err(e) = tree.detach(parent, first) {
                    warn!("cannot detach node: {e}");
                }
            }
            warn!("no potential root, breaking reporting cycle at first employee");
            first
        };

        if let Some(node) = tree.get_node_mut(root) {
            node.expanded = true;
            debug!("root: {}", node.record);
        }
        if let Err(e) = tree.set_root(root) {
            warn!("cannot set root: {e}");
            return None;
        }

        let pruned = tree.prune_unreachable();
        if pruned > 0 {
            warn!("{pruned} employees are not connected to the root and were left out");
        }

        Some(tree)
    }
}

/// Potential root with the most direct reports; ties go to input order.
fn most_direct_reports(tree: &HierarchyTree, candidates: &[Index]) -> Option<Index> {
    let mut best: Option<(Index, usize)> = None;
    for &idx in candidates {
        let reports = tree.get_node(idx).map(|n| n.children.len()).unwrap_or(0);
        match best {
            Some((_, most)) if most >= reports => {}
            _ => best = Some((idx, reports)),
        }
    }
    best.map(|(idx, _)| idx)
}

/// Convenience wrapper around [`HierarchyBuilder::build`].
pub fn build_hierarchy(employees: &[EmployeeRecord]) -> Option<HierarchyTree> {
    HierarchyBuilder::new().build(employees)
}
