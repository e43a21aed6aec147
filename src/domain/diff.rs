//! Structural diff between two snapshots of the organization.
//!
//! Employees are matched by canonical id. Each one lands in exactly one of
//! `new`, `moved`, `exit` or `unchanged`; cascade effects are reported on
//! top of that classification and may count a subordinate once per moved
//! ancestor in its chain.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::arena::{ChangeAnnotation, HierarchyTree};
use crate::domain::entities::{canonical_records, EmployeeRecord};
use crate::domain::normalize::normalize_id;

/// Per-employee change tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    New,
    Moved,
    Exit,
    /// Unchanged themselves, but below a moved employee in the target
    Cascade,
    Unchanged,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Moved => "moved",
            Self::Exit => "exit",
            Self::Cascade => "cascade",
            Self::Unchanged => "unchanged",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Employee whose manager differs between the snapshots.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovedEmployee {
    /// Record as it appears in the target snapshot
    pub record: EmployeeRecord,
    pub previous_manager_id: String,
    pub previous_manager_name: Option<String>,
}

/// Subordinates (direct and transitive, in the target) of one moved employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeEffect {
    pub moved_employee_id: String,
    pub affected_subordinate_ids: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSummary {
    pub new_count: usize,
    pub moved_count: usize,
    pub exit_count: usize,
    pub unchanged_count: usize,
    /// Moved employees that have at least one subordinate
    pub total_cascade: usize,
    /// Sum of all cascade counts, overlaps included
    pub total_affected: usize,
}

/// Final classification of one employee across both snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeClassification {
    pub id: String,
    pub change_type: ChangeType,
    pub previous_manager_id: Option<String>,
    pub previous_manager_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeAnalysis {
    pub new: Vec<EmployeeRecord>,
    pub moved: Vec<MovedEmployee>,
    pub exit: Vec<EmployeeRecord>,
    pub unchanged: Vec<EmployeeRecord>,
    pub cascade_effects: Vec<CascadeEffect>,
    pub summary: ChangeSummary,
}

impl ChangeAnalysis {
    /// Every employee of either snapshot keyed by canonical id.
    ///
    /// Precedence: new, moved and exit are disjoint by construction; cascade
    /// only replaces `unchanged`.
    pub fn classifications(&self) -> BTreeMap<String, ChangeClassification> {
        let mut result = BTreeMap::new();
        let plain = |record: &EmployeeRecord, change_type| ChangeClassification {
            id: record.id.clone(),
            change_type,
            previous_manager_id: None,
            previous_manager_name: None,
        };

        for record in &self.unchanged {
            result.insert(record.key(), plain(record, ChangeType::Unchanged));
        }
        for effect in &self.cascade_effects {
            for id in &effect.affected_subordinate_ids {
                if let Some(entry) = result.get_mut(&normalize_id(id)) {
                    entry.change_type = ChangeType::Cascade;
                }
            }
        }
        for record in &self.new {
            result.insert(record.key(), plain(record, ChangeType::New));
        }
        for record in &self.exit {
            result.insert(record.key(), plain(record, ChangeType::Exit));
        }
        for moved in &self.moved {
            result.insert(
                moved.record.key(),
                ChangeClassification {
                    id: moved.record.id.clone(),
                    change_type: ChangeType::Moved,
                    previous_manager_id: Some(moved.previous_manager_id.clone()),
                    previous_manager_name: moved.previous_manager_name.clone(),
                },
            );
        }
        result
    }

    /// Change tag of one employee, `None` if it is in neither snapshot.
    ///
    /// Scans the analysis on every call, so tagging a whole tree this way is
    /// quadratic. Build [`Self::classifications`] once for that instead.
    pub fn classify(&self, id: &str) -> Option<ChangeType> {
        let key = normalize_id(id);
        let matches = |record: &EmployeeRecord| record.key() == key;

        if self.moved.iter().any(|m| matches(&m.record)) {
            return Some(ChangeType::Moved);
        }
        if self.exit.iter().any(matches) {
            return Some(ChangeType::Exit);
        }
        if self.new.iter().any(matches) {
            return Some(ChangeType::New);
        }
        if !self.unchanged.iter().any(matches) {
            return None;
        }
        let cascaded = self
            .cascade_effects
            .iter()
            .flat_map(|e| &e.affected_subordinate_ids)
            .any(|sub| normalize_id(sub) == key);
        Some(if cascaded {
            ChangeType::Cascade
        } else {
            ChangeType::Unchanged
        })
    }

    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.moved.is_empty() && self.exit.is_empty()
    }
}

fn index<'a>(records: &[&'a EmployeeRecord]) -> HashMap<String, &'a EmployeeRecord> {
    records.iter().map(|r| (r.key(), *r)).collect()
}

/// Compares two snapshots.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiffEngine;

impl DiffEngine {
    pub fn new() -> Self {
        Self
    }

    /// Classify every employee of `baseline` and `target`.
    ///
    /// Returns `None` when either snapshot has no employee with a usable id:
    /// there is nothing to compare and callers should not offer a comparison
    /// view.
    #[instrument(level = "debug", skip_all, fields(baseline = baseline.len(), target = target.len()))]
    pub fn analyze(
        &self,
        baseline: &[EmployeeRecord],
        target: &[EmployeeRecord],
    ) -> Option<ChangeAnalysis> {
        let baseline = canonical_records(baseline);
        let target = canonical_records(target);
        if baseline.is_empty() || target.is_empty() {
            debug!("snapshot missing, no comparison");
            return None;
        }

        let baseline_by_id = index(&baseline);
        let target_by_id = index(&target);

        let mut new = Vec::new();
        let mut moved = Vec::new();
        let mut unchanged = Vec::new();

        for record in &target {
            let key = record.key();
            match baseline_by_id.get(&key) {
                None => new.push((*record).clone()),
                Some(previous) if previous.manager_key() != record.manager_key() => {
                    let previous_manager_name = baseline_by_id
                        .get(&previous.manager_key())
                        .map(|m| m.name.trim())
                        .filter(|name| !name.is_empty())
                        .map(str::to_string);
                    moved.push(MovedEmployee {
                        record: (*record).clone(),
                        previous_manager_id: previous.manager_id.clone(),
                        previous_manager_name,
                    });
                }
                Some(_) => unchanged.push((*record).clone()),
            }
        }

        let exit: Vec<EmployeeRecord> = baseline
            .iter()
            .filter(|r| !target_by_id.contains_key(&r.key()))
            .map(|r| (*r).clone())
            .collect();

        let reports = reports_by_manager(&target);
        let cascade_effects: Vec<CascadeEffect> = moved
            .iter()
            .filter_map(|m| {
                let affected = subordinates(&reports, &m.record.key());
                (!affected.is_empty()).then(|| CascadeEffect {
                    moved_employee_id: m.record.id.clone(),
                    count: affected.len(),
                    affected_subordinate_ids: affected,
                })
            })
            .collect();

        let summary = ChangeSummary {
            new_count: new.len(),
            moved_count: moved.len(),
            exit_count: exit.len(),
            unchanged_count: unchanged.len(),
            total_cascade: cascade_effects.len(),
            total_affected: cascade_effects.iter().map(|c| c.count).sum(),
        };
        debug!(?summary, "change analysis complete");

        Some(ChangeAnalysis {
            new,
            moved,
            exit,
            unchanged,
            cascade_effects,
            summary,
        })
    }
}

/// Canonical manager id -> direct reports, in target order.
fn reports_by_manager<'a>(target: &[&'a EmployeeRecord]) -> HashMap<String, Vec<&'a EmployeeRecord>> {
    let mut reports: HashMap<String, Vec<&EmployeeRecord>> = HashMap::new();
    for record in target {
        let manager = record.manager_key();
        if !manager.is_empty() {
            reports.entry(manager).or_default().push(record);
        }
    }
    reports
}

/// All direct and transitive reports of `key`, depth-first. Terminates on
/// cyclic input because every id is visited at most once.
fn subordinates(reports: &HashMap<String, Vec<&EmployeeRecord>>, key: &str) -> Vec<String> {
    let mut visited: HashSet<String> = HashSet::from([key.to_string()]);
    let mut affected = Vec::new();
    let mut stack: Vec<&EmployeeRecord> = reports
        .get(key)
        .map(|r| r.iter().rev().copied().collect())
        .unwrap_or_default();

    while let Some(record) = stack.pop() {
        let child_key = record.key();
        if !visited.insert(child_key.clone()) {
            continue;
        }
        affected.push(record.id.clone());
        if let Some(children) = reports.get(&child_key) {
            stack.extend(children.iter().rev().copied());
        }
    }
    affected
}

/// Convenience wrapper around [`DiffEngine::analyze`].
pub fn analyze_changes(
    baseline: &[EmployeeRecord],
    target: &[EmployeeRecord],
) -> Option<ChangeAnalysis> {
    DiffEngine::new().analyze(baseline, target)
}

/// Write change annotations onto the nodes of `tree`, replacing old ones.
/// Nodes unknown to the analysis are left unannotated.
#[instrument(level = "debug", skip_all)]
pub fn annotate_tree(tree: &mut HierarchyTree, analysis: &ChangeAnalysis) -> usize {
    tree.clear_changes();
    let classifications = analysis.classifications();
    let mut annotated = 0;
    for (_, node) in tree.nodes_mut() {
        if let Some(c) = classifications.get(&node.record.key()) {
            node.change = Some(ChangeAnnotation {
                change_type: c.change_type,
                previous_manager_id: c.previous_manager_id.clone(),
                previous_manager_name: c.previous_manager_name.clone(),
            });
            annotated += 1;
        }
    }
    annotated
}
