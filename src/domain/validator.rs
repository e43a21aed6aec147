//! Structural checks over one flat snapshot.
//!
//! Every finding is advisory: the validator collects the complete list and
//! never stops early, so callers can show a best-effort tree next to it.

use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use tracing::{debug, instrument};

use crate::domain::entities::{
    display_label, EmployeeRecord, ErrorDetails, FieldMapping, RawRow, RootCandidate,
    StructuralError, StructuralErrorKind,
};
use crate::domain::normalize::normalize_id;

/// Normalized view of one input row shared by all passes.
#[derive(Debug, Clone)]
struct RowView {
    /// 1-based position in the input
    row: usize,
    id: String,
    key: String,
    manager_id: String,
    manager_key: String,
    name: String,
}

impl RowView {
    fn new(row: usize, id: &str, manager_id: &str, name: &str) -> Self {
        Self {
            row,
            id: id.trim().to_string(),
            key: normalize_id(id),
            manager_id: manager_id.trim().to_string(),
            manager_key: normalize_id(manager_id),
            name: name.trim().to_string(),
        }
    }

    fn label(&self) -> String {
        display_label(&self.name, &self.id)
    }
}

/// Validate raw rows whose id and manager id live in the given columns.
pub fn validate(
    rows: &[RawRow],
    employee_id_field: &str,
    manager_id_field: &str,
) -> Vec<StructuralError> {
    let fields = FieldMapping {
        employee_id: employee_id_field.to_string(),
        manager_id: manager_id_field.to_string(),
        ..FieldMapping::default()
    };
    validate_with(rows, &fields)
}

/// Validate raw rows using a full column mapping (names feed the messages).
#[instrument(level = "debug", skip(rows, fields), fields(rows = rows.len()))]
pub fn validate_with(rows: &[RawRow], fields: &FieldMapping) -> Vec<StructuralError> {
    let cell = |row: &RawRow, column: &str| row.get(column).cloned().unwrap_or_default();
    let view: Vec<RowView> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            RowView::new(
                i + 1,
                &cell(row, &fields.employee_id),
                &cell(row, &fields.manager_id),
                &cell(row, &fields.name),
            )
        })
        .collect();
    check(&view)
}

/// Validate already-mapped records.
#[instrument(level = "debug", skip(records), fields(records = records.len()))]
pub fn validate_records(records: &[EmployeeRecord]) -> Vec<StructuralError> {
    let view: Vec<RowView> = records
        .iter()
        .enumerate()
        .map(|(i, r)| RowView::new(i + 1, &r.id, &r.manager_id, &r.name))
        .collect();
    check(&view)
}

fn check(view: &[RowView]) -> Vec<StructuralError> {
    let mut errors = Vec::new();

    // Pass 1: ids, duplicates, self references, root candidates
    let mut first_seen: HashMap<&str, usize> = HashMap::new();
    let mut canonical: Vec<&RowView> = Vec::new();
    let mut roots: Vec<&RowView> = Vec::new();

    for (idx, row) in view.iter().enumerate() {
        if row.key.is_empty() {
            errors.push(StructuralError::new(
                StructuralErrorKind::MissingEmployeeId,
                format!("Row {} has no employee id", row.row),
                ErrorDetails::MissingId { row: row.row },
            ));
            continue;
        }

        match first_seen.get(row.key.as_str()) {
            Some(&first) => {
                let first = &view[first];
                errors.push(StructuralError::new(
                    StructuralErrorKind::DuplicateEmployeeId,
                    format!(
                        "Employee id {} appears in row {} and again in row {}",
                        row.id, first.row, row.row
                    ),
                    ErrorDetails::DuplicateId {
                        id: row.id.clone(),
                        first_row: first.row,
                        duplicate_row: row.row,
                    },
                ));
            }
            None => {
                first_seen.insert(row.key.as_str(), idx);
                canonical.push(row);
                if row.manager_key.is_empty() {
                    roots.push(row);
                }
            }
        }

        if !row.manager_key.is_empty() && row.manager_key == row.key {
            errors.push(StructuralError::new(
                StructuralErrorKind::SelfReference,
                format!("{} is listed as their own manager", row.label()),
                ErrorDetails::SelfReference {
                    id: row.id.clone(),
                    row: row.row,
                },
            ));
        }
    }

    // Pass 2: exactly one root
    match roots.len() {
        0 => errors.push(StructuralError::new(
            StructuralErrorKind::NoRoot,
            "No employee without a manager was found",
            ErrorDetails::NoRoot,
        )),
        1 => {}
        n => errors.push(StructuralError::new(
            StructuralErrorKind::MultipleRoots,
            format!(
                "Found {n} employees without a manager: {}",
                roots.iter().map(|r| r.label()).join(", ")
            ),
            ErrorDetails::MultipleRoots {
                roots: roots
                    .iter()
                    .map(|r| RootCandidate {
                        id: r.id.clone(),
                        name: r.name.clone(),
                        row: r.row,
                    })
                    .collect(),
            },
        )),
    }

    // Pass 3: every referenced manager exists
    for row in &canonical {
        if !row.manager_key.is_empty() && !first_seen.contains_key(row.manager_key.as_str()) {
            errors.push(StructuralError::new(
                StructuralErrorKind::MissingManager,
                format!(
                    "Manager {} of {} does not exist",
                    row.manager_id,
                    row.label()
                ),
                ErrorDetails::MissingManager {
                    id: row.id.clone(),
                    manager_id: row.manager_id.clone(),
                    row: row.row,
                },
            ));
        }
    }

    // Pass 4: reporting cycles
    errors.extend(find_cycles(&canonical));

    debug!("validation produced {} findings", errors.len());
    errors
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

/// Depth-first search over employee -> manager edges.
///
/// Each employee has at most one outgoing edge, so the recursion stack is the
/// current reporting chain. Hitting a node that is still on the stack closes
/// a cycle; cycles are keyed by their sorted id set so each one is reported
/// once regardless of where the walk entered it.
fn find_cycles(canonical: &[&RowView]) -> Vec<StructuralError> {
    let position: HashMap<&str, usize> = canonical
        .iter()
        .enumerate()
        .map(|(i, r)| (r.key.as_str(), i))
        .collect();

    // Self loops are reported as self references, not as cycles.
    let manager_of: Vec<Option<usize>> = canonical
        .iter()
        .enumerate()
        .map(|(i, r)| {
            position
                .get(r.manager_key.as_str())
                .copied()
                .filter(|&m| m != i)
        })
        .collect();

    let mut marks = vec![Mark::Unvisited; canonical.len()];
    let mut seen_cycles: HashSet<Vec<&str>> = HashSet::new();
    let mut errors = Vec::new();

    for start in 0..canonical.len() {
        if marks[start] != Mark::Unvisited {
            continue;
        }

        let mut stack: Vec<usize> = Vec::new();
        let mut current = start;
        loop {
            marks[current] = Mark::OnStack;
            stack.push(current);

            let Some(next) = manager_of[current] else {
                break;
            };
            match marks[next] {
                Mark::Unvisited => current = next,
                Mark::Done => break,
                Mark::OnStack => {
                    let Some(entry) = stack.iter().position(|&n| n == next) else {
                        break;
                    };
                    let members = &stack[entry..];
                    let mut key: Vec<&str> =
                        members.iter().map(|&n| canonical[n].key.as_str()).collect();
                    key.sort_unstable();
                    if seen_cycles.insert(key) {
                        errors.push(cycle_error(canonical, members));
                    }
                    break;
                }
            }
        }

        for node in stack {
            marks[node] = Mark::Done;
        }
    }

    errors
}

fn cycle_error(canonical: &[&RowView], members: &[usize]) -> StructuralError {
    let ids: Vec<String> = members.iter().map(|&n| canonical[n].id.clone()).collect();
    let path = members
        .iter()
        .chain(members.first())
        .map(|&n| canonical[n].label())
        .join(" → ");

    StructuralError::new(
        StructuralErrorKind::CircularReference,
        format!("Circular reporting line: {path}"),
        ErrorDetails::Cycle { ids, path },
    )
}
