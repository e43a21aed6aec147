//! Domain entities: core data structures

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::normalize::normalize_id;

/// Full-time equivalent assumed when a row carries no usable value.
pub const DEFAULT_FTE: f64 = 1.0;

fn default_fte() -> f64 {
    DEFAULT_FTE
}

/// One flat row as handed over by the record producer: column name -> cell text.
pub type RawRow = BTreeMap<String, String>;

/// A single employee as it appears in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeRecord {
    pub id: String,
    /// Empty for the root of the organization
    #[serde(default)]
    pub manager_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_fte")]
    pub fte: f64,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub job_family: String,
    #[serde(default)]
    pub management_level: String,
}

impl EmployeeRecord {
    /// Minimal record carrying only the reporting line.
    pub fn new(id: impl Into<String>, manager_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            manager_id: manager_id.into(),
            name: String::new(),
            title: String::new(),
            fte: DEFAULT_FTE,
            location: String::new(),
            job_family: String::new(),
            management_level: String::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Map a raw row onto a record using the configured column names.
    ///
    /// Missing columns become empty strings; `fte` falls back to
    /// [`DEFAULT_FTE`] when absent, unparseable or not finite.
    pub fn from_row(row: &RawRow, fields: &FieldMapping) -> Self {
        let cell = |column: &str| row.get(column).map(|v| v.trim().to_string()).unwrap_or_default();
        let fte = row
            .get(&fields.fte)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .unwrap_or(DEFAULT_FTE);

        Self {
            id: cell(&fields.employee_id),
            manager_id: cell(&fields.manager_id),
            name: cell(&fields.name),
            title: cell(&fields.title),
            fte,
            location: cell(&fields.location),
            job_family: cell(&fields.job_family),
            management_level: cell(&fields.management_level),
        }
    }

    /// Canonical id used for matching.
    pub fn key(&self) -> String {
        normalize_id(&self.id)
    }

    /// Canonical manager id, empty for a root.
    pub fn manager_key(&self) -> String {
        normalize_id(&self.manager_id)
    }

    /// `name (id)` when a name is known, the bare id otherwise.
    pub fn label(&self) -> String {
        display_label(&self.name, &self.id)
    }
}

impl fmt::Display for EmployeeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// First record per canonical id, in input order; blank ids are dropped.
pub fn canonical_records(records: &[EmployeeRecord]) -> Vec<&EmployeeRecord> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter(|r| {
            let key = r.key();
            !key.is_empty() && seen.insert(key)
        })
        .collect()
}

pub(crate) fn display_label(name: &str, id: &str) -> String {
    let name = name.trim();
    let id = id.trim();
    if name.is_empty() {
        id.to_string()
    } else {
        format!("{name} ({id})")
    }
}

/// Column names used to map raw rows onto [`EmployeeRecord`] fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FieldMapping {
    pub employee_id: String,
    pub manager_id: String,
    pub name: String,
    pub title: String,
    pub fte: String,
    pub location: String,
    pub job_family: String,
    pub management_level: String,
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            employee_id: "Employee ID".into(),
            manager_id: "Manager ID".into(),
            name: "Name".into(),
            title: "Title".into(),
            fte: "FTE".into(),
            location: "Location".into(),
            job_family: "Job Family".into(),
            management_level: "Management Level".into(),
        }
    }
}

/// Category of a structural finding. The string tags are stable and meant
/// for direct display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StructuralErrorKind {
    #[serde(rename = "Missing Employee ID")]
    MissingEmployeeId,
    #[serde(rename = "Duplicate Employee ID")]
    DuplicateEmployeeId,
    #[serde(rename = "Self-Reference")]
    SelfReference,
    #[serde(rename = "No CEO Found")]
    NoRoot,
    #[serde(rename = "Multiple CEOs Found")]
    MultipleRoots,
    #[serde(rename = "Manager Does Not Exist")]
    MissingManager,
    #[serde(rename = "Circular Reference Found")]
    CircularReference,
}

impl StructuralErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingEmployeeId => "Missing Employee ID",
            Self::DuplicateEmployeeId => "Duplicate Employee ID",
            Self::SelfReference => "Self-Reference",
            Self::NoRoot => "No CEO Found",
            Self::MultipleRoots => "Multiple CEOs Found",
            Self::MissingManager => "Manager Does Not Exist",
            Self::CircularReference => "Circular Reference Found",
        }
    }
}

impl fmt::Display for StructuralErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A root candidate named in a multiple-roots finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootCandidate {
    pub id: String,
    pub name: String,
    pub row: usize,
}

/// Machine-readable payload of a structural finding. Rows are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ErrorDetails {
    MissingId {
        row: usize,
    },
    DuplicateId {
        id: String,
        first_row: usize,
        duplicate_row: usize,
    },
    SelfReference {
        id: String,
        row: usize,
    },
    NoRoot,
    MultipleRoots {
        roots: Vec<RootCandidate>,
    },
    MissingManager {
        id: String,
        manager_id: String,
        row: usize,
    },
    /// `ids` in reporting order starting at the node where the loop closed.
    Cycle {
        ids: Vec<String>,
        path: String,
    },
}

/// Advisory finding produced by the record validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralError {
    #[serde(rename = "type")]
    pub kind: StructuralErrorKind,
    pub message: String,
    pub details: ErrorDetails,
}

impl StructuralError {
    pub fn new(kind: StructuralErrorKind, message: impl Into<String>, details: ErrorDetails) -> Self {
        Self {
            kind,
            message: message.into(),
            details,
        }
    }
}

impl fmt::Display for StructuralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}
