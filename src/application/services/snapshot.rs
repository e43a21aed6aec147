//! Snapshot service
//!
//! Loads a snapshot file (JSON array of field-mapped rows), maps the rows
//! onto employee records, collects structural findings and builds the
//! laid-out hierarchy.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::domain::{
    canonical_records, validate_with, EmployeeRecord, FieldMapping, HierarchyBuilder,
    HierarchyTree, LayoutConfig, LayoutEngine, RawRow, StructuralError,
};
use crate::infrastructure::traits::FileSystem;

/// A loaded snapshot with its advisory findings.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// File the snapshot was read from
    pub source: PathBuf,
    /// Records in file order, including rows the builder will skip
    pub records: Vec<EmployeeRecord>,
    /// Structural findings, empty for a clean snapshot
    pub errors: Vec<StructuralError>,
}

impl Snapshot {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Service turning snapshot files into hierarchies.
pub struct SnapshotService {
    fs: Arc<dyn FileSystem>,
    fields: FieldMapping,
    builder: HierarchyBuilder,
    layout: LayoutEngine,
}

impl SnapshotService {
    /// Create a new snapshot service.
    pub fn new(fs: Arc<dyn FileSystem>, fields: FieldMapping, layout: LayoutConfig) -> Self {
        Self {
            fs,
            fields,
            builder: HierarchyBuilder::new(),
            layout: LayoutEngine::with_config(layout),
        }
    }

    pub fn fields(&self) -> &FieldMapping {
        &self.fields
    }

    /// Read the raw rows of a snapshot file.
    ///
    /// Cells may be strings, numbers, booleans or null; null becomes an
    /// empty cell and everything else its JSON text.
    pub fn read_rows(&self, path: &Path) -> ApplicationResult<Vec<RawRow>> {
        debug!("read_rows: path={}", path.display());
        let content = self
            .fs
            .read_to_string(path)
            .with_path_context("read snapshot", path)?;

        let objects: Vec<Map<String, Value>> =
            serde_json::from_str(&content).map_err(|e| ApplicationError::InvalidSnapshot {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        Ok(objects.into_iter().map(to_row).collect())
    }

    /// Load and validate a snapshot.
    #[instrument(level = "debug", skip(self))]
    pub fn load(&self, path: &Path) -> ApplicationResult<Snapshot> {
        let rows = self.read_rows(path)?;
        let errors = validate_with(&rows, &self.fields);
        let records: Vec<EmployeeRecord> = rows
            .iter()
            .map(|row| EmployeeRecord::from_row(row, &self.fields))
            .collect();

        if !errors.is_empty() {
            warn!(
                "{}: {} structural finding(s)",
                path.display(),
                errors.len()
            );
        }
        info!("loaded {} records from {}", records.len(), path.display());

        Ok(Snapshot {
            source: path.to_path_buf(),
            records,
            errors,
        })
    }

    /// Build and lay out the hierarchy of a loaded snapshot.
    ///
    /// With `expand_all` every node is expanded before layout, otherwise only
    /// the root is.
    pub fn hierarchy(&self, snapshot: &Snapshot, expand_all: bool) -> ApplicationResult<HierarchyTree> {
        let mut tree = self
            .builder
            .build(&snapshot.records)
            .ok_or_else(|| ApplicationError::EmptySnapshot(snapshot.source.clone()))?;
        if expand_all {
            tree.expand_all();
        }
        self.relayout(&mut tree)?;
        Ok(tree)
    }

    /// Recompute coordinates after expand flags changed.
    pub fn relayout(&self, tree: &mut HierarchyTree) -> ApplicationResult<()> {
        self.layout.layout_tree(tree)?;
        Ok(())
    }

    /// Write the flat employee records of `snapshot` to `out` as JSON.
    ///
    /// Every employee keeps its first record in file order, whether or not
    /// it is reachable from the root. Rows without an id and repeated ids
    /// are left out. Returns the number of records written.
    #[instrument(level = "debug", skip(self, snapshot), fields(source = %snapshot.source.display()))]
    pub fn export(&self, snapshot: &Snapshot, out: &Path) -> ApplicationResult<usize> {
        let records = canonical_records(&snapshot.records);
        if records.is_empty() {
            return Err(ApplicationError::EmptySnapshot(snapshot.source.clone()));
        }
        let skipped = snapshot.records.len() - records.len();
        if skipped > 0 {
            warn!("{skipped} rows without an id or with a repeated id left out of the export");
        }

        let json = serde_json::to_string_pretty(&records).map_err(|e| {
            ApplicationError::OperationFailed {
                context: format!("serialize export for {}", out.display()),
                source: Box::new(e),
            }
        })?;

        self.fs
            .ensure_parent(out)
            .with_path_context("create export directory", out)?;
        self.fs
            .write(out, &json)
            .with_path_context("write export", out)?;

        info!("exported {} records to {}", records.len(), out.display());
        Ok(records.len())
    }
}

fn to_row(object: Map<String, Value>) -> RawRow {
    object
        .into_iter()
        .map(|(column, value)| {
            let cell = match value {
                Value::Null => String::new(),
                Value::String(s) => s,
                other => other.to_string(),
            };
            (column, cell)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StructuralErrorKind;
    use crate::infrastructure::traits::MemoryFileSystem;

    fn service(fs: MemoryFileSystem) -> SnapshotService {
        SnapshotService::new(Arc::new(fs), FieldMapping::default(), LayoutConfig::default())
    }

    #[test]
    fn given_mixed_cell_types_when_reading_rows_then_stringifies_cells() {
        let fs = MemoryFileSystem::new().with_file(
            "/s.json",
            r#"[{"Employee ID": 7, "Manager ID": null, "FTE": 0.5, "Name": "Ann"}]"#,
        );

        let rows = service(fs).read_rows(Path::new("/s.json")).unwrap();

        assert_eq!(rows[0]["Employee ID"], "7");
        assert_eq!(rows[0]["Manager ID"], "");
        assert_eq!(rows[0]["FTE"], "0.5");
        assert_eq!(rows[0]["Name"], "Ann");
    }

    #[test]
    fn given_not_an_array_when_reading_rows_then_invalid_snapshot() {
        let fs = MemoryFileSystem::new().with_file("/s.json", r#"{"Employee ID": "1"}"#);

        let result = service(fs).read_rows(Path::new("/s.json"));

        assert!(matches!(
            result,
            Err(ApplicationError::InvalidSnapshot { .. })
        ));
    }

    #[test]
    fn given_missing_file_when_loading_then_operation_failed() {
        let result = service(MemoryFileSystem::new()).load(Path::new("/nope.json"));
        assert!(matches!(
            result,
            Err(ApplicationError::OperationFailed { .. })
        ));
    }

    #[test]
    fn given_dangling_manager_when_loading_then_reports_finding_and_still_builds() {
        let fs = MemoryFileSystem::new().with_file(
            "/s.json",
            r#"[
                {"Employee ID": "1", "Manager ID": ""},
                {"Employee ID": "2", "Manager ID": "1"},
                {"Employee ID": "3", "Manager ID": "99"}
            ]"#,
        );
        let service = service(fs);

        let snapshot = service.load(Path::new("/s.json")).unwrap();
        let tree = service.hierarchy(&snapshot, false).unwrap();

        assert_eq!(snapshot.errors.len(), 1);
        assert_eq!(snapshot.errors[0].kind, StructuralErrorKind::MissingManager);
        assert_eq!(tree.root_node().map(|n| n.id()), Some("1"));
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn given_empty_array_when_building_then_empty_snapshot_error() {
        let fs = MemoryFileSystem::new().with_file("/s.json", "[]");
        let service = service(fs);

        let snapshot = service.load(Path::new("/s.json")).unwrap();

        assert!(snapshot.is_empty());
        assert!(matches!(
            service.hierarchy(&snapshot, false),
            Err(ApplicationError::EmptySnapshot(_))
        ));
    }

    #[test]
    fn given_snapshot_when_exporting_then_writes_camel_case_records() {
        let fs = Arc::new(MemoryFileSystem::new().with_file(
            "/s.json",
            r#"[
                {"Employee ID": "1", "Manager ID": "", "Job Family": "Eng"},
                {"Employee ID": "2", "Manager ID": "1"}
            ]"#,
        ));
        let service =
            SnapshotService::new(fs.clone(), FieldMapping::default(), LayoutConfig::default());
        let snapshot = service.load(Path::new("/s.json")).unwrap();

        let written = service.export(&snapshot, Path::new("/out.json")).unwrap();

        assert_eq!(written, 2);
        let out = fs.read_to_string(Path::new("/out.json")).unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value[0]["id"], "1");
        assert_eq!(value[0]["jobFamily"], "Eng");
        assert_eq!(value[1]["managerId"], "1");
    }

    #[test]
    fn given_secondary_root_and_duplicate_when_exporting_then_keeps_every_employee_once() {
        // Arrange
        let fs = Arc::new(MemoryFileSystem::new().with_file(
            "/s.json",
            r#"[
                {"Employee ID": "1", "Manager ID": ""},
                {"Employee ID": "2", "Manager ID": "1"},
                {"Employee ID": "3", "Manager ID": "", "Name": "Loner"},
                {"Employee ID": "2", "Manager ID": "3"},
                {"Employee ID": "", "Manager ID": "1"}
            ]"#,
        ));
        let service =
            SnapshotService::new(fs.clone(), FieldMapping::default(), LayoutConfig::default());
        let snapshot = service.load(Path::new("/s.json")).unwrap();

        // Act
        let written = service.export(&snapshot, Path::new("/out.json")).unwrap();

        // Assert
        assert!(!snapshot.is_valid());
        assert_eq!(written, 3);
        let out = fs.read_to_string(Path::new("/out.json")).unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        let ids: Vec<&str> = value
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(value[1]["managerId"], "1");
        assert_eq!(value[2]["name"], "Loner");
    }
}
