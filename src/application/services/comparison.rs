//! Comparison service
//!
//! Loads a baseline and a target snapshot, classifies every employee and
//! annotates the target hierarchy for display.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::application::services::snapshot::{Snapshot, SnapshotService};
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{annotate_tree, ChangeAnalysis, DiffEngine, HierarchyTree};

/// Result of comparing two snapshots.
#[derive(Debug)]
pub struct Comparison {
    pub baseline: Snapshot,
    pub target: Snapshot,
    /// `None` when either snapshot holds no employees
    pub analysis: Option<ChangeAnalysis>,
    /// Target hierarchy, fully expanded, laid out and annotated
    pub tree: Option<HierarchyTree>,
}

impl Comparison {
    /// Whether anybody was added, moved or left.
    pub fn has_changes(&self) -> bool {
        self.analysis.as_ref().is_some_and(|a| !a.is_empty())
    }
}

/// Service for structural diffs between snapshots.
pub struct ComparisonService {
    snapshots: Arc<SnapshotService>,
    engine: DiffEngine,
}

impl ComparisonService {
    pub fn new(snapshots: Arc<SnapshotService>) -> Self {
        Self {
            snapshots,
            engine: DiffEngine::new(),
        }
    }

    /// Compare two snapshot files.
    #[instrument(level = "debug", skip(self))]
    pub fn compare(&self, baseline: &Path, target: &Path) -> ApplicationResult<Comparison> {
        let baseline = self.snapshots.load(baseline)?;
        let target = self.snapshots.load(target)?;
        self.compare_snapshots(baseline, target)
    }

    /// Compare two already loaded snapshots.
    pub fn compare_snapshots(
        &self,
        baseline: Snapshot,
        target: Snapshot,
    ) -> ApplicationResult<Comparison> {
        let analysis = self.engine.analyze(&baseline.records, &target.records);

        let tree = match &analysis {
            Some(analysis) => match self.snapshots.hierarchy(&target, true) {
                Ok(mut tree) => {
                    let annotated = annotate_tree(&mut tree, analysis);
                    debug!("annotated {annotated} nodes");
                    Some(tree)
                }
                Err(ApplicationError::EmptySnapshot(path)) => {
                    debug!("no hierarchy for {}", path.display());
                    None
                }
                Err(e) => return Err(e),
            },
            None => None,
        };

        if let Some(analysis) = &analysis {
            let s = &analysis.summary;
            info!(
                "new={} moved={} exit={} unchanged={} cascade={}",
                s.new_count, s.moved_count, s.exit_count, s.unchanged_count, s.total_cascade
            );
        }

        Ok(Comparison {
            baseline,
            target,
            analysis,
            tree,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChangeType, FieldMapping, LayoutConfig};
    use crate::infrastructure::traits::MemoryFileSystem;

    fn service(fs: MemoryFileSystem) -> ComparisonService {
        let snapshots =
            SnapshotService::new(Arc::new(fs), FieldMapping::default(), LayoutConfig::default());
        ComparisonService::new(Arc::new(snapshots))
    }

    #[test]
    fn given_moved_employee_when_comparing_then_annotates_target_tree() {
        let fs = MemoryFileSystem::new()
            .with_file(
                "/a.json",
                r#"[
                    {"Employee ID": "1", "Manager ID": "", "Name": "Ceo"},
                    {"Employee ID": "2", "Manager ID": "1", "Name": "Bo"},
                    {"Employee ID": "3", "Manager ID": "1"},
                    {"Employee ID": "4", "Manager ID": "2"}
                ]"#,
            )
            .with_file(
                "/b.json",
                r#"[
                    {"Employee ID": "1", "Manager ID": ""},
                    {"Employee ID": "2", "Manager ID": "1"},
                    {"Employee ID": "3", "Manager ID": "1"},
                    {"Employee ID": "4", "Manager ID": "3"}
                ]"#,
            );

        let comparison = service(fs)
            .compare(Path::new("/a.json"), Path::new("/b.json"))
            .unwrap();

        assert!(comparison.has_changes());
        let tree = comparison.tree.unwrap();
        let moved = tree.get_node(tree.find("4").unwrap()).unwrap();
        let change = moved.change.as_ref().unwrap();
        assert_eq!(change.change_type, ChangeType::Moved);
        assert_eq!(change.previous_manager_id.as_deref(), Some("2"));
        assert_eq!(change.previous_manager_name.as_deref(), Some("Bo"));
    }

    #[test]
    fn given_empty_baseline_when_comparing_then_no_analysis() {
        let fs = MemoryFileSystem::new()
            .with_file("/a.json", "[]")
            .with_file("/b.json", r#"[{"Employee ID": "1", "Manager ID": ""}]"#);

        let comparison = service(fs)
            .compare(Path::new("/a.json"), Path::new("/b.json"))
            .unwrap();

        assert!(comparison.analysis.is_none());
        assert!(comparison.tree.is_none());
        assert!(!comparison.has_changes());
    }

    #[test]
    fn given_target_with_only_blank_ids_when_comparing_then_no_analysis_and_no_error() {
        // Arrange
        let fs = MemoryFileSystem::new()
            .with_file(
                "/a.json",
                r#"[
                    {"Employee ID": "1", "Manager ID": ""},
                    {"Employee ID": "2", "Manager ID": "1"}
                ]"#,
            )
            .with_file("/b.json", r#"[{"Employee ID": ""}]"#);

        // Act
        let comparison = service(fs)
            .compare(Path::new("/a.json"), Path::new("/b.json"))
            .unwrap();

        // Assert
        assert!(comparison.analysis.is_none());
        assert!(comparison.tree.is_none());
        assert!(!comparison.target.is_valid());
    }
}
