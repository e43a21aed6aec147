//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::{ComparisonService, SnapshotService};
use crate::config::Settings;
use crate::infrastructure::traits::{FileSystem, RealFileSystem};

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    pub snapshots: Arc<SnapshotService>,
    pub comparison: ComparisonService,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        Self::with_deps(settings, Arc::new(RealFileSystem))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(settings: Settings, fs: Arc<dyn FileSystem>) -> Self {
        let settings = Arc::new(settings);
        let snapshots = Arc::new(SnapshotService::new(
            fs,
            settings.fields.clone(),
            settings.layout,
        ));
        let comparison = ComparisonService::new(snapshots.clone());

        Self {
            settings,
            snapshots,
            comparison,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::traits::MemoryFileSystem;
    use std::path::Path;

    #[test]
    fn given_custom_columns_when_wiring_then_snapshot_service_uses_them() {
        let mut settings = Settings::default();
        settings.fields.employee_id = "Worker".to_string();
        settings.fields.manager_id = "Boss".to_string();
        let fs = MemoryFileSystem::new().with_file(
            "/s.json",
            r#"[{"Worker": "a", "Boss": ""}, {"Worker": "b", "Boss": "a"}]"#,
        );

        let container = ServiceContainer::with_deps(settings, Arc::new(fs));
        let snapshot = container.snapshots.load(Path::new("/s.json")).unwrap();

        assert!(snapshot.is_valid());
        assert_eq!(snapshot.records[1].manager_id, "a");
    }

    #[test]
    fn given_injected_filesystem_when_comparing_then_reads_through_it() {
        // Arrange
        let fs = MemoryFileSystem::new()
            .with_file("/a.json", r#"[{"Employee ID": "1", "Manager ID": ""}]"#)
            .with_file(
                "/b.json",
                r#"[{"Employee ID": "1", "Manager ID": ""}, {"Employee ID": "2", "Manager ID": "1"}]"#,
            );
        let container = ServiceContainer::with_deps(Settings::default(), Arc::new(fs));

        // Act
        let comparison = container
            .comparison
            .compare(Path::new("/a.json"), Path::new("/b.json"))
            .unwrap();

        // Assert
        let analysis = comparison.analysis.unwrap();
        assert_eq!(analysis.summary.new_count, 1);
        assert_eq!(container.settings.layout, crate::domain::LayoutConfig::default());
    }
}
