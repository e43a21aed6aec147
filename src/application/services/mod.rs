//! Application services

pub mod comparison;
pub mod snapshot;

pub use comparison::{Comparison, ComparisonService};
pub use snapshot::{Snapshot, SnapshotService};
